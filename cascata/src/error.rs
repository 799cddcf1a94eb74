use thiserror::Error;

/// Error raised for any malformed input, whether detected while parsing,
/// resolving variables, or flattening the tree.
///
/// The line number is 1-based and refers to the original source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Syntax error: {message} on line {line}")]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        return SyntaxError {
            message: message.into(),
            line,
        };
    }
}
