//! The script side of the language: raw expression values, variable
//! environments, and interpolation.
//!
//! Expressions are kept opaque. A value is scanned as a balanced run of
//! text in which only three things are structural: quoted strings,
//! `$variable` references, and `#{...}` interpolation. Everything else is
//! carried through as literal text and substituted at resolve time.

use std::collections::HashMap;

use crate::error::SyntaxError;
use crate::parser::patterns;
use crate::parser::scanner::Scanner;

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Literal(String),
    Variable(String),
    Interpolation(Expression),
}

/// An unevaluated value: alternating literal and dynamic parts.
/// Adjacent literal parts are always merged as they are pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub parts: Vec<Part>,
    pub line: usize,
}

impl Expression {
    pub fn new(line: usize) -> Self {
        return Expression {
            parts: Vec::new(),
            line,
        };
    }

    pub fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Part::Literal(last)) = self.parts.last_mut() {
            last.push_str(text);
            return;
        }
        self.parts.push(Part::Literal(text.to_owned()));
    }

    pub fn push_variable(&mut self, name: String) {
        self.parts.push(Part::Variable(name));
    }

    pub fn push_interpolation(&mut self, inner: Expression) {
        self.parts.push(Part::Interpolation(inner));
    }

    /// True when no dynamic part exists and all literal text is blank.
    pub fn is_empty(&self) -> bool {
        return self.parts.iter().all(|p| match p {
            Part::Literal(s) => s.trim().is_empty(),
            _ => false,
        });
    }

    /// Strips surrounding whitespace from the outermost literal parts.
    pub fn trim(&mut self) {
        if let Some(Part::Literal(first)) = self.parts.first_mut() {
            let trimmed = first.trim_start().to_owned();
            *first = trimmed;
        }
        if let Some(Part::Literal(last)) = self.parts.last_mut() {
            let trimmed = last.trim_end().to_owned();
            *last = trimmed;
        }
        self.parts.retain(|p| !matches!(p, Part::Literal(s) if s.is_empty()));
    }

    /// Substitutes variables and interpolation, yielding plain text.
    pub fn evaluate(&self, env: &Environment) -> Result<String, SyntaxError> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Variable(name) => match env.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(SyntaxError::new(
                            format!("Undefined variable: \"${}\"", name),
                            self.line,
                        ));
                    }
                },
                Part::Interpolation(inner) => {
                    // #{} unwraps a fully-quoted result into plain text
                    let text = inner.evaluate(env)?;
                    out.push_str(unquote(&text));
                }
            }
        }
        return Ok(out);
    }
}

/// Strips one pair of matching outer quotes, if present.
pub(crate) fn unquote(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &text[1..text.len() - 1];
        }
    }
    return text;
}

/// Variable bindings visible while the tree is resolved.
#[derive(Debug, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        return Environment::default();
    }

    pub fn get(&self, name: &str) -> Option<&String> {
        return self.vars.get(name);
    }

    pub fn set(&mut self, name: &str, value: String) {
        self.vars.insert(name.to_owned(), value);
    }

    pub fn is_set(&self, name: &str) -> bool {
        return self.vars.contains_key(name);
    }
}

// ======= VALUE SCANNING =======

/// Terminators that end a value at paren depth zero. `{` and `}` always
/// stop the scan; `;` stops it only outside parentheses.
struct Stops<'a> {
    comma: bool,
    bang: bool,
    words: &'a [&'a str],
}

impl Stops<'_> {
    /// Ordinary declaration or directive value.
    fn value() -> Self {
        return Stops {
            comma: false,
            bang: true,
            words: &[],
        };
    }

    /// One element of a comma-separated argument list.
    fn argument() -> Self {
        return Stops {
            comma: true,
            bang: true,
            words: &[],
        };
    }

    /// Body of `#{...}`; `!` and `,` are plain text there.
    fn interpolation() -> Self {
        return Stops {
            comma: false,
            bang: false,
            words: &[],
        };
    }
}

pub fn parse_value(scanner: &mut Scanner) -> Result<Expression, SyntaxError> {
    return parse_value_with(scanner, Stops::value());
}

pub fn parse_argument(scanner: &mut Scanner) -> Result<Expression, SyntaxError> {
    return parse_value_with(scanner, Stops::argument());
}

/// Value scan that also stops before any of the given bare words, used for
/// the bounds of `@for $i from <a> through <b>`.
pub fn parse_value_until<'a>(
    scanner: &mut Scanner,
    words: &'a [&'a str],
) -> Result<Expression, SyntaxError> {
    return parse_value_with(
        scanner,
        Stops {
            comma: false,
            bang: true,
            words,
        },
    );
}

/// Consumes `#{ ... }` and returns the inner expression.
pub fn parse_interpolation(scanner: &mut Scanner) -> Result<Expression, SyntaxError> {
    if !scanner.scan_str("#{") {
        return Err(scanner.expected("\"#{\""));
    }
    let expr = parse_value_with(scanner, Stops::interpolation())?;
    if !scanner.scan_char('}') {
        return Err(scanner.expected("\"}\""));
    }
    return Ok(expr);
}

fn parse_value_with(scanner: &mut Scanner, stops: Stops) -> Result<Expression, SyntaxError> {
    let line = scanner.line();
    let mut expr = Expression::new(line);
    let mut paren_depth: usize = 0;

    loop {
        let Some(ch) = scanner.peek_char() else { break };
        match ch {
            '{' | '}' => break,
            ';' if paren_depth == 0 => break,
            ';' => {
                scanner.scan_char(';');
                expr.push_literal(";");
            }
            '!' if stops.bang && paren_depth == 0 => break,
            ',' if stops.comma && paren_depth == 0 => break,
            ')' if paren_depth == 0 => break,
            '#' if scanner.starts_with("#{") => {
                expr.push_interpolation(parse_interpolation(scanner)?);
            }
            '#' => {
                scanner.scan_char('#');
                expr.push_literal("#");
            }
            '"' | '\'' => {
                let Some(s) = scanner.scan(&patterns::STRING) else {
                    return Err(scanner.expected("closing quote"));
                };
                expr.push_literal(&s);
            }
            '$' => {
                scanner.scan_char('$');
                match scanner.scan(&patterns::IDENT) {
                    Some(name) => expr.push_variable(name),
                    None => expr.push_literal("$"),
                }
            }
            '(' => {
                scanner.scan_char('(');
                paren_depth += 1;
                expr.push_literal("(");
            }
            ')' => {
                scanner.scan_char(')');
                paren_depth -= 1;
                expr.push_literal(")");
            }
            '/' if scanner.starts_with("/*") => {
                if scanner.scan(&patterns::LOUD_COMMENT).is_none() {
                    return Err(scanner.expected("\"*/\""));
                }
            }
            '/' if scanner.starts_with("//") => {
                scanner.scan(&patterns::SILENT_COMMENT);
            }
            '!' | ',' | '/' => {
                let mut buf = [0u8; 4];
                scanner.scan_char(ch);
                expr.push_literal(ch.encode_utf8(&mut buf));
            }
            _ => {
                if !stops.words.is_empty() && ch.is_ascii_alphabetic() {
                    if let Some(word) = scanner.peek(&patterns::IDENT) {
                        if stops.words.contains(&word) {
                            break;
                        }
                    }
                    if let Some(word) = scanner.scan(&patterns::IDENT) {
                        expr.push_literal(&word);
                        continue;
                    }
                }
                let chunk = if stops.words.is_empty() {
                    scanner.scan(&patterns::VALUE_CHUNK)
                } else {
                    scanner.scan(&patterns::VALUE_CHUNK_NO_IDENT)
                };
                match chunk {
                    Some(text) => expr.push_literal(&text),
                    None => {
                        let mut buf = [0u8; 4];
                        scanner.scan_char(ch);
                        expr.push_literal(ch.encode_utf8(&mut buf));
                    }
                }
            }
        }
    }

    expr.trim();
    return Ok(expr);
}
