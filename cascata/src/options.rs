use strum_macros::{Display, EnumString};

/// Output style for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Style {
    /// CSS mirrors the nesting of the source; rules indent to their depth
    /// and closing braces ride the last declaration line.
    Nested,
    /// One declaration per line, closing brace on its own line.
    Expanded,
    /// One rule per line.
    Compact,
    /// Minimal whitespace, no trailing newline.
    Compressed,
}

/// Which property syntax a declaration used in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum PropertySyntax {
    /// `name: value`
    New,
    /// Leading-colon `:name value` or `=`-assignment shorthand.
    Old,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub style: Style,
    /// When set, declarations written in the other syntax are rejected.
    pub property_syntax: Option<PropertySyntax>,
}

impl Default for Options {
    fn default() -> Self {
        return Options {
            style: Style::Nested,
            property_syntax: None,
        };
    }
}

impl Options {
    pub fn with_style(style: Style) -> Self {
        return Options {
            style,
            ..Default::default()
        };
    }
}
