//! Compiled lexical patterns shared by the stylesheet and selector parsers.
//!
//! All patterns are written unanchored; `Scanner::scan` verifies that the
//! match begins exactly at the cursor.

use regex::Regex;
use std::sync::LazyLock;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        pub static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect("pattern must compile"));
    };
}

pattern!(WHITESPACE, r"[ \t\r\n\x0c]+");

// https://www.w3.org/TR/CSS21/syndata.html#tokenization, widened to accept
// custom-property style double leading dashes.
pattern!(
    IDENT,
    r"-?-?(?:[_a-zA-Z]|[^\x00-\x7F]|\\[^\n])(?:[-_a-zA-Z0-9]|[^\x00-\x7F]|\\[^\n])*"
);

pattern!(
    STRING,
    r#""(?:[^"\\\n]|\\[^\n])*"|'(?:[^'\\\n]|\\[^\n])*'"#
);

pattern!(LOUD_COMMENT, r"(?s)/\*.*?\*/");
pattern!(SILENT_COMMENT, r"//[^\n]*");

// Literal runs inside a selector; `#`, quotes, comments and block
// punctuation are handled one by one by the caller.
pattern!(SELECTOR_CHUNK, r#"[^{};#"'/]+"#);

// Literal runs inside an at-rule prelude (media queries keep their parens).
pattern!(DIRECTIVE_CHUNK, r#"[^{};#"']+"#);

// Literal runs inside a script value. Everything with structural meaning
// to the balanced scan is excluded and consumed individually.
pattern!(VALUE_CHUNK, r#"[^;{}()!,#"'$/]+"#);
pattern!(VALUE_CHUNK_NO_IDENT, r#"[^;{}()!,#"'$/a-zA-Z]+"#);

pattern!(IMPORTANT, r"important\b");
pattern!(DEFAULT_KW, r"default\b");
pattern!(FROM_KW, r"from\b");
pattern!(TO_KW, r"to\b");
pattern!(THROUGH_KW, r"through\b");
pattern!(IF_KW, r"if\b");
pattern!(AT_ELSE, r"@else\b");

pattern!(URL, r"url\([^)]*\)");
