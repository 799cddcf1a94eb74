use regex::Regex;

use crate::error::SyntaxError;

/// Saved cursor state. Restoring truncates every open capture buffer back
/// to its recorded length, so a failed speculative parse leaves no trace.
#[derive(Debug, Clone)]
pub struct Mark {
    position: usize,
    line: usize,
    capture_lens: Vec<usize>,
}

/// Pattern-matching cursor over the source text.
///
/// A scan succeeds only when the pattern matches at the cursor itself;
/// on success the cursor advances past the match, the line counter absorbs
/// any newlines in the consumed span, and the span is appended to every
/// open capture buffer.
pub struct Scanner {
    source: String,
    position: usize,
    line: usize,
    captures: Vec<String>,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        return Scanner {
            source: source.to_owned(),
            position: 0,
            line: 1,
            captures: Vec::new(),
        };
    }

    pub fn eos(&self) -> bool {
        return self.position >= self.source.len();
    }

    pub fn line(&self) -> usize {
        return self.line;
    }

    pub fn rest(&self) -> &str {
        return &self.source[self.position..];
    }

    pub fn peek_char(&self) -> Option<char> {
        return self.rest().chars().next();
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        return self.rest().starts_with(prefix);
    }

    /// True when the character immediately before the cursor is whitespace.
    pub fn preceded_by_whitespace(&self) -> bool {
        return self.source[..self.position]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_whitespace());
    }

    // ======= MATCHING =======

    /// Consumes `pattern` if it matches at the cursor, returning the
    /// matched text.
    pub fn scan(&mut self, pattern: &Regex) -> Option<String> {
        let (start, end) = {
            let m = pattern.find_at(&self.source, self.position)?;
            (m.start(), m.end())
        };
        if start != self.position {
            return None;
        }
        return Some(self.consumed(end - start));
    }

    /// Like `scan` but leaves the cursor untouched.
    pub fn peek(&self, pattern: &Regex) -> Option<&str> {
        let m = pattern.find_at(&self.source, self.position)?;
        if m.start() != self.position {
            return None;
        }
        return Some(m.as_str());
    }

    pub fn scan_char(&mut self, c: char) -> bool {
        if self.rest().starts_with(c) {
            self.consumed(c.len_utf8());
            return true;
        }
        return false;
    }

    pub fn scan_str(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.consumed(s.len());
            return true;
        }
        return false;
    }

    fn consumed(&mut self, len: usize) -> String {
        let end = self.position + len;
        let span = self.source[self.position..end].to_owned();
        self.line += span.bytes().filter(|b| *b == b'\n').count();
        for buf in &mut self.captures {
            buf.push_str(&span);
        }
        self.position = end;
        return span;
    }

    // ======= CAPTURES =======

    pub fn start_capture(&mut self) {
        self.captures.push(String::new());
    }

    pub fn take_capture(&mut self) -> String {
        debug_assert!(!self.captures.is_empty(), "unbalanced capture stack");
        return self.captures.pop().unwrap_or_default();
    }

    // ======= BACKTRACKING =======

    pub fn mark(&self) -> Mark {
        return Mark {
            position: self.position,
            line: self.line,
            capture_lens: self.captures.iter().map(String::len).collect(),
        };
    }

    pub fn restore(&mut self, mark: Mark) {
        self.position = mark.position;
        self.line = mark.line;
        self.captures.truncate(mark.capture_lens.len());
        for (buf, len) in self.captures.iter_mut().zip(mark.capture_lens) {
            buf.truncate(len);
        }
    }

    // ======= DIAGNOSTICS =======

    /// Up to `n` characters before the cursor, not crossing a line break.
    pub fn context_before(&self, n: usize) -> String {
        let upto = &self.source[..self.position];
        let start = upto.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let chars: Vec<char> = upto[start..].chars().collect();
        return chars[chars.len().saturating_sub(n)..].iter().collect();
    }

    /// Up to `n` characters after the cursor, not crossing a line break.
    pub fn context_after(&self, n: usize) -> String {
        return self
            .rest()
            .chars()
            .take_while(|c| *c != '\n')
            .take(n)
            .collect();
    }

    /// Builds the standard "expected X, was Y" error at the current cursor.
    pub fn expected(&self, what: &str) -> SyntaxError {
        let before = self.context_before(15);
        let message = if self.eos() {
            format!(
                "Invalid CSS after \"{}\": expected {}, was end of input",
                before, what
            )
        } else {
            format!(
                "Invalid CSS after \"{}\": expected {}, was \"{}\"",
                before,
                what,
                self.context_after(15)
            )
        };
        return SyntaxError::new(message, self.line);
    }
}
