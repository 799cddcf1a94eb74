//! Recursive-descent selector parser.
//!
//! Runs over selector text after interpolation has been substituted, so in
//! practice `Simple::Interpolation` only appears when a selector is parsed
//! before resolution. Errors are reported relative to the line the rule
//! started on.

use crate::error::SyntaxError;
use crate::parser::patterns;
use crate::parser::scanner::Scanner;

use super::{
    AttrOp, Combinator, CommaSequence, PseudoKind, Sequence, SequencePart, Simple, SimpleSequence,
};

pub fn parse_comma_sequence(text: &str, line: usize) -> Result<CommaSequence, SyntaxError> {
    let mut parser = SelectorParser {
        scanner: Scanner::new(text),
        base_line: line,
    };
    return parser.comma_sequence();
}

struct SelectorParser {
    scanner: Scanner,
    base_line: usize,
}

impl SelectorParser {
    fn comma_sequence(&mut self) -> Result<CommaSequence, SyntaxError> {
        let mut members = vec![self.sequence()?];
        while self.scanner.scan_char(',') {
            members.push(self.sequence()?);
        }
        if !self.scanner.eos() {
            return Err(self.err("selector"));
        }
        return Ok(CommaSequence { members });
    }

    fn sequence(&mut self) -> Result<Sequence, SyntaxError> {
        let mut members: Vec<SequencePart> = Vec::new();
        loop {
            let saw_newline = self.ws();
            if saw_newline && members.is_empty() {
                members.push(SequencePart::Newline);
            }
            let Some(ch) = self.scanner.peek_char() else { break };
            if ch == ',' {
                break;
            }
            if matches!(ch, '>' | '+' | '~') {
                self.scanner.scan_char(ch);
                members.push(SequencePart::Combinator(match ch {
                    '>' => Combinator::Child,
                    '+' => Combinator::NextSibling,
                    _ => Combinator::FollowingSibling,
                }));
                continue;
            }
            let mut comps = Vec::new();
            while let Some(comp) = self.component()? {
                comps.push(comp);
            }
            if comps.is_empty() {
                return Err(self.err("selector"));
            }
            members.push(SequencePart::Simple(SimpleSequence { members: comps }));
        }
        if !members
            .iter()
            .any(|p| matches!(p, SequencePart::Simple(_)))
        {
            return Err(self.err("selector"));
        }
        return Ok(Sequence { members });
    }

    /// One simple-selector component, or `None` at a group boundary.
    fn component(&mut self) -> Result<Option<Simple>, SyntaxError> {
        let Some(ch) = self.scanner.peek_char() else {
            return Ok(None);
        };
        return match ch {
            '&' => {
                self.scanner.scan_char('&');
                Ok(Some(Simple::Parent))
            }
            '#' if self.scanner.starts_with("#{") => {
                Ok(Some(Simple::Interpolation(self.interp_raw()?)))
            }
            '#' => {
                self.scanner.scan_char('#');
                Ok(Some(Simple::Id(self.expect_ident()?)))
            }
            '.' => {
                self.scanner.scan_char('.');
                Ok(Some(Simple::Class(self.expect_ident()?)))
            }
            '[' => Ok(Some(self.attribute()?)),
            ':' => Ok(Some(self.pseudo()?)),
            '*' => Ok(Some(self.element_or_universal()?)),
            _ => {
                if self.scanner.peek(&patterns::IDENT).is_some() {
                    Ok(Some(self.element_or_universal()?))
                } else {
                    Ok(None)
                }
            }
        };
    }

    fn element_or_universal(&mut self) -> Result<Simple, SyntaxError> {
        let first = self
            .name_or_star()
            .ok_or_else(|| self.err("identifier or \"*\""))?;
        if self.scanner.starts_with("|") && !self.scanner.starts_with("|=") {
            self.scanner.scan_char('|');
            let second = self
                .name_or_star()
                .ok_or_else(|| self.err("identifier or \"*\""))?;
            return Ok(qualified(Some(first), second));
        }
        return Ok(qualified(None, first));
    }

    fn pseudo(&mut self) -> Result<Simple, SyntaxError> {
        self.scanner.scan_char(':');
        let kind = if self.scanner.scan_char(':') {
            PseudoKind::Element
        } else {
            PseudoKind::Class
        };
        let name = self.expect_ident()?;
        if !self.scanner.scan_char('(') {
            return Ok(Simple::Pseudo {
                kind,
                name,
                arg: None,
            });
        }
        if name.eq_ignore_ascii_case("not") {
            self.ws();
            let inner = self.component()?.ok_or_else(|| self.err("selector"))?;
            self.ws();
            if !self.scanner.scan_char(')') {
                return Err(self.err("\")\""));
            }
            return Ok(Simple::Negation(Box::new(inner)));
        }
        let arg = self.balanced_paren_arg()?;
        return Ok(Simple::Pseudo {
            kind,
            name,
            arg: Some(arg),
        });
    }

    fn attribute(&mut self) -> Result<Simple, SyntaxError> {
        self.scanner.scan_char('[');
        self.ws();

        let mut namespace = None;
        let name;
        let mark = self.scanner.mark();
        let first = self.name_or_star();
        if first.is_some() && self.scanner.starts_with("|") && !self.scanner.starts_with("|=") {
            self.scanner.scan_char('|');
            namespace = first;
            name = self.expect_ident()?;
        } else {
            match first {
                Some(f) if f != "*" => name = f,
                _ => {
                    self.scanner.restore(mark);
                    return Err(self.err("identifier"));
                }
            }
        }
        self.ws();

        let operator = if self.scanner.scan_str("~=") {
            Some(AttrOp::Includes)
        } else if self.scanner.scan_str("|=") {
            Some(AttrOp::DashMatch)
        } else if self.scanner.scan_str("^=") {
            Some(AttrOp::Prefix)
        } else if self.scanner.scan_str("$=") {
            Some(AttrOp::Suffix)
        } else if self.scanner.scan_str("*=") {
            Some(AttrOp::Substring)
        } else if self.scanner.scan_str("=") {
            Some(AttrOp::Exact)
        } else {
            None
        };

        let value = if operator.is_some() {
            self.ws();
            let v = self
                .scanner
                .scan(&patterns::STRING)
                .or_else(|| self.scanner.scan(&patterns::IDENT))
                .ok_or_else(|| self.err("attribute value"))?;
            self.ws();
            Some(v)
        } else {
            None
        };

        if !self.scanner.scan_char(']') {
            return Err(self.err("\"]\""));
        }
        return Ok(Simple::Attribute {
            name,
            namespace,
            operator,
            value,
        });
    }

    fn name_or_star(&mut self) -> Option<String> {
        if self.scanner.scan_char('*') {
            return Some("*".to_owned());
        }
        return self.scanner.scan(&patterns::IDENT);
    }

    fn expect_ident(&mut self) -> Result<String, SyntaxError> {
        return self
            .scanner
            .scan(&patterns::IDENT)
            .ok_or_else(|| self.err("identifier"));
    }

    /// Raw text of a functional pseudo argument, up to the matching `)`.
    fn balanced_paren_arg(&mut self) -> Result<String, SyntaxError> {
        self.scanner.start_capture();
        let mut depth = 1usize;
        while let Some(ch) = self.scanner.peek_char() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let text = self.scanner.take_capture();
                        self.scanner.scan_char(')');
                        return Ok(text.trim().to_owned());
                    }
                }
                _ => {}
            }
            self.scanner.scan_char(ch);
        }
        let _ = self.scanner.take_capture();
        return Err(self.err("\")\""));
    }

    /// Raw inner text of `#{ ... }`, braces balanced.
    fn interp_raw(&mut self) -> Result<String, SyntaxError> {
        self.scanner.scan_str("#{");
        self.scanner.start_capture();
        let mut depth = 1usize;
        while let Some(ch) = self.scanner.peek_char() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let text = self.scanner.take_capture();
                        self.scanner.scan_char('}');
                        return Ok(text);
                    }
                }
                _ => {}
            }
            self.scanner.scan_char(ch);
        }
        let _ = self.scanner.take_capture();
        return Err(self.err("\"}\""));
    }

    fn ws(&mut self) -> bool {
        return match self.scanner.scan(&patterns::WHITESPACE) {
            Some(text) => text.contains('\n'),
            None => false,
        };
    }

    fn err(&self, what: &str) -> SyntaxError {
        let mut err = self.scanner.expected(what);
        err.line = self.base_line + self.scanner.line() - 1;
        return err;
    }
}

fn qualified(namespace: Option<String>, name: String) -> Simple {
    if name == "*" {
        return Simple::Universal { namespace };
    }
    return Simple::Element { name, namespace };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Style;

    fn parse(text: &str) -> CommaSequence {
        return parse_comma_sequence(text, 1).unwrap();
    }

    fn only_sequence(sel: &CommaSequence) -> &Sequence {
        assert_eq!(sel.members.len(), 1);
        return &sel.members[0];
    }

    #[test]
    fn bare_element() {
        let sel = parse("p");
        let seq = only_sequence(&sel);
        assert_eq!(
            seq.members,
            vec![SequencePart::Simple(SimpleSequence {
                members: vec![Simple::Element {
                    name: "p".to_owned(),
                    namespace: None
                }]
            })]
        );
    }

    #[test]
    fn compound_groups_split_on_whitespace_only() {
        let sel = parse("a.foo:hover b");
        let seq = only_sequence(&sel);
        assert_eq!(seq.members.len(), 2);
        let SequencePart::Simple(first) = &seq.members[0] else {
            panic!("expected compound group");
        };
        assert_eq!(first.members.len(), 3);
    }

    #[test]
    fn combinators_and_descendants() {
        let sel = parse("a > b + c ~ d e");
        let seq = only_sequence(&sel);
        assert_eq!(seq.to_css(Style::Expanded), "a > b + c ~ d e");
    }

    #[test]
    fn namespaces_on_elements_and_attributes() {
        let sel = parse("svg|circle[xlink|href^=\"#\"]");
        let SequencePart::Simple(group) = &only_sequence(&sel).members[0] else {
            panic!("expected compound group");
        };
        assert_eq!(
            group.members[0],
            Simple::Element {
                name: "circle".to_owned(),
                namespace: Some("svg".to_owned())
            }
        );
        assert_eq!(
            group.members[1],
            Simple::Attribute {
                name: "href".to_owned(),
                namespace: Some("xlink".to_owned()),
                operator: Some(AttrOp::Prefix),
                value: Some("\"#\"".to_owned()),
            }
        );
    }

    #[test]
    fn attribute_operator_is_distinguished_from_namespace_bar() {
        let sel = parse("[lang|=en]");
        let SequencePart::Simple(group) = &only_sequence(&sel).members[0] else {
            panic!("expected compound group");
        };
        assert_eq!(
            group.members[0],
            Simple::Attribute {
                name: "lang".to_owned(),
                namespace: None,
                operator: Some(AttrOp::DashMatch),
                value: Some("en".to_owned()),
            }
        );
    }

    #[test]
    fn functional_pseudo_keeps_raw_argument() {
        let sel = parse("li:nth-child(2n+1)::before");
        let SequencePart::Simple(group) = &only_sequence(&sel).members[0] else {
            panic!("expected compound group");
        };
        assert_eq!(
            group.members[1],
            Simple::Pseudo {
                kind: PseudoKind::Class,
                name: "nth-child".to_owned(),
                arg: Some("2n+1".to_owned()),
            }
        );
        assert_eq!(
            group.members[2],
            Simple::Pseudo {
                kind: PseudoKind::Element,
                name: "before".to_owned(),
                arg: None,
            }
        );
    }

    #[test]
    fn negation_takes_exactly_one_component() {
        let sel = parse("a:not(.hidden)");
        let SequencePart::Simple(group) = &only_sequence(&sel).members[0] else {
            panic!("expected compound group");
        };
        assert_eq!(
            group.members[1],
            Simple::Negation(Box::new(Simple::Class("hidden".to_owned())))
        );
    }

    #[test]
    fn parent_reference_and_interpolation_components() {
        let sel = parse("&.active #{$name}");
        let seq = only_sequence(&sel);
        let SequencePart::Simple(first) = &seq.members[0] else {
            panic!("expected compound group");
        };
        assert_eq!(first.members[0], Simple::Parent);
        let SequencePart::Simple(second) = &seq.members[1] else {
            panic!("expected compound group");
        };
        assert_eq!(
            second.members[0],
            Simple::Interpolation("$name".to_owned())
        );
    }

    #[test]
    fn garbage_is_rejected_with_rule_relative_line() {
        let err = parse_comma_sequence("a, {", 7).unwrap_err();
        assert_eq!(err.line, 7);
        let err = parse_comma_sequence("a,\n!", 7).unwrap_err();
        assert_eq!(err.line, 8);
    }
}
