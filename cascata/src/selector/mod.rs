//! Structured selectors: the data model, parent-reference resolution, and
//! CSS serialization.
//!
//! A selector is a comma-separated list of sequences; a sequence alternates
//! compound simple-selector groups with combinators (a missing combinator
//! between two groups means descendant). Newline markers record where the
//! author broke a selector across lines so multi-line selectors can be
//! reproduced in the output.

pub mod parse;

pub use parse::parse_comma_sequence;

use std::fmt;

use itertools::Itertools;

use crate::error::SyntaxError;
use crate::options::Style;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Child,
    NextSibling,
    FollowingSibling,
}

impl Combinator {
    pub fn symbol(&self) -> char {
        return match self {
            Combinator::Child => '>',
            Combinator::NextSibling => '+',
            Combinator::FollowingSibling => '~',
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    Exact,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

impl AttrOp {
    pub fn symbol(&self) -> &'static str {
        return match self {
            AttrOp::Exact => "=",
            AttrOp::Includes => "~=",
            AttrOp::DashMatch => "|=",
            AttrOp::Prefix => "^=",
            AttrOp::Suffix => "$=",
            AttrOp::Substring => "*=",
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoKind {
    /// Single colon.
    Class,
    /// Double colon.
    Element,
}

/// One simple-selector component inside a compound group.
#[derive(Debug, Clone, PartialEq)]
pub enum Simple {
    Element {
        name: String,
        namespace: Option<String>,
    },
    Universal {
        namespace: Option<String>,
    },
    Id(String),
    Class(String),
    Attribute {
        name: String,
        namespace: Option<String>,
        operator: Option<AttrOp>,
        /// Raw value text, quotes included when the author wrote them.
        value: Option<String>,
    },
    Pseudo {
        kind: PseudoKind,
        name: String,
        /// Raw argument text for functional pseudos, parens stripped.
        arg: Option<String>,
    },
    Negation(Box<Simple>),
    /// `&`, replaced during parent-reference resolution.
    Parent,
    /// `#{...}` that survived into selector position; raw inner text.
    Interpolation(String),
}

impl fmt::Display for Simple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Simple::Element { name, namespace } => match namespace {
                Some(ns) => write!(f, "{}|{}", ns, name),
                None => write!(f, "{}", name),
            },
            Simple::Universal { namespace } => match namespace {
                Some(ns) => write!(f, "{}|*", ns),
                None => write!(f, "*"),
            },
            Simple::Id(name) => write!(f, "#{}", name),
            Simple::Class(name) => write!(f, ".{}", name),
            Simple::Attribute {
                name,
                namespace,
                operator,
                value,
            } => {
                write!(f, "[")?;
                if let Some(ns) = namespace {
                    write!(f, "{}|", ns)?;
                }
                write!(f, "{}", name)?;
                if let (Some(op), Some(value)) = (operator, value) {
                    write!(f, "{}{}", op.symbol(), value)?;
                }
                write!(f, "]")
            }
            Simple::Pseudo { kind, name, arg } => {
                let colons = match kind {
                    PseudoKind::Class => ":",
                    PseudoKind::Element => "::",
                };
                match arg {
                    Some(arg) => write!(f, "{}{}({})", colons, name, arg),
                    None => write!(f, "{}{}", colons, name),
                }
            }
            Simple::Negation(inner) => write!(f, ":not({})", inner),
            Simple::Parent => write!(f, "&"),
            Simple::Interpolation(text) => write!(f, "#{{{}}}", text),
        }
    }
}

/// A compound group of simple selectors with no separators, e.g. `a.foo:hover`.
/// Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleSequence {
    pub members: Vec<Simple>,
}

impl SimpleSequence {
    pub fn to_css(&self) -> String {
        return self.members.iter().map(|m| m.to_string()).join("");
    }

    fn contains_parent(&self) -> bool {
        return self.members.iter().any(|m| matches!(m, Simple::Parent));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SequencePart {
    Simple(SimpleSequence),
    Combinator(Combinator),
    /// Author line break; only meaningful at the start of a sequence.
    Newline,
}

/// One comma-alternative of a selector.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub members: Vec<SequencePart>,
}

impl Sequence {
    pub fn starts_with_newline(&self) -> bool {
        return matches!(self.members.first(), Some(SequencePart::Newline));
    }

    pub fn contains_parent_ref(&self) -> bool {
        return self.members.iter().any(|p| match p {
            SequencePart::Simple(ss) => ss.contains_parent(),
            _ => false,
        });
    }

    pub fn to_css(&self, style: Style) -> String {
        let mut out = String::new();
        let mut need_sep = false;
        for part in &self.members {
            match part {
                SequencePart::Newline => {}
                SequencePart::Combinator(c) => {
                    if style == Style::Compressed {
                        out.push(c.symbol());
                    } else {
                        if need_sep {
                            out.push(' ');
                        }
                        out.push(c.symbol());
                        out.push(' ');
                    }
                    need_sep = false;
                }
                SequencePart::Simple(ss) => {
                    if need_sep {
                        out.push(' ');
                    }
                    out.push_str(&ss.to_css());
                    need_sep = true;
                }
            }
        }
        return out;
    }

    /// Splices this sequence under one ancestor sequence.
    ///
    /// Without a parent reference the ancestor is prepended as a descendant
    /// context. With one, every `&` is replaced in place by the ancestor:
    /// a compound-initial `&` takes the whole ancestor sequence, anything
    /// else requires the ancestor to be a single compound group.
    fn resolved_against(&self, parent: &Sequence, line: usize) -> Result<Sequence, SyntaxError> {
        if !self.contains_parent_ref() {
            let mut members = parent.members.clone();
            members.extend(
                self.members
                    .iter()
                    .filter(|p| !matches!(p, SequencePart::Newline))
                    .cloned(),
            );
            return Ok(Sequence { members });
        }

        let mut members = Vec::new();
        for part in &self.members {
            match part {
                SequencePart::Simple(ss) if ss.contains_parent() => {
                    splice_parent(ss, parent, &mut members, line)?;
                }
                other => members.push(other.clone()),
            }
        }
        return Ok(Sequence { members });
    }
}

fn splice_parent(
    group: &SimpleSequence,
    parent: &Sequence,
    out: &mut Vec<SequencePart>,
    line: usize,
) -> Result<(), SyntaxError> {
    let parent_last = match parent.members.last() {
        Some(SequencePart::Simple(ss)) => ss,
        _ => {
            return Err(SyntaxError::new(
                "Invalid parent selector: the reference has nothing to attach to",
                line,
            ));
        }
    };

    if matches!(group.members.first(), Some(Simple::Parent)) {
        out.extend(parent.members[..parent.members.len() - 1].iter().cloned());
        let mut merged = parent_last.members.clone();
        for comp in &group.members[1..] {
            match comp {
                Simple::Parent => merged.extend(parent_last.members.iter().cloned()),
                other => merged.push(other.clone()),
            }
        }
        out.push(SequencePart::Simple(SimpleSequence { members: merged }));
        return Ok(());
    }

    // `foo&`: the reference is mid-compound, so the ancestor must itself be
    // a single compound group.
    if parent.members.len() != 1 {
        return Err(SyntaxError::new(
            "Invalid parent selector: \"&\" may only follow other selector text when the parent is a single compound selector",
            line,
        ));
    }
    let mut merged = Vec::new();
    for comp in &group.members {
        match comp {
            Simple::Parent => merged.extend(parent_last.members.iter().cloned()),
            other => merged.push(other.clone()),
        }
    }
    out.push(SequencePart::Simple(SimpleSequence { members: merged }));
    return Ok(());
}

/// A full selector: comma-separated alternatives.
#[derive(Debug, Clone, PartialEq)]
pub struct CommaSequence {
    pub members: Vec<Sequence>,
}

impl CommaSequence {
    /// Resolves `&` references against the enclosing rule's selector.
    ///
    /// With N ancestor alternatives and M own alternatives this produces
    /// N * M resolved alternatives, ancestor-major in document order.
    pub fn resolve_parent_refs(
        &self,
        supers: Option<&CommaSequence>,
        line: usize,
    ) -> Result<CommaSequence, SyntaxError> {
        let Some(supers) = supers else {
            for seq in &self.members {
                if seq.contains_parent_ref() {
                    return Err(SyntaxError::new(
                        "Base-level rules cannot contain the parent-selector-referencing character \"&\"",
                        line,
                    ));
                }
            }
            return Ok(self.clone());
        };

        let mut members = Vec::new();
        for parent in &supers.members {
            for child in &self.members {
                members.push(child.resolved_against(parent, line)?);
            }
        }
        return Ok(CommaSequence { members });
    }

    pub fn to_css(&self, style: Style, tabs: usize) -> String {
        let mut out = String::new();
        for (i, seq) in self.members.iter().enumerate() {
            if i > 0 {
                out.push(',');
                if style != Style::Compressed {
                    if seq.starts_with_newline()
                        && matches!(style, Style::Nested | Style::Expanded)
                    {
                        out.push('\n');
                        out.push_str(&"  ".repeat(tabs));
                    } else {
                        out.push(' ');
                    }
                }
            }
            out.push_str(&seq.to_css(style));
        }
        return out;
    }
}
