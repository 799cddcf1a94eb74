//! The document tree produced by the parser and reshaped by the
//! transformation passes.
//!
//! The node set is a closed enum: every construct the language knows is a
//! variant here, and each variant owns its payload directly. Children are
//! plain owned vectors in document order.

use crate::error::SyntaxError;
use crate::options::PropertySyntax;
use crate::script::{Environment, Expression};
use crate::selector::CommaSequence;

/// A piece of interpolated text: literal runs alternating with embedded
/// script expressions. Consecutive literal pushes merge, so two adjacent
/// literal fragments never occur.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Interp {
    parts: Vec<Fragment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Literal(String),
    Script(Expression),
}

impl Interp {
    pub fn new() -> Self {
        return Interp::default();
    }

    pub fn parts(&self) -> &[Fragment] {
        return &self.parts;
    }

    pub fn push_str(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Fragment::Literal(last)) = self.parts.last_mut() {
            last.push_str(text);
            return;
        }
        self.parts.push(Fragment::Literal(text.to_owned()));
    }

    pub fn push_script(&mut self, expr: Expression) {
        self.parts.push(Fragment::Script(expr));
    }

    pub fn append(&mut self, other: Interp) {
        for part in other.parts {
            match part {
                Fragment::Literal(text) => self.push_str(&text),
                Fragment::Script(expr) => self.push_script(expr),
            }
        }
    }

    /// True when there is no script fragment and all literal text is blank.
    pub fn is_empty(&self) -> bool {
        return self.parts.iter().all(|p| match p {
            Fragment::Literal(s) => s.trim().is_empty(),
            Fragment::Script(_) => false,
        });
    }

    /// Strips surrounding whitespace from the outermost literal fragments.
    pub fn trim(&mut self) {
        if let Some(Fragment::Literal(first)) = self.parts.first_mut() {
            *first = first.trim_start().to_owned();
        }
        if let Some(Fragment::Literal(last)) = self.parts.last_mut() {
            *last = last.trim_end().to_owned();
        }
        self.parts
            .retain(|p| !matches!(p, Fragment::Literal(s) if s.is_empty()));
    }

    pub fn evaluate(&self, env: &Environment) -> Result<String, SyntaxError> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Fragment::Literal(text) => out.push_str(text),
                Fragment::Script(expr) => out.push_str(&expr.evaluate(env)?),
            }
        }
        return Ok(out);
    }
}

// ======= NODE PAYLOADS =======

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleData {
    /// Selector text as written, split into interpolation fragments.
    pub raw: Interp,
    /// Structured selector, filled in by the resolve pass.
    pub parsed: Option<CommaSequence>,
    /// Selector with parent references spliced in, filled in by flatten.
    pub resolved: Option<CommaSequence>,
    pub tabs: usize,
    pub group_end: bool,
}

impl RuleData {
    pub fn new(raw: Interp) -> Self {
        return RuleData {
            raw,
            ..Default::default()
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyData {
    pub raw_name: Interp,
    pub raw_value: Expression,
    /// Resolved name and value, filled in by the resolve pass. After
    /// flatten the name also carries any dash-joined nesting prefix.
    pub name: String,
    pub value: String,
    pub syntax: PropertySyntax,
    pub tabs: usize,
}

impl PropertyData {
    pub fn new(raw_name: Interp, raw_value: Expression, syntax: PropertySyntax) -> Self {
        return PropertyData {
            raw_name,
            raw_value,
            name: String::new(),
            value: String::new(),
            syntax,
            tabs: 0,
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveData {
    /// Name without the `@`, e.g. `media`.
    pub name: String,
    /// Prelude as written, split into interpolation fragments.
    pub raw: Interp,
    /// Resolved prelude text, filled in by the resolve pass.
    pub value: String,
    pub tabs: usize,
    pub group_end: bool,
}

impl DirectiveData {
    pub fn new(name: impl Into<String>, raw: Interp) -> Self {
        return DirectiveData {
            name: name.into(),
            raw,
            value: String::new(),
            tabs: 0,
            group_end: false,
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixinArg {
    pub name: String,
    pub default: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixinDefData {
    pub name: String,
    pub args: Vec<MixinArg>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixinIncludeData {
    pub name: String,
    pub args: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableData {
    pub name: String,
    pub value: Expression,
    /// `!default`: assign only when the name is still unbound.
    pub guarded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForData {
    pub var: String,
    pub from: Expression,
    pub to: Expression,
    /// `to` excludes the upper bound, `through` includes it.
    pub exclusive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileData {
    pub condition: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfData {
    /// `None` for a final `@else` branch.
    pub condition: Option<Expression>,
    /// Next branch of the chain, an `If` node itself.
    pub else_node: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportData {
    /// Raw import terms as written: quoted strings or `url(...)`.
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentData {
    /// Verbatim comment text, delimiters included.
    pub text: String,
    /// `//` comment, never rendered.
    pub silent: bool,
    /// `/*!` comment, kept even in compressed output.
    pub loud: bool,
    pub tabs: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    Rule(RuleData),
    Property(PropertyData),
    Directive(DirectiveData),
    MixinDef(MixinDefData),
    MixinInclude(MixinIncludeData),
    Variable(VariableData),
    For(ForData),
    While(WhileData),
    If(IfData),
    Import(ImportData),
    Comment(CommentData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// 1-based source line where the construct began.
    pub line: usize,
    /// Whether the construct was written with a `{ ... }` block.
    pub has_block: bool,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, line: usize) -> Self {
        return Node {
            kind,
            line,
            has_block: false,
            children: Vec::new(),
        };
    }

    /// Indentation depth assigned by flatten; zero for kinds that carry none.
    pub fn tabs(&self) -> usize {
        return match &self.kind {
            NodeKind::Rule(d) => d.tabs,
            NodeKind::Property(d) => d.tabs,
            NodeKind::Directive(d) => d.tabs,
            NodeKind::Comment(d) => d.tabs,
            _ => 0,
        };
    }

    pub fn group_end(&self) -> bool {
        return match &self.kind {
            NodeKind::Rule(d) => d.group_end,
            NodeKind::Directive(d) => d.group_end,
            _ => false,
        };
    }

    pub fn set_group_end(&mut self) {
        match &mut self.kind {
            NodeKind::Rule(d) => d.group_end = true,
            NodeKind::Directive(d) => d.group_end = true,
            _ => {}
        }
    }

    /// Human-facing name of the construct, for error messages.
    pub fn kind_name(&self) -> &'static str {
        return match &self.kind {
            NodeKind::Root => "stylesheet",
            NodeKind::Rule(_) => "rule",
            NodeKind::Property(_) => "property",
            NodeKind::Directive(_) => "directive",
            NodeKind::MixinDef(_) => "@mixin",
            NodeKind::MixinInclude(_) => "@include",
            NodeKind::Variable(_) => "variable",
            NodeKind::For(_) => "@for",
            NodeKind::While(_) => "@while",
            NodeKind::If(_) => "@if",
            NodeKind::Import(_) => "@import",
            NodeKind::Comment(_) => "comment",
        };
    }
}
