//! Recursive-descent parser for the stylesheet syntax.
//!
//! The parser produces the raw document tree: selectors and property names
//! stay as interpolation fragments, values stay as unevaluated expressions.
//! Ambiguous block children are disambiguated by attempting a declaration
//! parse and falling back to a ruleset parse from a saved mark.

use crate::error::SyntaxError;
use crate::options::PropertySyntax;
use crate::parser::patterns;
use crate::parser::scanner::Scanner;
use crate::script::{self, Expression, Part};
use crate::tree::{
    CommentData, DirectiveData, ForData, IfData, ImportData, Interp, MixinArg, MixinDefData,
    MixinIncludeData, Node, NodeKind, PropertyData, RuleData, VariableData, WhileData,
};

pub struct Parser {
    scanner: Scanner,
    /// Set while a declaration attempt sees property-shaped input (a legacy
    /// prefix hack, an `=` assignment, or repeated colons). When both the
    /// declaration and ruleset interpretations fail, this picks which error
    /// to surface.
    expected_property: bool,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        return Parser {
            scanner: Scanner::new(source),
            expected_property: false,
        };
    }

    #[tracing::instrument(skip_all)]
    pub fn parse(&mut self) -> Result<Node, SyntaxError> {
        let mut root = Node::new(NodeKind::Root, 1);
        self.statements(&mut root, false)?;
        if !self.scanner.eos() {
            return Err(self.scanner.expected("selector or at-rule"));
        }
        tracing::debug!(top_level = root.children.len(), "parsed stylesheet");
        return Ok(root);
    }

    // ======= STATEMENTS =======

    /// Parses children until `}` or end of input, attaching comments and
    /// enforcing statement terminators.
    fn statements(&mut self, node: &mut Node, nested: bool) -> Result<(), SyntaxError> {
        loop {
            self.whitespace_into(&mut node.children)?;
            if self.scanner.eos() || self.scanner.starts_with("}") {
                return Ok(());
            }
            let child = self.block_child(nested)?;
            let needs_semi = !child.has_block;
            node.children.push(child);
            if needs_semi {
                self.whitespace()?;
                if !self.scanner.scan_char(';')
                    && !self.scanner.starts_with("}")
                    && !self.scanner.eos()
                {
                    return Err(self.scanner.expected("\";\""));
                }
            } else {
                // stray semicolon after a block is tolerated
                self.scanner.scan_char(';');
            }
        }
    }

    fn block_child(&mut self, nested: bool) -> Result<Node, SyntaxError> {
        if self.scanner.starts_with("$") {
            return self.variable();
        }
        if self.scanner.starts_with("@") {
            return self.directive();
        }
        return self.declaration_or_ruleset(nested);
    }

    fn block(&mut self, node: &mut Node) -> Result<(), SyntaxError> {
        if !self.scanner.scan_char('{') {
            return Err(self.scanner.expected("\"{\""));
        }
        node.has_block = true;
        self.statements(node, true)?;
        if !self.scanner.scan_char('}') {
            return Err(self.scanner.expected("\"}\""));
        }
        return Ok(());
    }

    // ======= DECLARATION / RULESET DISAMBIGUATION =======

    fn declaration_or_ruleset(&mut self, nested: bool) -> Result<Node, SyntaxError> {
        let mark = self.scanner.mark();
        let saved_hint = std::mem::replace(&mut self.expected_property, false);
        let attempt = self.try_declaration();
        let hint = self.expected_property;
        self.expected_property = saved_hint;

        let decl_err = match attempt {
            Ok(node) => {
                if nested {
                    return Ok(node);
                }
                return Err(SyntaxError::new(
                    "Properties are only allowed within rules",
                    node.line,
                ));
            }
            Err(err) => err,
        };

        self.scanner.restore(mark);
        return match self.ruleset() {
            Ok(node) => Ok(node),
            Err(rule_err) => {
                if hint {
                    Err(decl_err)
                } else {
                    Err(rule_err)
                }
            }
        };
    }

    fn try_declaration(&mut self) -> Result<Node, SyntaxError> {
        let line = self.scanner.line();
        let mut syntax = PropertySyntax::New;
        let mut name = Interp::new();
        let eq_shorthand;

        if self.scanner.scan_char(':') {
            // legacy `:name value` form
            syntax = PropertySyntax::Old;
            self.expected_property = true;
            name.append(self.property_name()?);
            eq_shorthand = self.scanner.scan_char('=');
        } else {
            if self.scanner.scan_char('*') {
                // star-prefix hack, the name keeps the `*`
                self.expected_property = true;
                name.push_str("*");
            } else if self.scanner.scan_char('.') {
                // dot-prefix hack, likewise kept
                self.expected_property = true;
                name.push_str(".");
            }
            name.append(self.property_name()?);
            self.whitespace()?;
            if self.scanner.scan_char('=') {
                eq_shorthand = true;
            } else if self.scanner.scan_char(':') {
                eq_shorthand = false;
            } else {
                return Err(self.scanner.expected("\":\""));
            }
        }
        if eq_shorthand {
            syntax = PropertySyntax::Old;
            self.expected_property = true;
        }

        let space_after_sep = matches!(self.scanner.peek_char(), Some(c) if c.is_whitespace());
        let mut value = script::parse_value(&mut self.scanner)?;
        if value
            .parts
            .iter()
            .any(|p| matches!(p, Part::Literal(s) if s.contains(':')))
        {
            // `progid:...`-style values; also fires for pseudo selectors,
            // which is harmless since the hint only decides error wording
            self.expected_property = true;
        }

        if self.scanner.starts_with("!") {
            let mark = self.scanner.mark();
            self.scanner.scan_char('!');
            self.whitespace()?;
            if self.scanner.scan(&patterns::IMPORTANT).is_some() {
                value.push_literal(" !important");
            } else {
                self.scanner.restore(mark);
                return Err(self.scanner.expected("\"important\""));
            }
        }

        let value_empty = value.is_empty();
        let mut node = Node::new(
            NodeKind::Property(PropertyData::new(name, value, syntax)),
            line,
        );
        self.whitespace()?;

        if self.scanner.starts_with("{") {
            if eq_shorthand && !self.scanner.preceded_by_whitespace() {
                return Err(SyntaxError::new(
                    "Invalid CSS: a space is required between a script value and \"{\"",
                    self.scanner.line(),
                ));
            }
            // `foo:bar {` reads as a selector, not a nested block
            if !eq_shorthand && !space_after_sep && !value_empty {
                return Err(self.scanner.expected("\";\""));
            }
            self.block(&mut node)?;
        } else if !(self.scanner.starts_with(";")
            || self.scanner.starts_with("}")
            || self.scanner.eos())
        {
            return Err(self.scanner.expected("\";\""));
        }
        return Ok(node);
    }

    fn property_name(&mut self) -> Result<Interp, SyntaxError> {
        let mut interp = Interp::new();
        loop {
            if self.scanner.starts_with("#{") {
                interp.push_script(self.interpolation_fragment()?);
                continue;
            }
            if let Some(ident) = self.scanner.scan(&patterns::IDENT) {
                interp.push_str(&ident);
                continue;
            }
            break;
        }
        if interp.is_empty() {
            return Err(self.scanner.expected("identifier"));
        }
        return Ok(interp);
    }

    // ======= RULESETS =======

    fn ruleset(&mut self) -> Result<Node, SyntaxError> {
        let line = self.scanner.line();
        let raw = self.selector_fragments()?;
        let mut node = Node::new(NodeKind::Rule(RuleData::new(raw)), line);
        self.block(&mut node)?;
        return Ok(node);
    }

    /// Raw selector text up to the opening brace: literal runs, strings,
    /// and `#{...}` fragments. Comments are dropped.
    fn selector_fragments(&mut self) -> Result<Interp, SyntaxError> {
        let mut interp = Interp::new();
        loop {
            if let Some(chunk) = self.scanner.scan(&patterns::SELECTOR_CHUNK) {
                interp.push_str(&chunk);
                continue;
            }
            if self.scanner.starts_with("#{") {
                interp.push_script(self.interpolation_fragment()?);
                continue;
            }
            if self.scanner.starts_with("#") {
                self.scanner.scan_char('#');
                interp.push_str("#");
                continue;
            }
            if let Some(string) = self.scanner.scan(&patterns::STRING) {
                interp.push_str(&string);
                continue;
            }
            if self.scanner.starts_with("/*") {
                if self.scanner.scan(&patterns::LOUD_COMMENT).is_none() {
                    return Err(self.scanner.expected("\"*/\""));
                }
                interp.push_str(" ");
                continue;
            }
            if self.scanner.starts_with("//") {
                self.scanner.scan(&patterns::SILENT_COMMENT);
                continue;
            }
            break;
        }
        interp.trim();
        if interp.is_empty() {
            return Err(self.scanner.expected("selector"));
        }
        if !self.scanner.starts_with("{") {
            return Err(self.scanner.expected("\"{\""));
        }
        return Ok(interp);
    }

    // ======= VARIABLES =======

    fn variable(&mut self) -> Result<Node, SyntaxError> {
        let line = self.scanner.line();
        self.scanner.scan_char('$');
        let name = self.expect_ident()?;
        self.whitespace()?;
        if !self.scanner.scan_char(':') {
            return Err(self.scanner.expected("\":\""));
        }
        let value = script::parse_value(&mut self.scanner)?;
        if value.is_empty() {
            return Err(self.scanner.expected("expression (e.g. 1px, bold)"));
        }
        let mut guarded = false;
        if self.scanner.starts_with("!") {
            let mark = self.scanner.mark();
            self.scanner.scan_char('!');
            self.whitespace()?;
            if self.scanner.scan(&patterns::DEFAULT_KW).is_some() {
                guarded = true;
            } else {
                self.scanner.restore(mark);
            }
        }
        return Ok(Node::new(
            NodeKind::Variable(VariableData {
                name,
                value,
                guarded,
            }),
            line,
        ));
    }

    // ======= DIRECTIVES =======

    fn directive(&mut self) -> Result<Node, SyntaxError> {
        let line = self.scanner.line();
        self.scanner.scan_char('@');
        let Some(name) = self.scanner.scan(&patterns::IDENT) else {
            return Err(self.scanner.expected("identifier"));
        };
        self.whitespace()?;
        return match name.as_str() {
            "mixin" => self.mixin_definition(line),
            "include" => self.mixin_include(line),
            "debug" => self.debug_directive(line),
            "for" => self.for_directive(line),
            "while" => self.while_directive(line),
            "if" => self.if_directive(line),
            "else" => Err(SyntaxError::new(
                "Invalid CSS: @else must come after @if",
                line,
            )),
            "import" => self.import_directive(line),
            "media" => self.media_directive(line),
            _ => self.passthrough_directive(name, line),
        };
    }

    fn mixin_definition(&mut self, line: usize) -> Result<Node, SyntaxError> {
        let name = self.expect_ident()?;
        self.whitespace()?;
        let mut args = Vec::new();
        if self.scanner.scan_char('(') {
            self.whitespace()?;
            if !self.scanner.scan_char(')') {
                loop {
                    if !self.scanner.scan_char('$') {
                        return Err(self.scanner.expected("\"$\""));
                    }
                    let arg_name = self.expect_ident()?;
                    self.whitespace()?;
                    let default = if self.scanner.scan_char(':') {
                        self.whitespace()?;
                        let expr = script::parse_argument(&mut self.scanner)?;
                        if expr.is_empty() {
                            return Err(self.scanner.expected("expression (e.g. 1px, bold)"));
                        }
                        Some(expr)
                    } else {
                        None
                    };
                    args.push(MixinArg {
                        name: arg_name,
                        default,
                    });
                    self.whitespace()?;
                    if self.scanner.scan_char(',') {
                        self.whitespace()?;
                        continue;
                    }
                    if self.scanner.scan_char(')') {
                        break;
                    }
                    return Err(self.scanner.expected("\")\""));
                }
            }
            self.whitespace()?;
        }
        let mut node = Node::new(NodeKind::MixinDef(MixinDefData { name, args }), line);
        self.block(&mut node)?;
        return Ok(node);
    }

    fn mixin_include(&mut self, line: usize) -> Result<Node, SyntaxError> {
        let name = self.expect_ident()?;
        self.whitespace()?;
        let mut args = Vec::new();
        if self.scanner.scan_char('(') {
            self.whitespace()?;
            if !self.scanner.scan_char(')') {
                loop {
                    let arg = script::parse_argument(&mut self.scanner)?;
                    if arg.is_empty() {
                        return Err(self.scanner.expected("expression (e.g. 1px, bold)"));
                    }
                    args.push(arg);
                    self.whitespace()?;
                    if self.scanner.scan_char(',') {
                        self.whitespace()?;
                        continue;
                    }
                    if self.scanner.scan_char(')') {
                        break;
                    }
                    return Err(self.scanner.expected("\")\""));
                }
            }
        }
        return Ok(Node::new(
            NodeKind::MixinInclude(MixinIncludeData { name, args }),
            line,
        ));
    }

    fn debug_directive(&mut self, line: usize) -> Result<Node, SyntaxError> {
        let expr = script::parse_value(&mut self.scanner)?;
        if expr.is_empty() {
            return Err(self.scanner.expected("expression (e.g. 1px, bold)"));
        }
        let mut raw = Interp::new();
        raw.push_script(expr);
        return Ok(Node::new(
            NodeKind::Directive(DirectiveData::new("debug", raw)),
            line,
        ));
    }

    fn for_directive(&mut self, line: usize) -> Result<Node, SyntaxError> {
        if !self.scanner.scan_char('$') {
            return Err(self.scanner.expected("\"$\""));
        }
        let var = self.expect_ident()?;
        self.whitespace()?;
        if self.scanner.scan(&patterns::FROM_KW).is_none() {
            return Err(self.scanner.expected("\"from\""));
        }
        let from = script::parse_value_until(&mut self.scanner, &["to", "through"])?;
        if from.is_empty() {
            return Err(self.scanner.expected("expression (e.g. 1px, bold)"));
        }
        let exclusive = if self.scanner.scan(&patterns::TO_KW).is_some() {
            true
        } else if self.scanner.scan(&patterns::THROUGH_KW).is_some() {
            false
        } else {
            return Err(self.scanner.expected("\"through\" or \"to\""));
        };
        let to = script::parse_value(&mut self.scanner)?;
        if to.is_empty() {
            return Err(self.scanner.expected("expression (e.g. 1px, bold)"));
        }
        let mut node = Node::new(
            NodeKind::For(ForData {
                var,
                from,
                to,
                exclusive,
            }),
            line,
        );
        self.block(&mut node)?;
        return Ok(node);
    }

    fn while_directive(&mut self, line: usize) -> Result<Node, SyntaxError> {
        let condition = script::parse_value(&mut self.scanner)?;
        if condition.is_empty() {
            return Err(self.scanner.expected("expression (e.g. 1px, bold)"));
        }
        let mut node = Node::new(NodeKind::While(WhileData { condition }), line);
        self.block(&mut node)?;
        return Ok(node);
    }

    fn if_directive(&mut self, line: usize) -> Result<Node, SyntaxError> {
        let condition = script::parse_value(&mut self.scanner)?;
        if condition.is_empty() {
            return Err(self.scanner.expected("expression (e.g. 1px, bold)"));
        }
        let mut node = Node::new(
            NodeKind::If(IfData {
                condition: Some(condition),
                else_node: None,
            }),
            line,
        );
        self.block(&mut node)?;
        self.attach_else(&mut node)?;
        return Ok(node);
    }

    /// Chains `@else if` / `@else` branches onto an `@if` node as a linked
    /// list. Backtracks cleanly when no `@else` follows.
    fn attach_else(&mut self, if_node: &mut Node) -> Result<(), SyntaxError> {
        let mark = self.scanner.mark();
        self.whitespace()?;
        if self.scanner.scan(&patterns::AT_ELSE).is_none() {
            self.scanner.restore(mark);
            return Ok(());
        }
        self.whitespace()?;
        let line = self.scanner.line();
        let mut branch;
        if self.scanner.scan(&patterns::IF_KW).is_some() {
            self.whitespace()?;
            let condition = script::parse_value(&mut self.scanner)?;
            if condition.is_empty() {
                return Err(self.scanner.expected("expression (e.g. 1px, bold)"));
            }
            branch = Node::new(
                NodeKind::If(IfData {
                    condition: Some(condition),
                    else_node: None,
                }),
                line,
            );
            self.block(&mut branch)?;
            self.attach_else(&mut branch)?;
        } else {
            branch = Node::new(
                NodeKind::If(IfData {
                    condition: None,
                    else_node: None,
                }),
                line,
            );
            self.block(&mut branch)?;
        }
        if let NodeKind::If(data) = &mut if_node.kind {
            data.else_node = Some(Box::new(branch));
        }
        return Ok(());
    }

    fn import_directive(&mut self, line: usize) -> Result<Node, SyntaxError> {
        let mut paths = Vec::new();
        loop {
            self.whitespace()?;
            if let Some(url) = self.scanner.scan(&patterns::URL) {
                paths.push(url);
            } else if let Some(string) = self.scanner.scan(&patterns::STRING) {
                paths.push(string);
            } else {
                return Err(self.scanner.expected("string or url()"));
            }
            self.whitespace()?;
            if !self.scanner.scan_char(',') {
                break;
            }
        }
        return Ok(Node::new(NodeKind::Import(ImportData { paths }), line));
    }

    fn media_directive(&mut self, line: usize) -> Result<Node, SyntaxError> {
        let raw = self.directive_fragments()?;
        if raw.is_empty() {
            return Err(self.scanner.expected("media query"));
        }
        let mut node = Node::new(NodeKind::Directive(DirectiveData::new("media", raw)), line);
        if !self.scanner.starts_with("{") {
            return Err(self.scanner.expected("\"{\""));
        }
        self.block(&mut node)?;
        return Ok(node);
    }

    /// Unknown at-rules pass through: the prelude is parsed as a script
    /// value when that consumes it cleanly, as raw fragments otherwise,
    /// followed by an optional block.
    fn passthrough_directive(&mut self, name: String, line: usize) -> Result<Node, SyntaxError> {
        let mark = self.scanner.mark();
        let mut raw = Interp::new();
        let mut matched = false;
        if let Ok(expr) = script::parse_value(&mut self.scanner) {
            if self.scanner.starts_with("{")
                || self.scanner.starts_with(";")
                || self.scanner.starts_with("}")
                || self.scanner.eos()
            {
                if !expr.is_empty() {
                    raw.push_script(expr);
                }
                matched = true;
            }
        }
        if !matched {
            self.scanner.restore(mark);
            raw = self.directive_fragments()?;
        }
        let mut node = Node::new(NodeKind::Directive(DirectiveData::new(name, raw)), line);
        if self.scanner.starts_with("{") {
            self.block(&mut node)?;
        }
        return Ok(node);
    }

    /// Raw at-rule prelude up to `{`, `;` or `}`.
    fn directive_fragments(&mut self) -> Result<Interp, SyntaxError> {
        let mut interp = Interp::new();
        loop {
            if let Some(chunk) = self.scanner.scan(&patterns::DIRECTIVE_CHUNK) {
                interp.push_str(&chunk);
                continue;
            }
            if self.scanner.starts_with("#{") {
                interp.push_script(self.interpolation_fragment()?);
                continue;
            }
            if self.scanner.starts_with("#") {
                self.scanner.scan_char('#');
                interp.push_str("#");
                continue;
            }
            if let Some(string) = self.scanner.scan(&patterns::STRING) {
                interp.push_str(&string);
                continue;
            }
            break;
        }
        interp.trim();
        return Ok(interp);
    }

    // ======= LEXICAL HELPERS =======

    /// A `#{...}` fragment destined for a name or selector. Wrapped one
    /// level so evaluation applies interpolation quote-stripping.
    fn interpolation_fragment(&mut self) -> Result<Expression, SyntaxError> {
        let inner = script::parse_interpolation(&mut self.scanner)?;
        let mut wrapper = Expression::new(inner.line);
        wrapper.push_interpolation(inner);
        return Ok(wrapper);
    }

    fn expect_ident(&mut self) -> Result<String, SyntaxError> {
        return match self.scanner.scan(&patterns::IDENT) {
            Some(ident) => Ok(ident),
            None => Err(self.scanner.expected("identifier")),
        };
    }

    /// Skips whitespace and comments, dropping the comments.
    fn whitespace(&mut self) -> Result<bool, SyntaxError> {
        return self.whitespace_opt(None);
    }

    /// Skips whitespace, attaching comments to `children` in document order.
    fn whitespace_into(&mut self, children: &mut Vec<Node>) -> Result<bool, SyntaxError> {
        return self.whitespace_opt(Some(children));
    }

    fn whitespace_opt(
        &mut self,
        mut children: Option<&mut Vec<Node>>,
    ) -> Result<bool, SyntaxError> {
        let mut consumed = false;
        loop {
            if self.scanner.scan(&patterns::WHITESPACE).is_some() {
                consumed = true;
                continue;
            }
            if self.scanner.starts_with("/*") {
                let line = self.scanner.line();
                let Some(text) = self.scanner.scan(&patterns::LOUD_COMMENT) else {
                    return Err(self.scanner.expected("\"*/\""));
                };
                consumed = true;
                if let Some(children) = children.as_deref_mut() {
                    let loud = text.starts_with("/*!");
                    children.push(Node::new(
                        NodeKind::Comment(CommentData {
                            text,
                            silent: false,
                            loud,
                            tabs: 0,
                        }),
                        line,
                    ));
                }
                continue;
            }
            if self.scanner.starts_with("//") {
                let line = self.scanner.line();
                if let Some(text) = self.scanner.scan(&patterns::SILENT_COMMENT) {
                    consumed = true;
                    if let Some(children) = children.as_deref_mut() {
                        children.push(Node::new(
                            NodeKind::Comment(CommentData {
                                text,
                                silent: true,
                                loud: false,
                                tabs: 0,
                            }),
                            line,
                        ));
                    }
                    continue;
                }
            }
            return Ok(consumed);
        }
    }
}
