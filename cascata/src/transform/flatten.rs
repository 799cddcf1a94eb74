//! The flatten pass: rewrites the nested source tree into the flat shape
//! CSS requires.
//!
//! Nested rules are promoted to siblings of their parent, immediately after
//! it in document order, with parent references spliced into their
//! selectors. A rule survives only when it keeps at least one non-rule
//! child. Nested property blocks collapse into dash-joined names. Each
//! surviving statement is stamped with an indentation depth, and the last
//! promoted statement of a sibling run is flagged as a group end so the
//! renderer can separate visual groups.
//!
//! Anything that still requires evaluation at this point, a mixin include
//! or a control directive, is a hard error: expansion must happen between
//! resolve and flatten.

use crate::error::SyntaxError;
use crate::options::Options;
use crate::selector::CommaSequence;
use crate::tree::{Node, NodeKind};

#[tracing::instrument(skip_all)]
pub fn flatten(root: Node, options: &Options) -> Result<Node, SyntaxError> {
    let mut out = Node::new(NodeKind::Root, root.line);
    for child in root.children {
        match &child.kind {
            NodeKind::Rule(_) => flatten_rule(child, None, 0, &mut out.children, options)?,
            NodeKind::Directive(_) => {
                flatten_directive(child, None, 0, &mut out.children, options)?;
            }
            NodeKind::Import(_) => out.children.push(child),
            NodeKind::Comment(data) => {
                if !data.silent {
                    out.children.push(child);
                }
            }
            NodeKind::Variable(_) | NodeKind::MixinDef(_) => {}
            NodeKind::Property(_) => {
                return Err(SyntaxError::new(
                    "Properties are only allowed within rules",
                    child.line,
                ));
            }
            NodeKind::Root => {}
            _ => return Err(unevaluated(&child)),
        }
    }
    tracing::debug!(statements = out.children.len(), "flattened stylesheet");
    return Ok(out);
}

fn unevaluated(node: &Node) -> SyntaxError {
    return SyntaxError::new(
        format!(
            "Invalid CSS: {} must be evaluated before the tree is flattened",
            node.kind_name()
        ),
        node.line,
    );
}

fn flatten_rule(
    mut node: Node,
    parent: Option<&CommaSequence>,
    tabs: usize,
    out: &mut Vec<Node>,
    options: &Options,
) -> Result<(), SyntaxError> {
    let parsed = match &node.kind {
        NodeKind::Rule(data) => match &data.parsed {
            Some(parsed) => parsed.clone(),
            None => {
                return Err(SyntaxError::new(
                    "rule selector was not resolved before flattening",
                    node.line,
                ));
            }
        },
        _ => return Err(SyntaxError::new("expected a rule", node.line)),
    };
    let resolved = parsed.resolve_parent_refs(parent, node.line)?;

    let children = std::mem::take(&mut node.children);
    let mut locals: Vec<Node> = Vec::new();
    let mut nested: Vec<Node> = Vec::new();
    for child in children {
        match &child.kind {
            NodeKind::Rule(_) | NodeKind::Directive(_) => nested.push(child),
            NodeKind::Property(_) => {
                flatten_property(child, "", tabs + 1, &mut locals, options)?;
            }
            NodeKind::Comment(data) => {
                if !data.silent {
                    let mut child = child;
                    if let NodeKind::Comment(data) = &mut child.kind {
                        data.tabs = tabs + 1;
                    }
                    locals.push(child);
                }
            }
            NodeKind::Variable(_) | NodeKind::MixinDef(_) => {}
            NodeKind::Import(_) => {
                return Err(SyntaxError::new(
                    "Import directives may not be used within rules",
                    child.line,
                ));
            }
            NodeKind::Root => {}
            _ => return Err(unevaluated(&child)),
        }
    }

    let survives = !locals.is_empty();
    let child_tabs = if survives { tabs + 1 } else { tabs };

    let mut promoted: Vec<Node> = Vec::new();
    for sub in nested {
        match &sub.kind {
            NodeKind::Rule(_) => {
                flatten_rule(sub, Some(&resolved), child_tabs, &mut promoted, options)?;
            }
            NodeKind::Directive(_) => {
                flatten_directive(sub, Some(&resolved), child_tabs, &mut promoted, options)?;
            }
            _ => {}
        }
    }
    if let Some(last) = promoted.last_mut() {
        last.set_group_end();
    }

    if survives {
        if let NodeKind::Rule(data) = &mut node.kind {
            data.resolved = Some(resolved);
            data.tabs = tabs;
        }
        node.children = locals;
        out.push(node);
    }
    out.extend(promoted);
    return Ok(());
}

fn flatten_property(
    mut node: Node,
    prefix: &str,
    tabs: usize,
    out: &mut Vec<Node>,
    options: &Options,
) -> Result<(), SyntaxError> {
    let children = std::mem::take(&mut node.children);
    let line = node.line;
    let (full_name, value_empty) = {
        let NodeKind::Property(data) = &mut node.kind else {
            return Err(SyntaxError::new("expected a property", line));
        };
        if let Some(required) = options.property_syntax {
            if required != data.syntax {
                return Err(SyntaxError::new(
                    format!(
                        "Illegal property syntax: can't use {} syntax when \"{}\" syntax is required",
                        data.syntax, required
                    ),
                    line,
                ));
            }
        }
        let full_name = if prefix.is_empty() {
            data.name.clone()
        } else {
            format!("{}-{}", prefix, data.name)
        };
        if data.value.trim_end().ends_with(';') {
            return Err(SyntaxError::new(
                format!(
                    "Invalid CSS: the value of \"{}\" may not end with \";\"",
                    full_name
                ),
                line,
            ));
        }
        let value_empty = data.value.trim().is_empty();
        data.name = full_name.clone();
        data.tabs = tabs;
        (full_name, value_empty)
    };

    if children.is_empty() && value_empty {
        return Err(SyntaxError::new(
            format!("Invalid property: \"{}:\" (no value)", full_name),
            line,
        ));
    }
    // a valueless container contributes only its name prefix, no depth
    let child_tabs = if value_empty { tabs } else { tabs + 1 };
    if !value_empty {
        out.push(node);
    }
    for child in children {
        match &child.kind {
            NodeKind::Property(_) => {
                flatten_property(child, &full_name, child_tabs, out, options)?;
            }
            NodeKind::Comment(data) => {
                if !data.silent {
                    let mut child = child;
                    if let NodeKind::Comment(data) = &mut child.kind {
                        data.tabs = child_tabs;
                    }
                    out.push(child);
                }
            }
            _ => {
                return Err(SyntaxError::new(
                    "Illegal nesting: Only properties may be nested beneath properties",
                    child.line,
                ));
            }
        }
    }
    return Ok(());
}

fn flatten_directive(
    mut node: Node,
    parent: Option<&CommaSequence>,
    tabs: usize,
    out: &mut Vec<Node>,
    options: &Options,
) -> Result<(), SyntaxError> {
    let children = std::mem::take(&mut node.children);
    let mut flat: Vec<Node> = Vec::new();
    for child in children {
        match &child.kind {
            NodeKind::Rule(_) => flatten_rule(child, parent, tabs + 1, &mut flat, options)?,
            NodeKind::Directive(_) => {
                flatten_directive(child, parent, tabs + 1, &mut flat, options)?;
            }
            NodeKind::Property(_) => {
                flatten_property(child, "", tabs + 1, &mut flat, options)?;
            }
            NodeKind::Comment(data) => {
                if !data.silent {
                    let mut child = child;
                    if let NodeKind::Comment(data) = &mut child.kind {
                        data.tabs = tabs + 1;
                    }
                    flat.push(child);
                }
            }
            NodeKind::Variable(_) | NodeKind::MixinDef(_) => {}
            NodeKind::Import(_) => flat.push(child),
            NodeKind::Root => {}
            _ => return Err(unevaluated(&child)),
        }
    }
    if let NodeKind::Directive(data) = &mut node.kind {
        data.tabs = tabs;
    }
    node.children = flat;
    out.push(node);
    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{PropertySyntax, Style};
    use crate::parser::Parser;
    use crate::script::Environment;
    use crate::transform::resolve;

    fn flat(source: &str) -> Node {
        return try_flat(source).unwrap();
    }

    fn try_flat(source: &str) -> Result<Node, SyntaxError> {
        return try_flat_with(source, &Options::default());
    }

    fn try_flat_with(source: &str, options: &Options) -> Result<Node, SyntaxError> {
        let mut root = Parser::new(source).parse()?;
        resolve(&mut root, &mut Environment::new())?;
        return flatten(root, options);
    }

    fn selector_of(node: &Node) -> String {
        let NodeKind::Rule(data) = &node.kind else {
            panic!("expected rule, got {}", node.kind_name());
        };
        return data.resolved.as_ref().unwrap().to_css(Style::Compact, 0);
    }

    #[test]
    fn childless_parent_is_dropped_after_promotion() {
        let root = flat(".outer { .inner { color: red; } }");
        assert_eq!(root.children.len(), 1);
        assert_eq!(selector_of(&root.children[0]), ".outer .inner");
        assert_eq!(root.children[0].tabs(), 0);
    }

    #[test]
    fn surviving_parent_precedes_promoted_children() {
        let root = flat("p { margin: 0; a { color: blue; } }");
        assert_eq!(root.children.len(), 2);
        assert_eq!(selector_of(&root.children[0]), "p");
        assert_eq!(selector_of(&root.children[1]), "p a");
        assert_eq!(root.children[1].tabs(), 1);
        assert!(root.children[1].group_end());
        assert!(!root.children[0].group_end());
    }

    #[test]
    fn group_end_lands_on_the_last_of_a_sibling_run() {
        let root = flat("p { margin: 0; a { color: blue; } em { color: red; } }");
        assert_eq!(root.children.len(), 3);
        assert!(!root.children[1].group_end());
        assert!(root.children[2].group_end());
    }

    #[test]
    fn parent_references_splice_during_promotion() {
        let root = flat("a { margin: 0; &:hover { color: red; } }");
        assert_eq!(selector_of(&root.children[1]), "a:hover");
    }

    #[test]
    fn comma_lists_multiply() {
        let root = flat("a, b { c, d { margin: 0; } }");
        assert_eq!(selector_of(&root.children[0]), "a c, a d, b c, b d");
    }

    #[test]
    fn nested_properties_join_with_dashes() {
        let root = flat("p { font: { family: serif; size: 12px; } }");
        let names: Vec<&str> = root.children[0]
            .children
            .iter()
            .map(|c| match &c.kind {
                NodeKind::Property(d) => d.name.as_str(),
                _ => panic!("expected property"),
            })
            .collect();
        assert_eq!(names, vec!["font-family", "font-size"]);
        assert_eq!(root.children[0].children[0].tabs(), 1);
    }

    #[test]
    fn valued_container_keeps_its_own_declaration_and_indents_children() {
        let root = flat("p { font: 12px { family: serif; } }");
        let rule = &root.children[0];
        assert_eq!(rule.children.len(), 2);
        let NodeKind::Property(first) = &rule.children[0].kind else {
            panic!("expected property");
        };
        assert_eq!(first.name, "font");
        assert_eq!(first.value, "12px");
        assert_eq!(first.tabs, 1);
        let NodeKind::Property(second) = &rule.children[1].kind else {
            panic!("expected property");
        };
        assert_eq!(second.name, "font-family");
        assert_eq!(second.tabs, 2);
    }

    #[test]
    fn empty_property_without_children_is_rejected() {
        let err = try_flat("p { color: ; }").unwrap_err();
        assert_eq!(err.message, "Invalid property: \"color:\" (no value)");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn interpolated_terminator_in_a_value_is_rejected() {
        let err = try_flat("p { color: #{\"red;\"} }").unwrap_err();
        assert!(err.message.contains("may not end with \";\""));
    }

    #[test]
    fn strict_property_syntax_is_enforced() {
        let old_only = Options {
            property_syntax: Some(PropertySyntax::Old),
            ..Default::default()
        };
        let err = try_flat_with("p { color: red; }", &old_only).unwrap_err();
        assert!(err.message.starts_with("Illegal property syntax"));
        assert!(try_flat_with("p { color= red; }", &old_only).is_ok());

        let new_only = Options {
            property_syntax: Some(PropertySyntax::New),
            ..Default::default()
        };
        let err = try_flat_with("p { :color red; }", &new_only).unwrap_err();
        assert!(err.message.starts_with("Illegal property syntax"));
    }

    #[test]
    fn unexpanded_control_flow_is_an_error() {
        let err = try_flat("@if $x { p { color: red; } }").unwrap_err();
        assert!(err.message.contains("@if"));
        let err = try_flat("p { @include rounded; }").unwrap_err();
        assert!(err.message.contains("@include"));
    }

    #[test]
    fn mixin_definitions_and_variables_vanish() {
        let root = flat("$x: 1;\n@mixin m { color: red; }\np { margin: $x; }");
        assert_eq!(root.children.len(), 1);
        assert_eq!(selector_of(&root.children[0]), "p");
    }

    #[test]
    fn directives_survive_with_flattened_children() {
        let root = flat("@media print { p { a { color: red; } margin: 0; } }");
        let media = &root.children[0];
        let NodeKind::Directive(data) = &media.kind else {
            panic!("expected directive");
        };
        assert_eq!(data.value, "print");
        assert_eq!(data.tabs, 0);
        assert_eq!(media.children.len(), 2);
        assert_eq!(selector_of(&media.children[0]), "p");
        assert_eq!(media.children[0].tabs(), 1);
        assert_eq!(selector_of(&media.children[1]), "p a");
        assert_eq!(media.children[1].tabs(), 2);
    }

    #[test]
    fn source_lines_survive_both_passes() {
        let source = "p {\n  margin: 0;\n  a {\n    color: blue;\n  }\n}";
        let root = flat(source);
        assert_eq!(root.children[0].line, 1);
        assert_eq!(root.children[0].children[0].line, 2);
        assert_eq!(root.children[1].line, 3);
    }

    #[test]
    fn top_level_parent_reference_is_rejected() {
        let err = try_flat("& { color: red; }").unwrap_err();
        assert!(err.message.contains("Base-level rules"));
    }

    #[test]
    fn silent_comments_are_dropped_loud_comments_kept() {
        let root = flat("// gone\n/* kept */\np { // gone\n  /* kept */ margin: 0; }");
        let NodeKind::Comment(first) = &root.children[0].kind else {
            panic!("expected comment");
        };
        assert_eq!(first.text, "/* kept */");
        let rule = &root.children[1];
        assert_eq!(rule.children.len(), 2);
        assert!(matches!(&rule.children[0].kind, NodeKind::Comment(c) if !c.silent));
    }
}
