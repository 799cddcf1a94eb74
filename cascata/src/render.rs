//! Serializes a flattened tree to CSS text in one of the four output
//! styles. Works purely from resolved strings, indentation depths and
//! group-end flags; nothing here evaluates anything.

use itertools::Itertools;

use crate::error::SyntaxError;
use crate::options::{Options, Style};
use crate::tree::{CommentData, Node, NodeKind, PropertyData};

#[tracing::instrument(skip_all)]
pub fn render(root: &Node, options: &Options) -> Result<String, SyntaxError> {
    let mut out = String::new();
    render_statements(&root.children, options.style, &mut out)?;
    if options.style != Style::Compressed && !out.is_empty() {
        out.push('\n');
    }
    return Ok(out);
}

fn is_visible(node: &Node, style: Style) -> bool {
    return match &node.kind {
        NodeKind::Comment(data) => {
            if data.silent {
                return false;
            }
            if style == Style::Compressed {
                return data.loud;
            }
            true
        }
        NodeKind::Rule(_) => !node.children.is_empty(),
        _ => true,
    };
}

/// Renders a sibling run. In nested and compact styles a blank line opens
/// every new group: after a group-end statement and before any statement
/// back at the run's base depth.
fn render_statements(children: &[Node], style: Style, out: &mut String) -> Result<(), SyntaxError> {
    let visible: Vec<&Node> = children.iter().filter(|n| is_visible(n, style)).collect();
    let base = visible.first().map(|n| n.tabs()).unwrap_or(0);
    let mut prev_group_end = false;
    for (i, node) in visible.iter().enumerate() {
        if i > 0 {
            match style {
                Style::Compressed => {}
                Style::Expanded => out.push_str("\n\n"),
                Style::Nested | Style::Compact => {
                    out.push('\n');
                    if prev_group_end || node.tabs() == base {
                        out.push('\n');
                    }
                }
            }
        }
        render_statement(node, style, out)?;
        prev_group_end = node.group_end();
    }
    return Ok(());
}

fn render_statement(node: &Node, style: Style, out: &mut String) -> Result<(), SyntaxError> {
    match &node.kind {
        NodeKind::Rule(_) => return render_rule(node, style, out),
        NodeKind::Directive(_) => return render_directive(node, style, out),
        NodeKind::Import(data) => {
            let sep = if style == Style::Compressed { "" } else { "\n" };
            let text = data
                .paths
                .iter()
                .map(|p| format!("@import {};", p))
                .join(sep);
            out.push_str(&text);
        }
        NodeKind::Comment(data) => {
            if style == Style::Nested {
                out.push_str(&"  ".repeat(data.tabs));
            }
            out.push_str(&data.text);
        }
        NodeKind::Property(data) => {
            // property directly inside a directive block
            match style {
                Style::Nested => {
                    out.push_str(&"  ".repeat(data.tabs));
                    out.push_str(&format!("{}: {};", data.name, data.value));
                }
                Style::Compressed => {
                    out.push_str(&format!("{}:{};", data.name, data.value));
                }
                _ => out.push_str(&format!("  {}: {};", data.name, data.value)),
            }
        }
        _ => {
            return Err(SyntaxError::new(
                format!("cannot render {}; the tree was not flattened", node.kind_name()),
                node.line,
            ));
        }
    }
    return Ok(());
}

fn render_rule(node: &Node, style: Style, out: &mut String) -> Result<(), SyntaxError> {
    let NodeKind::Rule(data) = &node.kind else {
        return Err(SyntaxError::new("expected a rule", node.line));
    };
    let Some(selector) = data.resolved.as_ref() else {
        return Err(SyntaxError::new(
            "rule was not flattened before rendering",
            node.line,
        ));
    };

    match style {
        Style::Nested => {
            let indent = "  ".repeat(data.tabs);
            out.push_str(&indent);
            out.push_str(&selector.to_css(style, data.tabs));
            out.push_str(" {");
            for child in &node.children {
                if !is_visible(child, style) {
                    continue;
                }
                out.push('\n');
                render_member(child, style, data.tabs, out);
            }
            out.push_str(" }");
        }
        Style::Expanded => {
            out.push_str(&selector.to_css(style, 0));
            out.push_str(" {\n");
            for child in &node.children {
                if !is_visible(child, style) {
                    continue;
                }
                render_member(child, style, data.tabs, out);
                out.push('\n');
            }
            out.push('}');
        }
        Style::Compact => {
            out.push_str(&selector.to_css(style, 0));
            out.push_str(" {");
            for child in &node.children {
                if !is_visible(child, style) {
                    continue;
                }
                out.push(' ');
                render_member(child, style, data.tabs, out);
            }
            out.push_str(" }");
        }
        Style::Compressed => {
            out.push_str(&selector.to_css(style, 0));
            out.push('{');
            let members = node
                .children
                .iter()
                .filter(|c| is_visible(c, style))
                .map(member_compressed)
                .join(";");
            out.push_str(&members);
            out.push('}');
        }
    }
    return Ok(());
}

/// One declaration or comment line inside a rule body.
fn render_member(child: &Node, style: Style, rule_tabs: usize, out: &mut String) {
    let depth = child.tabs();
    let indent = match style {
        // depths are absolute; expanded output keeps rules flush left
        Style::Nested => "  ".repeat(depth),
        Style::Expanded => "  ".repeat(1 + depth.saturating_sub(rule_tabs + 1)),
        _ => String::new(),
    };
    out.push_str(&indent);
    match &child.kind {
        NodeKind::Property(PropertyData { name, value, .. }) => {
            out.push_str(&format!("{}: {};", name, value));
        }
        NodeKind::Comment(CommentData { text, .. }) => out.push_str(text),
        _ => {}
    }
}

fn member_compressed(child: &Node) -> String {
    return match &child.kind {
        NodeKind::Property(PropertyData { name, value, .. }) => format!("{}:{}", name, value),
        NodeKind::Comment(CommentData { text, .. }) => text.clone(),
        _ => String::new(),
    };
}

fn render_directive(node: &Node, style: Style, out: &mut String) -> Result<(), SyntaxError> {
    let NodeKind::Directive(data) = &node.kind else {
        return Err(SyntaxError::new("expected a directive", node.line));
    };
    let header = if data.value.is_empty() {
        format!("@{}", data.name)
    } else {
        format!("@{} {}", data.name, data.value)
    };

    if !node.has_block {
        if style == Style::Nested {
            out.push_str(&"  ".repeat(data.tabs));
        }
        out.push_str(&header);
        out.push(';');
        return Ok(());
    }

    match style {
        Style::Nested => {
            out.push_str(&"  ".repeat(data.tabs));
            out.push_str(&header);
            out.push_str(" {\n");
            render_statements(&node.children, style, out)?;
            out.push_str(" }");
        }
        Style::Expanded | Style::Compact => {
            out.push_str(&header);
            out.push_str(" {\n");
            render_statements(&node.children, style, out)?;
            out.push_str("\n}");
        }
        Style::Compressed => {
            out.push_str(&header);
            out.push('{');
            render_statements(&node.children, style, out)?;
            out.push('}');
        }
    }
    return Ok(());
}
