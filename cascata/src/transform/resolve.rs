//! The resolve pass: substitutes variables and interpolation throughout the
//! tree and parses rule selectors into their structured form.
//!
//! Each node is visited exactly once, in document order, against a single
//! mutable environment. Variable nodes write into the environment; every
//! other node only reads. Control-flow and mixin skeletons are left
//! untouched, since their bodies only gain meaning once an evaluator has
//! expanded them.

use crate::error::SyntaxError;
use crate::script::Environment;
use crate::selector;
use crate::tree::{Node, NodeKind};

#[tracing::instrument(skip_all)]
pub fn resolve(node: &mut Node, env: &mut Environment) -> Result<(), SyntaxError> {
    match &mut node.kind {
        NodeKind::Root => {}
        NodeKind::Rule(data) => {
            let text = data.raw.evaluate(env)?;
            data.parsed = Some(selector::parse_comma_sequence(&text, node.line)?);
        }
        NodeKind::Property(data) => {
            data.name = data.raw_name.evaluate(env)?;
            data.value = data.raw_value.evaluate(env)?;
        }
        NodeKind::Directive(data) => {
            data.value = data.raw.evaluate(env)?;
        }
        NodeKind::Variable(data) => {
            if !(data.guarded && env.is_set(&data.name)) {
                let value = data.value.evaluate(env)?;
                env.set(&data.name, value);
            }
        }
        NodeKind::Import(_) | NodeKind::Comment(_) => {}
        NodeKind::MixinDef(_)
        | NodeKind::MixinInclude(_)
        | NodeKind::For(_)
        | NodeKind::While(_)
        | NodeKind::If(_) => {
            return Ok(());
        }
    }
    for child in &mut node.children {
        resolve(child, env)?;
    }
    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::tree::NodeKind;

    fn resolved(source: &str) -> Node {
        let mut root = Parser::new(source).parse().unwrap();
        let mut env = Environment::new();
        resolve(&mut root, &mut env).unwrap();
        return root;
    }

    #[test]
    fn variables_flow_into_later_values() {
        let root = resolved("$width: 10px;\np { margin: $width; }");
        let NodeKind::Rule(_) = &root.children[1].kind else {
            panic!("expected rule");
        };
        let NodeKind::Property(prop) = &root.children[1].children[0].kind else {
            panic!("expected property");
        };
        assert_eq!(prop.name, "margin");
        assert_eq!(prop.value, "10px");
    }

    #[test]
    fn guarded_assignment_keeps_the_first_binding() {
        let root = resolved("$c: red;\n$c: blue !default;\np { color: $c; }");
        let NodeKind::Property(prop) = &root.children[2].children[0].kind else {
            panic!("expected property");
        };
        assert_eq!(prop.value, "red");
    }

    #[test]
    fn guarded_assignment_binds_when_unset() {
        let root = resolved("$c: blue !default;\np { color: $c; }");
        let NodeKind::Property(prop) = &root.children[1].children[0].kind else {
            panic!("expected property");
        };
        assert_eq!(prop.value, "blue");
    }

    #[test]
    fn interpolated_selectors_are_parsed_after_substitution() {
        let root = resolved("$name: wide;\np.#{$name} { margin: 0; }");
        let NodeKind::Rule(rule) = &root.children[1].kind else {
            panic!("expected rule");
        };
        let parsed = rule.parsed.as_ref().unwrap();
        assert_eq!(
            parsed.to_css(crate::options::Style::Compact, 0),
            "p.wide"
        );
    }

    #[test]
    fn undefined_variable_in_a_selector_is_reported() {
        let mut root = Parser::new("p.#{$ghost} { margin: 0; }").parse().unwrap();
        let err = resolve(&mut root, &mut Environment::new()).unwrap_err();
        assert_eq!(err.message, "Undefined variable: \"$ghost\"");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn mixin_and_control_bodies_are_left_unresolved() {
        let root = resolved("@mixin m { color: $later; }\n$later: red;");
        let NodeKind::Property(prop) = &root.children[0].children[0].kind else {
            panic!("expected property");
        };
        assert!(prop.value.is_empty());
    }
}
