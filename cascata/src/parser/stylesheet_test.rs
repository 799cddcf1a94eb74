use crate::parser::Parser;
use crate::options::PropertySyntax;
use crate::script::Part;
use crate::tree::{Fragment, Node, NodeKind};

fn parse(source: &str) -> Node {
    return Parser::new(source).parse().unwrap();
}

fn parse_err(source: &str) -> crate::SyntaxError {
    return Parser::new(source).parse().unwrap_err();
}

fn literal_text(fragments: &[Fragment]) -> String {
    let mut out = String::new();
    for fragment in fragments {
        match fragment {
            Fragment::Literal(text) => out.push_str(text),
            Fragment::Script(_) => out.push_str("#{}"),
        }
    }
    return out;
}

fn value_text(node: &Node) -> String {
    let NodeKind::Property(data) = &node.kind else {
        panic!("expected property, got {}", node.kind_name());
    };
    let mut out = String::new();
    for part in &data.raw_value.parts {
        match part {
            Part::Literal(text) => out.push_str(text),
            Part::Variable(name) => {
                out.push('$');
                out.push_str(name);
            }
            Part::Interpolation(_) => out.push_str("#{}"),
        }
    }
    return out;
}

// ======= RULES AND DECLARATIONS =======

#[test]
fn rule_with_declaration() {
    let root = parse("p { margin: 0; }");
    assert_eq!(root.children.len(), 1);
    let rule = &root.children[0];
    let NodeKind::Rule(data) = &rule.kind else {
        panic!("expected rule");
    };
    assert_eq!(literal_text(data.raw.parts()), "p");
    assert!(rule.has_block);
    assert_eq!(rule.children.len(), 1);
    let NodeKind::Property(prop) = &rule.children[0].kind else {
        panic!("expected property");
    };
    assert_eq!(literal_text(prop.raw_name.parts()), "margin");
    assert_eq!(prop.syntax, PropertySyntax::New);
    assert_eq!(value_text(&rule.children[0]), "0");
}

#[test]
fn pseudo_shaped_selector_parses_as_a_rule() {
    for source in ["foo:bar { color: red; }", "a:hover { color: red; }"] {
        let root = parse(source);
        assert!(
            matches!(root.children[0].kind, NodeKind::Rule(_)),
            "{} should be a rule",
            source
        );
    }
}

#[test]
fn spaced_value_before_a_block_is_a_nested_property() {
    let root = parse("p { font: 12px { family: serif; } }");
    let container = &root.children[0].children[0];
    let NodeKind::Property(data) = &container.kind else {
        panic!("expected property");
    };
    assert_eq!(literal_text(data.raw_name.parts()), "font");
    assert!(container.has_block);
    assert_eq!(container.children.len(), 1);
    assert!(matches!(container.children[0].kind, NodeKind::Property(_)));
}

#[test]
fn top_level_declaration_is_rejected() {
    let err = parse_err("margin: 0;");
    assert_eq!(err.message, "Properties are only allowed within rules");
    assert_eq!(err.line, 1);
}

#[test]
fn equals_shorthand_marks_old_syntax() {
    let root = parse("p { width = 2px; }");
    let NodeKind::Property(data) = &root.children[0].children[0].kind else {
        panic!("expected property");
    };
    assert_eq!(data.syntax, PropertySyntax::Old);
}

#[test]
fn equals_shorthand_requires_a_space_before_a_block() {
    // the inner body is invalid either way, so the declaration reading's
    // error wins on the strength of the `=` hint
    let err = parse_err("p { width =2px{ color red; } }");
    assert_eq!(
        err.message,
        "Invalid CSS: a space is required between a script value and \"{\""
    );
    assert!(parse("p { width =2px { a: b; } }").children[0].children[0].has_block);
}

#[test]
fn leading_colon_declaration_is_old_syntax() {
    let root = parse("p { :color red; }");
    let NodeKind::Property(data) = &root.children[0].children[0].kind else {
        panic!("expected property");
    };
    assert_eq!(data.syntax, PropertySyntax::Old);
    assert_eq!(literal_text(data.raw_name.parts()), "color");
    assert_eq!(value_text(&root.children[0].children[0]), "red");
}

#[test]
fn star_hack_keeps_the_star_in_the_name() {
    let root = parse("p { *zoom: 1; }");
    let NodeKind::Property(data) = &root.children[0].children[0].kind else {
        panic!("expected property");
    };
    assert_eq!(literal_text(data.raw_name.parts()), "*zoom");
}

#[test]
fn important_is_folded_into_the_value() {
    let root = parse("p { color: red !important; }");
    assert_eq!(value_text(&root.children[0].children[0]), "red !important");
}

#[test]
fn property_shaped_garbage_prefers_the_declaration_error() {
    for source in ["p { *zoom 1; }", "p { .pad 1; }"] {
        let err = parse_err(source);
        assert!(err.message.contains("expected \":\""), "got: {}", err.message);
    }
}

#[test]
fn selector_shaped_garbage_prefers_the_ruleset_error() {
    let err = parse_err("p { color red; }");
    assert!(err.message.contains("expected \"{\""), "got: {}", err.message);
}

// ======= VARIABLES =======

#[test]
fn variable_assignment_with_guard() {
    let root = parse("$width: 10px !default;\n$plain: 1;");
    let NodeKind::Variable(first) = &root.children[0].kind else {
        panic!("expected variable");
    };
    assert_eq!(first.name, "width");
    assert!(first.guarded);
    let NodeKind::Variable(second) = &root.children[1].kind else {
        panic!("expected variable");
    };
    assert!(!second.guarded);
    assert_eq!(root.children[1].line, 2);
}

// ======= DIRECTIVES =======

#[test]
fn mixin_definition_with_arguments() {
    let root = parse("@mixin rounded($radius: 5px, $width) { border-radius: $radius; }");
    let node = &root.children[0];
    let NodeKind::MixinDef(data) = &node.kind else {
        panic!("expected mixin definition");
    };
    assert_eq!(data.name, "rounded");
    assert_eq!(data.args.len(), 2);
    assert_eq!(data.args[0].name, "radius");
    assert!(data.args[0].default.is_some());
    assert!(data.args[1].default.is_none());
    assert_eq!(node.children.len(), 1);
}

#[test]
fn mixin_include_with_arguments() {
    let root = parse("p { @include rounded(5px, red); }");
    let NodeKind::MixinInclude(data) = &root.children[0].children[0].kind else {
        panic!("expected include");
    };
    assert_eq!(data.name, "rounded");
    assert_eq!(data.args.len(), 2);
}

#[test]
fn for_directive_bounds_and_exclusivity() {
    let root = parse("@for $i from 1 through 3 { }\n@for $j from 1 to 3 { }");
    let NodeKind::For(through) = &root.children[0].kind else {
        panic!("expected @for");
    };
    assert_eq!(through.var, "i");
    assert!(!through.exclusive);
    let NodeKind::For(to) = &root.children[1].kind else {
        panic!("expected @for");
    };
    assert!(to.exclusive);
}

#[test]
fn while_directive_keeps_its_condition() {
    let root = parse("@while $i > 0 { p { margin: 0; } }");
    let NodeKind::While(data) = &root.children[0].kind else {
        panic!("expected @while");
    };
    assert!(!data.condition.is_empty());
}

#[test]
fn else_branches_chain_off_the_if() {
    let root = parse("@if $a { } @else if $b { } @else { }");
    assert_eq!(root.children.len(), 1);
    let NodeKind::If(first) = &root.children[0].kind else {
        panic!("expected @if");
    };
    assert!(first.condition.is_some());
    let second = first.else_node.as_ref().unwrap();
    let NodeKind::If(second_data) = &second.kind else {
        panic!("expected chained branch");
    };
    assert!(second_data.condition.is_some());
    let third = second_data.else_node.as_ref().unwrap();
    let NodeKind::If(third_data) = &third.kind else {
        panic!("expected final branch");
    };
    assert!(third_data.condition.is_none());
    assert!(third_data.else_node.is_none());
}

#[test]
fn dangling_else_is_rejected() {
    let err = parse_err("@else { }");
    assert_eq!(err.message, "Invalid CSS: @else must come after @if");
}

#[test]
fn import_accepts_strings_and_urls() {
    let root = parse("@import \"a.css\", url(b.css);");
    let NodeKind::Import(data) = &root.children[0].kind else {
        panic!("expected import");
    };
    assert_eq!(data.paths, vec!["\"a.css\"", "url(b.css)"]);
}

#[test]
fn media_prelude_keeps_interpolation_fragments() {
    let root = parse("@media screen and #{$q} { p { margin: 0; } }");
    let NodeKind::Directive(data) = &root.children[0].kind else {
        panic!("expected directive");
    };
    assert_eq!(data.name, "media");
    assert_eq!(literal_text(data.raw.parts()), "screen and #{}");
}

#[test]
fn unknown_directives_pass_through() {
    let root = parse("@font-face { font-family: x; }\n@charset \"utf-8\";");
    let face = &root.children[0];
    let NodeKind::Directive(data) = &face.kind else {
        panic!("expected directive");
    };
    assert_eq!(data.name, "font-face");
    assert!(face.has_block);
    assert_eq!(face.children.len(), 1);

    let charset = &root.children[1];
    let NodeKind::Directive(data) = &charset.kind else {
        panic!("expected directive");
    };
    assert_eq!(data.name, "charset");
    assert!(!charset.has_block);
}

// ======= COMMENTS =======

#[test]
fn comments_attach_where_they_appear() {
    let root = parse("// silent\n/* loud-ish */\np { /*! bang */ margin: 0; }");
    let NodeKind::Comment(silent) = &root.children[0].kind else {
        panic!("expected comment");
    };
    assert!(silent.silent);
    assert_eq!(silent.text, "// silent");
    let NodeKind::Comment(plain) = &root.children[1].kind else {
        panic!("expected comment");
    };
    assert!(!plain.silent);
    assert!(!plain.loud);
    let NodeKind::Comment(bang) = &root.children[2].children[0].kind else {
        panic!("expected comment");
    };
    assert!(bang.loud);
}

// ======= ERRORS =======

#[test]
fn missing_semicolon_after_a_blockless_statement() {
    let err = parse_err("@import \"a.css\"\np { margin: 0; }");
    assert!(err.message.contains("expected \";\""), "got: {}", err.message);
    assert_eq!(err.line, 2);
}

#[test]
fn unclosed_block_reports_end_of_input() {
    let err = parse_err("p { margin: 0;");
    assert!(err.message.contains("expected"), "got: {}", err.message);
}

#[test]
fn stray_closing_brace_at_top_level() {
    let err = parse_err("p { margin: 0; }\n}");
    assert!(err.message.contains("selector or at-rule"));
    assert_eq!(err.line, 2);
}

#[test]
fn unterminated_comment_is_an_error() {
    let err = parse_err("p { margin: 0; } /* never closed");
    assert!(err.message.contains("*/"), "got: {}", err.message);
}
