#![allow(clippy::needless_return)]
#![allow(clippy::new_without_default)]

//! A compiler core for a CSS superset: nested rules, variables, parent
//! references and interpolation are parsed into a document tree, resolved,
//! flattened to the shape plain CSS requires, and rendered in one of four
//! output styles.
//!
//! Expression evaluation and control-flow expansion are deliberately left
//! to the embedder: the tree carries `@mixin`/`@include`/`@if`/`@for`/
//! `@while` skeletons through [`parse`], and [`resolve_and_flatten`]
//! rejects any that are still present.

pub mod error;
pub mod logging;
pub mod options;
pub mod parser;
pub mod render;
pub mod script;
pub mod selector;
pub mod transform;
pub mod tree;

pub use error::SyntaxError;
pub use options::{Options, PropertySyntax, Style};
pub use tree::{Node, NodeKind};

use script::Environment;

/// Parses source text into the raw document tree.
pub fn parse(source: &str) -> Result<Node, SyntaxError> {
    return parser::Parser::new(source).parse();
}

/// Runs the resolve and flatten passes over a parsed tree.
#[tracing::instrument(skip_all)]
pub fn resolve_and_flatten(mut root: Node, options: &Options) -> Result<Node, SyntaxError> {
    let mut env = Environment::new();
    transform::resolve(&mut root, &mut env)?;
    return transform::flatten(root, options);
}

/// Renders a flattened tree as CSS text.
pub fn render(root: &Node, options: &Options) -> Result<String, SyntaxError> {
    return render::render(root, options);
}

/// Full pipeline: parse, resolve, flatten, render.
#[tracing::instrument(skip_all)]
pub fn compile(source: &str, options: &Options) -> Result<String, SyntaxError> {
    let root = parse(source)?;
    let flat = resolve_and_flatten(root, options)?;
    return render::render(&flat, options);
}
