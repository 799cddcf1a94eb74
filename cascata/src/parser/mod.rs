pub mod patterns;
pub mod scanner;
pub mod stylesheet;

#[cfg(test)]
mod stylesheet_test;

pub use stylesheet::Parser;
