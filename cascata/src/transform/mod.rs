pub mod flatten;
pub mod resolve;

pub use flatten::flatten;
pub use resolve::resolve;
