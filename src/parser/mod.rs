// Chart call DSL parser module

pub mod ast;
pub mod call;
pub mod lexer;
pub mod pipeline;

// Public API re-exports
pub use ast::{ChartCall, Literal};
pub use pipeline::parse_pipeline;
