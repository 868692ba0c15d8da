// Processors module
pub mod import_rewriter;
pub mod js_transformer;

pub use import_rewriter::*;
pub use js_transformer::*;
