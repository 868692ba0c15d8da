// Infrastructure layer
pub mod assembler;
pub mod css;
pub mod dependency_analyzer;
pub mod file_system;
pub mod polyfill_resolver;
pub mod processors;
pub mod route_tree;
pub mod runtime;

pub use assembler::*;
pub use css::*;
pub use dependency_analyzer::*;
pub use file_system::*;
pub use polyfill_resolver::*;
pub use processors::*;
pub use route_tree::*;
pub use runtime::*;
