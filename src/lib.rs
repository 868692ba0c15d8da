// Kaze - file-system-routed build pipeline
// Library root with clean separation of concerns

pub mod cli;
pub mod core;
pub mod infrastructure;
pub mod utils;
