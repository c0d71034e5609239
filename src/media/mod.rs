// Media operations on top of the engine binding
//
// - commands: engine argument builders for every operation
// - filter: filter descriptors and their filter-graph expressions
// - executor: single-clip operations (trim, filter, export, split)
// - compositor: multi-clip timeline render

pub mod commands;
pub mod compositor;
pub mod executor;
pub mod filter;

pub use commands::*;
pub use compositor::*;
pub use executor::*;
pub use filter::*;
