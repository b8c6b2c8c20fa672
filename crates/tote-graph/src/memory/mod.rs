//! In-memory module graph.
//!
//! `ModuleGraph` is a cheaply clonable handle over `parking_lot`-guarded
//! maps. Methods are grouped by concern across the submodules; each adds an
//! `impl ModuleGraph` block.

mod cycles;
mod graph;
mod mutations;
mod queries;
mod traversal;

pub use graph::ModuleGraph;
