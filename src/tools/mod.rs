//! Tool implementations and the per-variant registries that serve them.

pub mod args;
pub mod calculate;
pub mod clock;
pub mod expr;
pub mod fs;
pub mod pattern;
pub mod registry;
pub mod terminal;
pub mod variants;
pub mod web_search;
pub mod workspace;

pub use registry::ToolRegistry;
pub use variants::{build_registry, ToolSettings, Variant};
