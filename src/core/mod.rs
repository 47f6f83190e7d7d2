//! Core types & traits: domain-agnostic contracts for tools and their results.

pub mod content;
pub mod error;
pub mod tool;

pub use content::ToolOutput;
pub use error::{ErrorKind, ToolError, WorkflowError};
pub use tool::{Tool, ToolDescriptor, ToolSpec};
