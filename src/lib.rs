//! MCP tool servers (filesystem, terminal, simple, sample) plus a runner that
//! hands role-based crew plans to an external agent engine.

pub mod cli;
pub mod clients;
pub mod core;
pub mod domain;
pub mod infra;
pub mod tools;
pub mod workflow;
