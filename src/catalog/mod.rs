//! Section task catalog: the named analysis agents a run can use.
//!
//! This module provides:
//! - `AgentDefinition` / `Section`: data describing one agent and its ordered sections
//! - `AgentCatalog`: registration and lookup of agents
//! - `validate_definitions`: pre-flight check for the agents of one run
//! - Built-in agents for the five due-diligence dimensions

mod builtins;
mod registry;
mod types;

pub use builtins::*;
pub use registry::AgentCatalog;
pub use types::*;
