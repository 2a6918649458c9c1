//! Agent catalog for looking up analysis agents by name.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::error;

use super::builtins;
use super::types::{AgentDefinition, AgentSummary};
use crate::error::{AppError, AppResult};

/// Registry of agent definitions.
///
/// Thread-safe table of definitions with the built-in agents registered on
/// creation. Registration order is preserved for listing.
pub struct AgentCatalog {
    agents: RwLock<Vec<AgentDefinition>>,
}

impl AgentCatalog {
    /// Create a new catalog with the built-in agents.
    pub fn new() -> Self {
        let catalog = Self::empty();
        catalog.register_builtins();
        catalog
    }

    /// Create a catalog with no agents.
    pub fn empty() -> Self {
        Self {
            agents: RwLock::new(Vec::new()),
        }
    }

    /// Register an agent.
    ///
    /// # Errors
    /// Returns a configuration error if the definition is invalid or an
    /// agent with the same name already exists.
    pub fn register(&self, definition: AgentDefinition) -> AppResult<()> {
        definition.validate()?;

        let mut agents = self.write();
        if agents.iter().any(|a| a.name == definition.name) {
            return Err(AppError::config(format!(
                "Agent '{}' already exists",
                definition.name
            )));
        }

        agents.push(definition);
        Ok(())
    }

    /// Get an agent by name.
    pub fn get(&self, name: &str) -> Option<AgentDefinition> {
        self.read().iter().find(|a| a.name == name).cloned()
    }

    /// Get an agent by name, failing for unknown names.
    pub fn require(&self, name: &str) -> AppResult<AgentDefinition> {
        self.get(name)
            .ok_or_else(|| AppError::config(format!("Unknown agent '{}'", name)))
    }

    /// Resolve names to definitions; an empty list selects every agent.
    pub fn resolve(&self, names: &[String]) -> AppResult<Vec<AgentDefinition>> {
        if names.is_empty() {
            return Ok(self.definitions());
        }
        names.iter().map(|n| self.require(n)).collect()
    }

    /// List all agents in registration order.
    pub fn list(&self) -> Vec<AgentSummary> {
        self.read().iter().map(|a| a.to_summary()).collect()
    }

    /// Clone every definition in registration order.
    pub fn definitions(&self) -> Vec<AgentDefinition> {
        self.read().clone()
    }

    /// Get the number of registered agents.
    pub fn count(&self) -> usize {
        self.read().len()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<AgentDefinition>> {
        self.agents.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<AgentDefinition>> {
        self.agents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn register_builtins(&self) {
        for definition in builtins::all_builtins() {
            let name = definition.name.clone();
            if let Err(e) = self.register(definition) {
                error!(
                    agent = %name,
                    error = %e,
                    "Failed to register builtin agent - this indicates a programming error"
                );
            }
        }
    }
}

impl Default for AgentCatalog {
    fn default() -> Self {
        Self::new()
    }
}
