//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - Shared application state management

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;

use crate::analysis::AnalysisOrchestrator;
use crate::catalog::AgentCatalog;
use crate::chat::{ChatEngine, SessionManager};
use crate::config::Config;
use crate::error::AppResult;
use crate::index::{IndexProvider, SqliteIndex};
use crate::langbase::Generator;

/// Application state shared across handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Retrieval index (ingestion, project management, querying).
    pub index: SqliteIndex,
    /// Agent catalog.
    pub catalog: Arc<AgentCatalog>,
    /// Analysis orchestrator.
    pub orchestrator: AnalysisOrchestrator,
    /// Live chat sessions.
    pub sessions: SessionManager,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: Config,
        index: SqliteIndex,
        generator: Arc<dyn Generator>,
    ) -> AppResult<Self> {
        tracing::info!(
            analysis_pipe = %config.pipes.analysis,
            condense_pipe = %config.pipes.condense,
            chat_pipe = %config.pipes.chat,
            dataroom = %config.dataroom.root.display(),
            "AppState initializing"
        );

        let provider: Arc<dyn IndexProvider> = Arc::new(index.clone());
        let catalog = Arc::new(AgentCatalog::new());
        let orchestrator =
            AnalysisOrchestrator::new(provider.clone(), generator.clone(), catalog.clone(), &config);
        let engine = Arc::new(ChatEngine::new(provider, generator, &config)?);

        Ok(Self {
            config,
            index,
            catalog,
            orchestrator,
            sessions: SessionManager::new(engine),
        })
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;
