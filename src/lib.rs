//! # Dataroom Diligence
//!
//! Due-diligence analysis over a startup's dataroom. Documents are ingested
//! into a per-project retrieval index; analysis agents answer their sections
//! against that index concurrently and write one markdown report each; chat
//! sessions answer follow-up questions with bounded conversational memory.
//! Text generation is delegated to Langbase Pipes.
//!
//! ## Features
//!
//! - **Analysis**: Built-in and caller-supplied agents run on a bounded worker pool
//! - **Reports**: One markdown report per agent, optionally converted to Word
//! - **Chat**: Condense, retrieve, answer; memory committed only on success
//! - **Catalog**: Five built-in screening, team, technology, financial and market agents
//!
//! ## Architecture
//!
//! ```text
//! MCP Client / CLI → Orchestrator / Chat Engine → Langbase Pipes (HTTP)
//!                            ↓
//!                    SQLite (Passage index)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dataroom_diligence::{Config, AppState, McpServer};
//! use dataroom_diligence::index::SqliteIndex;
//! use dataroom_diligence::langbase::LangbaseClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let index = SqliteIndex::new(&config.database).await?;
//!     let langbase = LangbaseClient::new(&config.langbase, config.request.clone())?;
//!     let state = Arc::new(AppState::new(config, index, Arc::new(langbase))?);
//!     McpServer::new(state).run().await?;
//!     Ok(())
//! }
//! ```

/// Concurrent agent analysis and report writing.
pub mod analysis;
/// Analysis agent definitions and the built-in catalog.
pub mod catalog;
/// Conversational retrieval sessions.
pub mod chat;
/// Command-line subcommands.
pub mod cli;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Document ingestion and passage retrieval.
pub mod index;
/// Langbase API client and types for pipe communication.
pub mod langbase;
/// System prompts for Langbase pipes.
pub mod prompts;
/// MCP server implementation and request handling.
pub mod server;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, McpServer, SharedState};
