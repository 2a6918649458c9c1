//! Langbase pipe client: the text-generation collaborator.
//!
//! Everything above this module talks to generation through the
//! [`Generator`] trait so that tests and alternative backends can stand in
//! for the HTTP client.

mod client;
mod types;

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

pub use client::LangbaseClient;
pub use types::*;

use async_trait::async_trait;

use crate::error::LangbaseResult;

/// A text-generation backend.
///
/// Implementations must be safe to share across concurrently running agents
/// and sessions.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Run a pipe and return its completion text.
    ///
    /// An empty or unsuccessful completion is an error, never an empty string.
    async fn generate(&self, request: PipeRequest) -> LangbaseResult<String>;
}
