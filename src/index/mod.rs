//! Retrieval index for dataroom projects.
//!
//! This module provides:
//! - [`Retriever`]: read-only top-k passage retrieval, shared by every agent and session
//! - [`IndexProvider`]: resolves a project name to its retriever
//! - [`SqliteIndex`]: the SQLite-backed implementation with ingestion and project deletion

mod chunker;
mod scoring;
mod sqlite;

pub use chunker::{chunk_text, PassageSplitter, DEFAULT_MAX_PASSAGE_CHARS};
pub use scoring::{rank_passages, tokenize};
pub use sqlite::{ProjectIndex, SqliteIndex};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RetrievalResult;

/// A retrieved passage with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Source document identifier (file name within the project).
    pub source: String,
    /// Passage text.
    pub text: String,
    /// Similarity score; higher is more relevant.
    pub score: f64,
}

impl Passage {
    /// Create a passage.
    pub fn new(source: impl Into<String>, text: impl Into<String>, score: f64) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            score,
        }
    }
}

/// Top-k passage retrieval over one project's documents.
///
/// Implementations are queried concurrently by every agent in an analysis
/// run and by every open chat session, and must not mutate the index while
/// serving queries.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return at most `top_k` passages, most relevant first.
    async fn retrieve(&self, query: &str, top_k: usize) -> RetrievalResult<Vec<Passage>>;
}

/// Resolves project names to ready retrieval indexes.
#[async_trait]
pub trait IndexProvider: Send + Sync {
    /// Open the index of an ingested project.
    ///
    /// # Errors
    /// Returns `RetrievalError::ProjectNotFound` if the project was never ingested.
    async fn open_index(&self, project: &str) -> RetrievalResult<Arc<dyn Retriever>>;
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub project: String,
    pub documents: usize,
    pub passages: usize,
    /// Files that were present but not ingested (binary or empty).
    pub skipped: Vec<String>,
}

/// An ingested project as recorded in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub source_path: String,
    pub document_count: i64,
    pub passage_count: i64,
    pub ingested_at: DateTime<Utc>,
}
