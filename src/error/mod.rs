use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Generation error: {0}")]
    Generation(#[from] LangbaseError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    #[error(
        "All {attempted} agents failed for project '{project}': {}",
        describe_failures(.failures)
    )]
    AllAgentsFailed {
        project: String,
        attempted: usize,
        /// Agent name to error text.
        failures: BTreeMap<String, String>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        AppError::Config {
            message: message.into(),
        }
    }

    /// Whether this error is a misconfiguration that must not be retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AppError::Config { .. } | AppError::Retrieval(RetrievalError::ProjectNotFound { .. })
        )
    }
}

/// Retrieval index errors
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Index connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Project not found: {project}")]
    ProjectNotFound { project: String },

    #[error("Ingestion failed for {path}: {message}")]
    Ingestion { path: PathBuf, message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Langbase API errors
#[derive(Debug, Error)]
pub enum LangbaseError {
    #[error("Langbase unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Report persistence errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Conversion of {path} failed: {message}")]
    Conversion { path: PathBuf, message: String },
}

/// Conversation session protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Session {session_id} is not ready (state: {state})")]
    SessionNotReady { session_id: String, state: String },

    #[error("Session {session_id} already has a turn in progress")]
    TurnInProgress { session_id: String },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },
}

/// MCP protocol errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    #[error("Invalid parameters for {tool_name}: {message}")]
    InvalidParameters { tool_name: String, message: String },

    #[error("Tool execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        McpError::ExecutionFailed {
            message: err.to_string(),
        }
    }
}

fn describe_failures(failures: &BTreeMap<String, String>) -> String {
    failures
        .iter()
        .map(|(agent, error)| format!("{}: {}", agent, error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for retrieval operations
pub type RetrievalResult<T> = Result<T, RetrievalError>;

/// Result type alias for Langbase operations
pub type LangbaseResult<T> = Result<T, LangbaseError>;

/// Result type alias for report persistence
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;
