use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use super::memory::{ChatMemory, TokenCounter};
use crate::error::ProtocolError;
use crate::index::Retriever;
use crate::langbase::Message;

/// Lifecycle state of a conversation session.
///
/// A session exists only once opened, so it starts `Ready`; turns are
/// accepted only in `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Ready,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Ready => write!(f, "ready"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

pub(crate) struct SessionInner {
    pub(crate) state: SessionState,
    pub(crate) memory: ChatMemory,
}

/// A live conversation bound to one project's index.
///
/// Turns are serialized by an internal lock; a turn arriving while
/// another is in flight is rejected rather than queued.
pub struct ChatSession {
    id: String,
    project: String,
    created_at: DateTime<Utc>,
    retriever: Arc<dyn Retriever>,
    inner: Mutex<SessionInner>,
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("project", &self.project)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    pub(crate) fn new(
        id: String,
        project: impl Into<String>,
        retriever: Arc<dyn Retriever>,
        memory_budget: usize,
        tokens: TokenCounter,
    ) -> Self {
        Self {
            id,
            project: project.into(),
            created_at: Utc::now(),
            retriever,
            inner: Mutex::new(SessionInner {
                state: SessionState::Ready,
                memory: ChatMemory::new(memory_budget, tokens),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn retriever(&self) -> &Arc<dyn Retriever> {
        &self.retriever
    }

    /// Current state; waits for an in-flight turn to finish.
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Copy of the conversation memory; waits for an in-flight turn to finish.
    pub async fn memory_snapshot(&self) -> Vec<Message> {
        self.inner.lock().await.memory.snapshot()
    }

    /// Claim the session for one turn.
    pub(crate) fn begin_turn(&self) -> Result<MutexGuard<'_, SessionInner>, ProtocolError> {
        let inner = self
            .inner
            .try_lock()
            .map_err(|_| ProtocolError::TurnInProgress {
                session_id: self.id.clone(),
            })?;

        if inner.state != SessionState::Ready {
            return Err(ProtocolError::SessionNotReady {
                session_id: self.id.clone(),
                state: inner.state.to_string(),
            });
        }

        Ok(inner)
    }

    /// Move to `Closed` once any in-flight turn has completed or failed.
    ///
    /// Returns `false` if the session was already closed.
    pub(crate) async fn close(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state == SessionState::Closed {
            return false;
        }
        inner.state = SessionState::Closed;
        inner.memory.clear();
        true
    }
}
