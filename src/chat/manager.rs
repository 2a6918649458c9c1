use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use super::engine::{ChatEngine, ChatResponse};
use super::session::ChatSession;
use crate::error::{AppResult, ProtocolError};

/// Live sessions addressable by id, for transports that cannot hold a
/// session handle across requests.
pub struct SessionManager {
    engine: Arc<ChatEngine>,
    sessions: RwLock<HashMap<String, Arc<ChatSession>>>,
}

impl SessionManager {
    pub fn new(engine: Arc<ChatEngine>) -> Self {
        Self {
            engine,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open a session and return its id.
    pub async fn open(&self, project: &str) -> AppResult<String> {
        let session = self.engine.open(project).await?;
        let id = session.id().to_string();
        self.sessions.write().await.insert(id.clone(), session);
        Ok(id)
    }

    /// Look up a live session.
    pub async fn get(&self, session_id: &str) -> Result<Arc<ChatSession>, ProtocolError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| ProtocolError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    /// Run one turn on a live session.
    pub async fn turn(
        &self,
        session_id: &str,
        message: &str,
        extra_context: Option<&str>,
    ) -> AppResult<ChatResponse> {
        let session = self.get(session_id).await?;
        self.engine.turn(&session, message, extra_context).await
    }

    /// Close and forget a session.
    pub async fn close(&self, session_id: &str) -> AppResult<()> {
        let session = self.sessions.write().await.remove(session_id).ok_or_else(|| {
            ProtocolError::SessionNotFound {
                session_id: session_id.to_string(),
            }
        })?;
        self.engine.close(&session).await;
        Ok(())
    }

    /// Close every live session.
    pub async fn close_all(&self) -> usize {
        let sessions: Vec<_> = self.sessions.write().await.drain().map(|(_, s)| s).collect();
        for session in &sessions {
            self.engine.close(session).await;
        }
        if !sessions.is_empty() {
            info!(closed = sessions.len(), "Closed all chat sessions");
        }
        sessions.len()
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
