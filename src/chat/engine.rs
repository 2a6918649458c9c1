use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::memory::{ChatMemory, TokenCounter};
use super::session::ChatSession;
use crate::config::{ChatConfig, Config};
use crate::error::AppResult;
use crate::index::{IndexProvider, Passage};
use crate::langbase::{Generator, Message, PipeRequest};
use crate::prompts::{
    chat_context_prompt, condense_request, CONDENSE_QUESTION_PROMPT, USER_SOURCES_HEADING,
};

/// Text placed in the context block when retrieval found nothing.
const NO_DOCUMENTS_CONTEXT: &str = "No relevant documents were retrieved for this message.";

/// Result of one conversational turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    /// Generated answer.
    pub response: String,
    /// Passages used to ground the answer.
    pub sources: Vec<Passage>,
    /// Standalone query the passages were retrieved for.
    pub condensed_query: String,
}

/// Append caller-supplied source material to a user message.
pub fn with_extra_context(message: &str, extra_context: Option<&str>) -> String {
    match extra_context {
        Some(extra) if !extra.trim().is_empty() => {
            format!("{}\n\n{}\n{}", message, USER_SOURCES_HEADING, extra)
        }
        _ => message.to_string(),
    }
}

/// Retrieval-augmented conversation: condense, retrieve, synthesize, commit.
pub struct ChatEngine {
    index: Arc<dyn IndexProvider>,
    generator: Arc<dyn Generator>,
    condense_pipe: String,
    chat_pipe: String,
    config: ChatConfig,
    tokens: TokenCounter,
}

impl ChatEngine {
    /// Create a chat engine.
    ///
    /// # Errors
    /// Fails if the tokenizer vocabulary used for memory budgeting cannot be loaded.
    pub fn new(
        index: Arc<dyn IndexProvider>,
        generator: Arc<dyn Generator>,
        config: &Config,
    ) -> AppResult<Self> {
        Ok(Self {
            index,
            generator,
            condense_pipe: config.pipes.condense.clone(),
            chat_pipe: config.pipes.chat.clone(),
            config: config.chat.clone(),
            tokens: TokenCounter::o200k()?,
        })
    }

    /// Open a session against an ingested project.
    pub async fn open(&self, project: &str) -> AppResult<Arc<ChatSession>> {
        let retriever = self.index.open_index(project).await?;
        let session = ChatSession::new(
            Uuid::new_v4().to_string(),
            project,
            retriever,
            self.config.memory_budget,
            self.tokens.clone(),
        );

        info!(session_id = %session.id(), project = %project, "Chat session opened");
        Ok(Arc::new(session))
    }

    /// Process one user message.
    ///
    /// Memory is only updated after the answer has been generated, so a
    /// failed turn leaves the session exactly as it was.
    pub async fn turn(
        &self,
        session: &ChatSession,
        message: &str,
        extra_context: Option<&str>,
    ) -> AppResult<ChatResponse> {
        let start = Instant::now();
        let mut inner = session.begin_turn()?;

        let message = with_extra_context(message, extra_context);

        let condensed_query = self.condense(&inner.memory, &message).await?;
        debug!(session_id = %session.id(), query = %condensed_query, "Condensed query");

        let sources = session
            .retriever()
            .retrieve(&condensed_query, self.config.top_k.max(1))
            .await
            .inspect_err(|e| {
                warn!(session_id = %session.id(), error = %e, "Retrieval failed, turn discarded")
            })?;

        let response = self
            .synthesize(&inner.memory, &message, &sources)
            .await
            .inspect_err(|e| {
                warn!(session_id = %session.id(), error = %e, "Synthesis failed, turn discarded")
            })?;

        inner
            .memory
            .commit(Message::user(message), Message::assistant(response.clone()));

        info!(
            session_id = %session.id(),
            project = %session.project(),
            sources = sources.len(),
            memory_tokens = inner.memory.token_count(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Chat turn completed"
        );

        Ok(ChatResponse {
            response,
            sources,
            condensed_query,
        })
    }

    /// Close a session once any in-flight turn has finished.
    pub async fn close(&self, session: &ChatSession) {
        if session.close().await {
            info!(session_id = %session.id(), "Chat session closed");
        } else {
            debug!(session_id = %session.id(), "Chat session already closed");
        }
    }

    async fn condense(&self, memory: &ChatMemory, message: &str) -> AppResult<String> {
        if memory.is_empty() {
            return Ok(message.to_string());
        }

        let request = PipeRequest::new(
            &self.condense_pipe,
            vec![
                Message::system(CONDENSE_QUESTION_PROMPT),
                Message::user(condense_request(&memory.transcript(), message)),
            ],
        );
        let condensed = self.generator.generate(request).await?;
        let condensed = condensed.trim();

        Ok(if condensed.is_empty() {
            message.to_string()
        } else {
            condensed.to_string()
        })
    }

    async fn synthesize(
        &self,
        memory: &ChatMemory,
        message: &str,
        sources: &[Passage],
    ) -> AppResult<String> {
        let context = if sources.is_empty() {
            NO_DOCUMENTS_CONTEXT.to_string()
        } else {
            sources
                .iter()
                .map(|p| format!("Source: {}\n{}", p.source, p.text))
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let mut messages = Vec::with_capacity(memory.len() + 2);
        messages.push(Message::system(chat_context_prompt(&context)));
        messages.extend(memory.messages().cloned());
        messages.push(Message::user(message));

        let request = PipeRequest::new(&self.chat_pipe, messages);
        Ok(self.generator.generate(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_extra_context() {
        assert_eq!(
            with_extra_context("Is the burn rate sustainable?", Some("Q3 burn: $200k/month")),
            "Is the burn rate sustainable?\n\nUser Provided Sources:\nQ3 burn: $200k/month"
        );
        assert_eq!(with_extra_context("Hi", None), "Hi");
        assert_eq!(with_extra_context("Hi", Some("  ")), "Hi");
    }
}
