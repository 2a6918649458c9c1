//! Conversational retrieval over an ingested project.
//!
//! Each turn condenses the follow-up into a standalone query, retrieves
//! passages for it, generates a grounded answer and only then commits the
//! exchange to the session's bounded memory.

mod engine;
mod manager;
mod memory;
mod session;

pub use engine::{with_extra_context, ChatEngine, ChatResponse};
pub use manager::SessionManager;
pub use memory::{ChatMemory, TokenCounter, MESSAGE_OVERHEAD_TOKENS};
pub use session::{ChatSession, SessionState};
