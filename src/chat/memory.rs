//! Token-bounded conversation memory.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use tiktoken_rs::CoreBPE;

use crate::error::{AppError, AppResult};
use crate::langbase::Message;

/// Tokens added per message for role and framing.
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Counts tokens with the `o200k_base` vocabulary.
///
/// Loading the vocabulary is expensive; build one counter and clone it, the
/// encoder itself is shared.
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Arc<CoreBPE>,
}

impl TokenCounter {
    pub fn o200k() -> AppResult<Self> {
        let bpe = tiktoken_rs::o200k_base().map_err(|e| AppError::Internal {
            message: format!("failed to load tokenizer: {}", e),
        })?;
        Ok(Self { bpe: Arc::new(bpe) })
    }

    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Cost of one stored message.
    pub fn message_cost(&self, message: &Message) -> usize {
        self.count(&message.content) + MESSAGE_OVERHEAD_TOKENS
    }
}

impl fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCounter")
            .field("vocabulary", &"o200k_base")
            .finish()
    }
}

/// Ordered user/assistant exchanges, capped by a token budget.
///
/// Messages are only ever added as a complete exchange by [`ChatMemory::commit`],
/// and evicted a whole exchange at a time from the oldest end.
///
/// The budget holds whenever more than one exchange is stored. The newest
/// exchange is never evicted, so a single exchange larger than the budget is
/// kept whole and [`ChatMemory::token_count`] then exceeds [`ChatMemory::budget`].
#[derive(Debug, Clone)]
pub struct ChatMemory {
    budget: usize,
    tokens: TokenCounter,
    messages: VecDeque<Message>,
    used: usize,
}

impl ChatMemory {
    pub fn new(budget: usize, tokens: TokenCounter) -> Self {
        Self {
            budget,
            tokens,
            messages: VecDeque::new(),
            used: 0,
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Tokens currently held.
    pub fn token_count(&self) -> usize {
        self.used
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages, oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Owned copy of the messages, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    /// Plain-text rendering used when condensing a follow-up question.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Append one exchange, then evict the oldest exchanges while over budget.
    pub fn commit(&mut self, user: Message, assistant: Message) {
        self.used += self.tokens.message_cost(&user) + self.tokens.message_cost(&assistant);
        self.messages.push_back(user);
        self.messages.push_back(assistant);

        while self.used > self.budget && self.messages.len() > 2 {
            for _ in 0..2 {
                if let Some(evicted) = self.messages.pop_front() {
                    self.used -= self.tokens.message_cost(&evicted);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.used = 0;
    }
}
