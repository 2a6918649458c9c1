//! Passage splitting for ingested documents.

use text_splitter::{Characters, ChunkConfig, TextSplitter};

/// Default upper bound on passage length, in characters.
pub const DEFAULT_MAX_PASSAGE_CHARS: usize = 1200;

/// Splits documents into passages of at most `max_chars` characters.
///
/// Boundaries are chosen semantically: paragraphs first, then sentences,
/// words and finally single characters when nothing coarser fits.
/// Passages are trimmed and blank passages are dropped.
pub struct PassageSplitter(TextSplitter<Characters>);

impl PassageSplitter {
    pub fn new(max_chars: usize) -> Self {
        Self(TextSplitter::new(ChunkConfig::new(max_chars.max(1))))
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.0
            .chunks(text)
            .filter(|chunk| !chunk.trim().is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for PassageSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PASSAGE_CHARS)
    }
}

/// Split a single document with a one-off splitter.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    PassageSplitter::new(max_chars).split(text)
}
