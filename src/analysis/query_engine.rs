use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::AppResult;
use crate::index::{Passage, Retriever};
use crate::langbase::{Generator, Message, PipeRequest};
use crate::prompts::{summarize_request, SECTION_ANALYSIS_PROMPT};

/// Answer returned when retrieval finds nothing to ground a section on.
pub const NO_CONTEXT_ANSWER: &str = "No relevant passages were found in the dataroom.";

/// Answer to one question plus the passages it was built from.
#[derive(Debug, Clone)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<Passage>,
}

/// Retrieval plus tree-style answer synthesis over one project's index.
///
/// A single engine is shared by every agent of a run; it holds no mutable
/// state, so concurrent queries only contend on the retriever and generator.
pub struct QueryEngine {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    pipe_name: String,
    top_k: usize,
    summary_fanout: usize,
}

impl QueryEngine {
    /// Create a query engine.
    pub fn new(
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        pipe_name: impl Into<String>,
        config: &AnalysisConfig,
    ) -> Self {
        Self {
            retriever,
            generator,
            pipe_name: pipe_name.into(),
            top_k: config.top_k.max(1),
            summary_fanout: config.summary_fanout.max(2),
        }
    }

    /// Answer `question` from the top-k passages.
    ///
    /// Passages are summarized `summary_fanout` at a time; the partial
    /// answers are then summarized the same way until one answer is left.
    pub async fn query(&self, question: &str) -> AppResult<QueryAnswer> {
        let start = Instant::now();

        let sources = self.retriever.retrieve(question, self.top_k).await?;
        if sources.is_empty() {
            debug!("No passages retrieved, skipping synthesis");
            return Ok(QueryAnswer {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources,
            });
        }

        let mut nodes: Vec<String> = sources
            .iter()
            .map(|p| format!("Source: {}\n{}", p.source, p.text))
            .collect();
        let mut calls = 0usize;

        let answer = loop {
            let mut summaries = Vec::with_capacity(nodes.len().div_ceil(self.summary_fanout));
            for group in nodes.chunks(self.summary_fanout) {
                let context: Vec<&str> = group.iter().map(String::as_str).collect();
                summaries.push(self.summarize(question, &context).await?);
                calls += 1;
            }

            if summaries.len() == 1 {
                break summaries.remove(0);
            }
            nodes = summaries;
        };

        debug!(
            passages = sources.len(),
            generation_calls = calls,
            latency_ms = start.elapsed().as_millis() as u64,
            "Query answered"
        );

        Ok(QueryAnswer { answer, sources })
    }

    async fn summarize(&self, question: &str, context: &[&str]) -> AppResult<String> {
        let request = PipeRequest::new(
            &self.pipe_name,
            vec![
                Message::system(SECTION_ANALYSIS_PROMPT),
                Message::user(summarize_request(question, context)),
            ],
        );
        Ok(self.generator.generate(request).await?)
    }
}
