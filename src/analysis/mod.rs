//! Concurrent due-diligence analysis.
//!
//! This module provides:
//! - [`QueryEngine`]: retrieval plus tree summarization for one question
//! - [`AgentInstance`]: an agent definition bound to a query engine, answering its sections in order
//! - [`AnalysisOrchestrator`]: fans agents out over a bounded worker pool and collects their results
//! - [`report`]: markdown report rendering, writing and conversion

mod agent;
mod orchestrator;
mod query_engine;
pub mod report;

pub use agent::{AgentInstance, AnalysisResult};
pub use orchestrator::{AnalysisOrchestrator, AnalysisRun, RunOptions, RunStatus};
pub use query_engine::{QueryAnswer, QueryEngine, NO_CONTEXT_ANSWER};
pub use report::{
    clear_results, convert_report, parse_report, render_markdown, write_report, ParsedReport,
};
