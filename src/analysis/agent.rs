use std::sync::Arc;
use std::time::Instant;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use super::query_engine::QueryEngine;
use crate::catalog::AgentDefinition;
use crate::error::AppResult;

/// Generated answers of one agent, keyed by section name.
///
/// Sections keep the order of the originating definition; serialization
/// emits a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisResult {
    sections: Vec<(String, String)>,
}

impl AnalysisResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section answer.
    pub fn push(&mut self, section: impl Into<String>, answer: impl Into<String>) {
        self.sections.push((section.into(), answer.into()));
    }

    /// Answer for a section, if present.
    pub fn get(&self, section: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|(name, _)| name == section)
            .map(|(_, answer)| answer.as_str())
    }

    /// Iterate `(section, answer)` pairs in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sections
            .iter()
            .map(|(name, answer)| (name.as_str(), answer.as_str()))
    }

    /// Section names in definition order.
    pub fn section_names(&self) -> Vec<&str> {
        self.sections.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl FromIterator<(String, String)> for AnalysisResult {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            sections: iter.into_iter().collect(),
        }
    }
}

impl Serialize for AnalysisResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for (name, answer) in &self.sections {
            map.serialize_entry(name, answer)?;
        }
        map.end()
    }
}

/// An agent definition bound to a query engine for one run.
pub struct AgentInstance {
    definition: AgentDefinition,
    engine: Arc<QueryEngine>,
}

impl AgentInstance {
    pub fn new(definition: AgentDefinition, engine: Arc<QueryEngine>) -> Self {
        Self { definition, engine }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Answer every section, one after another.
    ///
    /// The first failing section fails the whole agent.
    pub async fn analyze(&self) -> AppResult<AnalysisResult> {
        let start = Instant::now();
        info!(agent = %self.definition.name, sections = self.definition.sections.len(), "Agent started");

        let mut result = AnalysisResult::new();
        for section in &self.definition.sections {
            debug!(agent = %self.definition.name, section = %section.name, "Analyzing section");
            let answer = self.engine.query(&section.description).await?;
            result.push(section.name.clone(), answer.answer);
        }

        info!(
            agent = %self.definition.name,
            latency_ms = start.elapsed().as_millis() as u64,
            "Agent finished"
        );

        Ok(result)
    }
}
