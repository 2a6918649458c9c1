//! Data types for agent definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{AppError, AppResult};

/// A named unit of inquiry within an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section identifier (e.g., "executive_summary"); used as result key and report header.
    pub name: String,
    /// The question put to the dataroom for this section.
    pub description: String,
}

impl Section {
    /// Create a new section.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A named bundle of sections covering one due-diligence dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Unique agent name (e.g., "Financial Review").
    pub name: String,
    /// Sections, analyzed in this order.
    pub sections: Vec<Section>,
}

impl AgentDefinition {
    /// Create a definition with no sections.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sections: Vec::new(),
        }
    }

    /// Append a section.
    pub fn with_section(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.sections.push(Section::new(name, description));
        self
    }

    /// Check the definition is usable as a unit of analysis.
    ///
    /// # Errors
    /// Returns a configuration error for an empty name, no sections, or
    /// duplicate / empty section names.
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::config("Agent name is required"));
        }
        if self.name.contains(['/', '\\']) || self.name.starts_with('.') {
            return Err(AppError::config(format!(
                "Agent name '{}' cannot be used as a report file name",
                self.name
            )));
        }
        if self.sections.is_empty() {
            return Err(AppError::config(format!(
                "Agent '{}' must have at least one section",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for section in &self.sections {
            if section.name.trim().is_empty() {
                return Err(AppError::config(format!(
                    "Agent '{}' has a section without a name",
                    self.name
                )));
            }
            if !seen.insert(section.name.as_str()) {
                return Err(AppError::config(format!(
                    "Agent '{}' has duplicate section '{}'",
                    self.name, section.name
                )));
            }
        }

        Ok(())
    }

    /// Create a summary from the full definition.
    pub fn to_summary(&self) -> AgentSummary {
        AgentSummary {
            name: self.name.clone(),
            section_count: self.sections.len(),
            sections: self.sections.iter().map(|s| s.name.clone()).collect(),
        }
    }
}

/// Brief agent summary for listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    /// Agent name.
    pub name: String,
    /// Number of sections.
    pub section_count: usize,
    /// Section names in analysis order.
    pub sections: Vec<String>,
}

/// Pre-flight check for a set of definitions submitted to one run.
///
/// # Errors
/// Returns a configuration error if the set is empty, if two definitions
/// share a name, or if any definition is invalid on its own.
pub fn validate_definitions(definitions: &[AgentDefinition]) -> AppResult<()> {
    if definitions.is_empty() {
        return Err(AppError::config("At least one agent definition is required"));
    }

    let mut names = HashSet::new();
    for definition in definitions {
        definition.validate()?;
        if !names.insert(definition.name.as_str()) {
            return Err(AppError::config(format!(
                "Duplicate agent name '{}'",
                definition.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screening() -> AgentDefinition {
        AgentDefinition::new("Screening").with_section("exec_summary", "Summarize the pitch")
    }

    #[test]
    fn test_definition_builder_keeps_order() {
        let def = AgentDefinition::new("Team")
            .with_section("background", "Who are the founders?")
            .with_section("gaps", "Which roles are missing?");

        let names: Vec<_> = def.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["background", "gaps"]);
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_definition_validation() {
        assert!(AgentDefinition::new("").with_section("a", "b").validate().is_err());
        assert!(AgentDefinition::new("Empty").validate().is_err());
        assert!(AgentDefinition::new("../escape")
            .with_section("a", "b")
            .validate()
            .is_err());

        let dup = screening().with_section("exec_summary", "Again");
        let err = dup.validate().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("duplicate section 'exec_summary'"));
    }

    #[test]
    fn test_validate_definitions_rejects_empty_set() {
        let err = validate_definitions(&[]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_validate_definitions_rejects_duplicate_agents() {
        let err = validate_definitions(&[screening(), screening()]).unwrap_err();
        assert!(err.to_string().contains("Duplicate agent name 'Screening'"));
    }

    #[test]
    fn test_summary() {
        let summary = screening().to_summary();
        assert_eq!(summary.name, "Screening");
        assert_eq!(summary.section_count, 1);
        assert_eq!(summary.sections, vec!["exec_summary".to_string()]);
    }

    #[test]
    fn test_definition_deserializes_from_json() {
        let def: AgentDefinition = serde_json::from_value(serde_json::json!({
            "name": "Custom",
            "sections": [{"name": "risks", "description": "List the key risks"}]
        }))
        .unwrap();
        assert_eq!(def.sections[0], Section::new("risks", "List the key risks"));
    }
}
