use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::agent::{AgentInstance, AnalysisResult};
use super::query_engine::QueryEngine;
use super::report::{clear_results, convert_report, write_report};
use crate::catalog::{validate_definitions, AgentCatalog, AgentDefinition};
use crate::config::{AnalysisConfig, Config, DataroomConfig};
use crate::error::{AppError, AppResult, PersistenceError};
use crate::index::IndexProvider;
use crate::langbase::Generator;

/// Per-run switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Empty the project's results directory before any agent starts.
    pub clear_previous: bool,
    /// Also write a Word copy of every report.
    pub convert_reports: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            clear_previous: true,
            convert_reports: false,
        }
    }
}

/// Overall outcome of a run that produced at least one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every agent succeeded and every report was written.
    Complete,
    /// Some agents failed or some reports could not be written.
    Partial,
}

/// Everything one orchestration run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisRun {
    pub project: String,
    /// Successful agents, by name.
    pub results: BTreeMap<String, AnalysisResult>,
    /// Failed agents and their error.
    pub failures: BTreeMap<String, String>,
    /// Written markdown reports.
    pub reports: BTreeMap<String, PathBuf>,
    /// Converted Word reports.
    pub converted: BTreeMap<String, PathBuf>,
    /// Agents whose result is valid but whose report write or conversion failed.
    pub persistence_failures: BTreeMap<String, String>,
    pub duration_ms: u64,
}

impl AnalysisRun {
    pub fn status(&self) -> RunStatus {
        if self.failures.is_empty() && self.persistence_failures.is_empty() {
            RunStatus::Complete
        } else {
            RunStatus::Partial
        }
    }
}

/// What a single agent task hands back to the fan-in.
struct AgentOutcome {
    name: String,
    result: AppResult<AnalysisResult>,
    report: Option<Result<PathBuf, PersistenceError>>,
    converted: Option<Result<PathBuf, PersistenceError>>,
}

/// Runs a panel of agents concurrently against one project.
pub struct AnalysisOrchestrator {
    index: Arc<dyn IndexProvider>,
    generator: Arc<dyn Generator>,
    catalog: Arc<AgentCatalog>,
    dataroom: DataroomConfig,
    analysis: AnalysisConfig,
    pipe_name: String,
}

impl AnalysisOrchestrator {
    /// Create an orchestrator.
    pub fn new(
        index: Arc<dyn IndexProvider>,
        generator: Arc<dyn Generator>,
        catalog: Arc<AgentCatalog>,
        config: &Config,
    ) -> Self {
        Self {
            index,
            generator,
            catalog,
            dataroom: config.dataroom.clone(),
            analysis: config.analysis.clone(),
            pipe_name: config.pipes.analysis.clone(),
        }
    }

    /// Run catalog agents by name; an empty list runs every registered agent.
    pub async fn run_catalog(
        &self,
        project: &str,
        names: &[String],
        options: RunOptions,
    ) -> AppResult<AnalysisRun> {
        let definitions = self.catalog.resolve(names)?;
        self.run(project, definitions, options).await
    }

    /// Analyze `project` with every definition, one concurrent task per agent.
    ///
    /// Definitions are validated before anything touches the index or disk.
    /// A failing agent never cancels its siblings; it is recorded in
    /// `failures`. Returns `AllAgentsFailed` only if no agent succeeded.
    pub async fn run(
        &self,
        project: &str,
        definitions: Vec<AgentDefinition>,
        options: RunOptions,
    ) -> AppResult<AnalysisRun> {
        validate_definitions(&definitions)?;

        let start = Instant::now();
        let attempted = definitions.len();
        info!(project = %project, agents = attempted, "Analysis run started");

        let retriever = self.index.open_index(project).await?;
        let engine = Arc::new(QueryEngine::new(
            retriever,
            self.generator.clone(),
            &self.pipe_name,
            &self.analysis,
        ));

        let results_dir = self.dataroom.results_dir(project);
        if options.clear_previous {
            if let Err(e) = clear_results(&results_dir).await {
                warn!(project = %project, error = %e, "Failed to clear previous results");
            }
        }

        let permits = Arc::new(Semaphore::new(self.analysis.max_concurrent_agents.max(1)));
        let mut pending: HashSet<String> = HashSet::with_capacity(attempted);
        let mut tasks = JoinSet::new();

        for definition in definitions {
            pending.insert(definition.name.clone());
            let agent = AgentInstance::new(definition, engine.clone());
            let permits = permits.clone();
            let output_dir = results_dir.clone();

            tasks.spawn(async move {
                let name = agent.name().to_string();
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return AgentOutcome {
                            name,
                            result: Err(AppError::Internal {
                                message: format!("worker pool closed: {}", e),
                            }),
                            report: None,
                            converted: None,
                        }
                    }
                };

                let result = agent.analyze().await;
                let (report, converted) = match &result {
                    Ok(analysis) => {
                        let report = write_report(&name, analysis, &output_dir).await;
                        let converted = match (&report, options.convert_reports) {
                            (Ok(path), true) => Some(convert_report(path).await),
                            _ => None,
                        };
                        (Some(report), converted)
                    }
                    Err(_) => (None, None),
                };

                AgentOutcome {
                    name,
                    result,
                    report,
                    converted,
                }
            });
        }

        let mut run = AnalysisRun {
            project: project.to_string(),
            ..Default::default()
        };

        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(project = %project, error = %e, "Agent task aborted");
                    continue;
                }
            };
            pending.remove(&outcome.name);
            self.collect(&mut run, outcome);
        }

        // Tasks that panicked never reported back
        for name in pending {
            run.failures
                .insert(name, "agent task terminated unexpectedly".to_string());
        }

        run.duration_ms = start.elapsed().as_millis() as u64;

        if run.results.is_empty() {
            error!(project = %project, attempted, "All agents failed");
            return Err(AppError::AllAgentsFailed {
                project: project.to_string(),
                attempted,
                failures: run.failures,
            });
        }

        info!(
            project = %project,
            succeeded = run.results.len(),
            failed = run.failures.len(),
            latency_ms = run.duration_ms,
            "Analysis run finished"
        );

        Ok(run)
    }

    fn collect(&self, run: &mut AnalysisRun, outcome: AgentOutcome) {
        let AgentOutcome {
            name,
            result,
            report,
            converted,
        } = outcome;

        match result {
            Ok(analysis) => {
                run.results.insert(name.clone(), analysis);
            }
            Err(e) => {
                warn!(project = %run.project, agent = %name, error = %e, "Agent failed");
                run.failures.insert(name, e.to_string());
                return;
            }
        }

        match report {
            Some(Ok(path)) => {
                run.reports.insert(name.clone(), path);
            }
            Some(Err(e)) => {
                warn!(agent = %name, error = %e, "Report write failed");
                run.persistence_failures.insert(name.clone(), e.to_string());
            }
            None => {}
        }

        match converted {
            Some(Ok(path)) => {
                run.converted.insert(name, path);
            }
            Some(Err(e)) => {
                warn!(agent = %name, error = %e, "Report conversion failed");
                run.persistence_failures.insert(name, e.to_string());
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_options_default() {
        let options = RunOptions::default();
        assert!(options.clear_previous);
        assert!(!options.convert_reports);
    }

    #[test]
    fn test_run_status() {
        let mut run = AnalysisRun::default();
        run.results.insert("A".to_string(), AnalysisResult::new());
        assert_eq!(run.status(), RunStatus::Complete);

        run.failures.insert("B".to_string(), "boom".to_string());
        assert_eq!(run.status(), RunStatus::Partial);
    }

    #[test]
    fn test_run_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RunStatus::Partial).unwrap(),
            "\"partial\""
        );
    }
}
