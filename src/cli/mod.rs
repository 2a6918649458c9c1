//! Command-line interface.
//!
//! Without a subcommand the binary serves MCP over stdio. The remaining
//! subcommands run one operation against the configured dataroom and exit.

use clap::{Parser, Subcommand};

use crate::analysis::{clear_results, RunOptions};
use crate::server::AppState;

/// Dataroom due-diligence analysis and chat.
#[derive(Parser, Debug)]
#[command(name = "dataroom-diligence", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The requested command, defaulting to `serve`.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Serve MCP over stdio (default)
    Serve,

    /// Index (or re-index) a project's documents
    Ingest {
        /// Project directory name under DATAROOM_PATH
        project: String,
    },

    /// Run analysis agents against an ingested project
    Analyze {
        /// Project directory name under DATAROOM_PATH
        project: String,

        /// Agent to run; repeat for several (default: all built-in agents)
        #[arg(long = "agent")]
        agents: Vec<String>,

        /// Also write Word copies of the reports
        #[arg(long)]
        convert: bool,

        /// Keep reports from earlier runs
        #[arg(long)]
        keep_previous: bool,
    },

    /// List analysis templates
    Templates,

    /// List ingested projects
    Projects,

    /// Drop a project's index and its reports
    Delete {
        project: String,
    },
}

impl Commands {
    /// Whether the command calls the generation pipes.
    pub fn needs_generation(&self) -> bool {
        matches!(self, Commands::Serve | Commands::Analyze { .. })
    }
}

/// Result of CLI command execution.
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

/// Execute a one-shot command. `Serve` is handled by the binary.
pub async fn execute_command(command: Commands, state: &AppState) -> CliResult {
    match command {
        Commands::Serve => CliResult::error("serve is not a one-shot command"),
        Commands::Ingest { project } => execute_ingest(state, &project).await,
        Commands::Analyze {
            project,
            agents,
            convert,
            keep_previous,
        } => {
            let options = RunOptions {
                clear_previous: !keep_previous,
                convert_reports: convert,
            };
            execute_analyze(state, &project, &agents, options).await
        }
        Commands::Templates => execute_templates(state),
        Commands::Projects => execute_projects(state).await,
        Commands::Delete { project } => execute_delete(state, &project).await,
    }
}

async fn execute_ingest(state: &AppState, project: &str) -> CliResult {
    let source_dir = state.config.dataroom.project_dir(project);
    match state.index.ingest(project, &source_dir).await {
        Ok(report) => {
            let mut output = format!(
                "Ingested '{}': {} documents, {} passages\n",
                report.project, report.documents, report.passages
            );
            for skipped in &report.skipped {
                output.push_str(&format!("  skipped: {}\n", skipped));
            }
            CliResult::success(output)
        }
        Err(e) => CliResult::error(format!("Ingestion failed: {}", e)),
    }
}

async fn execute_analyze(
    state: &AppState,
    project: &str,
    agents: &[String],
    options: RunOptions,
) -> CliResult {
    let run = match state.orchestrator.run_catalog(project, agents, options).await {
        Ok(run) => run,
        Err(e) => return CliResult::error(format!("Analysis failed: {}", e)),
    };

    let mut output = format!(
        "Analysis of '{}' finished ({:?}, {} ms)\n",
        project,
        run.status(),
        run.duration_ms
    );
    for (agent, path) in &run.reports {
        output.push_str(&format!("  {:<24} {}\n", agent, path.display()));
    }
    for (agent, path) in &run.converted {
        output.push_str(&format!("  {:<24} {}\n", agent, path.display()));
    }
    for (agent, err) in &run.failures {
        output.push_str(&format!("  {:<24} FAILED: {}\n", agent, err));
    }
    for (agent, err) in &run.persistence_failures {
        output.push_str(&format!("  {:<24} NOT WRITTEN: {}\n", agent, err));
    }

    CliResult::success(output)
}

fn execute_templates(state: &AppState) -> CliResult {
    let mut output = String::new();
    for template in state.catalog.definitions() {
        output.push_str(&format!("{}\n", template.name));
        for section in &template.sections {
            output.push_str(&format!("  - {}\n", section.name));
        }
    }
    CliResult::success(output)
}

async fn execute_projects(state: &AppState) -> CliResult {
    match state.index.list_projects().await {
        Ok(projects) if projects.is_empty() => CliResult::success("No projects ingested\n"),
        Ok(projects) => {
            let mut output = String::new();
            for p in projects {
                output.push_str(&format!(
                    "{:<24} {:>4} docs {:>6} passages  {}\n",
                    p.name,
                    p.document_count,
                    p.passage_count,
                    p.ingested_at.format("%Y-%m-%d %H:%M:%S")
                ));
            }
            CliResult::success(output)
        }
        Err(e) => CliResult::error(format!("Failed to list projects: {}", e)),
    }
}

async fn execute_delete(state: &AppState, project: &str) -> CliResult {
    let existed = match state.index.drop_project(project).await {
        Ok(existed) => existed,
        Err(e) => return CliResult::error(format!("Failed to drop project: {}", e)),
    };

    match clear_results(&state.config.dataroom.results_dir(project)).await {
        Ok(removed) if existed => CliResult::success(format!(
            "Dropped '{}' and removed {} report files\n",
            project, removed
        )),
        Ok(_) => CliResult::success(format!("Project '{}' was not indexed\n", project)),
        Err(e) => CliResult::error(format!("Dropped index but failed to clear reports: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_serve() {
        let cli = Cli::try_parse_from(["dataroom-diligence"]).unwrap();
        assert_eq!(cli.command(), Commands::Serve);
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from([
            "dataroom-diligence",
            "analyze",
            "acme",
            "--agent",
            "Financial Review",
            "--agent",
            "Market Analysis",
            "--convert",
        ])
        .unwrap();

        assert_eq!(
            cli.command(),
            Commands::Analyze {
                project: "acme".to_string(),
                agents: vec!["Financial Review".to_string(), "Market Analysis".to_string()],
                convert: true,
                keep_previous: false,
            }
        );
        assert!(cli.command().needs_generation());
    }

    #[test]
    fn test_parse_ingest() {
        let cli = Cli::try_parse_from(["dataroom-diligence", "ingest", "acme"]).unwrap();
        let command = cli.command();
        assert!(!command.needs_generation());
        assert_eq!(
            command,
            Commands::Ingest {
                project: "acme".to_string()
            }
        );
    }

    #[test]
    fn test_cli_result() {
        assert_eq!(CliResult::success("ok").exit_code, 0);
        assert_eq!(CliResult::error("no").exit_code, 1);
    }
}
