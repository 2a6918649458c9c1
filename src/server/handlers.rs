use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::SharedState;
use crate::analysis::{clear_results, AnalysisRun, RunOptions, RunStatus};
use crate::catalog::{AgentDefinition, AgentSummary};
use crate::error::{McpError, McpResult};
use crate::index::ProjectInfo;

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        "diligence_run" => handle_diligence_run(state, arguments).await,
        "templates_list" => handle_templates_list(state).await,
        "template_get" => handle_template_get(state, arguments).await,
        "project_ingest" => handle_project_ingest(state, arguments).await,
        "project_delete" => handle_project_delete(state, arguments).await,
        "project_list" => handle_project_list(state).await,
        "chat_open" => handle_chat_open(state, arguments).await,
        "chat_turn" => handle_chat_turn(state, arguments).await,
        "chat_close" => handle_chat_close(state, arguments).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

// ============================================================================
// Diligence
// ============================================================================

#[derive(Debug, Deserialize)]
struct DiligenceRunParams {
    project_name: String,
    #[serde(default)]
    agents: Option<Vec<AgentDefinition>>,
    #[serde(default)]
    agent_names: Vec<String>,
    #[serde(default)]
    convert_reports: bool,
}

/// Response for diligence_run
#[derive(Debug, Serialize)]
pub struct DiligenceRunResponse {
    pub status: RunStatus,
    #[serde(flatten)]
    pub run: AnalysisRun,
}

async fn handle_diligence_run(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: DiligenceRunParams = parse_arguments("diligence_run", arguments)?;
    validate_project_name("diligence_run", &params.project_name)?;

    let options = RunOptions {
        convert_reports: params.convert_reports,
        ..RunOptions::default()
    };

    let run = match params.agents {
        Some(agents) => {
            state
                .orchestrator
                .run(&params.project_name, agents, options)
                .await?
        }
        None => {
            state
                .orchestrator
                .run_catalog(&params.project_name, &params.agent_names, options)
                .await?
        }
    };

    let response = DiligenceRunResponse {
        status: run.status(),
        run,
    };
    serde_json::to_value(response).map_err(McpError::Json)
}

// ============================================================================
// Templates
// ============================================================================

/// Response for templates_list
#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<AgentDefinition>,
    pub summaries: Vec<AgentSummary>,
    pub count: usize,
}

async fn handle_templates_list(state: &SharedState) -> McpResult<Value> {
    let templates = state.catalog.definitions();
    let response = TemplateListResponse {
        summaries: state.catalog.list(),
        count: templates.len(),
        templates,
    };
    serde_json::to_value(response).map_err(McpError::Json)
}

#[derive(Debug, Deserialize)]
struct TemplateGetParams {
    name: String,
}

async fn handle_template_get(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("template_get", arguments, |params: TemplateGetParams| async move {
        state.catalog.require(&params.name)
    })
    .await
}

// ============================================================================
// Projects
// ============================================================================

#[derive(Debug, Deserialize)]
struct ProjectParams {
    project_name: String,
}

async fn handle_project_ingest(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: ProjectParams = parse_arguments("project_ingest", arguments)?;
    validate_project_name("project_ingest", &params.project_name)?;

    let source_dir = state.config.dataroom.project_dir(&params.project_name);
    let report = state
        .index
        .ingest(&params.project_name, &source_dir)
        .await
        .map_err(|e| McpError::ExecutionFailed {
            message: e.to_string(),
        })?;

    serde_json::to_value(report).map_err(McpError::Json)
}

/// Response for project_delete
#[derive(Debug, Serialize)]
pub struct ProjectDeleteResponse {
    pub project: String,
    /// Whether the project had an index.
    pub existed: bool,
    pub reports_removed: usize,
}

async fn handle_project_delete(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: ProjectParams = parse_arguments("project_delete", arguments)?;
    validate_project_name("project_delete", &params.project_name)?;

    let existed = state
        .index
        .drop_project(&params.project_name)
        .await
        .map_err(|e| McpError::ExecutionFailed {
            message: e.to_string(),
        })?;

    let results_dir = state.config.dataroom.results_dir(&params.project_name);
    let reports_removed =
        clear_results(&results_dir)
            .await
            .map_err(|e| McpError::ExecutionFailed {
                message: e.to_string(),
            })?;

    let response = ProjectDeleteResponse {
        project: params.project_name,
        existed,
        reports_removed,
    };
    serde_json::to_value(response).map_err(McpError::Json)
}

/// Response for project_list
#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectInfo>,
    pub count: usize,
}

async fn handle_project_list(state: &SharedState) -> McpResult<Value> {
    let projects = state
        .index
        .list_projects()
        .await
        .map_err(|e| McpError::ExecutionFailed {
            message: e.to_string(),
        })?;

    let response = ProjectListResponse {
        count: projects.len(),
        projects,
    };
    serde_json::to_value(response).map_err(McpError::Json)
}

// ============================================================================
// Chat
// ============================================================================

/// Response for chat_open
#[derive(Debug, Serialize)]
pub struct ChatOpenResponse {
    pub session_id: String,
    pub project: String,
}

async fn handle_chat_open(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: ProjectParams = parse_arguments("chat_open", arguments)?;
    validate_project_name("chat_open", &params.project_name)?;

    let session_id = state.sessions.open(&params.project_name).await?;

    let response = ChatOpenResponse {
        session_id,
        project: params.project_name,
    };
    serde_json::to_value(response).map_err(McpError::Json)
}

#[derive(Debug, Deserialize)]
struct ChatTurnParams {
    session_id: String,
    message: String,
    #[serde(default)]
    context: Option<String>,
}

async fn handle_chat_turn(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler("chat_turn", arguments, |params: ChatTurnParams| async move {
        state
            .sessions
            .turn(&params.session_id, &params.message, params.context.as_deref())
            .await
    })
    .await
}

#[derive(Debug, Deserialize)]
struct ChatCloseParams {
    session_id: String,
}

async fn handle_chat_close(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: ChatCloseParams = parse_arguments("chat_close", arguments)?;
    state.sessions.close(&params.session_id).await?;

    Ok(serde_json::json!({
        "session_id": params.session_id,
        "closed": true
    }))
}

// ============================================================================
// Helper functions
// ============================================================================

/// Helper to parse arguments with consistent error handling
fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}

/// Project names become directory names under the dataroom root.
fn validate_project_name(tool_name: &str, project: &str) -> McpResult<()> {
    let valid = !project.trim().is_empty()
        && !project.contains(['/', '\\'])
        && project != "."
        && project != "..";

    if valid {
        Ok(())
    } else {
        Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: format!("Invalid project name: '{}'", project),
        })
    }
}

/// Parse arguments, run `operation`, and serialize its result.
async fn execute_handler<P, R, E, F, Fut>(
    tool_name: &str,
    arguments: Option<Value>,
    operation: F,
) -> McpResult<Value>
where
    P: serde::de::DeserializeOwned,
    R: Serialize,
    E: std::fmt::Display,
    F: FnOnce(P) -> Fut,
    Fut: std::future::Future<Output = Result<R, E>>,
{
    let params: P = parse_arguments(tool_name, arguments)?;

    let result = operation(params)
        .await
        .map_err(|e| McpError::ExecutionFailed {
            message: e.to_string(),
        })?;

    serde_json::to_value(result).map_err(McpError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestParams {
        content: String,
        value: i32,
    }

    #[test]
    fn test_parse_arguments_success() {
        let args = Some(json!({
            "content": "test content",
            "value": 42
        }));

        let params: TestParams = parse_arguments("test.tool", args).unwrap();
        assert_eq!(params.content, "test content");
        assert_eq!(params.value, 42);
    }

    #[test]
    fn test_parse_arguments_missing_arguments() {
        let result: McpResult<TestParams> = parse_arguments("test.tool", None);

        let err = result.unwrap_err();
        assert!(matches!(err, McpError::InvalidParameters { .. }));
        assert!(err.to_string().contains("Missing arguments"));
        assert!(err.to_string().contains("test.tool"));
    }

    #[test]
    fn test_parse_arguments_wrong_type() {
        let args = Some(json!({
            "content": "test",
            "value": "not a number"
        }));

        let result: McpResult<TestParams> = parse_arguments("test.tool", args);
        assert!(matches!(result, Err(McpError::InvalidParameters { .. })));
    }

    #[test]
    fn test_parse_diligence_params_defaults() {
        let params: DiligenceRunParams =
            parse_arguments("diligence_run", Some(json!({"project_name": "acme"}))).unwrap();

        assert_eq!(params.project_name, "acme");
        assert!(params.agents.is_none());
        assert!(params.agent_names.is_empty());
        assert!(!params.convert_reports);
    }

    #[test]
    fn test_parse_diligence_params_with_agents() {
        let params: DiligenceRunParams = parse_arguments(
            "diligence_run",
            Some(json!({
                "project_name": "acme",
                "agents": [{
                    "name": "Screening",
                    "sections": [{"name": "exec_summary", "description": "Summarize the pitch"}]
                }],
                "convert_reports": true
            })),
        )
        .unwrap();

        let agents = params.agents.unwrap();
        assert_eq!(agents[0].name, "Screening");
        assert!(params.convert_reports);
    }

    #[test]
    fn test_parse_chat_turn_params() {
        let params: ChatTurnParams = parse_arguments(
            "chat_turn",
            Some(json!({"session_id": "s1", "message": "Hi"})),
        )
        .unwrap();
        assert!(params.context.is_none());
    }

    #[test]
    fn test_validate_project_name() {
        assert!(validate_project_name("t", "acme").is_ok());
        assert!(validate_project_name("t", "Acme Solar 2024").is_ok());
        assert!(validate_project_name("t", "").is_err());
        assert!(validate_project_name("t", "..").is_err());
        assert!(validate_project_name("t", "a/b").is_err());
    }
}
