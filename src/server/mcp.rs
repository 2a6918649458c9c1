//! MCP protocol implementation for JSON-RPC 2.0 communication.
//!
//! This module provides:
//! - JSON-RPC 2.0 request/response types
//! - Tool definitions and schemas for the diligence, project and chat tools
//! - The line-delimited server loop (stdio in production, any async stream in tests)

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::{handle_tool_call, SharedState};

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod mcp_tests;

/// MCP protocol revision implemented by this server.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request identifier (None for notifications).
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    /// Request identifier; null when the request id could not be read.
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// MCP server information returned during initialization.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// MCP server capabilities advertised to clients.
#[derive(Debug, Serialize)]
pub struct Capabilities {
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change dynamically.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Result of the MCP initialize handshake.
#[derive(Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: Capabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// MCP tool definition with JSON Schema.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Parameters for a tools/call request.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Content item within a tool result.
#[derive(Debug, Serialize)]
pub struct ToolResultContent {
    /// The content type (always "text" here).
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// Result of a tool invocation.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolResultContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// MCP server speaking line-delimited JSON-RPC.
#[derive(Clone)]
pub struct McpServer {
    state: SharedState,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Serve over stdin/stdout until EOF.
    pub async fn run(&self) -> std::io::Result<()> {
        info!("Dataroom diligence MCP server starting...");
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.serve(reader, writer).await
    }

    /// Serve requests read line by line from `reader`, writing responses to `writer`.
    ///
    /// `tools/call` requests run concurrently, each in its own task, and
    /// their responses are written as they complete. Every other method is
    /// answered in arrival order. On EOF in-flight calls are finished and
    /// answered, then every live chat session is closed.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let mut in_flight = JoinSet::new();
        let mut lines = reader.lines();

        loop {
            tokio::select! {
                Some(response) = rx.recv() => {
                    write_response(&mut writer, &response).await?;
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Tool call task aborted");
                    }
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("EOF received, shutting down");
                        break;
                    };
                    self.dispatch(line.trim(), &tx, &mut in_flight).await;
                }
            }
        }

        if !in_flight.is_empty() {
            debug!(pending = in_flight.len(), "Waiting for in-flight tool calls");
        }
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Tool call task aborted");
            }
        }
        drop(tx);
        while let Some(response) = rx.recv().await {
            write_response(&mut writer, &response).await?;
        }

        self.state.sessions.close_all().await;
        Ok(())
    }

    /// Parse one line and answer it, inline or on a spawned task.
    async fn dispatch(
        &self,
        line: &str,
        tx: &mpsc::UnboundedSender<JsonRpcResponse>,
        in_flight: &mut JoinSet<()>,
    ) {
        if line.is_empty() {
            return;
        }
        debug!(request = %line, "Received request");

        let request = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, "Failed to parse request");
                send(
                    tx,
                    Some(JsonRpcResponse::error(
                        None,
                        -32700,
                        format!("Parse error: {}", e),
                    )),
                );
                return;
            }
        };

        if request.method == "tools/call" {
            let server = self.clone();
            let tx = tx.clone();
            in_flight.spawn(async move {
                send(&tx, server.handle_request(request).await);
            });
        } else {
            send(tx, self.handle_request(request).await);
        }
    }

    /// Handle a single JSON-RPC request; `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let is_notification = request.id.is_none();

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(request.id)),
            "initialized" | "notifications/initialized" | "notifications/cancelled" => {
                debug!(method = %request.method, "Received notification");
                None
            }
            "tools/list" => Some(self.handle_tools_list(request.id)),
            "tools/call" => Some(self.handle_tool_call(request.id, request.params).await),
            "ping" => Some(JsonRpcResponse::success(
                request.id,
                Value::Object(Default::default()),
            )),
            method => {
                if is_notification {
                    debug!(method = %method, "Unknown notification, ignoring");
                    None
                } else {
                    error!(method = %method, "Unknown method");
                    Some(JsonRpcResponse::error(
                        request.id,
                        -32601,
                        format!("Method not found: {}", method),
                    ))
                }
            }
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling initialize request");

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: Capabilities {
                tools: ToolCapabilities {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize initialize result");
                JsonRpcResponse::error(id, -32603, format!("Internal error: {}", e))
            }
        }
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        debug!("Handling tools/list request");
        JsonRpcResponse::success(id, json!({ "tools": tool_definitions() }))
    }

    async fn handle_tool_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(id, -32602, format!("Invalid params: {}", e));
                }
            },
            None => {
                return JsonRpcResponse::error(id, -32602, "Missing params");
            }
        };

        info!(tool = %params.name, "Handling tool call");

        let (text, is_error) =
            match handle_tool_call(&self.state, &params.name, params.arguments).await {
                Ok(result) => {
                    let text = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
                        error!(error = %e, "Failed to serialize tool result");
                        format!("{{\"error\": \"Serialization failed: {}\"}}", e)
                    });
                    (text, None)
                }
                Err(e) => (format!("Error: {}", e), Some(true)),
            };

        let tool_result = ToolCallResult {
            content: vec![ToolResultContent {
                content_type: "text".to_string(),
                text,
            }],
            is_error,
        };

        match serde_json::to_value(tool_result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize tool call result");
                JsonRpcResponse::error(id, -32603, format!("Internal error: {}", e))
            }
        }
    }
}

/// Queue a response for writing; notifications have none.
fn send(tx: &mpsc::UnboundedSender<JsonRpcResponse>, response: Option<JsonRpcResponse>) {
    if let Some(response) = response {
        if tx.send(response).is_err() {
            warn!("Response dropped, writer has stopped");
        }
    }
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let response_json = serde_json::to_string(response)?;
    debug!(response = %response_json, "Sending response");

    writer.write_all(response_json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Every tool the server exposes, in listing order.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        get_diligence_run_tool(),
        get_templates_list_tool(),
        get_template_get_tool(),
        get_project_ingest_tool(),
        get_project_delete_tool(),
        get_project_list_tool(),
        get_chat_open_tool(),
        get_chat_turn_tool(),
        get_chat_close_tool(),
    ]
}

fn project_name_schema() -> Value {
    json!({
        "type": "string",
        "minLength": 1,
        "description": "Project (dataroom) name; its documents live in <DATAROOM_PATH>/<project_name>"
    })
}

fn get_diligence_run_tool() -> Tool {
    Tool {
        name: "diligence_run".to_string(),
        description: "Run due-diligence agents concurrently against an ingested project. Each agent answers its sections in order and writes <agent>.md to the project's results directory. Succeeds if at least one agent succeeds.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "project_name": project_name_schema(),
                "agents": {
                    "type": "array",
                    "description": "Custom agent definitions; overrides agent_names",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "sections": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "name": { "type": "string" },
                                        "description": { "type": "string" }
                                    },
                                    "required": ["name", "description"]
                                }
                            }
                        },
                        "required": ["name", "sections"]
                    }
                },
                "agent_names": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Built-in agents to run (default: all)"
                },
                "convert_reports": {
                    "type": "boolean",
                    "description": "Also write a Word (.docx) copy of each report (default: false)"
                }
            },
            "required": ["project_name"],
            "additionalProperties": false
        }),
    }
}

fn get_templates_list_tool() -> Tool {
    Tool {
        name: "templates_list".to_string(),
        description: "List the available analysis templates with their sections.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
    }
}

fn get_template_get_tool() -> Tool {
    Tool {
        name: "template_get".to_string(),
        description: "Get one analysis template by name.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Template name, e.g. \"Financial Review\"" }
            },
            "required": ["name"],
            "additionalProperties": false
        }),
    }
}

fn get_project_ingest_tool() -> Tool {
    Tool {
        name: "project_ingest".to_string(),
        description: "Index (or fully re-index) the documents of a project.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": { "project_name": project_name_schema() },
            "required": ["project_name"],
            "additionalProperties": false
        }),
    }
}

fn get_project_delete_tool() -> Tool {
    Tool {
        name: "project_delete".to_string(),
        description: "Irreversibly drop a project's index and clear its results directory.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": { "project_name": project_name_schema() },
            "required": ["project_name"],
            "additionalProperties": false
        }),
    }
}

fn get_project_list_tool() -> Tool {
    Tool {
        name: "project_list".to_string(),
        description: "List ingested projects.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
    }
}

fn get_chat_open_tool() -> Tool {
    Tool {
        name: "chat_open".to_string(),
        description: "Open a conversation over an ingested project. Returns a session_id for chat_turn and chat_close.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": { "project_name": project_name_schema() },
            "required": ["project_name"],
            "additionalProperties": false
        }),
    }
}

fn get_chat_turn_tool() -> Tool {
    Tool {
        name: "chat_turn".to_string(),
        description: "Send a message in an open conversation. Returns the answer and the source passages it was grounded on.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" },
                "message": { "type": "string", "minLength": 1 },
                "context": {
                    "type": "string",
                    "description": "Optional source material appended to the message"
                }
            },
            "required": ["session_id", "message"],
            "additionalProperties": false
        }),
    }
}

fn get_chat_close_tool() -> Tool {
    Tool {
        name: "chat_close".to_string(),
        description: "Close a conversation and discard its memory.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": { "session_id": { "type": "string" } },
            "required": ["session_id"],
            "additionalProperties": false
        }),
    }
}
