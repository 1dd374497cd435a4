//! MCP server implementation for CATIA V5 automation.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: Capability negotiation and version agreement
//! 2. **Operation**: Handling tool calls and other requests
//! 3. **Shutdown**: Graceful connection termination
//!
//! # Architecture
//!
//! The server validates tool arguments and paths, then hands an
//! [`Operation`] to its [`CatiaBackend`]. Automation failures are reported as
//! tool results with `isError: true` so the client can show them to the
//! model; JSON-RPC errors are reserved for protocol problems.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::catia::{self, CatiaBackend, CatiaError, Operation};
use crate::mcp::protocol::{
    negotiate_version, parse_message, ErrorCode, IncomingMessage, JsonRpcError,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, OutgoingMessage, RequestId, SERVER_NAME,
};
use crate::mcp::transport::LineTransport;

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: &'static str,
    /// Server version.
    pub version: &'static str,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

const INSTRUCTIONS: &str = "Tools drive a running CATIA V5 session on this Windows host. \
    Sketch, pad, pocket and rectangle tools act on the first body of the active Part \
    document; pad, pocket and rectangle use the most recently created sketch. \
    Lengths are in millimetres.";

/// The MCP server for CATIA V5 automation.
pub struct McpServer<B> {
    /// Current server state.
    state: ServerState,
    /// The transport layer.
    transport: LineTransport,
    /// Negotiated protocol version (set after initialisation).
    protocol_version: Option<&'static str>,
    /// Automation backend.
    backend: B,
    /// Directories that document and macro paths must live under.
    allowed_paths: Vec<PathBuf>,
}

impl<B: CatiaBackend> McpServer<B> {
    /// Creates a new MCP server.
    ///
    /// An empty `allowed_paths` leaves file paths unrestricted.
    #[must_use]
    pub const fn new(transport: LineTransport, backend: B, allowed_paths: Vec<PathBuf>) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            transport,
            protocol_version: None,
            backend,
            allowed_paths,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Returns the negotiated protocol version, once initialised.
    #[must_use]
    pub const fn protocol_version(&self) -> Option<&'static str> {
        self.protocol_version
    }

    /// Validates that a path is within one of the allowed paths.
    ///
    /// Returns `Ok(())` if the path is allowed, or an error message if not.
    fn validate_path(&self, filepath: &str) -> Result<(), String> {
        if self.allowed_paths.is_empty() {
            return Ok(());
        }

        let path = Path::new(filepath);

        // Targets of "save as" may not exist yet; resolve their parent instead.
        let canonical_path = if path.exists() {
            path.canonicalize()
                .map_err(|e| format!("Failed to resolve path '{}': {e}", path.display()))?
        } else {
            let parent = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .ok_or_else(|| format!("Invalid path '{}': no parent directory", path.display()))?;
            let filename = path
                .file_name()
                .ok_or_else(|| format!("Invalid path '{}': no filename specified", path.display()))?;
            let canonical_parent = parent.canonicalize().map_err(|e| {
                format!(
                    "Parent directory '{}' does not exist or is inaccessible: {e}",
                    parent.display()
                )
            })?;
            canonical_parent.join(filename)
        };

        let allowed = self.allowed_paths.iter().any(|allowed| {
            allowed
                .canonicalize()
                .is_ok_and(|root| canonical_path.starts_with(root))
        });

        if allowed {
            Ok(())
        } else {
            Err("Access denied: path is outside the configured allowed directories".to_string())
        }
    }

    /// Runs the MCP server main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if signal registration or transport I/O fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                signal = &mut shutdown => {
                    let signal = signal?;
                    tracing::info!(signal, "Received signal, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        line_result: std::io::Result<Option<String>>,
    ) -> std::io::Result<bool> {
        let Some(line) = line_result? else {
            tracing::info!("Client closed the connection");
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        if let Some(reply) = self.handle_line(&line).await {
            self.transport.send(&reply).await?;
        }

        Ok(self.state == ServerState::ShuttingDown)
    }

    /// Handles a single line of input and returns the reply, if any.
    ///
    /// Notifications produce no reply.
    pub async fn handle_line(&mut self, line: &str) -> Option<OutgoingMessage> {
        match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => Some(self.handle_request(req).await),
            Ok(IncomingMessage::Notification(notif)) => {
                self.handle_notification(&notif);
                None
            }
            Err(error) => {
                tracing::warn!(code = error.error.code, message = %error.error.message, "Rejected message");
                Some(error.into())
            }
        }
    }

    /// Handles an incoming request.
    async fn handle_request(&mut self, req: JsonRpcRequest) -> OutgoingMessage {
        tracing::debug!(id = %req.id, method = %req.method, "Request received");

        let response = match req.method.as_str() {
            "initialize" => self.handle_initialize(&req),
            "ping" => Ok(JsonRpcResponse::success(req.id.clone(), json!({}))),
            "tools/list" => self.handle_tools_list(&req),
            "tools/call" => self.handle_tools_call(&req).await,
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        match response {
            Ok(resp) => resp.into(),
            Err(error) => error.into(),
        }
    }

    /// Handles an incoming notification.
    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" if self.state == ServerState::Initialising => {
                tracing::info!("Client initialised, server running");
                self.state = ServerState::Running;
            }
            method => tracing::debug!(method, "Ignoring notification"),
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::invalid_request(
                Some(req.id.clone()),
                "Server already initialised",
            ));
        }

        let params: InitializeParams = req.parse_params()?;
        let negotiated_version = negotiate_version(&params.protocol_version);

        if let Some(client) = &params.client_info {
            tracing::info!(
                client = %client.name,
                client_version = client.version.as_deref().unwrap_or("unknown"),
                requested = %params.protocol_version,
                negotiated = negotiated_version,
                "Initialising session"
            );
        }

        self.protocol_version = Some(negotiated_version);
        self.state = ServerState::Initialising;

        let result = json!({
            "protocolVersion": negotiated_version,
            "capabilities": ServerCapabilities {
                tools: ToolCapabilities::default(),
            },
            "serverInfo": ServerInfo::default(),
            "instructions": INSTRUCTIONS,
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "tools": tool_definitions() }),
        ))
    }

    /// Handles the tools/call request.
    async fn handle_tools_call(
        &self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ToolCallParams = req.parse_params()?;
        let result = self.call_tool(&params.name, &params.arguments).await;

        let result_value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(
                req.id.clone(),
                "Internal error: failed to serialise result",
            )
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), result_value))
    }

    /// Validates a tool call and runs it against the backend.
    async fn call_tool(&self, name: &str, arguments: &Value) -> ToolCallResult {
        let empty = json!({});
        let arguments = if arguments.is_null() { &empty } else { arguments };

        let op = match Operation::from_tool_call(name, arguments) {
            Ok(op) => op,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Rejected tool call");
                return ToolCallResult::error(e.to_string());
            }
        };

        for path in op.file_paths() {
            if let Err(e) = self.validate_path(path) {
                tracing::warn!(tool = name, "Rejected path outside allowed directories");
                return ToolCallResult::error(e);
            }
        }

        tracing::info!(tool = name, "Calling CATIA");

        match catia::perform(&self.backend, &op).await {
            Ok(output) => ToolCallResult::text(output.into_text()),
            Err(e) => {
                match &e {
                    CatiaError::AutomationUnavailable { .. } => {
                        tracing::error!(tool = name, error = %e, "Automation unavailable");
                    }
                    _ => tracing::warn!(tool = name, error = %e, "Tool call failed"),
                }
                ToolCallResult::error(e.to_string())
            }
        }
    }

    /// Ensures the server is in the Running state.
    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::new(
                Some(id.clone()),
                ErrorCode::InvalidRequest,
                "Server not initialised",
            ));
        }
        Ok(())
    }
}

/// Resolves with the signal name once SIGINT or SIGTERM arrives.
///
/// Handlers are installed on first poll.
///
/// # Errors
///
/// Returns an error if the handlers cannot be installed.
#[cfg(unix)]
pub async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => Ok("SIGINT"),
        _ = sigterm.recv() => Ok("SIGTERM"),
    }
}

/// Resolves once Ctrl+C arrives.
///
/// # Errors
///
/// Returns an error if the handler cannot be installed.
#[cfg(windows)]
pub async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "Ctrl+C")
}

fn no_arguments() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn name_argument(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string", "description": description }
        },
        "required": ["name"]
    })
}

fn positive_number_argument(key: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            key: { "type": "number", "exclusiveMinimum": 0, "description": description }
        },
        "required": [key]
    })
}

/// Returns the list of available tools.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        // === Session ===
        ToolDefinition {
            name: "get_catia_info",
            description: "Get CATIA application information: version, release, service pack, \
                          window caption, executable path and whether the window is visible.",
            input_schema: no_arguments(),
        },
        // === Documents ===
        ToolDefinition {
            name: "list_documents",
            description: "List all open documents with their name, full path and type \
                          (CATPart, CATProduct, CATDrawing, ...).",
            input_schema: no_arguments(),
        },
        ToolDefinition {
            name: "get_active_document",
            description: "Get the active document's name, path and saved state. \
                          Reports when no document is open.",
            input_schema: no_arguments(),
        },
        ToolDefinition {
            name: "create_part",
            description: "Create a new Part document and set its part number.",
            input_schema: name_argument("Part number for the new part"),
        },
        ToolDefinition {
            name: "create_product",
            description: "Create a new Product (assembly) document and set its part number.",
            input_schema: name_argument("Part number for the new product"),
        },
        ToolDefinition {
            name: "create_drawing",
            description: "Create a new Drawing document.",
            input_schema: name_argument("Label for the new drawing"),
        },
        ToolDefinition {
            name: "open_document",
            description: "Open a CATIA document from disk.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "file_path": { "type": "string", "description": "Path to the document" }
                },
                "required": ["file_path"]
            }),
        },
        ToolDefinition {
            name: "save_document",
            description: "Save the active document. With file_path, saves a copy under that \
                          path (Save As); otherwise saves in place.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Optional: target path for Save As"
                    }
                }
            }),
        },
        ToolDefinition {
            name: "close_document",
            description: "Close an open document by name (e.g. 'Part1.CATPart'). \
                          Unsaved changes are discarded.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "document_name": {
                        "type": "string",
                        "description": "Document name as returned by list_documents"
                    }
                },
                "required": ["document_name"]
            }),
        },
        // === Part Design ===
        ToolDefinition {
            name: "create_sketch",
            description: "Create a sketch on an origin plane in the first body of the active part.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "plane": {
                        "type": "string",
                        "enum": ["xy", "yz", "zx"],
                        "description": "Support plane"
                    },
                    "name": { "type": "string", "description": "Optional: sketch name" }
                },
                "required": ["plane"]
            }),
        },
        ToolDefinition {
            name: "create_rectangle",
            description: "Draw a closed rectangle profile in the most recent sketch of the \
                          first body. Coordinates and sizes are in millimetres.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "x": { "type": "number", "description": "Reference X in mm" },
                    "y": { "type": "number", "description": "Reference Y in mm" },
                    "width": { "type": "number", "exclusiveMinimum": 0, "description": "Width in mm" },
                    "height": { "type": "number", "exclusiveMinimum": 0, "description": "Height in mm" },
                    "centered": {
                        "type": "boolean",
                        "description": "Whether (x, y) is the centre (default) or the bottom-left corner"
                    }
                },
                "required": ["x", "y", "width", "height"]
            }),
        },
        ToolDefinition {
            name: "create_pad",
            description: "Extrude the most recent sketch of the first body into a pad and \
                          update the part.",
            input_schema: positive_number_argument("length", "Pad length in mm"),
        },
        ToolDefinition {
            name: "create_pocket",
            description: "Cut a pocket from the most recent sketch of the first body and \
                          update the part.",
            input_schema: positive_number_argument("depth", "Pocket depth in mm"),
        },
        ToolDefinition {
            name: "get_part_bodies",
            description: "List the bodies of the active part.",
            input_schema: no_arguments(),
        },
        ToolDefinition {
            name: "update_part",
            description: "Update (rebuild) the active part.",
            input_schema: no_arguments(),
        },
        // === Macros ===
        ToolDefinition {
            name: "execute_macro",
            description: "Run a function from a CATIA macro library.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "macro_path": {
                        "type": "string",
                        "description": "Macro library: a directory, CATIA document or VBA project"
                    },
                    "module_name": {
                        "type": "string",
                        "description": "Module (file) within the library, e.g. 'Tools.catvbs'"
                    },
                    "function_name": {
                        "type": "string",
                        "description": "Function to call, e.g. 'CATMain'"
                    },
                    "library_type": {
                        "type": "string",
                        "enum": ["directory", "document", "vba_project"],
                        "description": "Optional: kind of macro library (default: directory)"
                    }
                },
                "required": ["macro_path", "module_name", "function_name"]
            }),
        },
    ]
}
