//! JSON-RPC 2.0 message types for MCP protocol.
//!
//! Incoming lines are classified as requests (carry an `id`) or
//! notifications (no `id`). Everything the server writes back is an
//! [`OutgoingMessage`]: a success response or an error response.
//!
//! # MCP-Specific Constraints
//!
//! - Request IDs must be strings or integers (never `null`)
//! - Messages are single-line JSON

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol versions this server can speak, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-03-26", "2024-11-05"];

/// The newest protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = SUPPORTED_PROTOCOL_VERSIONS[0];

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "catia-v5-mcp";

/// Picks the protocol version to answer a client with.
///
/// The client's version is echoed when supported; otherwise the newest
/// supported version is offered and the client decides whether to proceed.
#[must_use]
pub fn negotiate_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .find(|v| **v == requested)
        .copied()
        .unwrap_or(MCP_PROTOCOL_VERSION)
}

/// A JSON-RPC 2.0 request ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// A JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Unique request identifier.
    pub id: RequestId,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Deserialises the request parameters into `T`.
    ///
    /// Missing parameters are treated as an empty object so that methods
    /// whose parameters are all optional accept a bare request.
    ///
    /// # Errors
    ///
    /// Returns an invalid-params error naming the method.
    pub fn parse_params<T: serde::de::DeserializeOwned>(&self) -> Result<T, JsonRpcError> {
        let params = self
            .params
            .clone()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        serde_json::from_value(params).map_err(|e| {
            JsonRpcError::invalid_params(
                self.id.clone(),
                format!("Invalid {} params: {e}", self.method),
            )
        })
    }
}

/// A JSON-RPC 2.0 notification message (incoming).
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    #[serde(default)]
    pub params: Option<Value>,
}

/// A successful JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this response corresponds to.
    pub id: RequestId,

    /// The result of the method call.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result,
        }
    }
}

/// Standard JSON-RPC 2.0 error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,
}

/// A JSON-RPC 2.0 error response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID, or `null` when it could not be determined.
    pub id: Option<RequestId>,

    /// The error details.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    /// Creates a new error response.
    #[must_use]
    pub fn new(id: Option<RequestId>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error: JsonRpcErrorData {
                code: code.code(),
                message: message.into(),
            },
        }
    }

    /// Creates a parse error response (ID cannot be determined).
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(None, ErrorCode::ParseError, "Parse error")
    }

    /// Creates an invalid request error response.
    #[must_use]
    pub fn invalid_request(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Self::new(id, ErrorCode::InvalidRequest, message)
    }

    /// Creates a method not found error response.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(
            Some(id),
            ErrorCode::MethodNotFound,
            format!("Method not found: {method}"),
        )
    }

    /// Creates an invalid params error response.
    #[must_use]
    pub fn invalid_params(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(Some(id), ErrorCode::InvalidParams, message)
    }

    /// Creates an internal error response.
    #[must_use]
    pub fn internal_error(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(Some(id), ErrorCode::InternalError, message)
    }
}

/// A message written by the server.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutgoingMessage {
    /// Success response.
    Response(JsonRpcResponse),
    /// Error response.
    Error(JsonRpcError),
}

impl From<JsonRpcResponse> for OutgoingMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for OutgoingMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}

/// An incoming message that could be either a request or notification.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A request expecting a response.
    Request(JsonRpcRequest),
    /// A notification (no response expected).
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    /// Returns the method name of this message.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Request(req) => &req.method,
            Self::Notification(notif) => &notif.method,
        }
    }
}

/// Parses a JSON string into an incoming message.
///
/// # Errors
///
/// Returns a `JsonRpcError` if the JSON is malformed or not a valid message.
pub fn parse_message(json: &str) -> Result<IncomingMessage, JsonRpcError> {
    let value: Value = serde_json::from_str(json).map_err(|_| JsonRpcError::parse_error())?;

    let Some(obj) = value.as_object() else {
        return Err(JsonRpcError::invalid_request(
            None,
            "Message must be a JSON object",
        ));
    };

    // Recover the id early so later errors can reference it.
    let id = obj
        .get("id")
        .and_then(|v| serde_json::from_value::<RequestId>(v.clone()).ok());

    if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err(JsonRpcError::invalid_request(
            id,
            "jsonrpc field must be \"2.0\"",
        ));
    }

    match obj.get("method").and_then(Value::as_str) {
        None => {
            return Err(JsonRpcError::invalid_request(
                id,
                "method field must be a string",
            ))
        }
        Some("") => {
            return Err(JsonRpcError::invalid_request(
                id,
                "method field cannot be empty",
            ))
        }
        Some(_) => {}
    }

    if obj.contains_key("id") {
        if id.is_none() {
            return Err(JsonRpcError::invalid_request(
                None,
                "id must be a string or an integer",
            ));
        }
        let request: JsonRpcRequest = serde_json::from_value(value)
            .map_err(|e| JsonRpcError::invalid_request(id, e.to_string()))?;
        Ok(IncomingMessage::Request(request))
    } else {
        let notification: JsonRpcNotification = serde_json::from_value(value)
            .map_err(|e| JsonRpcError::invalid_request(None, e.to_string()))?;
        Ok(IncomingMessage::Notification(notification))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::Number(1));
        assert_eq!(req.method, "initialize");
    }

    #[test]
    fn parse_valid_notification() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let msg = parse_message(json).unwrap();

        assert!(matches!(msg, IncomingMessage::Notification(_)));
        assert_eq!(msg.method(), "notifications/initialized");
    }

    #[test]
    fn parse_invalid_json() {
        let err = parse_message("not valid json").unwrap_err();
        assert_eq!(err.error.code, ErrorCode::ParseError.code());
        assert!(err.id.is_none());
    }

    #[test]
    fn parse_non_object() {
        let err = parse_message("[1, 2, 3]").unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn wrong_version_keeps_id() {
        let json = r#"{"jsonrpc": "1.0", "id": "abc", "method": "ping"}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, Some(RequestId::String("abc".to_string())));
    }

    #[test]
    fn reject_null_id() {
        let json = r#"{"jsonrpc": "2.0", "id": null, "method": "ping"}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn reject_empty_method() {
        let json = r#"{"jsonrpc": "2.0", "id": 3, "method": ""}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.id, Some(RequestId::Number(3)));
    }

    #[test]
    fn missing_params_become_empty_object() {
        #[derive(Deserialize)]
        struct Params {
            #[serde(default)]
            cursor: Option<String>,
        }

        let IncomingMessage::Request(req) =
            parse_message(r#"{"jsonrpc": "2.0", "id": 9, "method": "tools/list"}"#).unwrap()
        else {
            panic!("Expected Request");
        };
        let params: Params = req.parse_params().unwrap();
        assert!(params.cursor.is_none());
    }

    #[test]
    fn version_negotiation() {
        assert_eq!(negotiate_version("2024-11-05"), "2024-11-05");
        assert_eq!(negotiate_version("2025-03-26"), "2025-03-26");
        assert_eq!(negotiate_version("1999-01-01"), MCP_PROTOCOL_VERSION);
    }

    #[test]
    fn error_serialises_null_id() {
        let json = serde_json::to_string(&OutgoingMessage::from(JsonRpcError::parse_error()))
            .unwrap();
        assert!(json.contains(r#""id":null"#));
        assert!(json.contains(r#""code":-32700"#));
    }

    #[test]
    fn serialise_success_response() {
        let response =
            JsonRpcResponse::success(RequestId::Number(1), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&OutgoingMessage::from(response)).unwrap();
        assert_eq!(json, r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#);
    }
}
