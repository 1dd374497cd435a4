//! Integration tests for MCP protocol handling.
//!
//! These tests verify the MCP server's JSON-RPC 2.0 protocol implementation,
//! including request/response handling, error responses, and version
//! negotiation.

use catia_v5_mcp::mcp::protocol::{
    negotiate_version, parse_message, IncomingMessage, JsonRpcError, OutgoingMessage, RequestId,
    MCP_PROTOCOL_VERSION,
};

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "initialize");
        assert_eq!(req.id, RequestId::Number(1));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_tools_call_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": "call-7",
        "method": "tools/call",
        "params": {
            "name": "create_pad",
            "arguments": { "length": 12.5 }
        }
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "tools/call");
        assert_eq!(req.id, RequestId::String("call-7".to_string()));
        assert_eq!(req.params.unwrap()["arguments"]["length"], 12.5);
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_notification() {
    let json = r#"{
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Notification(notif) = result.unwrap() {
        assert_eq!(notif.method, "notifications/initialized");
    } else {
        panic!("Expected Notification");
    }
}

#[test]
fn test_parse_invalid_json() {
    let json = "not valid json";

    let error = parse_message(json).unwrap_err();
    assert_eq!(error.error.code, -32700);
    assert!(error.id.is_none());
}

#[test]
fn test_parse_missing_jsonrpc_version() {
    let json = r#"{
        "id": 1,
        "method": "test"
    }"#;

    let error = parse_message(json).unwrap_err();
    assert_eq!(error.error.code, -32600);
    assert_eq!(error.id, Some(RequestId::Number(1)));
}

// =============================================================================
// Response Serialisation Tests
// =============================================================================

#[test]
fn test_error_without_id_serialises_null() {
    let message: OutgoingMessage = JsonRpcError::parse_error().into();
    let value = serde_json::to_value(&message).unwrap();
    assert!(value["id"].is_null());
    assert_eq!(value["jsonrpc"], "2.0");
}

#[test]
fn test_method_not_found_names_method() {
    let error = JsonRpcError::method_not_found(RequestId::Number(3), "resources/list");
    assert_eq!(error.error.code, -32601);
    assert!(error.error.message.contains("resources/list"));
}

// =============================================================================
// Version Negotiation Tests
// =============================================================================

#[test]
fn test_negotiate_supported_versions() {
    assert_eq!(negotiate_version("2024-11-05"), "2024-11-05");
    assert_eq!(negotiate_version("2025-03-26"), "2025-03-26");
}

#[test]
fn test_negotiate_unknown_version_answers_latest() {
    assert_eq!(negotiate_version("1999-01-01"), MCP_PROTOCOL_VERSION);
    assert_eq!(MCP_PROTOCOL_VERSION, "2025-03-26");
}
