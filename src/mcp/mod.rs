//! Model Context Protocol (MCP) server implementation.
//!
//! This module implements the MCP specification for exposing CATIA V5
//! automation as tools to AI assistants. The server exchanges
//! newline-delimited JSON-RPC 2.0 messages over stdio or a TCP connection.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  Transport  │───▶│   Server    │───▶│   Backend   │    │
//! │   │ (stdio/tcp) │    │  (lifecycle)│    │   (CATIA)   │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! │          │                  │                  │            │
//! │          ▼                  ▼                  ▼            │
//! │   ┌──────────────────┐  ┌──────────────────────────┐       │
//! │   │ JSON-RPC Messages│  │ Script Host (COM calls)  │       │
//! │   └──────────────────┘  └──────────────────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation speaks MCP 2025-03-26 and falls back to 2024-11-05
//! for older clients.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION,
    SUPPORTED_PROTOCOL_VERSIONS,
};
pub use server::McpServer;
pub use transport::LineTransport;
