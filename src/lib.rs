//! catia-v5-mcp: MCP server for AI-assisted CATIA V5 modelling
//!
//! This library exposes a running CATIA V5 session to AI assistants as a set
//! of Model Context Protocol tools: document management, basic Part Design
//! features and macro execution.
//!
//! # Architecture
//!
//! The MCP server provides thin automation primitives. The AI decides what to
//! build:
//!
//! - **Documents**: Create, open, save and close Parts, Products and Drawings
//! - **Part Design**: Sketches on origin planes, rectangles, pads and pockets
//! - **Macros**: Run functions from existing CATIA macro libraries
//!
//! Every tool call becomes one short automation script executed by the
//! Windows Script Host against CATIA's COM interface.
//!
//! # Modules
//!
//! - [`catia`] — Operations, script generation and the automation backend
//! - [`config`] — Configuration loading and client launch descriptors
//! - [`error`] — Error types
//! - [`mcp`] — MCP protocol implementation

pub mod catia;
pub mod config;
pub mod error;
pub mod mcp;
