//! CATIA V5 automation.
//!
//! CATIA exposes its object model (`Application`, `Documents`, `Part`,
//! `ShapeFactory`, ...) through COM. This module turns MCP tool calls into
//! validated [`Operation`]s and hands them to a [`CatiaBackend`].
//!
//! # Backends
//!
//! - [`ScriptHostBackend`] generates a VBScript program per operation and runs
//!   it with the Windows Script Host, which performs the COM calls.
//!
//! Backends return flat [`Record`]s; [`response::shape`] turns them into the
//! tool output for each operation, so the result format does not depend on
//! the backend.

pub mod error;
pub mod host;
pub mod operation;
pub mod response;
pub mod script;

pub use error::{CatiaError, CatiaResult};
pub use host::ScriptHostBackend;
pub use operation::{DocumentKind, MacroLibraryType, Operation, Plane, Rectangle};
pub use response::ToolOutput;

use std::collections::BTreeMap;
use std::future::Future;

/// One result row produced by an automation call.
pub type Record = BTreeMap<String, String>;

/// Something that can carry out automation operations against CATIA.
pub trait CatiaBackend {
    /// Checks that the COM automation layer can be used at all.
    ///
    /// This does not contact CATIA; it only checks the local prerequisites.
    ///
    /// # Errors
    ///
    /// Returns [`CatiaError::AutomationUnavailable`] when it cannot.
    fn probe(&self) -> CatiaResult<()>;

    /// Runs an operation and returns the records it produced.
    fn run(&self, op: &Operation) -> impl Future<Output = CatiaResult<Vec<Record>>> + Send;

    /// Attaches to CATIA without changing anything and returns its caption.
    fn connect(&self) -> impl Future<Output = CatiaResult<String>> + Send;
}

/// Runs an operation end to end: probe, execute, shape.
///
/// # Errors
///
/// Returns the first error from any stage.
pub async fn perform<B: CatiaBackend>(backend: &B, op: &Operation) -> CatiaResult<ToolOutput> {
    backend.probe()?;
    let records = backend.run(op).await?;
    tracing::debug!(?op, records = records.len(), "Automation call completed");
    response::shape(op, &records)
}

/// Diagnostic check: verifies automation is available and CATIA answers.
///
/// Returns the CATIA window caption on success.
///
/// # Errors
///
/// Returns the error that prevented the connection.
pub async fn check<B: CatiaBackend>(backend: &B) -> CatiaResult<String> {
    backend.probe()?;
    backend.connect().await
}
