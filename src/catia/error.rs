//! Error types for CATIA automation.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for CATIA operations.
pub type CatiaResult<T> = Result<T, CatiaError>;

/// Errors that can occur while driving CATIA.
#[derive(Debug, Error)]
pub enum CatiaError {
    /// The COM automation layer cannot be used from this process.
    #[error("COM automation unavailable: {reason}")]
    AutomationUnavailable {
        /// Why automation cannot be used.
        reason: String,
    },

    /// No CATIA instance could be reached or started.
    #[error("Failed to connect to CATIA V5: {message}")]
    ConnectionFailed {
        /// Message reported by the automation layer.
        message: String,
    },

    /// An automation call raised an error inside CATIA.
    #[error("CATIA automation error: {message}")]
    AutomationFailed {
        /// Message reported by the automation layer.
        message: String,
    },

    /// A named document, body or sketch does not exist.
    #[error("{message}")]
    NotFound {
        /// Description of what was not found.
        message: String,
    },

    /// The requested tool does not exist.
    #[error("Unknown tool: {name}")]
    UnknownTool {
        /// Tool name sent by the client.
        name: String,
    },

    /// A tool argument was rejected before any automation call.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidArgument {
        /// Parameter name.
        name: String,
        /// Description of what's wrong.
        message: String,
    },

    /// The automation script did not finish in time.
    #[error("Automation call timed out after {}s", .timeout.as_secs())]
    Timeout {
        /// The configured timeout.
        timeout: Duration,
    },

    /// The script host process could not be started.
    #[error("Failed to start script host: {program}")]
    Spawn {
        /// Script host executable.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The generated script could not be written or removed.
    #[error("Failed to access automation script: {path}")]
    ScriptIo {
        /// Script file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The script host produced output that could not be understood.
    #[error("Malformed automation output: {message}")]
    MalformedOutput {
        /// Description of what's wrong.
        message: String,
    },
}

impl CatiaError {
    /// Creates an automation-unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::AutomationUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a malformed output error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedOutput {
            message: message.into(),
        }
    }
}
