//! Error types for catia-v5-mcp configuration.
//!
//! Automation errors live in [`crate::catia::CatiaError`]; this module only
//! covers the files read at startup: the server configuration and the client
//! launch descriptor.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors that can occur while building or checking a client launch descriptor.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Descriptor file could not be read or written.
    #[error("failed to access launch descriptor: {path}")]
    Io {
        /// Path to the descriptor file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Descriptor JSON is malformed.
    #[error("failed to parse launch descriptor")]
    Parse(#[source] serde_json::Error),

    /// The command does not point to an executable file.
    #[error("launch command not found: {path}")]
    CommandNotFound {
        /// The configured command path.
        path: PathBuf,
    },

    /// The config path could not be made absolute.
    #[error("cannot resolve config path: {path}")]
    ConfigPath {
        /// The config path as given.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The path of the running executable could not be determined.
    #[error("cannot determine the server executable path")]
    CurrentExe(#[source] std::io::Error),
}
