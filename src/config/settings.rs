//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// CATIA automation settings.
    #[serde(default)]
    pub catia: CatiaConfig,

    /// Transport the server listens on.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Directories that document and macro paths must live under.
    #[serde(default)]
    pub allowed_paths: Vec<PathBuf>,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.catia.validate()?;
        self.transport.validate()?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            });
        }
        Ok(())
    }
}

/// CATIA automation configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatiaConfig {
    /// COM programmatic identifier of the CATIA application.
    #[serde(default = "default_prog_id")]
    pub prog_id: String,

    /// Windows Script Host executable used to run automation scripts.
    #[serde(default = "default_script_host")]
    pub script_host: PathBuf,

    /// Start CATIA when no running instance is found.
    #[serde(default = "default_true")]
    pub launch_if_not_running: bool,

    /// Upper bound for a single automation call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl CatiaConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.prog_id.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "catia.prog_id must not be empty".to_string(),
            });
        }
        if self.script_host.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "catia.script_host must not be empty".to_string(),
            });
        }
        if !(1..=3600).contains(&self.timeout_secs) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "catia.timeout_secs must be between 1 and 3600, got {}",
                    self.timeout_secs
                ),
            });
        }
        Ok(())
    }
}

impl Default for CatiaConfig {
    fn default() -> Self {
        Self {
            prog_id: default_prog_id(),
            script_host: default_script_host(),
            launch_if_not_running: default_true(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_prog_id() -> String {
    "CATIA.Application".to_string()
}

fn default_script_host() -> PathBuf {
    PathBuf::from("cscript")
}

const fn default_timeout_secs() -> u64 {
    120
}

const fn default_true() -> bool {
    true
}

/// The transport kinds a client can use to reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Newline-delimited messages over stdin/stdout.
    Stdio,
    /// Newline-delimited messages over a TCP connection.
    Tcp,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Tcp => write!(f, "tcp"),
        }
    }
}

/// Transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Transport kind.
    #[serde(default = "default_transport_kind")]
    pub kind: TransportKind,

    /// Listen address for the tcp transport.
    #[serde(default)]
    pub address: Option<String>,
}

impl TransportConfig {
    /// Returns the parsed tcp listen address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is missing or malformed.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let address = self
            .address
            .as_deref()
            .ok_or_else(|| ConfigError::ValidationError {
                message: "transport.address is required for the tcp transport".to_string(),
            })?;
        address
            .parse()
            .map_err(|e| ConfigError::ValidationError {
                message: format!("Invalid transport.address '{address}': {e}"),
            })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.kind {
            TransportKind::Stdio => Ok(()),
            TransportKind::Tcp => self.socket_addr().map(|_| ()),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: default_transport_kind(),
            address: None,
        }
    }
}

const fn default_transport_kind() -> TransportKind {
    TransportKind::Stdio
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
