//! Client launch descriptor.
//!
//! MCP clients (desktop assistants, IDE plugins) read a small JSON record at
//! startup telling them which command to spawn and how to talk to it:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "catia-v5": {
//!       "command": "C:\\Tools\\catia-v5-mcp.exe",
//!       "args": ["C:\\Users\\me\\.catia-v5-mcp\\config.json"],
//!       "transport": "stdio"
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::{TransportConfig, TransportKind};
use crate::error::LaunchError;

/// How a client spawns and connects to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchDescriptor {
    /// Executable to spawn.
    pub command: PathBuf,

    /// Arguments passed to the executable.
    #[serde(default)]
    pub args: Vec<String>,

    /// How the client connects once the process is running.
    #[serde(default = "default_transport")]
    pub transport: TransportKind,

    /// Endpoint for non-stdio transports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Extra environment variables for the spawned process.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

const fn default_transport() -> TransportKind {
    TransportKind::Stdio
}

impl LaunchDescriptor {
    /// Builds a descriptor that launches the currently running executable.
    ///
    /// The config path is stored as an absolute path, since clients spawn
    /// the server from their own working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the executable or config path cannot be resolved.
    pub fn for_current_exe(
        config_path: Option<&Path>,
        transport: &TransportConfig,
    ) -> Result<Self, LaunchError> {
        let command = std::env::current_exe().map_err(LaunchError::CurrentExe)?;
        let args = match config_path {
            Some(p) => {
                let absolute = std::path::absolute(p).map_err(|source| LaunchError::ConfigPath {
                    path: p.to_path_buf(),
                    source,
                })?;
                vec![absolute.display().to_string()]
            }
            None => Vec::new(),
        };

        Ok(Self {
            command,
            args,
            transport: TransportKind::Stdio,
            url: None,
            env: BTreeMap::new(),
        }
        .with_transport(transport))
    }

    /// Returns a copy using a different transport. The command and arguments
    /// are left untouched.
    #[must_use]
    pub fn with_transport(mut self, transport: &TransportConfig) -> Self {
        self.transport = transport.kind;
        self.url = match transport.kind {
            TransportKind::Stdio => None,
            TransportKind::Tcp => transport.address.as_ref().map(|a| format!("tcp://{a}")),
        };
        self
    }

    /// Parses a bare descriptor, or the first server of an `mcpServers` map.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a launch descriptor.
    pub fn from_json(json: &str) -> Result<Self, LaunchError> {
        let value: Value = serde_json::from_str(json).map_err(LaunchError::Parse)?;
        let entry = match value.get("mcpServers").and_then(Value::as_object) {
            Some(servers) => servers.values().next().cloned().unwrap_or(Value::Null),
            None => value,
        };
        serde_json::from_value(entry).map_err(LaunchError::Parse)
    }

    /// Reads a descriptor file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, LaunchError> {
        let contents = std::fs::read_to_string(path).map_err(|source| LaunchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Wraps the descriptor in the `mcpServers` map clients expect.
    #[must_use]
    pub fn to_client_json(&self, server_name: &str) -> Value {
        json!({
            "mcpServers": {
                server_name: self,
            }
        })
    }

    /// Checks that the command points to an existing file.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::CommandNotFound`] if it does not.
    pub fn validate(&self) -> Result<(), LaunchError> {
        if self.command.is_file() {
            Ok(())
        } else {
            Err(LaunchError::CommandNotFound {
                path: self.command.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp(address: &str) -> TransportConfig {
        TransportConfig {
            kind: TransportKind::Tcp,
            address: Some(address.to_string()),
        }
    }

    #[test]
    fn parse_wrapped_descriptor() {
        let json = r#"{
            "mcpServers": {
                "catia-v5": {
                    "command": "C:\\Tools\\catia-v5-mcp.exe",
                    "args": ["-v"],
                    "transport": "stdio"
                }
            }
        }"#;

        let desc = LaunchDescriptor::from_json(json).unwrap();
        assert_eq!(desc.command, PathBuf::from(r"C:\Tools\catia-v5-mcp.exe"));
        assert_eq!(desc.args, vec!["-v".to_string()]);
        assert_eq!(desc.transport, TransportKind::Stdio);
    }

    #[test]
    fn parse_bare_descriptor_defaults_to_stdio() {
        let desc = LaunchDescriptor::from_json(r#"{ "command": "/usr/bin/true" }"#).unwrap();
        assert_eq!(desc.transport, TransportKind::Stdio);
        assert!(desc.args.is_empty());
    }

    #[test]
    fn reject_unknown_transport() {
        let json = r#"{ "command": "x", "transport": "carrier-pigeon" }"#;
        assert!(LaunchDescriptor::from_json(json).is_err());
    }

    #[test]
    fn changing_transport_keeps_command() {
        let desc =
            LaunchDescriptor::from_json(r#"{ "command": "/opt/catia-v5-mcp", "args": ["a"] }"#)
                .unwrap();
        let switched = desc.clone().with_transport(&tcp("127.0.0.1:8765"));

        assert_eq!(switched.command, desc.command);
        assert_eq!(switched.args, desc.args);
        assert_eq!(switched.transport, TransportKind::Tcp);
        assert_eq!(switched.url.as_deref(), Some("tcp://127.0.0.1:8765"));

        let back = switched.with_transport(&TransportConfig::default());
        assert_eq!(back.transport, TransportKind::Stdio);
        assert!(back.url.is_none());
    }

    #[test]
    fn client_json_shape() {
        let desc = LaunchDescriptor::from_json(r#"{ "command": "/opt/server" }"#).unwrap();
        let value = desc.to_client_json("catia-v5");

        let entry = &value["mcpServers"]["catia-v5"];
        assert_eq!(entry["command"], "/opt/server");
        assert_eq!(entry["transport"], "stdio");
        assert!(entry.get("env").is_none());
        assert!(entry.get("url").is_none());
    }

    #[test]
    fn validate_missing_command() {
        let dir = tempfile::tempdir().unwrap();
        let desc = LaunchDescriptor {
            command: dir.path().join("missing.exe"),
            args: Vec::new(),
            transport: TransportKind::Stdio,
            url: None,
            env: BTreeMap::new(),
        };
        assert!(matches!(
            desc.validate(),
            Err(LaunchError::CommandNotFound { .. })
        ));
    }

    #[test]
    fn validate_existing_command() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let desc = LaunchDescriptor {
            command: file.path().to_path_buf(),
            args: Vec::new(),
            transport: TransportKind::Stdio,
            url: None,
            env: BTreeMap::new(),
        };
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(&path, r#"{ "command": "/opt/server", "transport": "tcp" }"#).unwrap();

        let desc = LaunchDescriptor::load(&path).unwrap();
        assert_eq!(desc.transport, TransportKind::Tcp);
    }
}
