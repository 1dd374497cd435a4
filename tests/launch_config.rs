//! Integration tests for configuration files and client launch descriptors.

use std::io::Write;
use std::path::{Path, PathBuf};

use catia_v5_mcp::config::{
    load_config, LaunchDescriptor, TransportConfig, TransportKind,
};
use catia_v5_mcp::error::{ConfigError, LaunchError};

fn shipped(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config").join(name)
}

#[test]
fn example_config_loads() {
    let cfg = load_config(Some(&shipped("example-config.json"))).unwrap();
    assert_eq!(cfg.catia.prog_id, "CATIA.Application");
    assert_eq!(cfg.catia.timeout_secs, 120);
    assert_eq!(cfg.transport.kind, TransportKind::Stdio);
    assert_eq!(cfg.allowed_paths.len(), 2);
    assert_eq!(cfg.logging.level, "warn");
}

#[test]
fn example_launch_descriptor_loads() {
    let desc = LaunchDescriptor::load(&shipped("client-launch.json")).unwrap();
    assert_eq!(desc.transport, TransportKind::Stdio);
    assert_eq!(desc.args.len(), 1);
    assert!(desc.url.is_none());
}

#[test]
fn tcp_config_without_address_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{ "transport": {{ "kind": "tcp" }} }}"#).unwrap();

    let err = load_config(Some(file.path())).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError { .. }));
}

#[test]
fn generated_descriptor_round_trips_through_disk() {
    let tcp = TransportConfig {
        kind: TransportKind::Tcp,
        address: Some("127.0.0.1:8765".to_string()),
    };
    let desc = LaunchDescriptor::for_current_exe(Some(Path::new("cfg.json")), &tcp).unwrap();
    assert_eq!(desc.command, std::env::current_exe().unwrap());
    assert!(desc.validate().is_ok());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mcp.json");
    let json = serde_json::to_string_pretty(&desc.to_client_json("catia-v5")).unwrap();
    std::fs::write(&path, json).unwrap();

    let loaded = LaunchDescriptor::load(&path).unwrap();
    assert_eq!(loaded, desc);
    assert_eq!(loaded.transport, TransportKind::Tcp);
    assert_eq!(loaded.url.as_deref(), Some("tcp://127.0.0.1:8765"));
    let expected = std::env::current_dir().unwrap().join("cfg.json");
    assert_eq!(loaded.args, vec![expected.display().to_string()]);
}

#[test]
fn relative_config_path_is_stored_absolute() {
    let relative = Path::new("config").join("example-config.json");
    let desc = LaunchDescriptor::for_current_exe(Some(&relative), &TransportConfig::default())
        .unwrap();

    let stored = Path::new(&desc.args[0]);
    assert!(stored.is_absolute());
    assert!(stored.ends_with(&relative));

    // Loadable without depending on the working directory.
    let cfg = load_config(Some(stored)).unwrap();
    assert_eq!(cfg.catia.prog_id, "CATIA.Application");
}

#[test]
fn missing_command_fails_validation() {
    let desc = LaunchDescriptor::from_json(r#"{ "command": "/no/such/catia-v5-mcp" }"#).unwrap();
    assert!(matches!(
        desc.validate(),
        Err(LaunchError::CommandNotFound { .. })
    ));
}

#[test]
fn missing_descriptor_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = LaunchDescriptor::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, LaunchError::Io { .. }));
}
