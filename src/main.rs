//! catia-v5-mcp: MCP server for AI-assisted CATIA V5 modelling
//!
//! This tool exposes a running CATIA V5 session to AI assistants through the
//! Model Context Protocol.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use catia_v5_mcp::catia::{self, CatiaBackend, ScriptHostBackend};
use catia_v5_mcp::config::{self, Config, LaunchDescriptor, TransportKind};
use catia_v5_mcp::mcp::server::shutdown_signal;
use catia_v5_mcp::mcp::{LineTransport, McpServer};

/// MCP server for AI-assisted CATIA V5 modelling.
///
/// Exposes document management, Part Design features and macro execution
/// of a running CATIA V5 session as MCP tools.
#[derive(Parser, Debug)]
#[command(name = "catia-v5-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server on the configured transport (default)
    Serve,

    /// Check that CATIA can be reached through COM automation
    Check,

    /// Print the client launch descriptor for this executable
    ClientConfig {
        /// Key under `mcpServers` in the generated descriptor
        #[arg(long, default_value = "catia-v5")]
        server_name: String,

        /// Write the descriptor to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_runtime() -> Option<tokio::runtime::Runtime> {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => Some(runtime),
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            None
        }
    }
}

/// Entry point for the catia-v5-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig read from: {}", default_path.display());
                    eprintln!("Compare it with config/example-config.json");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cfg),
        Command::Check => check(cfg),
        Command::ClientConfig {
            server_name,
            output,
        } => client_config(&cfg, config_path, &server_name, output.as_deref()),
    }
}

/// Runs the MCP server until the client disconnects or a signal arrives.
fn serve(cfg: Config) -> ExitCode {
    // Display GPL license notice (required by GPLv3 Section 5d)
    eprintln!(
        "catia-v5-mcp {}  Copyright (C) 2026  The Embedded Society",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
    eprintln!();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = %cfg.transport.kind,
        "Starting catia-v5-mcp server"
    );

    if cfg.allowed_paths.is_empty() {
        info!("No allowed paths configured, file paths are unrestricted");
    } else {
        info!(allowed_paths = ?cfg.allowed_paths, "Allowed paths configured");
    }

    let backend = ScriptHostBackend::new(cfg.catia.clone());
    if let Err(e) = backend.probe() {
        error!(error = %e, "CATIA automation is not available; every tool call will fail");
    }

    let Some(runtime) = build_runtime() else {
        return ExitCode::FAILURE;
    };

    let result = match cfg.transport.kind {
        TransportKind::Stdio => {
            let mut server = McpServer::new(LineTransport::stdio(), backend, cfg.allowed_paths);
            info!("MCP server ready, waiting for client connection...");
            runtime.block_on(server.run())
        }
        TransportKind::Tcp => runtime.block_on(serve_tcp(&cfg, backend)),
    };

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

/// Serves one TCP client at a time until the process is asked to stop.
async fn serve_tcp(cfg: &Config, backend: ScriptHostBackend) -> std::io::Result<()> {
    let addr = cfg
        .transport
        .socket_addr()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %listener.local_addr()?, "MCP server listening");

    accept_loop(listener, backend, &cfg.allowed_paths, shutdown_signal()).await
}

/// Accepts connections one after another until `shutdown` resolves.
async fn accept_loop<B, F>(
    listener: tokio::net::TcpListener,
    backend: B,
    allowed_paths: &[PathBuf],
    shutdown: F,
) -> std::io::Result<()>
where
    B: CatiaBackend + Clone,
    F: Future<Output = std::io::Result<&'static str>>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                let signal = signal?;
                info!(signal, "Stopping listener");
                return Ok(());
            }

            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        continue;
                    }
                };
                info!(%peer, "Client connected");

                let mut server = McpServer::new(
                    LineTransport::tcp(stream),
                    backend.clone(),
                    allowed_paths.to_vec(),
                );
                if let Err(e) = server.run().await {
                    warn!(%peer, error = %e, "Connection ended with error");
                }
                info!(%peer, "Client disconnected");
            }
        }
    }
}

/// Connects to CATIA once and reports the outcome.
fn check(cfg: Config) -> ExitCode {
    let backend = ScriptHostBackend::new(cfg.catia);
    let Some(runtime) = build_runtime() else {
        return ExitCode::FAILURE;
    };

    match runtime.block_on(catia::check(&backend)) {
        Ok(caption) => {
            info!(caption = %caption, "Connected to CATIA");
            println!("OK");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Emits the launch descriptor clients use to start this server.
fn client_config(
    cfg: &Config,
    config_path: Option<&Path>,
    server_name: &str,
    output: Option<&Path>,
) -> ExitCode {
    let descriptor = match LaunchDescriptor::for_current_exe(config_path, &cfg.transport) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let json = descriptor.to_client_json(server_name);
    let text = match serde_json::to_string_pretty(&json) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Failed to serialise launch descriptor: {e}");
            return ExitCode::FAILURE;
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, format!("{text}\n")) {
                eprintln!("Failed to write {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
            info!(path = %path.display(), "Launch descriptor written");
        }
        None => println!("{text}"),
    }

    ExitCode::SUCCESS
}
