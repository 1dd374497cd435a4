//! Windows Script Host backend.
//!
//! Each operation is rendered to a VBScript file (UTF-16LE with BOM, so
//! document names outside the ANSI code page survive), run with
//! `cscript //NoLogo //U <file>`, and its Unicode output parsed back into
//! records. The script file is removed afterwards whether or not the call
//! succeeded.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use uuid::Uuid;

use crate::catia::error::{CatiaError, CatiaResult};
use crate::catia::operation::Operation;
use crate::catia::script::{
    self, EXIT_AUTOMATION_FAILED, EXIT_CONNECT_FAILED, EXIT_NOT_FOUND, RECORD_END,
};
use crate::catia::{CatiaBackend, Record};
use crate::config::CatiaConfig;

/// Drives CATIA by running generated scripts through the Windows Script Host.
#[derive(Debug, Clone)]
pub struct ScriptHostBackend {
    config: CatiaConfig,
    script_dir: PathBuf,
}

impl ScriptHostBackend {
    /// Creates a backend that writes its scripts to the system temp directory.
    #[must_use]
    pub fn new(config: CatiaConfig) -> Self {
        Self {
            config,
            script_dir: std::env::temp_dir(),
        }
    }

    /// Uses a different directory for generated scripts.
    #[must_use]
    pub fn with_script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.script_dir = dir.into();
        self
    }

    /// Locates the script host executable, searching `PATH` for bare names.
    #[must_use]
    pub fn resolve_script_host(&self) -> Option<PathBuf> {
        let host = &self.config.script_host;
        if host.is_absolute() || host.components().count() > 1 {
            return host.is_file().then(|| host.clone());
        }

        let path_var = std::env::var_os("PATH")?;
        std::env::split_paths(&path_var).find_map(|dir| {
            let candidate = dir.join(host);
            if candidate.is_file() {
                return Some(candidate);
            }
            let with_exe = candidate.with_extension("exe");
            with_exe.is_file().then_some(with_exe)
        })
    }

    /// Writes a script, runs it, and returns its decoded stdout.
    async fn run_script(&self, text: &str) -> CatiaResult<String> {
        let program = self
            .resolve_script_host()
            .unwrap_or_else(|| self.config.script_host.clone());
        let path = self
            .script_dir
            .join(format!("catia-v5-mcp-{}.vbs", Uuid::new_v4()));

        tokio::fs::write(&path, encode_script(text))
            .await
            .map_err(|source| CatiaError::ScriptIo {
                path: path.clone(),
                source,
            })?;

        let result = self.execute_script_file(&program, &path).await;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove automation script");
        }

        result
    }

    async fn execute_script_file(&self, program: &Path, script: &Path) -> CatiaResult<String> {
        let timeout = Duration::from_secs(self.config.timeout_secs);

        tracing::debug!(
            program = %program.display(),
            script = %script.display(),
            "Running automation script"
        );

        let child = Command::new(program)
            .arg("//NoLogo")
            .arg("//U")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CatiaError::Spawn {
                program: program.to_path_buf(),
                source,
            })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| CatiaError::Timeout { timeout })?
            .map_err(|source| CatiaError::Spawn {
                program: program.to_path_buf(),
                source,
            })?;

        let stdout = decode_output(&output.stdout);
        let stderr = decode_output(&output.stderr);
        interpret_exit(output.status.code(), stdout, &stderr)
    }
}

impl CatiaBackend for ScriptHostBackend {
    fn probe(&self) -> CatiaResult<()> {
        if !cfg!(windows) {
            return Err(CatiaError::unavailable(
                "CATIA V5 COM automation is only available on Windows",
            ));
        }
        self.resolve_script_host().map(|_| ()).ok_or_else(|| {
            CatiaError::unavailable(format!(
                "script host '{}' not found; install or enable Windows Script Host",
                self.config.script_host.display()
            ))
        })
    }

    async fn run(&self, op: &Operation) -> CatiaResult<Vec<Record>> {
        let stdout = self.run_script(&script::render(op, &self.config)).await?;
        parse_records(&stdout)
    }

    async fn connect(&self) -> CatiaResult<String> {
        let stdout = self
            .run_script(&script::render_connect_check(&self.config))
            .await?;
        parse_records(&stdout)?
            .first()
            .and_then(|r| r.get("caption"))
            .cloned()
            .ok_or_else(|| CatiaError::malformed("connection check returned no caption"))
    }
}

/// Encodes a script as UTF-16LE with a byte order mark.
fn encode_script(source: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + source.len() * 2);
    bytes.extend_from_slice(&[0xFF, 0xFE]);
    for unit in source.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

/// Decodes script host output, which is UTF-16LE under `//U` but may be
/// plain bytes when the host fails before running the script.
fn decode_output(bytes: &[u8]) -> String {
    let looks_utf16 = bytes.len() % 2 == 0 && bytes.chunks_exact(2).any(|pair| pair[1] == 0);
    if looks_utf16 {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// Maps the script host exit status to a result.
fn interpret_exit(code: Option<i32>, stdout: String, stderr: &str) -> CatiaResult<String> {
    let message = stderr.trim().to_string();
    match code {
        // Compilation errors still exit 0 but leave a message on stderr.
        Some(0) if message.is_empty() => Ok(stdout),
        Some(0 | EXIT_AUTOMATION_FAILED) => Err(CatiaError::AutomationFailed { message }),
        Some(EXIT_CONNECT_FAILED) => Err(CatiaError::ConnectionFailed { message }),
        Some(EXIT_NOT_FOUND) => Err(CatiaError::NotFound { message }),
        Some(code) => Err(CatiaError::AutomationFailed {
            message: format!("script host exited with status {code}: {message}"),
        }),
        None => Err(CatiaError::AutomationFailed {
            message: "script host was terminated".to_string(),
        }),
    }
}

/// Parses `key<TAB>value` lines into records separated by `---`.
///
/// # Errors
///
/// Returns [`CatiaError::MalformedOutput`] for lines that are neither.
pub fn parse_records(output: &str) -> CatiaResult<Vec<Record>> {
    let mut records = Vec::new();
    let mut current = Record::new();

    for line in output.trim_start_matches('\u{feff}').lines() {
        if line.is_empty() {
            continue;
        }
        if line == RECORD_END {
            records.push(std::mem::take(&mut current));
            continue;
        }
        let (key, value) = line
            .split_once('\t')
            .ok_or_else(|| CatiaError::malformed(format!("unexpected line: {line}")))?;
        current.insert(key.to_string(), value.to_string());
    }

    if !current.is_empty() {
        records.push(current);
    }
    Ok(records)
}
