//! Process execution and local system probes.
//!
//! Everything here is a thin wrapper over the operating system: running a
//! shell string, asking the package manager whether something is installed,
//! and collecting a few facts about the machine for prompts.

pub mod inventory;
pub mod system_info;

pub use inventory::{LocalInventory, SystemInventory};
pub use system_info::SystemFacts;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Shell used when the configured one cannot be found.
const FALLBACK_SHELL: &str = "sh";

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
}

/// Runs a shell command string and hands back its buffered output.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<ExecutionResult>;
}

/// Runs commands through `<shell> -c`, waiting for the child to exit.
pub struct ShellRunner {
    shell: PathBuf,
}

impl ShellRunner {
    /// Use `shell` when it is on `PATH`, otherwise fall back to `sh`.
    pub fn new(shell: &str) -> Self {
        let shell = which::which(shell).unwrap_or_else(|_| {
            warn!("Shell '{}' not found on PATH, using {}", shell, FALLBACK_SHELL);
            PathBuf::from(FALLBACK_SHELL)
        });
        Self { shell }
    }

    pub fn shell(&self) -> &Path {
        &self.shell
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(FALLBACK_SHELL)
    }
}

#[async_trait::async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<ExecutionResult> {
        info!("Executing via {}: {}", self.shell.display(), command);

        // stdin stays attached so password prompts (sudo) still work.
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("failed to spawn {}", self.shell.display()))?;

        let result = ExecutionResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            success: output.status.success(),
        };

        debug!("Exit code: {}", result.exit_code);
        debug!("Stdout length: {}", result.stdout.len());
        if !result.stderr.is_empty() {
            debug!("Stderr content: {}", result.stderr);
        }

        Ok(result)
    }
}
