//! Machine facts embedded in prompts so answers fit this system.

use serde::{Deserialize, Serialize};
use std::process::Stdio;
use sysiq_config::PackageManager;
use tokio::process::Command;
use tracing::debug;

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemFacts {
    pub kernel: String,
    pub uptime: String,
    pub packages: String,
    pub shell_version: String,
    pub monitor: String,
}

impl SystemFacts {
    /// Every fact set to "Unknown".
    pub fn unknown() -> Self {
        Self {
            kernel: UNKNOWN.to_string(),
            uptime: UNKNOWN.to_string(),
            packages: UNKNOWN.to_string(),
            shell_version: UNKNOWN.to_string(),
            monitor: UNKNOWN.to_string(),
        }
    }

    /// Compact JSON, as embedded in prompts.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for SystemFacts {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Collect facts about the running system. Probes that fail read "Unknown".
pub async fn gather(package_manager: PackageManager, shell: &str) -> SystemFacts {
    let (kernel, uptime, packages, shell_version, monitor) = tokio::join!(
        first_line("uname", &["-r"]),
        first_line("uptime", &["-p"]),
        package_count(package_manager),
        first_line(shell, &["--version"]),
        first_line("xrandr", &["--current"]),
    );

    let facts = SystemFacts {
        kernel: kernel.unwrap_or_else(|| UNKNOWN.to_string()),
        uptime: uptime.unwrap_or_else(|| UNKNOWN.to_string()),
        packages: packages.unwrap_or_else(|| UNKNOWN.to_string()),
        shell_version: shell_version.unwrap_or_else(|| UNKNOWN.to_string()),
        monitor: monitor.unwrap_or_else(|| UNKNOWN.to_string()),
    };
    debug!("System facts: {:?}", facts);
    facts
}

async fn capture(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
        .map_err(|e| debug!("probe {} failed: {}", program, e))
        .ok()?;

    if !output.status.success() {
        debug!("probe {} exited with {}", program, output.status);
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).to_string())
}

async fn first_line(program: &str, args: &[&str]) -> Option<String> {
    let stdout = capture(program, args).await?;
    first_non_empty_line(&stdout)
}

fn first_non_empty_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

async fn package_count(package_manager: PackageManager) -> Option<String> {
    let (program, args): (&str, &[&str]) = match package_manager {
        PackageManager::Pacman => ("pacman", &["-Qq"]),
        PackageManager::Apt => ("dpkg-query", &["-f", ".\n", "-W"]),
        PackageManager::Dnf | PackageManager::Zypper => ("rpm", &["-qa"]),
        PackageManager::Apk => ("apk", &["info"]),
        PackageManager::Xbps => ("xbps-query", &["-l"]),
        PackageManager::Emerge | PackageManager::Nix | PackageManager::Unknown => return None,
    };
    let stdout = capture(program, args).await?;
    Some(count_lines(&stdout).to_string())
}

fn count_lines(text: &str) -> usize {
    text.lines().filter(|line| !line.trim().is_empty()).count()
}
