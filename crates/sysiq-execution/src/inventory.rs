//! "Is this package already here?" probes.

use anyhow::{bail, Result};
use std::process::Stdio;
use sysiq_config::PackageManager;
use tokio::process::Command;
use tracing::{debug, warn};

/// Answers whether a package is present on the local machine.
///
/// Answers are approximate. Callers treat an `Err` as "not installed".
#[async_trait::async_trait]
pub trait LocalInventory: Send + Sync {
    async fn is_installed(&self, package: &str) -> Result<bool>;
}

/// Queries the native package database, then falls back to a PATH lookup.
pub struct SystemInventory {
    package_manager: PackageManager,
}

impl SystemInventory {
    pub fn new(package_manager: PackageManager) -> Self {
        Self { package_manager }
    }

    pub fn package_manager(&self) -> PackageManager {
        self.package_manager
    }

    /// argv for the package-database query, when this manager has one.
    fn query_argv(&self, package: &str) -> Option<Vec<String>> {
        let argv: &[&str] = match self.package_manager {
            PackageManager::Pacman => &["pacman", "-Q"],
            PackageManager::Apt => &["dpkg", "-s"],
            PackageManager::Dnf | PackageManager::Zypper => &["rpm", "-q"],
            PackageManager::Apk => &["apk", "info", "-e"],
            PackageManager::Xbps => &["xbps-query"],
            PackageManager::Emerge | PackageManager::Nix | PackageManager::Unknown => {
                return None
            }
        };
        let mut argv: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
        argv.push(package.to_string());
        Some(argv)
    }

    /// `Some(answer)` when the package database could be asked at all.
    async fn query_package_db(&self, package: &str) -> Result<Option<bool>> {
        let Some(argv) = self.query_argv(package) else {
            return Ok(None);
        };

        let status = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => {
                debug!("{} -> {}", argv.join(" "), status);
                Ok(Some(status.success()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("{} is not available, falling back to PATH lookup", argv[0]);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Package names as package managers spell them.
fn is_plausible_package_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._+-@/:".contains(c))
}

#[async_trait::async_trait]
impl LocalInventory for SystemInventory {
    async fn is_installed(&self, package: &str) -> Result<bool> {
        let package = package.trim();
        if !is_plausible_package_name(package) {
            bail!("'{}' is not a valid package name", package);
        }

        if let Some(true) = self.query_package_db(package).await? {
            return Ok(true);
        }

        // Many packages ship a binary of the same name; the package may also
        // have come from somewhere other than the package manager.
        let on_path = which::which(package).is_ok();
        debug!("{} on PATH: {}", package, on_path);
        Ok(on_path)
    }
}
