//! Immutable snapshot of the user's environment for one pipeline run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An API key. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredential(String);

impl ApiCredential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Pacman,
    Apt,
    Dnf,
    Zypper,
    Apk,
    Xbps,
    Emerge,
    Nix,
    Unknown,
}

impl PackageManager {
    /// Guess the package manager from a free-form distro name.
    pub fn infer_from_distro(distro: &str) -> Self {
        let distro = distro.to_lowercase();
        let matches_any = |names: &[&str]| names.iter().any(|n| distro.contains(n));

        if matches_any(&["arch", "manjaro", "endeavour", "garuda", "artix", "cachyos"]) {
            PackageManager::Pacman
        } else if matches_any(&["ubuntu", "debian", "mint", "pop", "elementary", "kali", "raspbian", "zorin"]) {
            PackageManager::Apt
        } else if matches_any(&["fedora", "rhel", "red hat", "centos", "rocky", "alma", "nobara"]) {
            PackageManager::Dnf
        } else if matches_any(&["opensuse", "suse"]) {
            PackageManager::Zypper
        } else if distro.contains("alpine") {
            PackageManager::Apk
        } else if distro.contains("void") {
            PackageManager::Xbps
        } else if matches_any(&["gentoo", "funtoo"]) {
            PackageManager::Emerge
        } else if distro.contains("nixos") {
            PackageManager::Nix
        } else {
            PackageManager::Unknown
        }
    }

    pub fn from_id(id: &str) -> Self {
        match id.trim().to_lowercase().as_str() {
            "pacman" | "paru" | "yay" => PackageManager::Pacman,
            "apt" | "apt-get" | "dpkg" => PackageManager::Apt,
            "dnf" | "yum" | "rpm" => PackageManager::Dnf,
            "zypper" => PackageManager::Zypper,
            "apk" => PackageManager::Apk,
            "xbps" | "xbps-install" => PackageManager::Xbps,
            "emerge" | "portage" => PackageManager::Emerge,
            "nix" | "nix-env" => PackageManager::Nix,
            _ => PackageManager::Unknown,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            PackageManager::Pacman => "pacman",
            PackageManager::Apt => "apt",
            PackageManager::Dnf => "dnf",
            PackageManager::Zypper => "zypper",
            PackageManager::Apk => "apk",
            PackageManager::Xbps => "xbps",
            PackageManager::Emerge => "emerge",
            PackageManager::Nix => "nix",
            PackageManager::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Read-only environment description handed to every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemProfile {
    pub distro: String,
    pub desktop: String,
    pub shell: String,
    pub terminal: String,
    pub package_manager: PackageManager,
    pub credential: ApiCredential,
}

impl SystemProfile {
    /// Build a profile directly, inferring the package manager from `distro`.
    pub fn new(
        distro: &str,
        desktop: &str,
        shell: &str,
        terminal: &str,
        credential: ApiCredential,
    ) -> Self {
        Self {
            distro: distro.to_string(),
            desktop: desktop.to_string(),
            shell: shell.to_string(),
            terminal: terminal.to_string(),
            package_manager: PackageManager::infer_from_distro(distro),
            credential,
        }
    }

    pub fn with_package_manager(mut self, package_manager: PackageManager) -> Self {
        self.package_manager = package_manager;
        self
    }
}
