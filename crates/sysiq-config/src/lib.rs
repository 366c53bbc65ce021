mod profile;

pub use profile::{ApiCredential, PackageManager, SystemProfile};

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Environment variable that overrides `provider.api_key`.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Searched in order when no explicit path is given.
const DEFAULT_CONFIG_PATHS: [&str; 2] = ["./sysiq.toml", "~/.config/sysiq/config.toml"];

/// Profile written by earlier releases (JSON, no provider section).
const LEGACY_CONFIG_PATH: &str = "~/.config/sysiq/config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration file found (looked in {})", .searched.join(", "))]
    NotFound { searched: Vec<String> },

    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration file {} is corrupt: {message}", .path.display())]
    Corrupt { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("no API key configured; set GEMINI_API_KEY or provider.api_key in the config file")]
    MissingCredential,

    #[error("could not write {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    pub profile: ProfileConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// The user's environment as captured by the configurator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub distro: String,
    pub desktop: String,
    pub shell: String,
    pub terminal: String,
    /// Package manager id (pacman, apt, ...). Inferred from `distro` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<String>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            distro: "Arch Linux".to_string(),
            desktop: "Hyprland".to_string(),
            shell: "fish".to_string(),
            terminal: "foot".to_string(),
            package_manager: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Sampling temperature for package discovery. Command stages always use 0.
    #[serde(default = "default_discovery_temperature")]
    pub discovery_temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Request `application/json` output from the provider.
    #[serde(default = "default_true")]
    pub json_mode: bool,
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_discovery_temperature() -> f64 {
    0.2
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: None,
            discovery_temperature: default_discovery_temperature(),
            max_tokens: None,
            timeout_seconds: default_timeout_seconds(),
            json_mode: true,
        }
    }
}

/// How the JSON region is located inside a model reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Everything from the first opening delimiter to the last matching closer.
    #[default]
    Greedy,
    /// The first bracket-balanced value, string-aware.
    Balanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub extraction: ExtractionMode,
    /// Extra attempts when a reply contains no JSON at all.
    #[serde(default)]
    pub retry_on_missing_json: u32,
    /// Extra attempts when a reply's JSON does not match the stage schema.
    #[serde(default)]
    pub retry_on_malformed_json: u32,
    /// Fall back to the first discovered candidate's command when the final
    /// stage yields nothing usable.
    #[serde(default)]
    pub candidate_fallback: bool,
    /// Answer every confirmation with yes.
    #[serde(default)]
    pub auto_confirm: bool,
}

/// Shape of the JSON profile written by earlier releases.
#[derive(Debug, Deserialize)]
struct LegacyProfile {
    #[serde(default)]
    distro: Option<String>,
    #[serde(default)]
    desktop: Option<String>,
    #[serde(default)]
    shell: Option<String>,
    #[serde(default)]
    terminal: Option<String>,
}

impl Config {
    /// The path new configurations are written to.
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .map(|mut path| {
                path.push(".config");
                path.push("sysiq");
                path.push("config.toml");
                path
            })
            .unwrap_or_else(|| PathBuf::from("./sysiq.toml"))
    }

    /// Resolve which configuration file would be loaded, if any.
    pub fn find_config_path(config_path: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = config_path {
            let expanded = PathBuf::from(shellexpand::tilde(path).as_ref());
            return expanded.exists().then_some(expanded);
        }

        DEFAULT_CONFIG_PATHS.iter().find_map(|path| {
            let expanded = PathBuf::from(shellexpand::tilde(path).as_ref());
            expanded.exists().then_some(expanded)
        })
    }

    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(path) = Self::find_config_path(config_path) {
            debug!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            return Self::from_toml_str(&content).map_err(|e| match e {
                ConfigError::Corrupt { message, .. } => ConfigError::Corrupt { path, message },
                other => other,
            });
        }

        // An explicit path never falls back to anything else.
        if let Some(path) = config_path {
            return Err(ConfigError::NotFound {
                searched: vec![path.to_string()],
            });
        }

        let legacy = PathBuf::from(shellexpand::tilde(LEGACY_CONFIG_PATH).as_ref());
        if legacy.exists() {
            warn!(
                "Using legacy JSON profile at {}; run the configurator to migrate it",
                legacy.display()
            );
            let content = std::fs::read_to_string(&legacy).map_err(|source| ConfigError::Read {
                path: legacy.clone(),
                source,
            })?;
            return Self::from_legacy_json(&content).map_err(|e| match e {
                ConfigError::Corrupt { message, .. } => ConfigError::Corrupt {
                    path: legacy,
                    message,
                },
                other => other,
            });
        }

        Err(ConfigError::NotFound {
            searched: DEFAULT_CONFIG_PATHS.iter().map(|p| p.to_string()).collect(),
        })
    }

    pub fn load_with_overrides(
        config_path: Option<&str>,
        model_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::load(config_path)?;

        if let Some(model) = model_override {
            config.provider.model = model;
        }

        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::Corrupt {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the JSON profile format. Missing fields take the configurator defaults.
    pub fn from_legacy_json(content: &str) -> Result<Self, ConfigError> {
        let legacy: LegacyProfile =
            serde_json::from_str(content).map_err(|e| ConfigError::Corrupt {
                path: PathBuf::new(),
                message: e.to_string(),
            })?;
        let defaults = ProfileConfig::default();

        let config = Config {
            profile: ProfileConfig {
                distro: legacy.distro.unwrap_or(defaults.distro),
                desktop: legacy.desktop.unwrap_or(defaults.desktop),
                shell: legacy.shell.unwrap_or(defaults.shell),
                terminal: legacy.terminal.unwrap_or(defaults.terminal),
                package_manager: None,
            },
            ..Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("profile.distro", &self.profile.distro),
            ("profile.desktop", &self.profile.desktop),
            ("profile.shell", &self.profile.shell),
            ("profile.terminal", &self.profile.terminal),
            ("provider.model", &self.provider.model),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("{} must not be empty", name)));
        }
        if self.provider.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "provider.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.provider.discovery_temperature) {
            return Err(ConfigError::Invalid(
                "provider.discovery_temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |message: String| ConfigError::Write {
            path: path.to_path_buf(),
            message,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
            }
        }
        let toml_string = toml::to_string_pretty(self).map_err(|e| write_err(e.to_string()))?;
        let mut file = open_for_write(path, self.provider.api_key.is_some())
            .map_err(|e| write_err(e.to_string()))?;
        file.write_all(toml_string.as_bytes())
            .map_err(|e| write_err(e.to_string()))?;
        Ok(())
    }

    /// The API key, preferring the environment over the file.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                self.provider
                    .api_key
                    .clone()
                    .filter(|key| !key.trim().is_empty())
            })
    }

    pub fn package_manager(&self) -> PackageManager {
        match &self.profile.package_manager {
            Some(id) => PackageManager::from_id(id),
            None => PackageManager::infer_from_distro(&self.profile.distro),
        }
    }

    /// Snapshot the profile for one pipeline run.
    pub fn system_profile(&self) -> Result<SystemProfile, ConfigError> {
        let key = self.resolve_api_key().ok_or(ConfigError::MissingCredential)?;

        Ok(SystemProfile {
            distro: self.profile.distro.clone(),
            desktop: self.profile.desktop.clone(),
            shell: self.profile.shell.clone(),
            terminal: self.profile.terminal.clone(),
            package_manager: self.package_manager(),
            credential: ApiCredential::new(key),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.provider.timeout_seconds)
    }
}

/// Truncate or create `path`. A file holding a key is readable by its owner only.
#[cfg(unix)]
fn open_for_write(path: &Path, private: bool) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mode = if private { 0o600 } else { 0o644 };
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)?;
    // `mode` only applies on creation; an existing file keeps its old bits.
    if private {
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(file)
}

#[cfg(not(unix))]
fn open_for_write(path: &Path, _private: bool) -> std::io::Result<std::fs::File> {
    std::fs::File::create(path)
}

#[cfg(test)]
mod tests;
