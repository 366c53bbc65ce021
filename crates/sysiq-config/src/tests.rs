#[cfg(test)]
mod tests {
    use crate::{Config, ConfigError, ExtractionMode, PackageManager, API_KEY_ENV};
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> String {
        let config_path = dir.path().join("sysiq.toml");
        fs::write(&config_path, content).unwrap();
        config_path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_load_full_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            r#"
[profile]
distro = "Ubuntu 24.04"
desktop = "GNOME"
shell = "bash"
terminal = "gnome-terminal"

[provider]
api_key = "file-key"
model = "gemini-1.5-pro"
discovery_temperature = 0.4
timeout_seconds = 15
json_mode = false

[pipeline]
extraction = "balanced"
retry_on_missing_json = 1
candidate_fallback = true
"#,
        );

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.profile.distro, "Ubuntu 24.04");
        assert_eq!(config.provider.model, "gemini-1.5-pro");
        assert_eq!(config.provider.timeout_seconds, 15);
        assert!(!config.provider.json_mode);
        assert_eq!(config.pipeline.extraction, ExtractionMode::Balanced);
        assert_eq!(config.pipeline.retry_on_missing_json, 1);
        assert_eq!(config.pipeline.retry_on_malformed_json, 0);
        assert!(config.pipeline.candidate_fallback);
        assert!(!config.pipeline.auto_confirm);
        assert_eq!(config.package_manager(), PackageManager::Apt);
    }

    #[test]
    fn test_profile_only_config_takes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            r#"
[profile]
distro = "Arch Linux"
desktop = "Hyprland"
shell = "fish"
terminal = "foot"
"#,
        );

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.provider.model, "gemini-2.0-flash");
        assert_eq!(config.provider.timeout_seconds, 60);
        assert!(config.provider.json_mode);
        assert_eq!(config.pipeline.extraction, ExtractionMode::Greedy);
        assert_eq!(config.package_manager(), PackageManager::Pacman);
    }

    #[test]
    fn test_explicit_package_manager_wins_over_distro() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            r#"
[profile]
distro = "Arch Linux"
desktop = "sway"
shell = "zsh"
terminal = "alacritty"
package_manager = "nix"
"#,
        );

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.package_manager(), PackageManager::Nix);
    }

    #[test]
    fn test_missing_explicit_path_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");

        let err = Config::load(Some(missing.to_str().unwrap())).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }), "got {:?}", err);
    }

    #[test]
    fn test_corrupt_file_is_reported_with_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, "[profile\ndistro = ");

        let err = Config::load(Some(&path)).unwrap_err();
        match err {
            ConfigError::Corrupt { path: reported, .. } => {
                assert!(reported.ends_with("sysiq.toml"))
            }
            other => panic!("expected Corrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_profile_field_is_invalid() {
        let err = Config::from_toml_str(
            r#"
[profile]
distro = ""
desktop = "Hyprland"
shell = "fish"
terminal = "foot"
"#,
        )
        .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("profile.distro"), "got: {}", msg);
    }

    #[test]
    fn test_zero_timeout_is_invalid() {
        let err = Config::from_toml_str(
            r#"
[profile]
distro = "Arch Linux"
desktop = "Hyprland"
shell = "fish"
terminal = "foot"

[provider]
timeout_seconds = 0
"#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.profile.distro = "Fedora 40".to_string();
        config.pipeline.auto_confirm = true;
        config.save(&path).unwrap();

        let loaded = Config::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_saved_temperature_keeps_its_written_form() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        Config::default().save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("discovery_temperature = 0.2\n"), "{}", text);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_api_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        // A pre-existing world-readable file must be tightened too.
        fs::write(&path, "").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let mut config = Config::default();
        config.provider.api_key = Some("secret".to_string());
        config.save(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0, "mode was {:o}", mode & 0o777);
        assert!(fs::read_to_string(&path).unwrap().contains("secret"));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_config_without_key_is_owner_writable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        Config::default().save(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o600, 0o600);
    }

    #[test]
    fn test_legacy_json_profile() {
        let config = Config::from_legacy_json(
            r#"{"distro":"Ubuntu","desktop":"KDE","shell":"zsh","ai_api":"Gemini"}"#,
        )
        .unwrap();

        assert_eq!(config.profile.distro, "Ubuntu");
        assert_eq!(config.profile.desktop, "KDE");
        assert_eq!(config.profile.shell, "zsh");
        // Missing fields fall back to the configurator defaults.
        assert_eq!(config.profile.terminal, "foot");
        assert_eq!(config.provider.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_legacy_json_garbage_is_corrupt() {
        let err = Config::from_legacy_json("not json").unwrap_err();
        assert!(matches!(err, ConfigError::Corrupt { .. }));
    }

    #[test]
    fn test_model_override() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            r#"
[profile]
distro = "Arch Linux"
desktop = "Hyprland"
shell = "fish"
terminal = "foot"
"#,
        );

        let config =
            Config::load_with_overrides(Some(&path), Some("gemini-2.5-pro".to_string())).unwrap();
        assert_eq!(config.provider.model, "gemini-2.5-pro");
    }

    #[test]
    #[serial]
    fn test_env_credential_takes_precedence() {
        std::env::set_var(API_KEY_ENV, "env-key");

        let mut config = Config::default();
        config.provider.api_key = Some("file-key".to_string());
        let profile = config.system_profile().unwrap();

        std::env::remove_var(API_KEY_ENV);
        assert_eq!(profile.credential.expose(), "env-key");
    }

    #[test]
    #[serial]
    fn test_file_credential_used_without_env() {
        std::env::remove_var(API_KEY_ENV);

        let mut config = Config::default();
        config.provider.api_key = Some("file-key".to_string());
        let profile = config.system_profile().unwrap();

        assert_eq!(profile.credential.expose(), "file-key");
        assert_eq!(profile.distro, "Arch Linux");
        assert_eq!(profile.package_manager, PackageManager::Pacman);
    }

    #[test]
    #[serial]
    fn test_missing_credential_is_fatal() {
        std::env::remove_var(API_KEY_ENV);

        let mut config = Config::default();
        config.provider.api_key = Some("   ".to_string());

        let err = config.system_profile().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential));
    }
}
