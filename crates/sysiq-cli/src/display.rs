//! `--show-profile` output.

use crossterm::style::{Attribute, SetAttribute};
use sysiq_config::Config;
use sysiq_execution::SystemFacts;

fn heading(title: &str) -> String {
    format!(
        "{}{}{}",
        SetAttribute(Attribute::Bold),
        title,
        SetAttribute(Attribute::Reset)
    )
}

/// Render the profile, provider settings and system facts as text.
pub fn format_profile(config: &Config, facts: &SystemFacts) -> String {
    let key_source = if std::env::var(sysiq_config::API_KEY_ENV)
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false)
    {
        "environment"
    } else if config.provider.api_key.is_some() {
        "config file"
    } else {
        "not set"
    };

    let rows: Vec<(&str, String)> = vec![
        ("Distro", config.profile.distro.clone()),
        ("Desktop", config.profile.desktop.clone()),
        ("Shell", config.profile.shell.clone()),
        ("Terminal", config.profile.terminal.clone()),
        ("Package manager", config.package_manager().to_string()),
        ("Model", config.provider.model.clone()),
        ("API key", key_source.to_string()),
    ];
    let facts_rows: Vec<(&str, String)> = vec![
        ("Kernel", facts.kernel.clone()),
        ("Uptime", facts.uptime.clone()),
        ("Packages", facts.packages.clone()),
        ("Shell version", facts.shell_version.clone()),
        ("Monitor", facts.monitor.clone()),
    ];

    let mut out = String::new();
    out.push_str(&heading("Current configuration"));
    out.push('\n');
    for (label, value) in rows {
        out.push_str(&format!("  {:<16} {}\n", label, value));
    }
    out.push_str(&heading("System information"));
    out.push('\n');
    for (label, value) in facts_rows {
        out.push_str(&format!("  {:<16} {}\n", label, value));
    }
    out
}
