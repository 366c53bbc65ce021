//! Prompt templates for the three stages.
//!
//! Every prompt opens with the user's environment and closes with the exact
//! JSON shape expected back. Placeholders use `{{NAME}}` and are filled by
//! [`build`] in a single pass, so text supplied by the user or read from the
//! machine is never expanded.

use sysiq_config::SystemProfile;
use sysiq_execution::SystemFacts;

use crate::stage::Stage;

/// Shared opening: who is asking and on what machine.
pub const ENVIRONMENT_PREAMBLE: &str = "Considering I am using distro: {{DISTRO}}, \
Desktop Environment: {{DESKTOP}}, Shell: {{SHELL}}, Terminal: {{TERMINAL}}, \
package manager: {{PACKAGE_MANAGER}}, and system info: {{SYSTEM_INFO}}";

/// Shared closing rules about the reply format.
pub const REPLY_RULES: &str = r#"Reply with ONLY that JSON. Do not write any text before or after it, do not wrap it in markdown code fences, and do not escape newlines."#;

pub const PACKAGE_DISCOVERY_PROMPT: &str = r#"{{PREAMBLE}}, list the packages needed to answer the following request:
{{QUERY}}

For every package you name, give the canonical package name exactly as my package manager knows it, and a ready-to-run shell command that uses that package to answer the request.

Answer with a JSON array in exactly this shape:
[{"package_name": "<string>", "command": "<string>"}]

{{RULES}}"#;

pub const INSTALL_RESOLUTION_PROMPT: &str = r#"{{PREAMBLE}}, I am missing the following packages:
{{MISSING}}

Give the single-line shell command that installs all of them.

Answer with a JSON object in exactly this shape:
{"install_command": "<string>"}

{{RULES}}"#;

pub const FINAL_COMMAND_PROMPT: &str = r#"{{PREAMBLE}}, and that all required packages are installed, give the single-line shell command that answers the following request:
{{QUERY}}

Answer with a JSON object in exactly this shape:
{"command": "<string>"}

{{RULES}}"#;

/// Render the prompt for `stage`. Pure and deterministic.
pub fn build(stage: &Stage, profile: &SystemProfile, facts: &SystemFacts) -> String {
    let template = match stage {
        Stage::PackageDiscovery { .. } => PACKAGE_DISCOVERY_PROMPT,
        Stage::InstallResolution { .. } => INSTALL_RESOLUTION_PROMPT,
        Stage::FinalCommand { .. } => FINAL_COMMAND_PROMPT,
    };
    let template = template
        .replace("{{PREAMBLE}}", ENVIRONMENT_PREAMBLE)
        .replace("{{RULES}}", REPLY_RULES);

    let system_info = facts.to_json();
    let payload = match stage {
        Stage::PackageDiscovery { query } | Stage::FinalCommand { query } => ("QUERY", query.clone()),
        Stage::InstallResolution { missing } => ("MISSING", missing.join("\n")),
    };

    fill(
        &template,
        &[
            ("DISTRO", profile.distro.as_str()),
            ("DESKTOP", profile.desktop.as_str()),
            ("SHELL", profile.shell.as_str()),
            ("TERMINAL", profile.terminal.as_str()),
            ("PACKAGE_MANAGER", profile.package_manager.id()),
            ("SYSTEM_INFO", system_info.as_str()),
            (payload.0, payload.1.as_str()),
        ],
    )
}

/// Replace each known `{{NAME}}` in one left-to-right pass. Inserted values
/// are never scanned again, so braces inside them stay literal.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let known = after.find("}}").and_then(|end| {
            let name = &after[..end];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (end, *value))
        });

        match known {
            Some((end, value)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
