//! First-run configurator: asks for the profile fields and saves them.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::Path;
use sysiq_config::{Config, API_KEY_ENV};
use tracing::info;

/// Ask for each profile field, keeping `base` values when the answer is empty.
pub fn capture_profile<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    base: Config,
) -> Result<Config> {
    let mut config = base;

    writeln!(output, "Let's describe your system. Press Enter to keep the value in brackets.")?;
    config.profile.distro = ask(input, output, "Distro", &config.profile.distro)?;
    config.profile.desktop = ask(input, output, "Desktop environment / window manager", &config.profile.desktop)?;
    config.profile.shell = ask(input, output, "Shell", &config.profile.shell)?;
    config.profile.terminal = ask(input, output, "Terminal", &config.profile.terminal)?;

    write!(
        output,
        "Gemini API key (leave empty to use ${}): ",
        API_KEY_ENV
    )?;
    output.flush()?;
    let key = read_answer(input)?;
    if !key.is_empty() {
        config.provider.api_key = Some(key);
    }

    Ok(config)
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str, current: &str) -> Result<String> {
    write!(output, "{} [{}]: ", label, current)?;
    output.flush()?;
    let answer = read_answer(input)?;
    Ok(if answer.is_empty() {
        current.to_string()
    } else {
        answer
    })
}

/// One trimmed line; end of input reads as an empty answer.
fn read_answer<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    input.read_line(&mut line).context("failed to read answer")?;
    Ok(line.trim().to_string())
}

/// Run the configurator on the terminal and save the result to `path`.
pub fn run_configurator(path: &Path) -> Result<Config> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();

    let config = capture_profile(&mut input, &mut output, Config::default())?;
    config
        .save(path)
        .with_context(|| format!("could not save configuration to {}", path.display()))?;

    info!("Saved configuration to {}", path.display());
    writeln!(output, "Saved configuration to {}", path.display())?;
    Ok(config)
}
