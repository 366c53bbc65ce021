//! sysiq CLI - asks a model which command answers your request, installs
//! what is missing and runs it after you confirm.

mod cli_args;
mod display;
mod setup;
mod sysiq_status;
mod ui_writer_impl;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::debug;

use sysiq_config::{Config, ConfigError};
use sysiq_core::{Pipeline, PipelineOptions, UiWriter};
use sysiq_execution::{system_info, ShellRunner, SystemInventory};
use sysiq_providers::GeminiProvider;

pub use cli_args::Cli;

use sysiq_status::SysiqStatus;
use ui_writer_impl::ConsoleUiWriter;

pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    initialize_logging(cli.verbose);

    let ui = ConsoleUiWriter::new();

    let config = match load_or_create_config(&cli, &ui) {
        Ok(Some(config)) => config,
        Ok(None) => return Ok(ExitCode::from(1)),
        Err(e) => {
            SysiqStatus::fatal(&format!("{:#}", e));
            return Ok(ExitCode::from(1));
        }
    };

    let package_manager = config.package_manager();

    if cli.show_profile {
        let facts = system_info::gather(package_manager, &config.profile.shell).await;
        print!("{}", display::format_profile(&config, &facts));
        if cli.query_text().is_none() {
            return Ok(ExitCode::SUCCESS);
        }
    }

    // Checked before anything touches the network.
    let profile = match config.system_profile() {
        Ok(profile) => profile,
        Err(e) => {
            SysiqStatus::fatal(&e.to_string());
            return Ok(ExitCode::from(1));
        }
    };

    let query = match cli.query_text() {
        Some(query) => query,
        None => match ask_for_query()? {
            Some(query) => query,
            None => return Ok(ExitCode::SUCCESS),
        },
    };

    let facts = system_info::gather(package_manager, &profile.shell).await;

    let mut provider = GeminiProvider::new(
        profile.credential.expose().to_string(),
        Some(config.provider.model.clone()),
        config.provider.max_tokens,
        Some(config.request_timeout()),
    )
    .context("failed to set up the Gemini provider")?;
    if let Some(base_url) = &config.provider.base_url {
        provider = provider.with_base_url(base_url.clone());
    }

    let mut options = PipelineOptions::from_config(&config).with_dry_run(cli.dry_run);
    if cli.yes {
        options = options.with_auto_confirm(true);
    }
    debug!("Pipeline options: {:?}", options);

    let runner = ShellRunner::new(&profile.shell);
    let pipeline = Pipeline::new(
        Box::new(provider),
        Box::new(SystemInventory::new(package_manager)),
        Box::new(runner),
        ui,
        profile,
        facts,
    )
    .with_options(options);

    let report = pipeline.run(&query).await;
    if let Some(failure) = report.failure() {
        debug!("Run {} failed: {:?}", report.run_id, failure);
    }

    Ok(ExitCode::from(report.exit_code()))
}

// --- Helper functions ---

fn initialize_logging(verbose: bool) {
    use tracing_subscriber::filter::Directive;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "warn" };
    let mut filter = EnvFilter::from_default_env();
    for target in [
        env!("CARGO_PKG_NAME").replace('-', "_"),
        "sysiq".to_string(),
        "sysiq_core".to_string(),
        "sysiq_config".to_string(),
        "sysiq_execution".to_string(),
        "sysiq_providers".to_string(),
    ] {
        if let Ok(directive) = format!("{}={}", target, level).parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }

    // stdout belongs to the conversation with the user.
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init();
}

/// `Ok(None)` means the user chose not to create a configuration.
fn load_or_create_config(cli: &Cli, ui: &ConsoleUiWriter) -> Result<Option<Config>> {
    match Config::load_with_overrides(cli.config.as_deref(), cli.model.clone()) {
        Ok(config) => Ok(Some(config)),
        // An explicit --config path that does not exist is always an error.
        Err(ConfigError::NotFound { .. }) if cli.config.is_none() => {
            SysiqStatus::info("no configuration found");
            if !ui.prompt_user_yes_no("Run the configurator now?") {
                SysiqStatus::fatal("a configuration is required; rerun sysiq to create one");
                return Ok(None);
            }
            let path = Config::default_config_path();
            let mut config = setup::run_configurator(&path)?;
            if let Some(model) = &cli.model {
                config.provider.model = model.clone();
            }
            Ok(Some(config))
        }
        Err(e) => Err(e.into()),
    }
}

/// Prompt for a query on stdin. `None` for exit, quit, empty input or EOF.
fn ask_for_query() -> Result<Option<String>> {
    print!("Enter your CLI query (or type 'exit' to quit): ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(parse_query_answer(&line))
}

fn parse_query_answer(line: &str) -> Option<String> {
    let query = line.trim();
    match query {
        "" | "exit" | "quit" => None,
        _ => Some(query.to_string()),
    }
}
