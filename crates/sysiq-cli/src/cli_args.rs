//! CLI argument parsing for sysiq.

use clap::Parser;

#[derive(Parser, Clone, Debug)]
#[command(name = "sysiq")]
#[command(about = "Turns a plain-language request into a shell command for your system")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the configured model
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Resolve and print commands without executing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Print the configured profile and detected system facts
    #[arg(long)]
    pub show_profile: bool,

    /// What you want to do, in plain words (asked interactively if omitted)
    #[arg(value_name = "QUERY", trailing_var_arg = true)]
    pub query: Vec<String>,
}

impl Cli {
    /// The query words joined by single spaces, if any were given.
    pub fn query_text(&self) -> Option<String> {
        let text = self.query.join(" ");
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}
