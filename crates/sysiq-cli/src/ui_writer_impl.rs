use crossterm::style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor};
use std::io::{self, Write};
use sysiq_core::{PackageCandidate, UiWriter};
use sysiq_execution::ExecutionResult;

use crate::sysiq_status::SysiqStatus;

/// Console implementation of UiWriter
pub struct ConsoleUiWriter;

impl ConsoleUiWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleUiWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl UiWriter for ConsoleUiWriter {
    fn println(&self, message: &str) {
        println!("{}", message);
    }

    fn print_stage_start(&self, description: &str) {
        SysiqStatus::progress(description);
    }

    fn print_stage_done(&self) {
        SysiqStatus::done();
    }

    fn print_stage_failed(&self, message: &str) {
        SysiqStatus::error(message);
    }

    fn print_candidates(&self, candidates: &[PackageCandidate]) {
        for candidate in candidates {
            println!(
                "  {}{}{}  {}",
                SetAttribute(Attribute::Bold),
                candidate.name,
                SetAttribute(Attribute::Reset),
                candidate.command
            );
        }
    }

    fn print_command(&self, label: &str, command: &str) {
        println!(
            "{}: {}{}{}",
            label,
            SetForegroundColor(Color::Cyan),
            command,
            ResetColor
        );
    }

    fn print_command_output(&self, result: &ExecutionResult) {
        let stdout = result.stdout.trim_end();
        if !stdout.is_empty() {
            println!("{}", stdout);
        }
        let stderr = result.stderr.trim_end();
        if !stderr.is_empty() {
            eprintln!(
                "{}{}{}",
                SetForegroundColor(Color::DarkGrey),
                stderr,
                ResetColor
            );
        }
    }

    fn print_warning(&self, message: &str) {
        SysiqStatus::warning(message);
    }

    fn prompt_user_yes_no(&self, message: &str) -> bool {
        print!("{} [y/N] ", message);
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_ok() {
            let trimmed = input.trim().to_lowercase();
            trimmed == "y" || trimmed == "yes"
        } else {
            false
        }
    }
}
