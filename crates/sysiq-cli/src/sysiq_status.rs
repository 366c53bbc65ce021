//! Formatting for "sysiq:" prefixed status lines.
//!
//! ```ignore
//! SysiqStatus::progress("discovering packages");
//! SysiqStatus::done();
//! ```

use crossterm::style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor};
use std::io::{self, Write};

pub struct SysiqStatus;

impl SysiqStatus {
    fn prefix() -> String {
        format!(
            "{}{}sysiq:{}{}",
            SetAttribute(Attribute::Bold),
            SetForegroundColor(Color::Green),
            ResetColor,
            SetAttribute(Attribute::Reset)
        )
    }

    /// "sysiq: <message> ..." without a newline; finish with `done()` or `error()`.
    pub fn progress(message: &str) {
        print!("{} {} ...", Self::prefix(), message);
        let _ = io::stdout().flush();
    }

    pub fn done() {
        println!(
            " {}{}[done]{}",
            SetForegroundColor(Color::Green),
            SetAttribute(Attribute::Bold),
            ResetColor
        );
    }

    /// Complete a progress line with "[error: <msg>]" in red.
    pub fn error(msg: &str) {
        println!(
            " {}[error: {}]{}",
            SetForegroundColor(Color::Red),
            msg,
            ResetColor
        );
    }

    /// One full status line.
    pub fn info(message: &str) {
        println!("{} {}", Self::prefix(), message);
    }

    pub fn warning(message: &str) {
        println!(
            "{} {}{}{}",
            Self::prefix(),
            SetForegroundColor(Color::Yellow),
            message,
            ResetColor
        );
    }

    /// Fatal problems go to stderr so they survive stdout redirection.
    pub fn fatal(message: &str) {
        eprintln!(
            "{}{}sysiq:{} {}{}{}",
            SetAttribute(Attribute::Bold),
            SetForegroundColor(Color::Red),
            SetAttribute(Attribute::Reset),
            SetForegroundColor(Color::Red),
            message,
            ResetColor
        );
    }
}
