//! Isolate the JSON value inside a free-form model reply.
//!
//! Models wrap their answer in prose or markdown fences often enough that the
//! reply text is never parsed directly. Two strategies are offered:
//!
//! - [`ExtractionMode::Greedy`] (default) takes everything from the first
//!   opening delimiter to the last closer of the same kind. Prompts are tuned
//!   against this behaviour. Two separate JSON fragments in one reply get
//!   merged and then rejected.
//! - [`ExtractionMode::Balanced`] walks the text and returns the first
//!   bracket-balanced value that parses, ignoring delimiters inside strings.
//!
//! Either way, a successful extraction is always valid JSON.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use sysiq_config::ExtractionMode;
use tracing::debug;

use crate::error::ReplyError;

static GREEDY_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("greedy object regex must compile"));
static GREEDY_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("greedy array regex must compile"));

/// Return the JSON substring of `raw`, or `NotFound`.
pub fn extract(raw: &str, mode: ExtractionMode) -> Result<&str, ReplyError> {
    let found = match mode {
        ExtractionMode::Greedy => greedy(raw),
        ExtractionMode::Balanced => balanced(raw),
    };

    match found {
        Some(json) => {
            debug!("Extracted {} of {} reply bytes as JSON", json.len(), raw.len());
            Ok(json)
        }
        None => {
            debug!("No JSON value in reply: {:?}", raw);
            Err(ReplyError::NotFound)
        }
    }
}

fn is_valid_json(text: &str) -> bool {
    serde_json::from_str::<serde::de::IgnoredAny>(text).is_ok()
}

fn greedy(raw: &str) -> Option<&str> {
    let mut spans: Vec<Range<usize>> = Vec::with_capacity(2);
    for re in [&*GREEDY_OBJECT, &*GREEDY_ARRAY] {
        if let Some(m) = re.find(raw) {
            spans.push(m.range());
        }
    }

    // Whichever kind opens first wins; the other is a fallback for prose
    // like "see [the docs]" ahead of an object.
    spans.sort_by_key(|span| span.start);
    spans
        .into_iter()
        .map(|span| &raw[span])
        .find(|candidate| is_valid_json(candidate))
}

fn balanced(raw: &str) -> Option<&str> {
    raw.char_indices()
        .filter(|(_, c)| *c == '{' || *c == '[')
        .filter_map(|(start, _)| balanced_end(raw, start).map(|end| &raw[start..end]))
        .find(|candidate| is_valid_json(candidate))
}

/// Byte index just past the closer matching the opener at `start`.
fn balanced_end(raw: &str, start: usize) -> Option<usize> {
    let mut expected: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in raw[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => expected.push('}'),
            '[' if !in_string => expected.push(']'),
            '}' | ']' if !in_string => {
                if expected.pop() != Some(c) {
                    return None;
                }
                if expected.is_empty() {
                    return Some(start + i + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}
