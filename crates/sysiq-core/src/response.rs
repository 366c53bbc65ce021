//! Typed stage results decoded from extracted JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sysiq_config::ExtractionMode;
use tracing::{debug, warn};

use crate::error::ReplyError;
use crate::extract::extract;

/// One package proposed by the model, with a command that uses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCandidate {
    #[serde(rename = "package_name")]
    pub name: String,
    /// Ready-to-run command tied to this package.
    pub command: String,
}

/// Package-discovery reply in either accepted shape.
///
/// The bare array is canonical and is what the prompt asks for. The
/// `{"packages": [...]}` wrapper is still accepted because models keep
/// producing it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PackageReply {
    List(Vec<PackageCandidate>),
    Wrapped { packages: Vec<PackageCandidate> },
}

impl PackageReply {
    fn into_candidates(self) -> Vec<PackageCandidate> {
        match self {
            PackageReply::List(candidates) => candidates,
            PackageReply::Wrapped { packages } => packages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallDirective {
    /// Empty means the model did not know.
    pub install_command: String,
}

impl InstallDirective {
    pub fn is_empty(&self) -> bool {
        self.install_command.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalDirective {
    /// Empty means the model did not know.
    pub command: String,
}

impl FinalDirective {
    pub fn is_empty(&self) -> bool {
        self.command.trim().is_empty()
    }
}

/// Parse `text` as JSON, yielding `Value::Null` instead of an error.
pub fn safe_parse(text: &str) -> Value {
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            debug!("safe_parse fell back to null: {}", e);
            Value::Null
        }
    }
}

/// Decode extracted JSON into a stage result type.
pub fn parse_as<T: DeserializeOwned>(text: &str) -> Result<T, ReplyError> {
    let value = safe_parse(text);
    if value.is_null() {
        return Err(ReplyError::Schema("reply is not a JSON value".to_string()));
    }
    serde_json::from_value(value).map_err(|e| ReplyError::Schema(e.to_string()))
}

/// Decode a package-discovery reply.
///
/// Candidates with a blank name are dropped, as are repeated names; model
/// order is kept otherwise.
pub fn parse_packages(text: &str) -> Result<Vec<PackageCandidate>, ReplyError> {
    let reply: PackageReply = parse_as(text).map_err(|e| match e {
        ReplyError::Schema(detail) => ReplyError::Schema(format!(
            "expected an array of {{package_name, command}} objects or {{\"packages\": [...]}} ({})",
            detail
        )),
        other => other,
    })?;

    let mut candidates: Vec<PackageCandidate> = Vec::new();
    for mut candidate in reply.into_candidates() {
        candidate.name = candidate.name.trim().to_string();
        candidate.command = candidate.command.trim().to_string();

        if candidate.name.is_empty() {
            warn!("Skipping package candidate with a blank name: {:?}", candidate);
            continue;
        }
        if candidates.iter().any(|c| c.name == candidate.name) {
            debug!("Skipping repeated package candidate {}", candidate.name);
            continue;
        }
        candidates.push(candidate);
    }
    Ok(candidates)
}

pub fn parse_install(text: &str) -> Result<InstallDirective, ReplyError> {
    let mut directive: InstallDirective = parse_as(text)?;
    directive.install_command = directive.install_command.trim().to_string();
    Ok(directive)
}

pub fn parse_final(text: &str) -> Result<FinalDirective, ReplyError> {
    let mut directive: FinalDirective = parse_as(text)?;
    directive.command = directive.command.trim().to_string();
    Ok(directive)
}

/// Extract then decode a raw reply.
pub fn resolve<T>(
    raw: &str,
    mode: ExtractionMode,
    parse: fn(&str) -> Result<T, ReplyError>,
) -> Result<T, ReplyError> {
    let json = extract(raw, mode)?;
    parse(json)
}
