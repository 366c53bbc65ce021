use std::fmt;
use sysiq_config::SystemProfile;
use sysiq_execution::SystemFacts;
use sysiq_providers::CompletionRequest;

use crate::prompts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    PackageDiscovery,
    InstallResolution,
    FinalCommand,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::PackageDiscovery => "package discovery",
            StageKind::InstallResolution => "install resolution",
            StageKind::FinalCommand => "final command",
        };
        f.write_str(name)
    }
}

/// A stage together with the payload its prompt needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    PackageDiscovery { query: String },
    InstallResolution { missing: Vec<String> },
    FinalCommand { query: String },
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::PackageDiscovery { .. } => StageKind::PackageDiscovery,
            Stage::InstallResolution { .. } => StageKind::InstallResolution,
            Stage::FinalCommand { .. } => StageKind::FinalCommand,
        }
    }
}

/// One stage invocation: rendered prompt plus the context it came from.
/// Built per call and dropped once the reply is resolved.
#[derive(Debug, Clone)]
pub struct StageRequest<'a> {
    pub stage: Stage,
    pub prompt: String,
    pub profile: &'a SystemProfile,
}

impl<'a> StageRequest<'a> {
    pub fn new(stage: Stage, profile: &'a SystemProfile, facts: &SystemFacts) -> Self {
        let prompt = prompts::build(&stage, profile, facts);
        Self {
            stage,
            prompt,
            profile,
        }
    }

    pub fn kind(&self) -> StageKind {
        self.stage.kind()
    }

    pub fn completion_request(
        &self,
        temperature: f32,
        json_output: bool,
        max_tokens: Option<u32>,
    ) -> CompletionRequest {
        let request = CompletionRequest::new(self.prompt.clone())
            .with_temperature(temperature)
            .with_json_output(json_output);
        match max_tokens {
            Some(max_tokens) => request.with_max_tokens(max_tokens),
            None => request,
        }
    }
}
