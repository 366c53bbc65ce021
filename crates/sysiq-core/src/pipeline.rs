//! The three-stage run: discover packages, install what is missing, then
//! resolve and run the command that answers the request.
//!
//! Stages run strictly one after another. Every stage boundary converts
//! errors into a terminal [`Failure`]; nothing escapes as a panic or an
//! untyped error.

use sysiq_config::{Config, ExtractionMode, SystemProfile};
use sysiq_execution::{CommandRunner, ExecutionResult, LocalInventory, SystemFacts};
use sysiq_providers::LLMProvider;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{Failure, ReplyError, StageError};
use crate::response::{
    parse_final, parse_install, parse_packages, resolve, FinalDirective, InstallDirective,
    PackageCandidate,
};
use crate::stage::{Stage, StageKind, StageRequest};
use crate::ui_writer::UiWriter;

/// Install and final stages want the most likely command, not variety.
const COMMAND_TEMPERATURE: f32 = 0.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub extraction: ExtractionMode,
    /// Re-send a prompt whose reply held no JSON, at most this many times.
    pub retry_on_missing_json: u32,
    /// Re-send a prompt whose JSON missed the schema, at most this many times.
    pub retry_on_malformed_json: u32,
    /// Use the first candidate's command when the final stage yields nothing.
    pub candidate_fallback: bool,
    pub auto_confirm: bool,
    /// Resolve every command but execute none.
    pub dry_run: bool,
    pub discovery_temperature: f32,
    pub json_mode: bool,
    pub max_tokens: Option<u32>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            extraction: ExtractionMode::Greedy,
            retry_on_missing_json: 0,
            retry_on_malformed_json: 0,
            candidate_fallback: false,
            auto_confirm: false,
            dry_run: false,
            discovery_temperature: 0.2,
            json_mode: true,
            max_tokens: None,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            extraction: config.pipeline.extraction,
            retry_on_missing_json: config.pipeline.retry_on_missing_json,
            retry_on_malformed_json: config.pipeline.retry_on_malformed_json,
            candidate_fallback: config.pipeline.candidate_fallback,
            auto_confirm: config.pipeline.auto_confirm,
            dry_run: false,
            discovery_temperature: config.provider.discovery_temperature as f32,
            json_mode: config.provider.json_mode,
            max_tokens: config.provider.max_tokens,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_auto_confirm(mut self, auto_confirm: bool) -> Self {
        self.auto_confirm = auto_confirm;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Finished, whether or not the user chose to run anything.
    Done,
    Failed(Failure),
}

/// Everything a run produced, in stage order.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub query: String,
    pub candidates: Vec<PackageCandidate>,
    pub installed: Vec<String>,
    pub missing: Vec<String>,
    pub install: Option<InstallDirective>,
    pub install_result: Option<ExecutionResult>,
    pub final_command: Option<FinalDirective>,
    /// The final command came from the first candidate, not the final stage.
    pub used_fallback: bool,
    pub final_result: Option<ExecutionResult>,
    /// The confirmation the user turned down, if any.
    pub declined: Option<StageKind>,
    pub outcome: Outcome,
}

impl PipelineReport {
    fn new(run_id: Uuid, query: &str) -> Self {
        Self {
            run_id,
            query: query.to_string(),
            candidates: Vec::new(),
            installed: Vec::new(),
            missing: Vec::new(),
            install: None,
            install_result: None,
            final_command: None,
            used_fallback: false,
            final_result: None,
            declined: None,
            outcome: Outcome::Done,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Done)
    }

    pub fn failure(&self) -> Option<&Failure> {
        match &self.outcome {
            Outcome::Failed(failure) => Some(failure),
            Outcome::Done => None,
        }
    }

    /// 1 for a failed run, 0 otherwise. Declines and non-zero command exits
    /// still count as success.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

pub struct Pipeline<W: UiWriter> {
    provider: Box<dyn LLMProvider>,
    inventory: Box<dyn LocalInventory>,
    runner: Box<dyn CommandRunner>,
    ui_writer: W,
    profile: SystemProfile,
    facts: SystemFacts,
    options: PipelineOptions,
}

impl<W: UiWriter> Pipeline<W> {
    pub fn new(
        provider: Box<dyn LLMProvider>,
        inventory: Box<dyn LocalInventory>,
        runner: Box<dyn CommandRunner>,
        ui_writer: W,
        profile: SystemProfile,
        facts: SystemFacts,
    ) -> Self {
        Self {
            provider,
            inventory,
            runner,
            ui_writer,
            profile,
            facts,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Run all stages for `query`.
    pub async fn run(&self, query: &str) -> PipelineReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", %run_id);

        async {
            info!(
                "Starting run with {} ({}) for: {}",
                self.provider.name(),
                self.provider.model(),
                query
            );
            let mut report = PipelineReport::new(run_id, query);
            if let Err(failure) = self.run_stages(query, &mut report).await {
                error!("Run failed at {}: {}", failure.stage, failure.reason);
                report.outcome = Outcome::Failed(failure);
            }
            info!("Run finished: {:?}", report.outcome);
            report
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, query: &str, report: &mut PipelineReport) -> Result<(), Failure> {
        report.candidates = self.discover_packages(query).await?;

        let (installed, missing) = self.partition(&report.candidates).await;
        report.installed = installed;
        report.missing = missing;

        if report.missing.is_empty() {
            self.ui_writer
                .println("All required packages are already installed.");
        } else {
            self.ui_writer
                .println(&format!("Missing packages: {}", report.missing.join(", ")));

            let directive = self.resolve_install(&report.missing).await?;
            self.ui_writer
                .print_command("Install command", &directive.install_command);
            report.install = Some(directive.clone());

            if self.options.dry_run {
                self.ui_writer
                    .println("Dry run: install command not executed.");
            } else if self.confirm("Do you want to execute the install command?") {
                report.install_result = self
                    .execute(&directive.install_command, StageKind::InstallResolution)
                    .await;
            } else {
                self.ui_writer.println("Installation cancelled.");
                report.declined = Some(StageKind::InstallResolution);
                return Ok(());
            }
        }

        let (directive, used_fallback) = self.resolve_final(query, &report.candidates).await?;
        self.ui_writer.print_command("Command", &directive.command);
        report.final_command = Some(directive.clone());
        report.used_fallback = used_fallback;

        if self.options.dry_run {
            self.ui_writer.println("Dry run: command not executed.");
        } else if self.confirm("Do you want to execute this command?") {
            report.final_result = self
                .execute(&directive.command, StageKind::FinalCommand)
                .await;
        } else {
            self.ui_writer.println("Command execution cancelled.");
            report.declined = Some(StageKind::FinalCommand);
        }

        Ok(())
    }

    // ========================================================================
    // Stages
    // ========================================================================

    async fn discover_packages(&self, query: &str) -> Result<Vec<PackageCandidate>, Failure> {
        let kind = StageKind::PackageDiscovery;
        self.ui_writer.print_stage_start("discovering packages");

        let stage = Stage::PackageDiscovery {
            query: query.to_string(),
        };
        let candidates = self
            .request(stage, self.options.discovery_temperature, parse_packages)
            .await
            .map_err(|e| self.stage_failed(kind, Some(e)))?;

        if candidates.is_empty() {
            return Err(self.stage_failed(kind, None));
        }

        self.ui_writer.print_stage_done();
        self.ui_writer.print_candidates(&candidates);
        Ok(candidates)
    }

    /// Split candidate names into (installed, missing). A probe error counts
    /// as missing.
    async fn partition(&self, candidates: &[PackageCandidate]) -> (Vec<String>, Vec<String>) {
        let mut installed = Vec::new();
        let mut missing = Vec::new();

        for candidate in candidates {
            match self.inventory.is_installed(&candidate.name).await {
                Ok(true) => installed.push(candidate.name.clone()),
                Ok(false) => missing.push(candidate.name.clone()),
                Err(e) => {
                    warn!(
                        "Could not check whether {} is installed, assuming not: {:#}",
                        candidate.name, e
                    );
                    missing.push(candidate.name.clone());
                }
            }
        }

        debug!("Installed: {:?}, missing: {:?}", installed, missing);
        (installed, missing)
    }

    async fn resolve_install(&self, missing: &[String]) -> Result<InstallDirective, Failure> {
        let kind = StageKind::InstallResolution;
        self.ui_writer.print_stage_start("resolving install command");

        let stage = Stage::InstallResolution {
            missing: missing.to_vec(),
        };
        let directive = self
            .request(stage, COMMAND_TEMPERATURE, parse_install)
            .await
            .map_err(|e| self.stage_failed(kind, Some(e)))?;

        if directive.is_empty() {
            return Err(self.stage_failed(kind, None));
        }

        self.ui_writer.print_stage_done();
        Ok(directive)
    }

    /// Returns the directive and whether it came from the candidate fallback.
    async fn resolve_final(
        &self,
        query: &str,
        candidates: &[PackageCandidate],
    ) -> Result<(FinalDirective, bool), Failure> {
        let kind = StageKind::FinalCommand;
        self.ui_writer.print_stage_start("resolving final command");

        let stage = Stage::FinalCommand {
            query: query.to_string(),
        };
        match self.request(stage, COMMAND_TEMPERATURE, parse_final).await {
            Ok(directive) if !directive.is_empty() => {
                self.ui_writer.print_stage_done();
                Ok((directive, false))
            }
            Ok(_) => self.final_fallback(candidates, None),
            Err(e) if e.is_transport() => Err(self.stage_failed(kind, Some(e))),
            Err(e) => self.final_fallback(candidates, Some(e)),
        }
    }

    fn final_fallback(
        &self,
        candidates: &[PackageCandidate],
        cause: Option<StageError>,
    ) -> Result<(FinalDirective, bool), Failure> {
        let fallback = candidates
            .first()
            .filter(|candidate| !candidate.command.is_empty());

        match fallback {
            Some(candidate) if self.options.candidate_fallback => {
                warn!(
                    "Final stage gave nothing usable ({:?}); using the command proposed for {}",
                    cause, candidate.name
                );
                self.ui_writer.print_stage_done();
                self.ui_writer.print_warning(&format!(
                    "Using the command suggested for {} instead",
                    candidate.name
                ));
                Ok((
                    FinalDirective {
                        command: candidate.command.clone(),
                    },
                    true,
                ))
            }
            _ => Err(self.stage_failed(StageKind::FinalCommand, cause)),
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Send one stage prompt and decode the reply, re-sending only for the
    /// reply failures the options allow. Transport errors end the stage.
    async fn request<T>(
        &self,
        stage: Stage,
        temperature: f32,
        parse: fn(&str) -> Result<T, ReplyError>,
    ) -> Result<T, StageError> {
        let request = StageRequest::new(stage, &self.profile, &self.facts);
        let kind = request.kind();
        let completion = request.completion_request(
            temperature,
            self.options.json_mode,
            self.options.max_tokens,
        );

        let mut missing_retries = self.options.retry_on_missing_json;
        let mut malformed_retries = self.options.retry_on_malformed_json;

        loop {
            debug!("Sending {} prompt ({} chars)", kind, request.prompt.len());
            let response = self
                .provider
                .complete(completion.clone())
                .await
                .map_err(|e| {
                    warn!("{} transport error: {}", kind, e);
                    StageError::from(e)
                })?;
            debug!("{} reply: {}", kind, response.content);

            match resolve(&response.content, self.options.extraction, parse) {
                Ok(value) => return Ok(value),
                Err(ReplyError::NotFound) if missing_retries > 0 => {
                    missing_retries -= 1;
                    warn!(
                        "{} reply held no JSON, asking again ({} retries left)",
                        kind, missing_retries
                    );
                }
                Err(ReplyError::Schema(detail)) if malformed_retries > 0 => {
                    malformed_retries -= 1;
                    warn!(
                        "{} reply did not match the schema ({}), asking again ({} retries left)",
                        kind, detail, malformed_retries
                    );
                }
                Err(e) => {
                    warn!("{} reply rejected: {}", kind, e);
                    return Err(e.into());
                }
            }
        }
    }

    fn stage_failed(&self, stage: StageKind, cause: Option<StageError>) -> Failure {
        let failure = match cause {
            Some(error) => Failure::from_error(stage, error),
            None => Failure::empty(stage),
        };
        self.ui_writer.print_stage_failed(&failure.user_message());
        failure
    }

    fn confirm(&self, message: &str) -> bool {
        if self.options.auto_confirm {
            self.ui_writer.println(&format!("{} yes (--yes)", message));
            return true;
        }
        self.ui_writer.prompt_user_yes_no(message)
    }

    async fn execute(&self, command: &str, stage: StageKind) -> Option<ExecutionResult> {
        match self.runner.run(command).await {
            Ok(result) => {
                self.ui_writer.print_command_output(&result);
                if !result.success {
                    warn!("{} command exited with {}", stage, result.exit_code);
                    self.ui_writer.print_warning(&format!(
                        "Command exited with status {}",
                        result.exit_code
                    ));
                }
                Some(result)
            }
            Err(e) => {
                error!("Failed to execute {} command: {:#}", stage, e);
                self.ui_writer
                    .print_warning(&format!("Could not run the command: {:#}", e));
                None
            }
        }
    }
}
