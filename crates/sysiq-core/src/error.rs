//! Failure taxonomy for a pipeline run.
//!
//! Three things can go wrong with a stage: the model could not be reached,
//! its reply held no JSON, or the JSON did not fit the stage schema. The
//! orchestrator collapses all three into a terminal [`Failure`] but keeps the
//! original [`StageError`] so the user sees which one happened.

use std::fmt;
use sysiq_providers::ProviderError;
use thiserror::Error;

use crate::stage::StageKind;

/// A reply arrived but could not be turned into a stage result.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReplyError {
    #[error("no JSON value found in the model reply")]
    NotFound,

    #[error("model reply does not match the expected schema: {0}")]
    Schema(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StageError {
    #[error(transparent)]
    Transport(#[from] ProviderError),

    #[error(transparent)]
    Reply(#[from] ReplyError),
}

impl StageError {
    /// Short wording shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            StageError::Transport(ProviderError::EmptyCredential) => "no API key configured",
            StageError::Transport(ProviderError::HttpStatus(429)) => "model rate limited the request",
            StageError::Transport(ProviderError::HttpStatus(_)) => "model endpoint returned an error",
            StageError::Transport(ProviderError::MalformedEnvelope(_)) => "model reply malformed",
            StageError::Transport(_) => "model unreachable",
            StageError::Reply(ReplyError::NotFound) => "model reply unparsable",
            StageError::Reply(ReplyError::Schema(_)) => "model reply malformed",
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, StageError::Transport(_))
    }
}

/// Reason codes for a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    NoPackages,
    NoInstallCommand,
    NoFinalCommand,
    RateLimitedOrHttpError,
    ModelUnreachable,
    MissingCredential,
}

impl FailureReason {
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::NoPackages => "no_packages",
            FailureReason::NoInstallCommand => "no_install_command",
            FailureReason::NoFinalCommand => "no_final_command",
            FailureReason::RateLimitedOrHttpError => "rate_limited_or_http_error",
            FailureReason::ModelUnreachable => "model_unreachable",
            FailureReason::MissingCredential => "missing_credential",
        }
    }

    /// The reason used when `stage` produced nothing usable.
    pub fn empty_result(stage: StageKind) -> Self {
        match stage {
            StageKind::PackageDiscovery => FailureReason::NoPackages,
            StageKind::InstallResolution => FailureReason::NoInstallCommand,
            StageKind::FinalCommand => FailureReason::NoFinalCommand,
        }
    }

    pub fn from_stage_error(stage: StageKind, error: &StageError) -> Self {
        match error {
            StageError::Transport(ProviderError::EmptyCredential) => FailureReason::MissingCredential,
            StageError::Transport(ProviderError::HttpStatus(_)) => {
                FailureReason::RateLimitedOrHttpError
            }
            StageError::Transport(ProviderError::ConnectFailed(_))
            | StageError::Transport(ProviderError::Timeout) => FailureReason::ModelUnreachable,
            // An envelope without text is as useless as a reply without JSON.
            StageError::Transport(ProviderError::MalformedEnvelope(_)) | StageError::Reply(_) => {
                Self::empty_result(stage)
            }
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Terminal outcome of a failed run.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub stage: StageKind,
    pub reason: FailureReason,
    pub cause: Option<StageError>,
}

impl Failure {
    pub fn empty(stage: StageKind) -> Self {
        Self {
            stage,
            reason: FailureReason::empty_result(stage),
            cause: None,
        }
    }

    pub fn from_error(stage: StageKind, error: StageError) -> Self {
        Self {
            stage,
            reason: FailureReason::from_stage_error(stage, &error),
            cause: Some(error),
        }
    }

    /// One line for the terminal: stage, reason and what went wrong.
    pub fn user_message(&self) -> String {
        match &self.cause {
            Some(cause) => format!(
                "{} failed ({}): {}",
                self.stage,
                self.reason.code(),
                cause.user_message()
            ),
            None => format!(
                "{} failed ({}): model returned an empty result",
                self.stage,
                self.reason.code()
            ),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_map_to_transport_codes() {
        let stage = StageKind::FinalCommand;
        let rate_limited = StageError::Transport(ProviderError::HttpStatus(429));
        assert_eq!(
            FailureReason::from_stage_error(stage, &rate_limited).code(),
            "rate_limited_or_http_error"
        );

        let refused = StageError::Transport(ProviderError::ConnectFailed("refused".into()));
        assert_eq!(
            FailureReason::from_stage_error(stage, &refused),
            FailureReason::ModelUnreachable
        );
        assert_eq!(
            FailureReason::from_stage_error(stage, &StageError::Transport(ProviderError::Timeout)),
            FailureReason::ModelUnreachable
        );
        assert_eq!(
            FailureReason::from_stage_error(
                stage,
                &StageError::Transport(ProviderError::EmptyCredential)
            ),
            FailureReason::MissingCredential
        );
    }

    #[test]
    fn test_reply_errors_map_to_empty_result_of_stage() {
        let not_found = StageError::Reply(ReplyError::NotFound);
        assert_eq!(
            FailureReason::from_stage_error(StageKind::PackageDiscovery, &not_found),
            FailureReason::NoPackages
        );
        let schema = StageError::Reply(ReplyError::Schema("missing field".into()));
        assert_eq!(
            FailureReason::from_stage_error(StageKind::InstallResolution, &schema),
            FailureReason::NoInstallCommand
        );
    }

    #[test]
    fn test_user_messages_keep_failure_kinds_apart() {
        let stage = StageKind::FinalCommand;
        let unreachable = Failure::from_error(
            stage,
            StageError::Transport(ProviderError::ConnectFailed("dns".into())),
        );
        let unparsable = Failure::from_error(stage, StageError::Reply(ReplyError::NotFound));
        let malformed =
            Failure::from_error(stage, StageError::Reply(ReplyError::Schema("x".into())));

        assert!(unreachable.user_message().contains("model unreachable"));
        assert!(unparsable.user_message().contains("model reply unparsable"));
        assert!(malformed.user_message().contains("model reply malformed"));
        assert_eq!(unparsable.reason, malformed.reason);
    }

    #[test]
    fn test_empty_failure_message_names_stage() {
        let failure = Failure::empty(StageKind::PackageDiscovery);
        assert_eq!(
            failure.user_message(),
            "package discovery failed (no_packages): model returned an empty result"
        );
    }
}
