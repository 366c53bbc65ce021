//! Core of sysiq: turns a request into commands through three model stages.
//!
//! The flow is prompt → transport → extraction → decoding, once per stage,
//! driven by [`Pipeline`].

pub mod error;
pub mod extract;
pub mod pipeline;
pub mod prompts;
pub mod response;
pub mod stage;
pub mod ui_writer;

pub use error::{Failure, FailureReason, ReplyError, StageError};
pub use extract::extract;
pub use pipeline::{Outcome, Pipeline, PipelineOptions, PipelineReport};
pub use response::{
    parse_as, parse_final, parse_install, parse_packages, safe_parse, FinalDirective,
    InstallDirective, PackageCandidate,
};
pub use stage::{Stage, StageKind, StageRequest};
pub use ui_writer::{NullUiWriter, UiWriter};
