use sysiq_execution::ExecutionResult;

use crate::response::PackageCandidate;

/// Interface for UI output operations
/// Keeps the pipeline free of terminal details so it can run under tests or
/// another front end.
pub trait UiWriter: Send + Sync {
    /// Print a message with a newline
    fn println(&self, message: &str);

    /// Announce that a stage is starting ("discovering packages")
    fn print_stage_start(&self, description: &str);

    /// Close the line opened by `print_stage_start`
    fn print_stage_done(&self);

    /// Close the line opened by `print_stage_start` with an error
    fn print_stage_failed(&self, message: &str);

    /// Print the packages the model proposed
    fn print_candidates(&self, candidates: &[PackageCandidate]);

    /// Print a command the user may run
    fn print_command(&self, label: &str, command: &str);

    /// Print captured output of an executed command
    fn print_command_output(&self, result: &ExecutionResult);

    /// Print a non-fatal warning
    fn print_warning(&self, message: &str);

    /// Prompt the user for a yes/no confirmation
    fn prompt_user_yes_no(&self, message: &str) -> bool;
}

/// A UiWriter that discards output and declines every confirmation.
pub struct NullUiWriter;

impl UiWriter for NullUiWriter {
    fn println(&self, _message: &str) {}
    fn print_stage_start(&self, _description: &str) {}
    fn print_stage_done(&self) {}
    fn print_stage_failed(&self, _message: &str) {}
    fn print_candidates(&self, _candidates: &[PackageCandidate]) {}
    fn print_command(&self, _label: &str, _command: &str) {}
    fn print_command_output(&self, _result: &ExecutionResult) {}
    fn print_warning(&self, _message: &str) {}
    fn prompt_user_yes_no(&self, _message: &str) -> bool {
        false
    }
}
