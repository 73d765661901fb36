//! CLI module for the binary status deploy hook
//!
//! `run` reconciles every eligible function and prints a report; `check`
//! performs a single read-only probe round.

pub mod commands;
pub mod output;

pub use commands::{BinaryStatusCli, Commands, Invocation, TargetArgs};
pub use output::{CheckOutput, OutputFormat};

use binary_status_core::{Error, Result};

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every checked function has binary support active
    Success = 0,
    /// Some function did not converge and the run is configured to fail
    Unconverged = 1,
    /// Unreadable or malformed input, missing stage, region or credentials
    InvalidInput = 3,
    /// The run itself could not proceed (gateway lookup failed)
    Fatal = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    pub fn from_run(converged: bool, fail_on_unconverged: bool) -> Self {
        if converged || !fail_on_unconverged {
            ExitCode::Success
        } else {
            ExitCode::Unconverged
        }
    }

    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::Configuration(_) | Error::Serialization(_) => ExitCode::InvalidInput,
            _ => ExitCode::Fatal,
        }
    }
}

/// Run the CLI and return the exit code
pub async fn run(cli: BinaryStatusCli) -> Result<ExitCode> {
    match cli.command {
        Commands::Run(args) => commands::execute_run(args).await,
        Commands::Check(args) => commands::execute_check(args).await,
    }
}
