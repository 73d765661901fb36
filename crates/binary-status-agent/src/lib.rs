//! Binary Status Agent
//!
//! Deploy hook binding `binary-status-core` to the real control planes:
//! SigV4-signed API Gateway and Lambda clients, an HTTP client for the
//! attributes service, and the `apig-binary-status` command line.
//!
//! # Exit Codes
//! - 0: binary support active, or not converged with `fail_on_unconverged` off
//! - 1: not converged and `fail_on_unconverged` on
//! - 3: invalid input
//! - 10: the run could not proceed

pub mod cli;
pub mod client;

pub use cli::{BinaryStatusCli, Commands, ExitCode, OutputFormat};
pub use client::{ApiGatewayClient, AttributesClient, AwsCredentials, LambdaClient, SigV4Signer};

/// Run the CLI, printing any error and mapping it to an exit code
pub async fn run_cli(cli: BinaryStatusCli) -> ExitCode {
    match cli::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from_error(&e)
        }
    }
}
