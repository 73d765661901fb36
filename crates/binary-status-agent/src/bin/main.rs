//! apig-binary-status
//!
//! Post-deploy hook that verifies binary payload support on API Gateway.
//!
//! # Usage
//!
//! ```bash
//! # Reconcile after `deploy`
//! apig-binary-status run --service serverless.yml --stage dev
//!
//! # Read-only probe, JSON report
//! apig-binary-status check --service serverless.yml --stage dev --format json
//! ```

use binary_status_agent::{run_cli, BinaryStatusCli};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = BinaryStatusCli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    let exit_code = run_cli(cli).await;
    std::process::exit(exit_code.into());
}
