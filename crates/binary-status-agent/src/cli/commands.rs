//! CLI command definitions for the binary status deploy hook

use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use super::output::{render_check, render_run, CheckOutput, OutputFormat};
use super::ExitCode;
use crate::client::{ApiGatewayClient, AttributesClient, AwsCredentials, LambdaClient};
use binary_status_core::{DeployContext, Error, FunctionSpec, ReconcileConfig, Reconciler, Result};

/// Binary status deploy hook
///
/// Verifies that an API Gateway REST API serves binary payloads for every
/// function that declares content handling, enabling each function's
/// compression flag and reverting it if support never becomes active.
#[derive(Parser, Debug)]
#[command(name = "apig-binary-status")]
#[command(about = "Verify and enable binary payload support after a deploy", long_about = None)]
#[command(version)]
pub struct BinaryStatusCli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile every eligible function until binary support is active
    Run(TargetArgs),

    /// Probe once without changing anything
    Check(TargetArgs),
}

/// Where the deployment lives and how to reach it
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Deploy context (service definition) file, YAML or JSON
    #[arg(short, long)]
    pub service: PathBuf,

    /// Deployment stage; defaults to the service's provider stage
    #[arg(long)]
    pub stage: Option<String>,

    /// AWS region; defaults to the provider region, then AWS_REGION
    #[arg(long)]
    pub region: Option<String>,

    /// REST API name; defaults to "{stage}-{service}"
    #[arg(long)]
    pub api_name: Option<String>,

    /// Reconciliation settings (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base URL of the deployed attributes service
    #[arg(long, env = "ATTRIBUTES_SERVICE_URL")]
    pub attributes_url: Option<String>,

    /// Override the API Gateway control plane endpoint
    #[arg(long, env = "BINARY_STATUS_APIGATEWAY_ENDPOINT", hide = true)]
    pub apigateway_endpoint: Option<String>,

    /// Override the Lambda control plane endpoint
    #[arg(long, env = "BINARY_STATUS_LAMBDA_ENDPOINT", hide = true)]
    pub lambda_endpoint: Option<String>,

    /// Output format for the report
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Everything a run needs, resolved from arguments, files and environment
#[derive(Debug, Clone)]
pub struct Invocation {
    pub stage: String,
    pub region: String,
    pub api_name: String,
    pub functions: Vec<FunctionSpec>,
    pub config: ReconcileConfig,
    pub attributes_url: String,
}

impl TargetArgs {
    /// Resolve stage, region, gateway name, functions and settings
    pub fn resolve(&self) -> Result<Invocation> {
        let context = DeployContext::from_file(&self.service).map_err(|e| {
            Error::configuration(format!(
                "failed to load service file '{}': {}",
                self.service.display(),
                e
            ))
        })?;

        let stage = self
            .stage
            .clone()
            .or_else(|| context.provider.stage.clone())
            .ok_or_else(|| Error::configuration("no stage given and the service defines none"))?;
        let region = self
            .region
            .clone()
            .or_else(|| context.provider.region.clone())
            .or_else(|| non_empty_env("AWS_REGION"))
            .or_else(|| non_empty_env("AWS_DEFAULT_REGION"))
            .ok_or_else(|| {
                Error::configuration("no region given and none found in the service or environment")
            })?;
        let api_name = self
            .api_name
            .clone()
            .unwrap_or_else(|| context.api_gateway_name(&stage));

        let config = match &self.config {
            Some(path) => ReconcileConfig::from_file(path)?,
            None => ReconcileConfig::default(),
        }
        .with_env_overrides()?;

        let attributes_url = self
            .attributes_url
            .clone()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| Error::configuration("ATTRIBUTES_SERVICE_URL is not set"))?;

        Ok(Invocation {
            functions: context.function_specs(&stage),
            stage,
            region,
            api_name,
            config,
            attributes_url,
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Wire the HTTP clients into a reconciler
pub fn build_reconciler(args: &TargetArgs, invocation: &Invocation) -> Result<Reconciler> {
    let credentials = Arc::new(AwsCredentials::from_env()?);
    let region = invocation.region.as_str();

    let gateway = match &args.apigateway_endpoint {
        Some(endpoint) => {
            ApiGatewayClient::with_endpoint(credentials.clone(), region, endpoint.clone())
        }
        None => ApiGatewayClient::new(credentials.clone(), region),
    };
    let lambda = match &args.lambda_endpoint {
        Some(endpoint) => LambdaClient::with_endpoint(credentials, region, endpoint.clone()),
        None => LambdaClient::new(credentials, region),
    };
    let attributes = AttributesClient::new(invocation.attributes_url.clone());

    tracing::debug!(
        region,
        stage = %invocation.stage,
        attributes_url = attributes.base_url(),
        "Control plane clients ready"
    );
    Ok(Reconciler::from_clients(
        Arc::new(gateway),
        Arc::new(lambda),
        Arc::new(attributes),
        &invocation.stage,
        invocation.config.clone(),
    ))
}

pub async fn execute_run(args: TargetArgs) -> Result<ExitCode> {
    let invocation = args.resolve()?;
    let reconciler = build_reconciler(&args, &invocation)?;

    let report = reconciler
        .run(&invocation.api_name, &invocation.functions)
        .await?;
    render_run(&mut io::stdout(), &report, args.format)?;

    Ok(ExitCode::from_run(
        report.converged(),
        invocation.config.fail_on_unconverged,
    ))
}

pub async fn execute_check(args: TargetArgs) -> Result<ExitCode> {
    let invocation = args.resolve()?;
    let reconciler = build_reconciler(&args, &invocation)?;

    let checks = reconciler
        .check_once(&invocation.api_name, &invocation.functions)
        .await?;
    let output = CheckOutput::new(&invocation.api_name, checks);
    render_check(&mut io::stdout(), &output, args.format)?;

    Ok(if output.passed {
        ExitCode::Success
    } else {
        ExitCode::Unconverged
    })
}
