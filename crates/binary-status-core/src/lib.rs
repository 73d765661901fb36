//! Binary Status Core
//!
//! Post-deploy verification and remediation of binary payload support on an
//! API Gateway REST API and the functions behind it.
//!
//! ## Components
//!
//! - **Resource Locator** (`locator`): gateway name → REST API id and resources
//! - **Configuration Probe** (`probe`): binary media types, integration
//!   content handling, end-to-end traffic
//! - **Configuration Mutator** (`mutator`): feature flag in a function's
//!   environment variables
//! - **Test Fixture Manager** (`fixture`): disposable data for the
//!   end-to-end probe
//! - **Reconciler** (`reconcile`): the bounded polling loop tying them together
//!
//! Remote services are reached only through the traits in `remote`; this
//! crate performs no network I/O of its own.
//!
//! ## Example
//!
//! ```rust,ignore
//! use binary_status_core::{DeployContext, ReconcileConfig, Reconciler};
//!
//! let context = DeployContext::from_file("serverless.yml")?;
//! let config = ReconcileConfig::default();
//! let reconciler = Reconciler::from_clients(gateway, compute, attributes, "dev", config);
//! let report = reconciler
//!     .run(&context.api_gateway_name("dev"), &context.function_specs("dev"))
//!     .await?;
//! assert!(report.converged());
//! ```

pub mod config;
pub mod error;
pub mod fixture;
pub mod locator;
pub mod model;
pub mod mutator;
pub mod probe;
pub mod reconcile;
pub mod remote;
pub mod service;

pub use config::{BackoffConfig, ReconcileConfig};
pub use error::{Error, Result};
pub use fixture::{FixtureManager, FixtureSpec};
pub use locator::ResourceLocator;
pub use model::{
    CheckAttempt, EnvironmentVariableSet, FunctionSpec, HttpEventBinding, IntegrationQuery,
    ResourceEntry, ResourceGraph,
};
pub use mutator::ConfigurationMutator;
pub use probe::{ConfigurationProbe, ContentHandlingCheck, ProbeVerdict};
pub use reconcile::{FunctionCheck, FunctionOutcome, ReconcileState, Reconciler, RunReport};
pub use service::DeployContext;
