//! Reconciliation Loop
//!
//! Drives every eligible function through
//! `Idle → FlagEnabling → Polling → {Succeeded | FlagReverting → Reverted}`:
//!
//! 1. The gateway is located once per run.
//! 2. Each function gets its flag enabled, then is polled with the full probe
//!    set until the aggregate verdict passes or the attempt budget is spent.
//! 3. On exhaustion the flag is set back to `false`.
//!
//! Function machines run concurrently. Fixture provisioning happens before
//! any of them starts and teardown only after all of them are terminal.

mod report;

pub use report::{FunctionCheck, FunctionOutcome, ReconcileState, RunReport};

use crate::config::ReconcileConfig;
use crate::error::{Error, Result};
use crate::fixture::{FixtureManager, FixtureSpec};
use crate::locator::ResourceLocator;
use crate::model::{CheckAttempt, FunctionSpec, IntegrationQuery, ResourceGraph};
use crate::mutator::ConfigurationMutator;
use crate::probe::{ConfigurationProbe, ContentHandlingCheck, ProbeVerdict, SUCCESS_STATUS_CODE};
use crate::remote::{AttributesApi, ComputeApi, GatewayApi};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio::time::sleep;

/// One content-handling check planned for a function
#[derive(Debug, Clone)]
struct PlannedCheck {
    query: IntegrationQuery,
    path: String,
    expected: String,
}

pub struct Reconciler {
    locator: ResourceLocator,
    probe: ConfigurationProbe,
    mutator: ConfigurationMutator,
    fixtures: FixtureManager,
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(
        locator: ResourceLocator,
        probe: ConfigurationProbe,
        mutator: ConfigurationMutator,
        fixtures: FixtureManager,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            locator,
            probe,
            mutator,
            fixtures,
            config,
        }
    }

    /// Wire all components from the three remote clients
    pub fn from_clients(
        gateway: Arc<dyn GatewayApi>,
        compute: Arc<dyn ComputeApi>,
        attributes: Arc<dyn AttributesApi>,
        stage: &str,
        config: ReconcileConfig,
    ) -> Self {
        let mutator = ConfigurationMutator::new(compute, config.flag_key.clone())
            .with_qualifier(config.qualifier.clone());
        Self::new(
            ResourceLocator::new(gateway.clone()),
            ConfigurationProbe::new(gateway, attributes.clone()),
            mutator,
            FixtureManager::new(attributes, stage),
            config,
        )
    }

    /// Replace the fixture data provisioned and queried by the run
    pub fn with_fixture(mut self, spec: FixtureSpec) -> Self {
        self.fixtures = self.fixtures.with_spec(spec);
        self
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Full run: fixture setup, per-function reconciliation, fixture teardown
    ///
    /// Functions that never converge are reverted and reported, not raised.
    /// Only run-level failures (gateway lookup) are returned as errors, and
    /// even then the fixture is torn down first.
    pub async fn run(&self, api_name: &str, functions: &[FunctionSpec]) -> Result<RunReport> {
        let started_at = Utc::now();
        let eligible: Vec<&FunctionSpec> = functions.iter().filter(|f| f.is_eligible()).collect();
        tracing::info!(
            api_name,
            functions = functions.len(),
            eligible = eligible.len(),
            "Checking binary support on API Gateway"
        );

        let fixture = self.fixtures.spec();
        let pre_check = self.probe.end_to_end_probe(fixture).await;
        let fixture_provisioned = self.fixtures.provision().await;

        let reconciled = self.reconcile_all(api_name, &eligible).await;

        let fixture_torn_down = self.fixtures.teardown().await;
        let post_check = self.probe.end_to_end_probe(fixture).await;

        let (rest_api_id, outcomes) = reconciled?;
        let report = RunReport {
            api_name: api_name.to_string(),
            rest_api_id,
            functions: outcomes,
            pre_check,
            post_check,
            fixture_provisioned,
            fixture_torn_down,
            started_at,
            finished_at: Utc::now(),
        };

        if report.converged() {
            tracing::info!(api_name, "Binary support active for all functions");
        } else {
            tracing::warn!(
                api_name,
                reverted = report.count(ReconcileState::Reverted),
                failed = report.count(ReconcileState::Failed),
                "Binary support did not converge for some functions"
            );
        }
        Ok(report)
    }

    /// One read-only probe round per eligible function; no flags, no fixture
    pub async fn check_once(
        &self,
        api_name: &str,
        functions: &[FunctionSpec],
    ) -> Result<Vec<FunctionCheck>> {
        let eligible: Vec<&FunctionSpec> = functions.iter().filter(|f| f.is_eligible()).collect();
        if eligible.is_empty() {
            return Ok(Vec::new());
        }
        let graph = self.locator.locate(api_name).await?;

        let checks = eligible.into_iter().map(|function| {
            let graph = &graph;
            async move {
                let result = match self.plan_checks(function, graph) {
                    Ok(planned) => self.check_function(graph, &planned).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(verdict) => FunctionCheck {
                        function: function.name.clone(),
                        verdict: Some(verdict),
                        error: None,
                    },
                    Err(e) => FunctionCheck {
                        function: function.name.clone(),
                        verdict: None,
                        error: Some(e),
                    },
                }
            }
        });
        Ok(join_all(checks).await)
    }

    async fn reconcile_all(
        &self,
        api_name: &str,
        eligible: &[&FunctionSpec],
    ) -> Result<(Option<String>, Vec<FunctionOutcome>)> {
        if eligible.is_empty() {
            tracing::info!("No function declares content handling, nothing to reconcile");
            return Ok((None, Vec::new()));
        }

        let graph = self.locator.locate(api_name).await.map_err(|e| {
            tracing::error!(api_name, error = %e, "Failed to locate API Gateway");
            e
        })?;

        let machines = eligible
            .iter()
            .map(|function| self.reconcile_function(function, &graph));
        let outcomes = join_all(machines).await;
        Ok((Some(graph.rest_api_id.clone()), outcomes))
    }

    /// One function's state machine, always ending in a terminal state
    async fn reconcile_function(
        &self,
        function: &FunctionSpec,
        graph: &ResourceGraph,
    ) -> FunctionOutcome {
        let name = function.name.as_str();

        let planned = match self.plan_checks(function, graph) {
            Ok(planned) => planned,
            Err(e) => {
                tracing::error!(function = name, error = %e, "Function cannot be checked");
                return FunctionOutcome::failed(name, 0, e);
            }
        };

        transition(name, ReconcileState::Idle, ReconcileState::FlagEnabling);
        if let Err(e) = self.mutator.set_feature_flag(name, true).await {
            tracing::warn!(
                function = name,
                error = %e,
                "Failed to enable feature flag, polling anyway"
            );
        }

        transition(name, ReconcileState::FlagEnabling, ReconcileState::Polling);
        let mut attempt = CheckAttempt::new(self.config.max_attempts);
        let last_error = loop {
            let round = attempt.attempts_made() + 1;
            let error = match self.check_function(graph, &planned).await {
                Ok(verdict) if verdict.passed() => {
                    transition(name, ReconcileState::Polling, ReconcileState::Succeeded);
                    tracing::info!(function = name, round, "Binary support enabled");
                    return FunctionOutcome::succeeded(name, round);
                }
                Ok(verdict) => Error::AggregateFailure {
                    function: name.to_string(),
                    failed_checks: verdict.failed_checks(),
                },
                Err(e) if e.is_fatal() => {
                    tracing::error!(
                        function = name,
                        round,
                        error = %e,
                        "Fatal error while polling"
                    );
                    self.revert(name).await;
                    return FunctionOutcome::failed(name, round, e);
                }
                Err(e) => e,
            };

            tracing::info!(
                function = name,
                round,
                max_attempts = attempt.max_attempts(),
                reason = %error,
                "Binary support not active yet"
            );
            if attempt.record_failure() {
                break error;
            }
            sleep(self.config.backoff.delay(attempt.attempts_made())).await;
        };

        transition(name, ReconcileState::Polling, ReconcileState::FlagReverting);
        tracing::warn!(
            function = name,
            attempts = attempt.attempts_made(),
            error = %last_error,
            "Attempt budget exhausted, reverting feature flag"
        );
        self.revert(name).await;
        transition(name, ReconcileState::FlagReverting, ReconcileState::Reverted);
        FunctionOutcome::reverted(name, attempt.attempts_made(), last_error)
    }

    /// Set the flag back to `false`; the outcome is only logged
    async fn revert(&self, name: &str) {
        match self.mutator.set_feature_flag(name, false).await {
            Ok(()) => tracing::info!(function = name, "Feature flag reverted"),
            Err(e) => tracing::error!(function = name, error = %e, "Failed to revert feature flag"),
        }
    }

    /// Integration queries for every content-handling binding
    ///
    /// A binding whose path has no gateway resource is a configuration error.
    fn plan_checks(
        &self,
        function: &FunctionSpec,
        graph: &ResourceGraph,
    ) -> Result<Vec<PlannedCheck>> {
        function
            .content_handling_bindings()
            .map(|binding| {
                let resource_id = graph.resource_id(&binding.path).ok_or_else(|| {
                    Error::configuration(format!(
                        "function {} binds {} {} but REST API {} has no such resource",
                        function.name, binding.method, binding.path, graph.rest_api_id
                    ))
                })?;
                Ok(PlannedCheck {
                    query: IntegrationQuery {
                        rest_api_id: graph.rest_api_id.clone(),
                        resource_id: resource_id.to_string(),
                        http_method: binding.method.clone(),
                        status_code: SUCCESS_STATUS_CODE.to_string(),
                    },
                    path: binding.path.clone(),
                    expected: binding.content_handling.clone().unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Run every probe for one function and combine them into a verdict
    ///
    /// Every probe is awaited. When several fail, a fatal error wins over a
    /// retryable one.
    async fn check_function(
        &self,
        graph: &ResourceGraph,
        planned: &[PlannedCheck],
    ) -> Result<ProbeVerdict> {
        let media = self
            .probe
            .has_binary_media_type(&graph.rest_api_id, &self.config.expected_media_type);
        let handling = join_all(planned.iter().map(|check| async move {
            let matches = self
                .probe
                .content_handling_matches(&check.query, &check.expected)
                .await?;
            Ok::<_, Error>(ContentHandlingCheck {
                method: check.query.http_method.clone(),
                path: check.path.clone(),
                expected: check.expected.clone(),
                matches,
            })
        }));
        let end_to_end = self.probe.end_to_end_probe(self.fixtures.spec());

        let (media, handling, end_to_end) = tokio::join!(media, handling, end_to_end);

        let mut content_handling = Vec::with_capacity(handling.len());
        let mut errors = Vec::new();
        let binary_media_type = match media {
            Ok(present) => present,
            Err(e) => {
                errors.push(e);
                false
            }
        };
        for result in handling {
            match result {
                Ok(check) => content_handling.push(check),
                Err(e) => errors.push(e),
            }
        }
        if let Some(error) = first_error(errors) {
            return Err(error);
        }

        Ok(ProbeVerdict {
            binary_media_type,
            content_handling,
            end_to_end,
        })
    }
}

/// The first fatal error, otherwise the first error
fn first_error(errors: Vec<Error>) -> Option<Error> {
    let fatal = errors.iter().position(Error::is_fatal);
    let mut errors = errors.into_iter();
    match fatal {
        Some(index) => errors.nth(index),
        None => errors.next(),
    }
}

fn transition(function: &str, from: ReconcileState, to: ReconcileState) {
    tracing::debug!(function, %from, %to, "State transition");
}
