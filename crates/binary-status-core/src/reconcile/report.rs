//! Per-function states and the run report

use crate::error::Error;
use crate::probe::ProbeVerdict;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// States of one function's reconciliation machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileState {
    Idle,
    FlagEnabling,
    Polling,
    Succeeded,
    FlagReverting,
    Reverted,
    /// Stopped on a fatal error (missing resource or integration)
    Failed,
}

impl ReconcileState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReconcileState::Succeeded | ReconcileState::Reverted | ReconcileState::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileState::Idle => "idle",
            ReconcileState::FlagEnabling => "flag_enabling",
            ReconcileState::Polling => "polling",
            ReconcileState::Succeeded => "succeeded",
            ReconcileState::FlagReverting => "flag_reverting",
            ReconcileState::Reverted => "reverted",
            ReconcileState::Failed => "failed",
        }
    }
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn serialize_error<S: Serializer>(error: &Option<Error>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Terminal result of one function's machine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionOutcome {
    pub function: String,
    pub state: ReconcileState,
    /// Probe rounds executed
    pub rounds: u32,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<Error>,
}

impl FunctionOutcome {
    pub fn succeeded(function: impl Into<String>, rounds: u32) -> Self {
        Self {
            function: function.into(),
            state: ReconcileState::Succeeded,
            rounds,
            error: None,
        }
    }

    pub fn reverted(function: impl Into<String>, rounds: u32, error: Error) -> Self {
        Self {
            function: function.into(),
            state: ReconcileState::Reverted,
            rounds,
            error: Some(error),
        }
    }

    pub fn failed(function: impl Into<String>, rounds: u32, error: Error) -> Self {
        Self {
            function: function.into(),
            state: ReconcileState::Failed,
            rounds,
            error: Some(error),
        }
    }
}

/// Result of a read-only check of one function
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCheck {
    pub function: String,
    pub verdict: Option<ProbeVerdict>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<Error>,
}

impl FunctionCheck {
    pub fn passed(&self) -> bool {
        self.verdict.as_ref().is_some_and(ProbeVerdict::passed)
    }
}

/// Summary of one reconciliation run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub api_name: String,
    pub rest_api_id: Option<String>,
    pub functions: Vec<FunctionOutcome>,
    /// End-to-end probe before the fixture was provisioned
    pub pre_check: bool,
    /// End-to-end probe after the fixture was removed
    pub post_check: bool,
    pub fixture_provisioned: bool,
    pub fixture_torn_down: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Every checked function reached `Succeeded`
    pub fn converged(&self) -> bool {
        self.functions
            .iter()
            .all(|f| f.state == ReconcileState::Succeeded)
    }

    pub fn count(&self, state: ReconcileState) -> usize {
        self.functions.iter().filter(|f| f.state == state).count()
    }

    pub fn outcome(&self, function: &str) -> Option<&FunctionOutcome> {
        self.functions.iter().find(|f| f.function == function)
    }
}
