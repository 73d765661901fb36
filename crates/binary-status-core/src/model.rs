//! Data model shared by the locator, probes, mutator and reconciler

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One HTTP event binding declared on a function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpEventBinding {
    /// Upper-cased HTTP method (`GET`, `POST`, ...)
    pub method: String,
    /// Gateway resource path, always starting with `/`
    pub path: String,
    /// Declared content-handling mode, e.g. `CONVERT_TO_BINARY`
    pub content_handling: Option<String>,
}

impl HttpEventBinding {
    pub fn new(method: &str, path: &str) -> Self {
        let path = path.trim_start_matches('/');
        Self {
            method: method.to_uppercase(),
            path: format!("/{}", path),
            content_handling: None,
        }
    }

    pub fn with_content_handling(mut self, mode: impl Into<String>) -> Self {
        self.content_handling = Some(mode.into());
        self
    }
}

/// A deployable compute unit and the HTTP events routed to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Deployed function name
    pub name: String,
    pub bindings: Vec<HttpEventBinding>,
    /// Opt-in flag; a function with `check = false` is never polled
    pub check: bool,
}

impl FunctionSpec {
    pub fn new(name: impl Into<String>, bindings: Vec<HttpEventBinding>) -> Self {
        Self {
            name: name.into(),
            bindings,
            check: true,
        }
    }

    /// Bindings that declare a content-handling mode
    pub fn content_handling_bindings(&self) -> impl Iterator<Item = &HttpEventBinding> {
        self.bindings.iter().filter(|b| b.content_handling.is_some())
    }

    /// Whether this function takes part in reconciliation
    pub fn is_eligible(&self) -> bool {
        self.check && self.content_handling_bindings().next().is_some()
    }
}

/// A `{path, resource_id}` pair under a REST API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub path: String,
    pub resource_id: String,
}

/// The resolved resources of one gateway
///
/// Built fresh on every run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGraph {
    pub rest_api_id: String,
    resources: Vec<ResourceEntry>,
}

impl ResourceGraph {
    pub fn new(rest_api_id: impl Into<String>, resources: Vec<ResourceEntry>) -> Self {
        Self {
            rest_api_id: rest_api_id.into(),
            resources,
        }
    }

    pub fn resources(&self) -> &[ResourceEntry] {
        &self.resources
    }

    /// Resource id for an exact path, first match wins
    pub fn resource_id(&self, path: &str) -> Option<&str> {
        self.resources
            .iter()
            .find(|r| r.path == path)
            .map(|r| r.resource_id.as_str())
    }
}

/// Composite key of one integration response lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntegrationQuery {
    pub rest_api_id: String,
    pub resource_id: String,
    pub http_method: String,
    pub status_code: String,
}

impl std::fmt::Display for IntegrationQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.rest_api_id, self.resource_id, self.http_method, self.status_code
        )
    }
}

/// Attempt bookkeeping for one function's polling cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckAttempt {
    attempts_made: u32,
    max_attempts: u32,
}

impl CheckAttempt {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts_made: 0,
            max_attempts,
        }
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Record a failed aggregate check; returns `true` once the budget is spent
    pub fn record_failure(&mut self) -> bool {
        self.attempts_made += 1;
        self.is_exhausted()
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts_made >= self.max_attempts
    }
}

/// A function's environment variables, always written back as a whole
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentVariableSet(BTreeMap<String, String>);

impl EnvironmentVariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Set or overwrite one key, leaving every other variable untouched
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<BTreeMap<String, String>> for EnvironmentVariableSet {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, String)> for EnvironmentVariableSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
