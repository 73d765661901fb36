//! Deploy context handed over by the deployment hook
//!
//! The document mirrors a serverless service definition: a service name, a
//! provider block with stage/region and a map of functions with their HTTP
//! events. It is converted once into a typed `Vec<FunctionSpec>`.

use crate::error::{Error, Result};
use crate::model::{FunctionSpec, HttpEventBinding};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSection {
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Explicit gateway name, overriding `{stage}-{service}`
    #[serde(default)]
    pub api_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpEventSection {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub content_handling: Option<String>,
}

/// An `http` event, either as a map or as the `"METHOD path"` shorthand
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HttpEvent {
    Detailed(HttpEventSection),
    Shorthand(String),
}

impl HttpEvent {
    /// Typed binding; a shorthand that is not exactly `METHOD path` yields `None`
    pub fn binding(&self) -> Option<HttpEventBinding> {
        match self {
            Self::Detailed(http) => {
                let binding = HttpEventBinding::new(&http.method, &http.path);
                Some(match &http.content_handling {
                    Some(mode) => binding.with_content_handling(mode.clone()),
                    None => binding,
                })
            }
            Self::Shorthand(raw) => {
                let mut parts = raw.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(method), Some(path), None) => Some(HttpEventBinding::new(method, path)),
                    _ => None,
                }
            }
        }
    }
}

/// One entry of a function's `events` list; non-HTTP events are ignored
#[derive(Debug, Clone, Deserialize)]
pub struct EventSection {
    #[serde(default)]
    pub http: Option<HttpEvent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionSection {
    /// Deployed name override
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_check")]
    pub check: bool,
    #[serde(default)]
    pub events: Vec<EventSection>,
}

fn default_check() -> bool {
    true
}

/// The service definition as seen after deploy finalization
#[derive(Debug, Clone, Deserialize)]
pub struct DeployContext {
    pub service: String,
    #[serde(default)]
    pub provider: ProviderSection,
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionSection>,
}

impl DeployContext {
    /// Parse YAML (a superset of JSON)
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let context: Self = serde_yaml::from_str(content)?;
        if context.service.trim().is_empty() {
            return Err(Error::configuration("service name must not be empty"));
        }
        Ok(context)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let context: Self = serde_json::from_str(content)?;
        if context.service.trim().is_empty() {
            return Err(Error::configuration("service name must not be empty"));
        }
        Ok(context)
    }

    /// Load from a file; `.json` is parsed as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Gateway name: explicit `apiName` or `{stage}-{service}`
    pub fn api_gateway_name(&self, stage: &str) -> String {
        self.provider
            .api_name
            .clone()
            .unwrap_or_else(|| format!("{}-{}", stage, self.service))
    }

    /// Typed function list with deployed names resolved for `stage`
    pub fn function_specs(&self, stage: &str) -> Vec<FunctionSpec> {
        self.functions
            .iter()
            .map(|(key, section)| {
                let name = section
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("{}-{}-{}", self.service, stage, key));
                let bindings = section
                    .events
                    .iter()
                    .filter_map(|e| e.http.as_ref())
                    .filter_map(HttpEvent::binding)
                    .collect();
                FunctionSpec {
                    name,
                    bindings,
                    check: section.check,
                }
            })
            .collect()
    }
}
