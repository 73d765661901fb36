//! Configuration Probe
//!
//! Read-only checks against the remote configuration:
//!
//! - the gateway advertises the required binary media type
//! - a route's integration response carries the expected content handling
//! - synthetic traffic through the attributes service succeeds
//!
//! The first two propagate remote errors. The end-to-end probe never does:
//! any failure is logged and reported as `false`.

use crate::error::Result;
use crate::fixture::FixtureSpec;
use crate::model::IntegrationQuery;
use crate::remote::{AttributesApi, FilterRule, GatewayApi, MatchClause};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Status code an integration response must report to count as enabled
pub const SUCCESS_STATUS_CODE: &str = "200";

/// Outcome of one content-handling check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentHandlingCheck {
    pub method: String,
    pub path: String,
    pub expected: String,
    pub matches: bool,
}

/// Results of one full probe round for a function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeVerdict {
    pub binary_media_type: bool,
    pub content_handling: Vec<ContentHandlingCheck>,
    pub end_to_end: bool,
}

impl ProbeVerdict {
    /// Logical AND of every individual check
    pub fn passed(&self) -> bool {
        self.binary_media_type && self.content_handling.iter().all(|c| c.matches) && self.end_to_end
    }

    /// Names of the checks that did not pass
    pub fn failed_checks(&self) -> Vec<String> {
        let mut failed = Vec::new();
        if !self.binary_media_type {
            failed.push("binary_media_type".to_string());
        }
        failed.extend(
            self.content_handling
                .iter()
                .filter(|c| !c.matches)
                .map(|c| format!("content_handling {} {}", c.method, c.path)),
        );
        if !self.end_to_end {
            failed.push("end_to_end".to_string());
        }
        failed
    }
}

pub struct ConfigurationProbe {
    gateway: Arc<dyn GatewayApi>,
    attributes: Arc<dyn AttributesApi>,
}

impl ConfigurationProbe {
    pub fn new(gateway: Arc<dyn GatewayApi>, attributes: Arc<dyn AttributesApi>) -> Self {
        Self {
            gateway,
            attributes,
        }
    }

    /// Whether the gateway lists `expected` among its binary media types
    ///
    /// An absent or empty list is `false`, not an error.
    pub async fn has_binary_media_type(&self, rest_api_id: &str, expected: &str) -> Result<bool> {
        let config = self.gateway.get_rest_api(rest_api_id).await?;
        let present = config
            .binary_media_types
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|t| t == expected);
        tracing::debug!(rest_api_id, expected, present, "Checked binary media types");
        Ok(present)
    }

    /// Whether the integration response is `200` with exactly `expected_mode`
    pub async fn content_handling_matches(
        &self,
        query: &IntegrationQuery,
        expected_mode: &str,
    ) -> Result<bool> {
        let response = self.gateway.get_integration_response(query).await?;
        let matches = response.status_code.as_deref() == Some(SUCCESS_STATUS_CODE)
            && response.content_handling.as_deref() == Some(expected_mode);
        tracing::debug!(
            query = %query,
            expected_mode,
            actual = ?response.content_handling,
            matches,
            "Checked integration content handling"
        );
        Ok(matches)
    }

    /// Filter query against the fixture data; `true` iff the call succeeds
    pub async fn end_to_end_probe(&self, fixture: &FixtureSpec) -> bool {
        let filters = [FilterRule {
            id: Uuid::new_v4().to_string(),
            clauses: vec![MatchClause {
                attr: fixture.definition_name.clone(),
                op: "$ne".to_string(),
                value: "test".to_string(),
            }],
        }];
        let options = serde_json::json!({});

        match self
            .attributes
            .filter_values(&filters, &options, &fixture.tenant())
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "End-to-end probe failed");
                false
            }
        }
    }
}
