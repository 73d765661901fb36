//! Remote control-plane interfaces
//!
//! The reconciler never talks to the network directly. It is handed
//! implementations of these traits: real HTTP clients in production,
//! in-memory fakes or mocks in tests.
//!
//! # Error Handling
//!
//! Implementations return `Error::NotFound` when the addressed resource does
//! not exist, `Error::Transient` for network, throttling and server-side
//! failures, and `Error::Rejected` for any other refusal.

use crate::error::Result;
use crate::model::{EnvironmentVariableSet, IntegrationQuery};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of the account's REST API list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestApiSummary {
    pub id: String,
    pub name: String,
}

/// One resource of a REST API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResource {
    pub id: String,
    pub path: String,
}

/// Gateway-level configuration of a REST API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApiConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub binary_media_types: Option<Vec<String>>,
}

/// Integration response of one method/status pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationResponse {
    #[serde(default)]
    pub status_code: Option<String>,
    #[serde(default)]
    pub content_handling: Option<String>,
}

/// The part of a function's configuration this tool reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionConfiguration {
    pub function_name: String,
    /// `None` when the function has no environment block at all
    pub environment: Option<EnvironmentVariableSet>,
}

/// Tenant scope attached to every attributes-service call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantContext {
    pub tenant_id: String,
}

impl TenantContext {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
        }
    }
}

/// Value type of an attribute definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValueType {
    #[serde(rename = "type")]
    pub kind: String,
}

/// An attribute definition to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    pub name: String,
    pub tenant_id: String,
    pub value: AttributeValueType,
    pub apply_to: String,
    pub required: bool,
}

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub value: String,
}

/// A set of values for one object, as sent to set/remove calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    pub values: BTreeMap<String, AttributeValue>,
}

/// One match clause of a filter rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchClause {
    pub attr: String,
    pub op: String,
    pub value: String,
}

/// A filter rule evaluated by the attributes service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub id: String,
    #[serde(rename = "match")]
    pub clauses: Vec<MatchClause>,
}

/// API Gateway control plane
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GatewayApi: Send + Sync {
    /// List every REST API in the account/region
    async fn list_rest_apis(&self) -> Result<Vec<RestApiSummary>>;

    /// List every resource under a REST API
    async fn list_resources(&self, rest_api_id: &str) -> Result<Vec<ApiResource>>;

    /// Fetch gateway-level configuration
    async fn get_rest_api(&self, rest_api_id: &str) -> Result<RestApiConfig>;

    /// Fetch one integration response
    async fn get_integration_response(
        &self,
        query: &IntegrationQuery,
    ) -> Result<IntegrationResponse>;
}

/// Function (compute) control plane
#[async_trait::async_trait]
pub trait ComputeApi: Send + Sync {
    /// Read a function's configuration, optionally at a version or alias
    async fn get_function_configuration(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<FunctionConfiguration>;

    /// Replace a function's whole environment variable set
    async fn update_function_environment(
        &self,
        function_name: &str,
        variables: &EnvironmentVariableSet,
    ) -> Result<()>;
}

/// Attributes service used for fixture data and end-to-end traffic
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AttributesApi: Send + Sync {
    async fn create_definition(
        &self,
        definition: &AttributeDefinition,
        ctx: &TenantContext,
    ) -> Result<()>;

    async fn set_values(
        &self,
        object_type: &str,
        object_id: &str,
        values: &AttributeValues,
        ctx: &TenantContext,
    ) -> Result<()>;

    async fn remove_values(
        &self,
        object_type: &str,
        object_id: &str,
        values: &AttributeValues,
        ctx: &TenantContext,
    ) -> Result<()>;

    async fn delete_definition(&self, definition_id: &str, ctx: &TenantContext) -> Result<()>;

    /// Run filter rules; the response body is opaque to this tool
    async fn filter_values(
        &self,
        filters: &[FilterRule],
        options: &serde_json::Value,
        ctx: &TenantContext,
    ) -> Result<serde_json::Value>;
}
