//! Remote control-plane interfaces
//!
//! Trait-based seams for the gateway, compute and attributes services. The
//! core only depends on these traits; `binary-status-agent` provides the
//! HTTP implementations.

pub mod traits;

pub use traits::{
    ApiResource, AttributeDefinition, AttributeValue, AttributeValueType, AttributeValues,
    AttributesApi, ComputeApi, FilterRule, FunctionConfiguration, GatewayApi,
    IntegrationResponse, MatchClause, RestApiConfig, RestApiSummary, TenantContext,
};

#[cfg(test)]
pub use traits::{MockAttributesApi, MockGatewayApi};
