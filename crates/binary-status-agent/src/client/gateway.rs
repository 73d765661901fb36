//! API Gateway (REST APIs, v1) control plane client

use super::{AwsCredentials, SigV4Signer, SignedTransport, Target};
use binary_status_core::remote::{
    ApiResource, GatewayApi, IntegrationResponse, RestApiConfig, RestApiSummary,
};
use binary_status_core::{IntegrationQuery, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Largest page the list operations accept
pub const PAGE_LIMIT: &str = "500";

/// One page of a list operation
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new", alias = "items")]
    item: Vec<T>,
    #[serde(default)]
    position: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiGatewayClient {
    transport: SignedTransport,
}

impl ApiGatewayClient {
    /// Client for the regional public endpoint
    pub fn new(credentials: Arc<AwsCredentials>, region: &str) -> Self {
        let endpoint = format!("https://apigateway.{}.amazonaws.com", region);
        Self::with_endpoint(credentials, region, endpoint)
    }

    pub fn with_endpoint(
        credentials: Arc<AwsCredentials>,
        region: &str,
        endpoint: impl Into<String>,
    ) -> Self {
        let signer = SigV4Signer::new(credentials, region, "apigateway");
        Self {
            transport: SignedTransport::new(endpoint, signer),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.with_timeout(timeout);
        self
    }

    /// Follow `position` cursors until the last page
    async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        target: Target<'_>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut position: Option<String> = None;
        loop {
            let page: Page<T> = {
                let mut query = vec![("limit", PAGE_LIMIT)];
                if let Some(cursor) = position.as_deref() {
                    query.push(("position", cursor));
                }
                self.transport.get_json(path, &query, target).await?
            };
            items.extend(page.item);
            match page.position {
                Some(next) if !next.is_empty() => position = Some(next),
                _ => break,
            }
        }
        Ok(items)
    }
}

#[async_trait::async_trait]
impl GatewayApi for ApiGatewayClient {
    async fn list_rest_apis(&self) -> Result<Vec<RestApiSummary>> {
        let apis: Vec<RestApiSummary> = self
            .list_all("/restapis", Target::new("REST API list", "/restapis"))
            .await?;
        tracing::debug!(count = apis.len(), "Listed REST APIs");
        Ok(apis)
    }

    async fn list_resources(&self, rest_api_id: &str) -> Result<Vec<ApiResource>> {
        let path = format!("/restapis/{}/resources", rest_api_id);
        self.list_all(&path, Target::new("REST API", rest_api_id)).await
    }

    async fn get_rest_api(&self, rest_api_id: &str) -> Result<RestApiConfig> {
        let path = format!("/restapis/{}", rest_api_id);
        self.transport
            .get_json(&path, &[], Target::new("REST API", rest_api_id))
            .await
    }

    async fn get_integration_response(
        &self,
        query: &IntegrationQuery,
    ) -> Result<IntegrationResponse> {
        let path = format!(
            "/restapis/{}/resources/{}/methods/{}/integration/responses/{}",
            query.rest_api_id, query.resource_id, query.http_method, query.status_code
        );
        let name = query.to_string();
        self.transport
            .get_json(&path, &[], Target::new("integration response", &name))
            .await
    }
}
