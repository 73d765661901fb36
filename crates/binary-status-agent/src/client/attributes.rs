//! Attributes service client
//!
//! Talks to the deployed attributes service itself, so it is bound to one
//! stage's base URL. Every call carries the tenant in `X-Tenant-Id`.

use super::{build_url, check_status, transport_error, Target, DEFAULT_TIMEOUT};
use binary_status_core::remote::{
    AttributeDefinition, AttributeValues, AttributesApi, FilterRule, TenantContext,
};
use binary_status_core::Result;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response};
use serde::Serialize;
use std::time::Duration;

pub const TENANT_HEADER: &str = "X-Tenant-Id";

#[derive(Debug, Serialize)]
struct FilterRequest<'a> {
    filters: &'a [FilterRule],
    options: &'a serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct AttributesClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl AttributesClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        ctx: &TenantContext,
        target: Target<'_>,
    ) -> Result<Response> {
        let url = build_url(&self.base_url, path, &[])?;
        let mut request = self
            .client
            .request(method, url)
            .timeout(self.timeout)
            .header(TENANT_HEADER, ctx.tenant_id.as_str());
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(body)?);
        }
        let response = request.send().await.map_err(transport_error)?;
        check_status(response, target).await
    }

    fn values_path(object_type: &str, object_id: &str) -> String {
        format!("/values/{}/{}", object_type, object_id)
    }
}

#[async_trait::async_trait]
impl AttributesApi for AttributesClient {
    async fn create_definition(
        &self,
        definition: &AttributeDefinition,
        ctx: &TenantContext,
    ) -> Result<()> {
        self.send(
            Method::POST,
            "/definitions",
            Some(definition),
            ctx,
            Target::new("attribute definition", &definition.name),
        )
        .await?;
        Ok(())
    }

    async fn set_values(
        &self,
        object_type: &str,
        object_id: &str,
        values: &AttributeValues,
        ctx: &TenantContext,
    ) -> Result<()> {
        self.send(
            Method::PUT,
            &Self::values_path(object_type, object_id),
            Some(values),
            ctx,
            Target::new(object_type, object_id),
        )
        .await?;
        Ok(())
    }

    async fn remove_values(
        &self,
        object_type: &str,
        object_id: &str,
        values: &AttributeValues,
        ctx: &TenantContext,
    ) -> Result<()> {
        self.send(
            Method::DELETE,
            &Self::values_path(object_type, object_id),
            Some(values),
            ctx,
            Target::new(object_type, object_id),
        )
        .await?;
        Ok(())
    }

    async fn delete_definition(&self, definition_id: &str, ctx: &TenantContext) -> Result<()> {
        self.send::<()>(
            Method::DELETE,
            &format!("/definitions/{}", definition_id),
            None,
            ctx,
            Target::new("attribute definition", definition_id),
        )
        .await?;
        Ok(())
    }

    async fn filter_values(
        &self,
        filters: &[FilterRule],
        options: &serde_json::Value,
        ctx: &TenantContext,
    ) -> Result<serde_json::Value> {
        let request = FilterRequest { filters, options };
        let response = self
            .send(
                Method::POST,
                "/values/filter",
                Some(&request),
                ctx,
                Target::new("filter endpoint", "/values/filter"),
            )
            .await?;
        let text = response.text().await.map_err(transport_error)?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}
