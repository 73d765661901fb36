//! HTTP clients for the gateway, function and attributes control planes
//!
//! Each client implements one of the `binary_status_core::remote` traits.
//! Responses are mapped onto the core error taxonomy:
//!
//! - 404 → `NotFound`
//! - 429, 5xx, timeouts, connection failures → `Transient`
//! - any other non-success status → `Rejected`

pub mod attributes;
pub mod gateway;
pub mod lambda;
pub mod signing;

pub use attributes::AttributesClient;
pub use gateway::ApiGatewayClient;
pub use lambda::LambdaClient;
pub use signing::{AwsCredentials, SigV4Signer};

use binary_status_core::{Error, Result};
use chrono::Utc;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Per-request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// What a request addresses; names the resource in `NotFound` errors
#[derive(Debug, Clone, Copy)]
pub(crate) struct Target<'a> {
    pub kind: &'a str,
    pub name: &'a str,
}

impl<'a> Target<'a> {
    pub fn new(kind: &'a str, name: &'a str) -> Self {
        Self { kind, name }
    }
}

/// Build `{base}{path}?{query}`
pub(crate) fn build_url(base: &str, path: &str, query: &[(&str, &str)]) -> Result<Url> {
    let raw = format!("{}{}", base.trim_end_matches('/'), path);
    let mut url = Url::parse(&raw)
        .map_err(|e| Error::configuration(format!("invalid URL {}: {}", raw, e)))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Map a non-success status onto the error taxonomy
pub(crate) fn status_error(status: StatusCode, message: String, target: Target<'_>) -> Error {
    match status.as_u16() {
        404 => Error::not_found(target.kind, target.name),
        429 | 500..=599 => Error::transient(format!("HTTP {}: {}", status.as_u16(), message)),
        code => Error::Rejected {
            status: code,
            message,
        },
    }
}

pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    if err.is_decode() {
        Error::Serialization(format!("JSON error: {}", err))
    } else {
        Error::transient(err.to_string())
    }
}

/// Pass successful responses through, turn everything else into an error
pub(crate) async fn check_status(response: Response, target: Target<'_>) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(status_error(status, message, target))
}

pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    response.json::<T>().await.map_err(transport_error)
}

/// JSON transport signed with SigV4, shared by the AWS control-plane clients
#[derive(Debug, Clone)]
pub(crate) struct SignedTransport {
    client: reqwest::Client,
    endpoint: String,
    signer: SigV4Signer,
    timeout: Duration,
}

impl SignedTransport {
    pub fn new(endpoint: impl Into<String>, signer: SigV4Signer) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            signer,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        build_url(&self.endpoint, path, query)
    }

    pub async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
        target: Target<'_>,
    ) -> Result<Response> {
        let payload = match body {
            Some(value) => serde_json::to_vec(value)?,
            None => Vec::new(),
        };
        let headers = self.signer.sign(method.as_str(), &url, &payload, Utc::now())?;

        tracing::debug!(method = %method, url = %url, "Sending signed request");
        let mut request = self
            .client
            .request(method, url)
            .timeout(self.timeout)
            .header(ACCEPT, "application/json");
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if body.is_some() {
            request = request.header(CONTENT_TYPE, "application/json").body(payload);
        }

        let response = request.send().await.map_err(transport_error)?;
        check_status(response, target).await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        target: Target<'_>,
    ) -> Result<T> {
        let url = self.url(path, query)?;
        let response = self.send(Method::GET, url, None, target).await?;
        decode(response).await
    }
}
