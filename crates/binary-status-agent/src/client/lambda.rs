//! Lambda function configuration client

use super::{AwsCredentials, SigV4Signer, SignedTransport, Target};
use binary_status_core::remote::{ComputeApi, FunctionConfiguration};
use binary_status_core::{EnvironmentVariableSet, Result};
use reqwest::Method;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const API_VERSION: &str = "2015-03-31";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConfigurationBody {
    function_name: String,
    #[serde(default)]
    environment: Option<EnvironmentBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnvironmentBody {
    #[serde(default)]
    variables: Option<EnvironmentVariableSet>,
}

impl From<ConfigurationBody> for FunctionConfiguration {
    fn from(body: ConfigurationBody) -> Self {
        FunctionConfiguration {
            function_name: body.function_name,
            environment: body.environment.map(|env| env.variables.unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LambdaClient {
    transport: SignedTransport,
}

impl LambdaClient {
    pub fn new(credentials: Arc<AwsCredentials>, region: &str) -> Self {
        let endpoint = format!("https://lambda.{}.amazonaws.com", region);
        Self::with_endpoint(credentials, region, endpoint)
    }

    pub fn with_endpoint(
        credentials: Arc<AwsCredentials>,
        region: &str,
        endpoint: impl Into<String>,
    ) -> Self {
        let signer = SigV4Signer::new(credentials, region, "lambda");
        Self {
            transport: SignedTransport::new(endpoint, signer),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.with_timeout(timeout);
        self
    }

    fn configuration_path(function_name: &str) -> String {
        format!("/{}/functions/{}/configuration", API_VERSION, function_name)
    }
}

#[async_trait::async_trait]
impl ComputeApi for LambdaClient {
    async fn get_function_configuration(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<FunctionConfiguration> {
        let query: Vec<(&str, &str)> = qualifier.map(|q| ("Qualifier", q)).into_iter().collect();
        let body: ConfigurationBody = self
            .transport
            .get_json(
                &Self::configuration_path(function_name),
                &query,
                Target::new("function", function_name),
            )
            .await?;
        Ok(body.into())
    }

    async fn update_function_environment(
        &self,
        function_name: &str,
        variables: &EnvironmentVariableSet,
    ) -> Result<()> {
        let url = self.transport.url(&Self::configuration_path(function_name), &[])?;
        let body = serde_json::json!({ "Environment": { "Variables": variables } });
        self.transport
            .send(Method::PUT, url, Some(&body), Target::new("function", function_name))
            .await?;
        tracing::debug!(
            function = function_name,
            variables = variables.len(),
            "Updated function environment"
        );
        Ok(())
    }
}
