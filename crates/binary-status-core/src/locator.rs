//! Resource Locator
//!
//! Resolves a gateway's logical name to its REST API id and resource paths.

use crate::error::{Error, Result};
use crate::model::{ResourceEntry, ResourceGraph};
use crate::remote::GatewayApi;
use std::sync::Arc;

pub struct ResourceLocator {
    gateway: Arc<dyn GatewayApi>,
}

impl ResourceLocator {
    pub fn new(gateway: Arc<dyn GatewayApi>) -> Self {
        Self { gateway }
    }

    /// Find the REST API named exactly `name` and list its resources
    pub async fn locate(&self, name: &str) -> Result<ResourceGraph> {
        let apis = self.gateway.list_rest_apis().await?;
        let mut matches = apis.into_iter().filter(|api| api.name == name);

        let api = matches
            .next()
            .ok_or_else(|| Error::not_found("REST API", name))?;
        let extra = matches.count();
        if extra > 0 {
            return Err(Error::Ambiguous {
                name: name.to_string(),
                count: extra + 1,
            });
        }

        let resources = self.gateway.list_resources(&api.id).await?;
        tracing::debug!(
            api_name = name,
            rest_api_id = %api.id,
            resources = resources.len(),
            "Resolved gateway resources"
        );

        Ok(ResourceGraph::new(
            api.id,
            resources
                .into_iter()
                .map(|r| ResourceEntry {
                    path: r.path,
                    resource_id: r.id,
                })
                .collect(),
        ))
    }
}
