//! Test Fixture Manager
//!
//! Provisions the disposable attribute definition and value the end-to-end
//! probe queries, and removes them again afterwards. Failures are soft: they
//! are logged and reported as `false`, never raised.

use crate::error::Result;
use crate::remote::{
    AttributeDefinition, AttributeValue, AttributeValueType, AttributeValues, AttributesApi,
    TenantContext,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Synthetic identifiers of the fixture data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSpec {
    pub tenant_id: String,
    pub definition_name: String,
    pub object_type: String,
    pub object_id: String,
    pub value: String,
}

impl Default for FixtureSpec {
    fn default() -> Self {
        Self {
            tenant_id: "40000000-0000-0000-0000-00000000test".to_string(),
            definition_name: "testfortemp".to_string(),
            object_type: "user".to_string(),
            object_id: "12340000".to_string(),
            value: "valuefortemp".to_string(),
        }
    }
}

impl FixtureSpec {
    pub fn tenant(&self) -> TenantContext {
        TenantContext::new(&self.tenant_id)
    }

    pub fn definition(&self) -> AttributeDefinition {
        AttributeDefinition {
            name: self.definition_name.clone(),
            tenant_id: self.tenant_id.clone(),
            value: AttributeValueType {
                kind: "string".to_string(),
            },
            apply_to: self.object_type.clone(),
            required: false,
        }
    }

    fn value_map(&self) -> BTreeMap<String, AttributeValue> {
        BTreeMap::from([(
            self.definition_name.clone(),
            AttributeValue {
                value: self.value.clone(),
            },
        )])
    }

    /// Payload for setting the fixture value, owner fields included
    pub fn values(&self) -> AttributeValues {
        AttributeValues {
            tenant_id: Some(self.tenant_id.clone()),
            object_id: Some(self.object_id.clone()),
            object_type: Some(self.object_type.clone()),
            values: self.value_map(),
        }
    }

    /// Payload for removing the fixture value
    pub fn removal(&self) -> AttributeValues {
        AttributeValues {
            tenant_id: None,
            object_id: None,
            object_type: None,
            values: self.value_map(),
        }
    }
}

pub struct FixtureManager {
    attributes: Arc<dyn AttributesApi>,
    spec: FixtureSpec,
    stage: String,
}

impl FixtureManager {
    pub fn new(attributes: Arc<dyn AttributesApi>, stage: impl Into<String>) -> Self {
        Self {
            attributes,
            spec: FixtureSpec::default(),
            stage: stage.into(),
        }
    }

    pub fn with_spec(mut self, spec: FixtureSpec) -> Self {
        self.spec = spec;
        self
    }

    pub fn spec(&self) -> &FixtureSpec {
        &self.spec
    }

    /// Create the definition, then set the value; `false` on any failure
    pub async fn provision(&self) -> bool {
        match self.try_provision().await {
            Ok(()) => {
                tracing::info!(stage = %self.stage, "Provisioned test fixture");
                true
            }
            Err(e) => {
                tracing::warn!(stage = %self.stage, error = %e, "Failed to provision test fixture");
                false
            }
        }
    }

    /// Remove the value, then delete the definition; `false` on any failure
    pub async fn teardown(&self) -> bool {
        match self.try_teardown().await {
            Ok(()) => {
                tracing::info!(stage = %self.stage, "Removed test fixture");
                true
            }
            Err(e) => {
                tracing::warn!(stage = %self.stage, error = %e, "Failed to remove test fixture");
                false
            }
        }
    }

    async fn try_provision(&self) -> Result<()> {
        let ctx = self.spec.tenant();
        self.attributes
            .create_definition(&self.spec.definition(), &ctx)
            .await?;
        self.attributes
            .set_values(&self.spec.object_type, &self.spec.object_id, &self.spec.values(), &ctx)
            .await
    }

    async fn try_teardown(&self) -> Result<()> {
        let ctx = self.spec.tenant();
        self.attributes
            .remove_values(&self.spec.object_type, &self.spec.object_id, &self.spec.removal(), &ctx)
            .await?;
        self.attributes
            .delete_definition(&self.spec.definition_name, &ctx)
            .await
    }
}
