//! Configuration Mutator
//!
//! Toggles the feature flag in a function's environment. The remote API only
//! accepts a complete variable set, so the current set is read, one key is
//! overwritten and the whole set is written back.

use crate::error::Result;
use crate::model::EnvironmentVariableSet;
use crate::remote::ComputeApi;
use std::sync::Arc;

pub struct ConfigurationMutator {
    compute: Arc<dyn ComputeApi>,
    flag_key: String,
    qualifier: Option<String>,
}

impl ConfigurationMutator {
    pub fn new(compute: Arc<dyn ComputeApi>, flag_key: impl Into<String>) -> Self {
        Self {
            compute,
            flag_key: flag_key.into(),
            qualifier: None,
        }
    }

    /// Read configuration at this version or alias instead of `$LATEST`
    pub fn with_qualifier(mut self, qualifier: Option<String>) -> Self {
        self.qualifier = qualifier;
        self
    }

    pub fn flag_key(&self) -> &str {
        &self.flag_key
    }

    /// Set the flag to `"true"`/`"false"`, preserving every other variable
    pub async fn set_feature_flag(&self, function_name: &str, enabled: bool) -> Result<()> {
        let config = self
            .compute
            .get_function_configuration(function_name, self.qualifier.as_deref())
            .await?;
        let mut variables = config.environment.unwrap_or_default();
        variables.set(self.flag_key.clone(), enabled.to_string());

        self.compute
            .update_function_environment(function_name, &variables)
            .await?;

        tracing::info!(
            function = function_name,
            flag = %self.flag_key,
            enabled,
            variables = variables.len(),
            "Updated function feature flag"
        );
        Ok(())
    }

    /// Current flag value, if the function has one
    pub async fn read_feature_flag(&self, function_name: &str) -> Result<Option<String>> {
        let config = self
            .compute
            .get_function_configuration(function_name, self.qualifier.as_deref())
            .await?;
        Ok(config
            .environment
            .as_ref()
            .and_then(|vars: &EnvironmentVariableSet| vars.get(&self.flag_key))
            .map(String::from))
    }
}
