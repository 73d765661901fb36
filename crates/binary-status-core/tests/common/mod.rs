//! In-memory stand-in for the gateway, compute and attributes services

#![allow(dead_code)]

use binary_status_core::remote::{
    ApiResource, AttributeDefinition, AttributeValues, AttributesApi, ComputeApi, FilterRule,
    FunctionConfiguration, GatewayApi, IntegrationResponse, RestApiConfig, RestApiSummary,
    TenantContext,
};
use binary_status_core::{
    BackoffConfig, EnvironmentVariableSet, Error, FunctionSpec, HttpEventBinding,
    IntegrationQuery, ReconcileConfig, Reconciler, Result,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const API_NAME: &str = "dev-attributes";
pub const REST_API_ID: &str = "a1b2c3";
pub const BINARY: &str = "CONVERT_TO_BINARY";

#[derive(Default)]
pub struct Knobs {
    /// Integration responses report content handling from this call onward (1-based)
    pub integration_ready_from_call: Option<u32>,
    /// Resource ids whose integration does not exist at all
    pub missing_integrations: Vec<String>,
    /// Resource ids whose integration lookup is throttled
    pub throttled_integrations: Vec<String>,
    pub media_types: Option<Vec<String>>,
    pub rest_api_error: Option<Error>,
    pub fail_provision: bool,
    pub fail_filter: bool,
    pub fail_first_update: bool,
    pub duplicate_api: bool,
}

#[derive(Default)]
pub struct Counters {
    pub list_rest_apis: u32,
    pub get_rest_api: u32,
    pub integration: u32,
    pub filter: u32,
    pub updates: u32,
}

pub struct FakeCloud {
    pub knobs: Mutex<Knobs>,
    pub counters: Mutex<Counters>,
    pub environments: Mutex<HashMap<String, EnvironmentVariableSet>>,
    /// Ordered log of side effects and probe calls
    pub events: Mutex<Vec<String>>,
    /// Status codes requested from integration responses
    pub queried_status_codes: Mutex<Vec<String>>,
    /// Definition names created by the fixture
    pub provisioned_definitions: Mutex<Vec<String>>,
    /// Attribute names used by filter queries
    pub filtered_attributes: Mutex<Vec<String>>,
}

impl FakeCloud {
    pub fn new(knobs: Knobs) -> Arc<Self> {
        Arc::new(Self {
            knobs: Mutex::new(knobs),
            counters: Mutex::new(Counters::default()),
            environments: Mutex::new(HashMap::new()),
            events: Mutex::new(Vec::new()),
            queried_status_codes: Mutex::new(Vec::new()),
            provisioned_definitions: Mutex::new(Vec::new()),
            filtered_attributes: Mutex::new(Vec::new()),
        })
    }

    /// Integrations ready immediately, media type present
    pub fn healthy() -> Arc<Self> {
        Self::new(Knobs {
            integration_ready_from_call: Some(1),
            media_types: Some(vec!["application/json".to_string()]),
            ..Default::default()
        })
    }

    pub fn with_environment(self: Arc<Self>, function: &str, vars: &[(&str, &str)]) -> Arc<Self> {
        let env = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.environments
            .lock()
            .unwrap()
            .insert(function.to_string(), env);
        self
    }

    pub fn flag(&self, function: &str) -> Option<String> {
        self.environments
            .lock()
            .unwrap()
            .get(function)
            .and_then(|env| env.get("ENABLE_COMPRESSION").map(String::from))
    }

    pub fn environment(&self, function: &str) -> Option<EnvironmentVariableSet> {
        self.environments.lock().unwrap().get(function).cloned()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn log(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }
}

#[async_trait::async_trait]
impl GatewayApi for FakeCloud {
    async fn list_rest_apis(&self) -> Result<Vec<RestApiSummary>> {
        self.counters.lock().unwrap().list_rest_apis += 1;
        let mut apis = vec![
            RestApiSummary {
                id: "other".into(),
                name: "prod-attributes".into(),
            },
            RestApiSummary {
                id: REST_API_ID.into(),
                name: API_NAME.into(),
            },
        ];
        if self.knobs.lock().unwrap().duplicate_api {
            apis.push(RestApiSummary {
                id: "dupe".into(),
                name: API_NAME.into(),
            });
        }
        Ok(apis)
    }

    async fn list_resources(&self, rest_api_id: &str) -> Result<Vec<ApiResource>> {
        assert_eq!(rest_api_id, REST_API_ID);
        Ok(vec![
            ApiResource {
                id: "root".into(),
                path: "/".into(),
            },
            ApiResource {
                id: "res-filter".into(),
                path: "/values/filter".into(),
            },
            ApiResource {
                id: "res-export".into(),
                path: "/values/export".into(),
            },
        ])
    }

    async fn get_rest_api(&self, rest_api_id: &str) -> Result<RestApiConfig> {
        self.counters.lock().unwrap().get_rest_api += 1;
        let knobs = self.knobs.lock().unwrap();
        if let Some(e) = &knobs.rest_api_error {
            return Err(e.clone());
        }
        Ok(RestApiConfig {
            id: rest_api_id.to_string(),
            name: API_NAME.to_string(),
            binary_media_types: knobs.media_types.clone(),
        })
    }

    async fn get_integration_response(
        &self,
        query: &IntegrationQuery,
    ) -> Result<IntegrationResponse> {
        let call = {
            let mut counters = self.counters.lock().unwrap();
            counters.integration += 1;
            counters.integration
        };
        self.log(format!("probe:{}", query.resource_id));
        self.queried_status_codes
            .lock()
            .unwrap()
            .push(query.status_code.clone());
        let knobs = self.knobs.lock().unwrap();
        if knobs.throttled_integrations.contains(&query.resource_id) {
            return Err(Error::transient("TooManyRequestsException"));
        }
        if knobs.missing_integrations.contains(&query.resource_id) {
            return Err(Error::not_found("integration response", query.to_string()));
        }
        let ready = knobs
            .integration_ready_from_call
            .is_some_and(|from| call >= from);
        Ok(IntegrationResponse {
            status_code: Some(query.status_code.clone()),
            content_handling: ready.then(|| BINARY.to_string()),
        })
    }
}

#[async_trait::async_trait]
impl ComputeApi for FakeCloud {
    async fn get_function_configuration(
        &self,
        function_name: &str,
        _qualifier: Option<&str>,
    ) -> Result<FunctionConfiguration> {
        Ok(FunctionConfiguration {
            function_name: function_name.to_string(),
            environment: self.environment(function_name),
        })
    }

    async fn update_function_environment(
        &self,
        function_name: &str,
        variables: &EnvironmentVariableSet,
    ) -> Result<()> {
        let call = {
            let mut counters = self.counters.lock().unwrap();
            counters.updates += 1;
            counters.updates
        };
        if call == 1 && self.knobs.lock().unwrap().fail_first_update {
            return Err(Error::transient("TooManyRequestsException"));
        }
        self.log(format!(
            "update:{}:{}",
            function_name,
            variables.get("ENABLE_COMPRESSION").unwrap_or("-")
        ));
        self.environments
            .lock()
            .unwrap()
            .insert(function_name.to_string(), variables.clone());
        Ok(())
    }
}

#[async_trait::async_trait]
impl AttributesApi for FakeCloud {
    async fn create_definition(
        &self,
        definition: &AttributeDefinition,
        _ctx: &TenantContext,
    ) -> Result<()> {
        self.log("provision");
        self.provisioned_definitions
            .lock()
            .unwrap()
            .push(definition.name.clone());
        if self.knobs.lock().unwrap().fail_provision {
            return Err(Error::Rejected {
                status: 409,
                message: "definition exists".into(),
            });
        }
        Ok(())
    }

    async fn set_values(
        &self,
        _object_type: &str,
        _object_id: &str,
        _values: &AttributeValues,
        _ctx: &TenantContext,
    ) -> Result<()> {
        Ok(())
    }

    async fn remove_values(
        &self,
        _object_type: &str,
        _object_id: &str,
        _values: &AttributeValues,
        _ctx: &TenantContext,
    ) -> Result<()> {
        self.log("teardown");
        Ok(())
    }

    async fn delete_definition(&self, _definition_id: &str, _ctx: &TenantContext) -> Result<()> {
        Ok(())
    }

    async fn filter_values(
        &self,
        filters: &[FilterRule],
        _options: &serde_json::Value,
        _ctx: &TenantContext,
    ) -> Result<serde_json::Value> {
        self.counters.lock().unwrap().filter += 1;
        self.filtered_attributes.lock().unwrap().extend(
            filters
                .iter()
                .flat_map(|rule| rule.clauses.iter().map(|clause| clause.attr.clone())),
        );
        if self.knobs.lock().unwrap().fail_filter {
            return Err(Error::transient("502 Bad Gateway"));
        }
        Ok(serde_json::json!({ "results": [] }))
    }
}

pub fn fast_config() -> ReconcileConfig {
    ReconcileConfig::builder()
        .backoff(BackoffConfig::fixed(Duration::ZERO))
        .build()
        .unwrap()
}

pub fn reconciler(cloud: &Arc<FakeCloud>, config: ReconcileConfig) -> Reconciler {
    Reconciler::from_clients(cloud.clone(), cloud.clone(), cloud.clone(), "dev", config)
}

pub fn binary_function(name: &str, path: &str) -> FunctionSpec {
    FunctionSpec::new(
        name,
        vec![HttpEventBinding::new("post", path).with_content_handling(BINARY)],
    )
}
