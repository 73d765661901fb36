//! Integration tests for the binary status agent
//!
//! Control-plane clients are exercised against wiremock servers; the CLI
//! argument resolution against temporary service and config files.

use binary_status_agent::cli::TargetArgs;
use binary_status_agent::{
    ApiGatewayClient, AttributesClient, AwsCredentials, LambdaClient, OutputFormat,
};
use binary_status_core::remote::{AttributesApi, ComputeApi, GatewayApi, TenantContext};
use binary_status_core::{
    BackoffConfig, EnvironmentVariableSet, Error, FixtureSpec, FunctionSpec, HttpEventBinding,
    IntegrationQuery, ReconcileConfig, ReconcileState, Reconciler,
};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> Arc<AwsCredentials> {
    Arc::new(AwsCredentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"))
}

fn gateway(server: &MockServer) -> ApiGatewayClient {
    ApiGatewayClient::with_endpoint(credentials(), "us-east-1", server.uri())
}

fn lambda(server: &MockServer) -> LambdaClient {
    LambdaClient::with_endpoint(credentials(), "us-east-1", server.uri())
}

// ============================================================================
// API Gateway
// ============================================================================

#[tokio::test]
async fn test_list_rest_apis_follows_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/restapis"))
        .and(query_param("position", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "item": [{ "id": "b2", "name": "dev-attributes" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/restapis"))
        .and(query_param("limit", "500"))
        .and(header_exists("authorization"))
        .and(header_exists("x-amz-date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "item": [{ "id": "a1", "name": "prod-attributes", "createdDate": 1700000000 }],
            "position": "p2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let apis = gateway(&server).list_rest_apis().await.unwrap();
    let names: Vec<&str> = apis.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["prod-attributes", "dev-attributes"]);
}

#[tokio::test]
async fn test_list_resources() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/restapis/a1/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "item": [
                { "id": "r0", "path": "/" },
                { "id": "r1", "parentId": "r0", "pathPart": "filter", "path": "/values/filter" }
            ]
        })))
        .mount(&server)
        .await;

    let resources = gateway(&server).list_resources("a1").await.unwrap();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[1].id, "r1");
    assert_eq!(resources[1].path, "/values/filter");
}

#[tokio::test]
async fn test_get_rest_api_binary_media_types() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/restapis/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a1",
            "name": "dev-attributes",
            "binaryMediaTypes": ["application/json"]
        })))
        .mount(&server)
        .await;

    let api = gateway(&server).get_rest_api("a1").await.unwrap();
    assert_eq!(api.binary_media_types, Some(vec!["application/json".to_string()]));
}

#[tokio::test]
async fn test_gateway_status_mapping() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/restapis/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "message": "Invalid API identifier" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/restapis/busy"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/restapis/denied"))
        .respond_with(ResponseTemplate::new(403).set_body_string("AccessDenied"))
        .mount(&server)
        .await;

    let client = gateway(&server);
    assert!(matches!(
        client.get_rest_api("missing").await,
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        client.get_rest_api("busy").await,
        Err(Error::Transient(_))
    ));
    assert_eq!(
        client.get_rest_api("denied").await.unwrap_err(),
        Error::Rejected {
            status: 403,
            message: "AccessDenied".into()
        }
    );
}

#[tokio::test]
async fn test_timeout_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/restapis/a1"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = gateway(&server).with_timeout(Duration::from_millis(50));
    assert!(matches!(client.get_rest_api("a1").await, Err(Error::Transient(_))));
}

#[tokio::test]
async fn test_get_integration_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/restapis/a1/resources/r1/methods/POST/integration/responses/200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statusCode": "200",
            "contentHandling": "CONVERT_TO_BINARY",
            "responseTemplates": {}
        })))
        .mount(&server)
        .await;

    let query = IntegrationQuery {
        rest_api_id: "a1".into(),
        resource_id: "r1".into(),
        http_method: "POST".into(),
        status_code: "200".into(),
    };
    let response = gateway(&server).get_integration_response(&query).await.unwrap();
    assert_eq!(response.status_code.as_deref(), Some("200"));
    assert_eq!(response.content_handling.as_deref(), Some("CONVERT_TO_BINARY"));
}

// ============================================================================
// Lambda
// ============================================================================

#[tokio::test]
async fn test_get_function_configuration_with_qualifier() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2015-03-31/functions/attributes-dev-api/configuration"))
        .and(query_param("Qualifier", "live"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "FunctionName": "attributes-dev-api",
            "Environment": { "Variables": { "STAGE": "dev" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = lambda(&server)
        .get_function_configuration("attributes-dev-api", Some("live"))
        .await
        .unwrap();
    assert_eq!(config.function_name, "attributes-dev-api");
    assert_eq!(config.environment.unwrap().get("STAGE"), Some("dev"));
}

#[tokio::test]
async fn test_update_function_environment_sends_whole_set() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/2015-03-31/functions/attributes-dev-api/configuration"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "Environment": { "Variables": { "ENABLE_COMPRESSION": "true", "STAGE": "dev" } }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "FunctionName": "attributes-dev-api" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut variables = EnvironmentVariableSet::new();
    variables.set("STAGE", "dev");
    variables.set("ENABLE_COMPRESSION", "true");
    lambda(&server)
        .update_function_environment("attributes-dev-api", &variables)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unknown_function_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2015-03-31/functions/nope/configuration"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "Type": "User" })))
        .mount(&server)
        .await;

    let result = lambda(&server).get_function_configuration("nope", None).await;
    assert_eq!(result.unwrap_err(), Error::not_found("function", "nope"));
}

// ============================================================================
// Attributes service
// ============================================================================

#[tokio::test]
async fn test_attributes_fixture_calls_carry_tenant() {
    let server = MockServer::start().await;
    let spec = FixtureSpec::default();

    Mock::given(method("POST"))
        .and(path("/definitions"))
        .and(header("X-Tenant-Id", spec.tenant_id.as_str()))
        .and(body_json(json!({
            "name": "testfortemp",
            "tenantId": spec.tenant_id,
            "value": { "type": "string" },
            "applyTo": "user",
            "required": false
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/values/user/12340000"))
        .and(header("X-Tenant-Id", spec.tenant_id.as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/definitions/testfortemp"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = AttributesClient::new(server.uri());
    let ctx = spec.tenant();
    client.create_definition(&spec.definition(), &ctx).await.unwrap();
    client
        .set_values(&spec.object_type, &spec.object_id, &spec.values(), &ctx)
        .await
        .unwrap();
    client.delete_definition(&spec.definition_name, &ctx).await.unwrap();
}

#[tokio::test]
async fn test_filter_values() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/values/filter"))
        .and(header("X-Tenant-Id", "t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&server)
        .await;

    let client = AttributesClient::new(format!("{}/api/", server.uri()));
    let result = client
        .filter_values(&[], &json!({}), &TenantContext::new("t1"))
        .await
        .unwrap();
    assert_eq!(result, json!({ "results": [] }));
}

#[tokio::test]
async fn test_attributes_server_error_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/values/filter"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = AttributesClient::new(server.uri());
    let result = client
        .filter_values(&[], &json!({}), &TenantContext::new("t1"))
        .await;
    assert!(matches!(result, Err(Error::Transient(_))));
}

// ============================================================================
// Full run over HTTP
// ============================================================================

async fn mount_deployment(server: &MockServer, content_handling: Option<&str>) {
    Mock::given(method("GET"))
        .and(path("/restapis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "item": [{ "id": "a1", "name": "dev-attributes" }]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/restapis/a1/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "item": [{ "id": "r1", "path": "/values/filter" }]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/restapis/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a1",
            "name": "dev-attributes",
            "binaryMediaTypes": ["application/json"]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/restapis/a1/resources/r1/methods/POST/integration/responses/200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statusCode": "200",
            "contentHandling": content_handling
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2015-03-31/functions/attributes-dev-api/configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "FunctionName": "attributes-dev-api",
            "Environment": { "Variables": { "STAGE": "dev" } }
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/values/filter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/definitions"))
        .respond_with(ResponseTemplate::new(201))
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/values/user/12340000"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/values/user/12340000"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/definitions/testfortemp"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

fn http_reconciler(server: &MockServer, max_attempts: u32) -> Reconciler {
    let config = ReconcileConfig::builder()
        .max_attempts(max_attempts)
        .backoff(BackoffConfig::fixed(Duration::ZERO))
        .build()
        .unwrap();
    Reconciler::from_clients(
        Arc::new(gateway(server)),
        Arc::new(lambda(server)),
        Arc::new(AttributesClient::new(server.uri())),
        "dev",
        config,
    )
}

fn binary_function() -> FunctionSpec {
    FunctionSpec::new(
        "attributes-dev-api",
        vec![HttpEventBinding::new("post", "/values/filter")
            .with_content_handling("CONVERT_TO_BINARY")],
    )
}

#[tokio::test]
async fn test_full_run_succeeds_over_http() {
    let server = MockServer::start().await;
    mount_deployment(&server, Some("CONVERT_TO_BINARY")).await;

    Mock::given(method("PUT"))
        .and(path("/2015-03-31/functions/attributes-dev-api/configuration"))
        .and(body_json(json!({
            "Environment": { "Variables": { "ENABLE_COMPRESSION": "true", "STAGE": "dev" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let report = http_reconciler(&server, 3)
        .run("dev-attributes", &[binary_function()])
        .await
        .unwrap();

    assert!(report.converged());
    assert_eq!(report.rest_api_id.as_deref(), Some("a1"));
    assert!(report.pre_check && report.post_check);
    assert!(report.fixture_provisioned && report.fixture_torn_down);
}

#[tokio::test]
async fn test_full_run_reverts_over_http() {
    let server = MockServer::start().await;
    mount_deployment(&server, None).await;

    Mock::given(method("PUT"))
        .and(path("/2015-03-31/functions/attributes-dev-api/configuration"))
        .and(body_json(json!({
            "Environment": { "Variables": { "ENABLE_COMPRESSION": "true", "STAGE": "dev" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/2015-03-31/functions/attributes-dev-api/configuration"))
        .and(body_json(json!({
            "Environment": { "Variables": { "ENABLE_COMPRESSION": "false", "STAGE": "dev" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let report = http_reconciler(&server, 2)
        .run("dev-attributes", &[binary_function()])
        .await
        .unwrap();

    let outcome = report.outcome("attributes-dev-api").unwrap();
    assert_eq!(outcome.state, ReconcileState::Reverted);
    assert_eq!(outcome.rounds, 2);
}

// ============================================================================
// CLI argument resolution
// ============================================================================

const SERVICE_YAML: &str = r#"
service: attributes
provider:
  stage: dev
  region: eu-west-1
functions:
  api:
    events:
      - http:
          method: post
          path: values/filter
          contentHandling: CONVERT_TO_BINARY
  health:
    check: false
    events:
      - http:
          method: get
          path: health
"#;

fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn target_args(service: &std::path::Path) -> TargetArgs {
    TargetArgs {
        service: service.to_path_buf(),
        stage: None,
        region: None,
        api_name: None,
        config: None,
        attributes_url: Some("https://a1.execute-api.eu-west-1.amazonaws.com/dev".into()),
        apigateway_endpoint: None,
        lambda_endpoint: None,
        format: OutputFormat::Text,
    }
}

#[test]
fn test_resolve_falls_back_to_provider_block() {
    let service = write_temp(".yml", SERVICE_YAML);
    let invocation = target_args(service.path()).resolve().unwrap();

    assert_eq!(invocation.stage, "dev");
    assert_eq!(invocation.region, "eu-west-1");
    assert_eq!(invocation.api_name, "dev-attributes");
    assert_eq!(invocation.functions.len(), 2);

    let eligible: Vec<&FunctionSpec> = invocation
        .functions
        .iter()
        .filter(|f| f.is_eligible())
        .collect();
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].name, "attributes-dev-api");
}

#[test]
fn test_resolve_prefers_arguments_and_reads_config() {
    let service = write_temp(".yml", SERVICE_YAML);
    let config = write_temp(
        ".toml",
        r#"
max_attempts = 4
fail_on_unconverged = true

[backoff]
initial_ms = 250
"#,
    );

    let mut args = target_args(service.path());
    args.stage = Some("prod".into());
    args.region = Some("us-west-2".into());
    args.api_name = Some("attributes-api".into());
    args.config = Some(config.path().to_path_buf());

    let invocation = args.resolve().unwrap();
    assert_eq!(invocation.stage, "prod");
    assert_eq!(invocation.region, "us-west-2");
    assert_eq!(invocation.api_name, "attributes-api");
    assert_eq!(invocation.functions[0].name, "attributes-prod-api");
    assert_eq!(invocation.config.max_attempts, 4);
    assert_eq!(invocation.config.backoff.initial_ms, 250);
    assert!(invocation.config.fail_on_unconverged);
}

#[test]
fn test_resolve_rejects_bad_input() {
    let broken = write_temp(".yml", "service: [unclosed");
    let result = target_args(broken.path()).resolve();
    assert!(matches!(result, Err(Error::Configuration(_))));

    let service = write_temp(".yml", SERVICE_YAML);
    let mut args = target_args(service.path());
    args.attributes_url = None;
    assert!(matches!(args.resolve(), Err(Error::Configuration(_))));

    let bad_config = write_temp(".toml", "max_attempts = 0");
    let mut args = target_args(service.path());
    args.config = Some(bad_config.path().to_path_buf());
    assert!(matches!(args.resolve(), Err(Error::Configuration(_))));
}
