//! Common test utilities for tfokta-runtime integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use tfokta_core::ProviderConfig;
use tfokta_runtime::{ClientBundle, ResourceRuntime};
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// API-token configuration against the mock server with a fixed org flavour.
pub fn config(server: &MockServer, classic: bool) -> ProviderConfig {
    ProviderConfig::builder()
        .org_url(server.uri())
        .api_token("00test-token")
        .min_wait_seconds(0)
        .max_wait_seconds(0)
        .max_retries(2)
        .classic_org(classic)
        .build()
        .expect("valid test config")
}

pub fn runtime(server: &MockServer, classic: bool) -> ResourceRuntime {
    let bundle = ClientBundle::new(config(server, classic)).expect("bundle");
    ResourceRuntime::with_default_kinds(Arc::new(bundle))
}

pub fn oie_runtime(server: &MockServer) -> ResourceRuntime {
    runtime(server, false)
}

pub fn classic_runtime(server: &MockServer) -> ResourceRuntime {
    runtime(server, true)
}

pub fn okta_error(code: &str, summary: &str) -> Value {
    json!({
        "errorCode": code,
        "errorSummary": summary,
        "errorLink": code,
        "errorId": "oae-test",
        "errorCauses": []
    })
}

pub fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(okta_error(
        "E0000007",
        "Not found: Resource not found: missing (Resource)",
    ))
}

pub fn policy(id: &str, policy_type: &str, name: &str, system: bool) -> Value {
    json!({
        "id": id,
        "type": policy_type,
        "name": name,
        "status": "ACTIVE",
        "system": system,
        "priority": 1
    })
}

pub fn bookmark(id: &str, label: &str, status: &str, access_policy: Option<&str>) -> Value {
    let mut app = json!({
        "id": id,
        "name": "bookmark",
        "label": label,
        "status": status,
        "signOnMode": "BOOKMARK",
        "settings": { "app": { "url": "https://docs.example.com", "requestIntegration": false } },
        "_links": {}
    });
    if let Some(policy) = access_policy {
        app["_links"]["accessPolicy"]["href"] = json!(format!("https://acme.okta.com/api/v1/policies/{policy}"));
    }
    app
}

pub fn user(id: &str) -> Value {
    json!({
        "id": id,
        "status": "ACTIVE",
        "profile": { "login": format!("{id}@example.com") }
    })
}

/// Mount the policy listing used by default discovery.
pub async fn mount_policies(server: &MockServer, policy_type: &str, body: Value, calls: u64) {
    Mock::given(method("GET"))
        .and(path("/api/v1/policies"))
        .and(query_param("type", policy_type))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(calls)
        .mount(server)
        .await;
}
