//! Common test utilities for tfokta-client integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use tfokta_client::OktaClient;
use tfokta_core::ProviderConfig;
use tracing_subscriber::EnvFilter;
use wiremock::MockServer;

pub const RSA_PRIVATE: &str = include_str!("../fixtures/rsa_private.pem");
pub const RSA_PUBLIC: &str = include_str!("../fixtures/rsa_public.pem");

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// API-token configuration pointed at the mock server, without retry waits.
pub fn api_token_config(server: &MockServer) -> ProviderConfig {
    ProviderConfig::builder()
        .org_url(server.uri())
        .api_token("00test-token")
        .min_wait_seconds(0)
        .max_wait_seconds(0)
        .max_retries(3)
        .build()
        .expect("valid test config")
}

/// Private-key configuration pointed at the mock server.
pub fn private_key_config(server: &MockServer) -> ProviderConfig {
    ProviderConfig::builder()
        .org_url(server.uri())
        .client_id("0oaservice")
        .private_key(RSA_PRIVATE)
        .private_key_id("test-kid")
        .scopes(["okta.apps.manage", "okta.groups.read"])
        .min_wait_seconds(0)
        .max_wait_seconds(0)
        .max_retries(3)
        .build()
        .expect("valid test config")
}

pub fn api_token_client(server: &MockServer) -> OktaClient {
    OktaClient::new(api_token_config(server)).expect("client")
}

/// `Link` header pointing at the next page.
pub fn next_link(server: &MockServer, path: &str, cursor: &str) -> String {
    format!(
        "<{}{}?after={}&limit=2>; rel=\"next\"",
        server.uri(),
        path,
        cursor
    )
}

pub fn self_link(server: &MockServer, path: &str) -> String {
    format!("<{}{}?limit=2>; rel=\"self\"", server.uri(), path)
}

pub fn user(id: &str) -> Value {
    json!({
        "id": id,
        "status": "ACTIVE",
        "profile": { "login": format!("{id}@example.com") }
    })
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

pub fn token_response(token: &str) -> Value {
    json!({
        "token_type": "Bearer",
        "expires_in": 3600,
        "access_token": token,
        "scope": "okta.apps.manage okta.groups.read"
    })
}
