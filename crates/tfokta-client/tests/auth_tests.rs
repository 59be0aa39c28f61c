//! Integration tests for the private-key token flow and static tokens.

mod common;

use std::collections::HashMap;

use common::*;
use futures::future::join_all;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::{json, Value};
use tfokta_client::assertion::{AssertionClaims, CLIENT_ASSERTION_TYPE};
use tfokta_client::OktaClient;
use tfokta_core::{CallContext, OktaError, ProviderConfig};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/oauth2/v1/token";

fn form_fields(body: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(body).into_owned().collect()
}

#[tokio::test]
async fn test_token_request_carries_signed_assertion() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("T1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/apps"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let client = OktaClient::new(private_key_config(&server)).unwrap();
    let ctx = CallContext::new();
    let _: Vec<Value> = client.get(&ctx, "/api/v1/apps").await.unwrap();
    // second call reuses the cached token
    let _: Vec<Value> = client.get(&ctx, "/api/v1/apps").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let token_request = requests
        .iter()
        .find(|r| r.url.path() == TOKEN_PATH)
        .expect("token request");
    let form = form_fields(&token_request.body);

    assert_eq!(form["scope"], "okta.apps.manage okta.groups.read");
    assert_eq!(form["client_assertion_type"], CLIENT_ASSERTION_TYPE);

    let assertion = &form["client_assertion"];
    let header = decode_header(assertion).unwrap();
    assert_eq!(header.alg, Algorithm::RS256);
    assert_eq!(header.kid.as_deref(), Some("test-kid"));

    let audience = format!("{}{}", server.uri(), TOKEN_PATH);
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[audience.as_str()]);
    let claims = decode::<AssertionClaims>(
        assertion,
        &DecodingKey::from_rsa_pem(RSA_PUBLIC.as_bytes()).unwrap(),
        &validation,
    )
    .unwrap()
    .claims;

    assert_eq!(claims.iss, "0oaservice");
    assert_eq!(claims.sub, "0oaservice");
    assert_eq!(claims.aud, audience);
    assert_eq!(claims.exp - claims.iat, 300);
}

#[tokio::test]
async fn test_concurrent_unauthorized_refreshes_once() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("T1")))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("T2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/groups"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(okta_error("E0000011", "Invalid token provided")),
        )
        .expect(1..=10)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/groups"))
        .and(header("authorization", "Bearer T2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "00g1" }])))
        .expect(10)
        .mount(&server)
        .await;

    let client = OktaClient::new(private_key_config(&server)).unwrap();
    let ctx = CallContext::new();
    client.signer().credential(&ctx).await.unwrap();

    let calls = (0..10).map(|_| client.get::<Vec<Value>>(&ctx, "/api/v1/groups"));
    let results = join_all(calls).await;

    for result in results {
        assert_eq!(result.unwrap().len(), 1);
    }
    let token_calls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == TOKEN_PATH)
        .count();
    assert_eq!(token_calls, 2);
}

#[tokio::test]
async fn test_rejected_client_is_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "The client_assertion signature is invalid."
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/apps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let client = OktaClient::new(private_key_config(&server)).unwrap();
    let err = client
        .get::<Value>(&CallContext::new(), "/api/v1/apps")
        .await
        .unwrap_err();
    assert!(matches!(err, OktaError::AuthFailure { status: Some(401), .. }));
}

#[tokio::test]
async fn test_token_endpoint_outage_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_response("T1")))
        .expect(1)
        .mount(&server)
        .await;

    let client = OktaClient::new(private_key_config(&server)).unwrap();
    let credential = client.signer().credential(&CallContext::new()).await.unwrap();
    assert_eq!(credential.header_value(), "Bearer T1");
}

#[tokio::test]
async fn test_static_token_unauthorized_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .and(header("authorization", "Bearer external-token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(okta_error("E0000011", "Invalid token provided")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig::builder()
        .org_url(server.uri())
        .external_access_token("external-token")
        .min_wait_seconds(0)
        .max_wait_seconds(0)
        .build()
        .unwrap();
    let client = OktaClient::new(config).unwrap();

    let err = client
        .get::<Value>(&CallContext::new(), "/api/v1/users")
        .await
        .unwrap_err();
    assert!(matches!(err, OktaError::AuthFailure { status: Some(401), .. }));
    assert_eq!(client.signer().mode(), "external_access_token");
}
