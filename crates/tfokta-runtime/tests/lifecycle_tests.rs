//! Integration tests for status-bearing updates and no-op round trips.

mod common;

use common::*;
use serde_json::json;
use tfokta_core::CallContext;
use tfokta_runtime::kinds::{app_bookmark, app_signon_policy};
use tfokta_runtime::{Attributes, ResourceInstance, UpdateOutcome};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// `METHOD /path` of every request the server saw, in arrival order.
async fn calls(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect()
}

fn mutating(calls: &[String]) -> Vec<&String> {
    calls.iter().filter(|c| !c.starts_with("GET ")).collect()
}

async fn mount_lifecycle(server: &MockServer, base: &str, transition: &str) {
    Mock::given(method("POST"))
        .and(path(format!("{base}/lifecycle/{transition}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_policy_deactivated_after_update() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/policies/rst1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(policy("rst1", "ACCESS_POLICY", "Stricter", false)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_lifecycle(&server, "/api/v1/policies/rst1", "deactivate").await;

    let instance = ResourceInstance::new(
        Attributes::new().with("name", "Stricter").with("status", "INACTIVE"),
    )
    .with_id("rst1")
    .with_observed(Attributes::new().with("name", "Strict").with("status", "ACTIVE"));

    let outcome = oie_runtime(&server)
        .update(&CallContext::new(), app_signon_policy::NAME, instance)
        .await
        .unwrap();
    let UpdateOutcome::Updated(updated) = outcome else {
        panic!("expected Updated");
    };
    assert_eq!(updated.observed.unwrap().get_str("status"), Some("INACTIVE"));

    assert_eq!(
        calls(&server).await,
        vec![
            "PUT /api/v1/policies/rst1",
            "POST /api/v1/policies/rst1/lifecycle/deactivate",
        ]
    );
}

#[tokio::test]
async fn test_bookmark_deactivated_before_update() {
    init_tracing();
    let server = MockServer::start().await;

    mount_lifecycle(&server, "/api/v1/apps/0oa1", "deactivate").await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/apps/0oa1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bookmark("0oa1", "Docs v2", "INACTIVE", None)))
        .expect(1)
        .mount(&server)
        .await;

    let instance = ResourceInstance::new(
        Attributes::new()
            .with("label", "Docs v2")
            .with("url", "https://docs.example.com")
            .with("status", "INACTIVE"),
    )
    .with_id("0oa1")
    .with_observed(
        Attributes::new()
            .with("label", "Docs")
            .with("url", "https://docs.example.com")
            .with("status", "ACTIVE"),
    );

    oie_runtime(&server)
        .update(&CallContext::new(), app_bookmark::NAME, instance)
        .await
        .unwrap();

    assert_eq!(
        calls(&server).await,
        vec![
            "POST /api/v1/apps/0oa1/lifecycle/deactivate",
            "PUT /api/v1/apps/0oa1",
        ]
    );
}

#[tokio::test]
async fn test_status_unchanged_sends_no_lifecycle_call() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/policies/rst1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(policy("rst1", "ACCESS_POLICY", "Stricter", false)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let instance = ResourceInstance::new(
        Attributes::new().with("name", "Stricter").with("status", "ACTIVE"),
    )
    .with_id("rst1")
    .with_observed(Attributes::new().with("name", "Strict").with("status", "ACTIVE"));

    oie_runtime(&server)
        .update(&CallContext::new(), app_signon_policy::NAME, instance)
        .await
        .unwrap();

    assert_eq!(calls(&server).await, vec!["PUT /api/v1/policies/rst1"]);
}

#[tokio::test]
async fn test_imported_bookmark_update_is_a_no_op() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/apps/0oa1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bookmark("0oa1", "Docs", "ACTIVE", Some("rst0"))))
        .mount(&server)
        .await;

    let runtime = oie_runtime(&server);
    let ctx = CallContext::new();
    let imported = runtime.import(&ctx, app_bookmark::NAME, "0oa1").await.unwrap();
    assert_eq!(imported.desired.get_str("authentication_policy"), Some("rst0"));

    let outcome = runtime
        .update(&ctx, app_bookmark::NAME, imported.clone())
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Updated(imported));
    assert!(mutating(&calls(&server).await).is_empty());
}

#[tokio::test]
async fn test_imported_policy_update_is_a_no_op() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/policies/rst1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(policy("rst1", "ACCESS_POLICY", "Strict", false)))
        .mount(&server)
        .await;

    let runtime = oie_runtime(&server);
    let ctx = CallContext::new();
    let imported = runtime.import(&ctx, app_signon_policy::NAME, "rst1").await.unwrap();

    let outcome = runtime
        .update(&ctx, app_signon_policy::NAME, imported.clone())
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Updated(imported));

    let seen = calls(&server).await;
    assert_eq!(seen, vec!["GET /api/v1/policies/rst1"]);
}
