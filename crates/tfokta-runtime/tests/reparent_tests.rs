//! Integration tests for default discovery and re-parenting on delete.

mod common;

use std::sync::Arc;

use common::*;
use serde_json::json;
use tfokta_core::CallContext;
use tfokta_runtime::kinds::{app_bookmark, app_signon_policy, profile_enrollment_apps};
use tfokta_runtime::{Attributes, ClientBundle, ResourceInstance, UpdateOutcome};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn policy_instance(id: &str, system: bool) -> ResourceInstance {
    ResourceInstance::new(Attributes::new().with("name", "Strict"))
        .with_id(id)
        .with_observed(Attributes::new().with("name", "Strict").with("system", system))
}

async fn mount_bound_apps(server: &MockServer, policy_id: &str, apps: &[&str]) {
    let body: Vec<_> = apps.iter().map(|id| bookmark(id, id, "ACTIVE", Some(policy_id))).collect();
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/policies/{policy_id}/app")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_rebind(server: &MockServer, app: &str, policy_id: &str, status: u16) {
    Mock::given(method("PUT"))
        .and(path(format!("/api/v1/apps/{app}/policies/{policy_id}")))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_policy_delete_moves_apps_to_default() {
    init_tracing();
    let server = MockServer::start().await;

    mount_policies(
        &server,
        "ACCESS_POLICY",
        json!([
            policy("rst1", "ACCESS_POLICY", "Strict", false),
            policy("rst0", "ACCESS_POLICY", "Default Policy", true)
        ]),
        1,
    )
    .await;
    mount_bound_apps(&server, "rst1", &["0oa1", "0oa2"]).await;
    mount_rebind(&server, "0oa1", "rst0", 204).await;
    mount_rebind(&server, "0oa2", "rst0", 204).await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/policies/rst1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let runtime = oie_runtime(&server);
    runtime
        .delete(&CallContext::new(), app_signon_policy::NAME, policy_instance("rst1", false))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_rebind_does_not_block_delete() {
    let server = MockServer::start().await;

    mount_policies(
        &server,
        "ACCESS_POLICY",
        json!([policy("rst0", "ACCESS_POLICY", "Default Policy", true)]),
        1,
    )
    .await;
    mount_bound_apps(&server, "rst1", &["0oa1", "0oa2"]).await;
    mount_rebind(&server, "0oa1", "rst0", 400).await;
    mount_rebind(&server, "0oa2", "rst0", 204).await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/policies/rst1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let runtime = oie_runtime(&server);
    runtime
        .delete(&CallContext::new(), app_signon_policy::NAME, policy_instance("rst1", false))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_final_delete_failure_is_surfaced() {
    let server = MockServer::start().await;

    mount_policies(
        &server,
        "ACCESS_POLICY",
        json!([policy("rst0", "ACCESS_POLICY", "Default Policy", true)]),
        1,
    )
    .await;
    mount_bound_apps(&server, "rst1", &[]).await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/policies/rst1"))
        .respond_with(ResponseTemplate::new(403).set_body_json(okta_error(
            "E0000006",
            "You do not have permission to perform the requested action",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let runtime = oie_runtime(&server);
    let err = runtime
        .delete(&CallContext::new(), app_signon_policy::NAME, policy_instance("rst1", false))
        .await
        .unwrap_err();
    assert_eq!(err.okta_error_code(), Some("E0000006"));
    assert_eq!(err.context().unwrap().id.as_deref(), Some("rst1"));
}

#[tokio::test]
async fn test_system_default_is_never_deleted() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let runtime = oie_runtime(&server);
    runtime
        .delete(&CallContext::new(), app_signon_policy::NAME, policy_instance("rst0", true))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_default_discovered_once_per_bundle() {
    let server = MockServer::start().await;
    mount_policies(
        &server,
        "ACCESS_POLICY",
        json!([
            policy("rst7", "ACCESS_POLICY", "Docs", false),
            policy("rst0", "ACCESS_POLICY", "Default Policy", true)
        ]),
        1,
    )
    .await;

    let bundle = Arc::new(ClientBundle::new(config(&server, false)).unwrap());
    let ctx = CallContext::new();

    let (a, b) = tokio::join!(
        bundle.default_policy(&ctx, "ACCESS_POLICY"),
        bundle.default_policy(&ctx, "ACCESS_POLICY"),
    );
    assert_eq!(a.unwrap().id.as_deref(), Some("rst0"));
    assert_eq!(b.unwrap().id.as_deref(), Some("rst0"));

    let again = bundle.default_policy(&ctx, "ACCESS_POLICY").await.unwrap();
    assert!(again.system);
}

#[tokio::test]
async fn test_missing_default_is_not_found() {
    let server = MockServer::start().await;
    mount_policies(
        &server,
        "PROFILE_ENROLLMENT",
        json!([policy("rst3", "PROFILE_ENROLLMENT", "Signup", false)]),
        2,
    )
    .await;

    let bundle = ClientBundle::new(config(&server, false)).unwrap();
    let ctx = CallContext::new();
    assert!(bundle.default_policy(&ctx, "PROFILE_ENROLLMENT").await.unwrap_err().is_not_found());
    // failures are not cached
    assert!(bundle.default_policy(&ctx, "PROFILE_ENROLLMENT").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_removed_enrollment_apps_return_to_default() {
    let server = MockServer::start().await;

    mount_policies(
        &server,
        "PROFILE_ENROLLMENT",
        json!([policy("rst0", "PROFILE_ENROLLMENT", "Default Policy", true)]),
        1,
    )
    .await;
    mount_rebind(&server, "0oa3", "rst5", 204).await;
    mount_rebind(&server, "0oa1", "rst0", 204).await;

    let runtime = oie_runtime(&server);
    let instance = ResourceInstance::new(
        Attributes::new()
            .with("policy_id", "rst5")
            .with("apps", vec!["0oa2", "0oa3"]),
    )
    .with_id("rst5")
    .with_observed(
        Attributes::new()
            .with("policy_id", "rst5")
            .with("apps", vec!["0oa1", "0oa2"]),
    );

    let outcome = runtime
        .update(&CallContext::new(), profile_enrollment_apps::NAME, instance)
        .await
        .unwrap();
    let UpdateOutcome::Updated(updated) = outcome else {
        panic!("expected Updated");
    };
    assert_eq!(
        updated.observed.unwrap().get_strings("apps"),
        vec!["0oa2".to_string(), "0oa3".to_string()]
    );
}

#[tokio::test]
async fn test_bookmark_uses_default_access_policy_on_identity_engine() {
    let server = MockServer::start().await;

    mount_policies(
        &server,
        "ACCESS_POLICY",
        json!([policy("rst0", "ACCESS_POLICY", "Default Policy", true)]),
        1,
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/apps"))
        .and(query_param("activate", "true"))
        .and(body_partial_json(json!({ "signOnMode": "BOOKMARK", "label": "Docs" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(bookmark("0oa1", "Docs", "ACTIVE", None)))
        .expect(1)
        .mount(&server)
        .await;
    mount_rebind(&server, "0oa1", "rst0", 204).await;

    let runtime = oie_runtime(&server);
    let desired = Attributes::new()
        .with("label", "Docs")
        .with("url", "https://docs.example.com");
    let created = runtime
        .create(&CallContext::new(), app_bookmark::NAME, ResourceInstance::new(desired))
        .await
        .unwrap();

    let observed = created.observed.unwrap();
    assert_eq!(observed.get_str(app_bookmark::AUTHENTICATION_POLICY), Some("rst0"));
}

#[tokio::test]
async fn test_bookmark_skips_access_policy_on_classic() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/apps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bookmark("0oa1", "Docs", "ACTIVE", None)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/policies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let runtime = classic_runtime(&server);
    let desired = Attributes::new()
        .with("label", "Docs")
        .with("url", "https://docs.example.com");
    let created = runtime
        .create(&CallContext::new(), app_bookmark::NAME, ResourceInstance::new(desired))
        .await
        .unwrap();
    assert!(!created.observed.unwrap().has(app_bookmark::AUTHENTICATION_POLICY));
}

#[tokio::test]
async fn test_bookmark_deactivated_before_delete() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/apps/0oa1/lifecycle/deactivate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/apps/0oa1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let runtime = oie_runtime(&server);
    let instance = ResourceInstance::new(Attributes::new().with("label", "Docs"))
        .with_id("0oa1")
        .with_observed(Attributes::new().with("status", "ACTIVE"));
    runtime
        .delete(&CallContext::new(), app_bookmark::NAME, instance)
        .await
        .unwrap();
}
