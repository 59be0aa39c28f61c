//! `okta_app_bookmark`: a bookmark application.

use tracing::debug;

use tfokta_client::ApiRequest;
use tfokta_core::{LifecycleStatus, OktaError, OktaResult, RetryClass};

use crate::decorators::{set_lifecycle, with_lifecycle, LifecycleOrder};
use crate::defaults::default_policy_id;
use crate::descriptor::{hook, Created, HookInput, ResourceDescriptor};
use crate::instance::{Attributes, STATUS};
use crate::model::policy::ACCESS_POLICY;
use crate::model::{Application, BookmarkApplication};

pub const NAME: &str = "okta_app_bookmark";

pub const AUTHENTICATION_POLICY: &str = "authentication_policy";

fn app_path(input: &HookInput) -> OktaResult<String> {
    Ok(format!("/api/v1/apps/{}", input.id()?))
}

fn app_body(desired: &Attributes) -> OktaResult<Application> {
    let mut app = BookmarkApplication::new(desired.require_str("label")?, desired.require_str("url")?);
    app.settings.app.request_integration = desired.get_bool("request_integration").unwrap_or(false);
    Ok(Application::Bookmark(app))
}

fn app_attributes(app: &Application) -> OktaResult<Attributes> {
    let bookmark = app.as_bookmark().ok_or_else(|| {
        OktaError::invalid_input(format!(
            "application {} has sign-on mode {}, not BOOKMARK",
            app.id().unwrap_or_default(),
            app.sign_on_mode().unwrap_or("unknown")
        ))
    })?;

    let mut attributes = Attributes::new()
        .with("label", bookmark.common.label.as_str())
        .with("url", bookmark.settings.app.url.as_str())
        .with("request_integration", bookmark.settings.app.request_integration);
    attributes.set_opt(STATUS, bookmark.common.status.as_deref());
    attributes.set_opt(AUTHENTICATION_POLICY, app.access_policy_id());
    Ok(attributes)
}

/// Bind the app to its access policy.
///
/// Without an explicit policy the org default is used on Identity Engine;
/// Classic orgs have no access policies, so nothing is sent.
async fn assign_policy(input: &HookInput, app_id: &str) -> OktaResult<Option<String>> {
    let policy_id = match input.desired().get_str(AUTHENTICATION_POLICY) {
        Some(explicit) => explicit.to_string(),
        None if input.bundle.is_oie(&input.ctx).await? => {
            default_policy_id(&input.bundle, &input.ctx, ACCESS_POLICY).await?
        }
        None => {
            debug!(app_id, "Classic org, leaving application without access policy");
            return Ok(None);
        }
    };

    let request = ApiRequest::put(format!("/api/v1/apps/{app_id}/policies/{policy_id}"))
        .retry_class(RetryClass::IdempotentWithConflict);
    input.bundle.client().execute_empty(&input.ctx, &request).await?;
    Ok(Some(policy_id))
}

async fn create(input: HookInput) -> OktaResult<Created> {
    let body = app_body(input.desired())?;
    let activate = input.desired().status()? == LifecycleStatus::Active;
    let request = ApiRequest::post("/api/v1/apps")
        .query("activate", activate.to_string())
        .json(&body)?;

    let app: Application = input.bundle.client().execute(&input.ctx, &request).await?.body;
    let id = app
        .id()
        .map(str::to_string)
        .ok_or_else(|| OktaError::serialization("created application has no id"))?;

    let mut observed = app_attributes(&app)?;
    if let Some(policy_id) = assign_policy(&input, &id).await? {
        observed.set(AUTHENTICATION_POLICY, policy_id);
    }
    Ok(Created { id, observed })
}

async fn read(input: HookInput) -> OktaResult<Attributes> {
    let app: Application = input.bundle.client().get(&input.ctx, &app_path(&input)?).await?;
    app_attributes(&app)
}

async fn update(input: HookInput) -> OktaResult<Attributes> {
    let id = input.id()?.to_string();
    let body = app_body(input.desired())?;
    let app: Application = input
        .bundle
        .client()
        .put(&input.ctx, &app_path(&input)?, &body)
        .await?;

    let mut observed = app_attributes(&app)?;
    let wanted = input.desired().get_str(AUTHENTICATION_POLICY);
    if wanted.is_some() && wanted != observed.get_str(AUTHENTICATION_POLICY) {
        if let Some(policy_id) = assign_policy(&input, &id).await? {
            observed.set(AUTHENTICATION_POLICY, policy_id);
        }
    }
    Ok(observed)
}

async fn delete(input: HookInput) -> OktaResult<()> {
    let path = app_path(&input)?;
    let current = input.observed().status()?;
    if current == LifecycleStatus::Active {
        set_lifecycle(&input.ctx, input.bundle.client(), &path, LifecycleStatus::Inactive).await?;
    }
    input.bundle.client().delete(&input.ctx, &path).await
}

pub fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(NAME, hook(create), hook(read), hook(delete))
        .update(with_lifecycle(hook(update), LifecycleOrder::BeforeUpdate, app_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_is_tagged_bookmark() {
        let desired = Attributes::new()
            .with("label", "Docs")
            .with("url", "https://docs.example.com")
            .with("request_integration", true);
        let body = serde_json::to_value(app_body(&desired).unwrap()).unwrap();
        assert_eq!(body["signOnMode"], "BOOKMARK");
        assert_eq!(body["name"], "bookmark");
        assert_eq!(body["settings"]["app"]["requestIntegration"], true);
    }

    #[test]
    fn test_body_requires_url() {
        let err = app_body(&Attributes::new().with("label", "Docs")).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_non_bookmark_rejected() {
        let app: Application = serde_json::from_value(json!({
            "id": "0oa2",
            "name": "acme_saml",
            "label": "Acme",
            "signOnMode": "SAML_2_0"
        }))
        .unwrap();
        let err = app_attributes(&app).unwrap_err();
        assert!(err.to_string().contains("SAML_2_0"));
    }
}
