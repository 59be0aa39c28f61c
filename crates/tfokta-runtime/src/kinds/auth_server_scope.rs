//! `okta_auth_server_scope`: a scope of a custom authorization server.
//!
//! Imported as `<auth_server_id>/<scope_id>`.

use std::time::Duration;

use tfokta_core::{OktaError, OktaResult};

use crate::descriptor::{hook, ConsistencyWindow, Created, HookInput, ResourceDescriptor};
use crate::instance::Attributes;
use crate::model::OAuthScope;

pub const NAME: &str = "okta_auth_server_scope";

pub const AUTH_SERVER_ID: &str = "auth_server_id";

const VISIBILITY_WINDOW: Duration = Duration::from_secs(30);

fn scopes_path(desired: &Attributes) -> OktaResult<String> {
    Ok(format!(
        "/api/v1/authorizationServers/{}/scopes",
        desired.require_str(AUTH_SERVER_ID)?
    ))
}

fn scope_path(input: &HookInput) -> OktaResult<String> {
    Ok(format!("{}/{}", scopes_path(input.desired())?, input.id()?))
}

fn scope_body(desired: &Attributes) -> OktaResult<OAuthScope> {
    let text = |name: &str| desired.get_str(name).map(str::to_string);
    Ok(OAuthScope {
        id: None,
        name: desired.require_str("name")?.to_string(),
        description: text("description"),
        display_name: text("display_name"),
        consent: text("consent"),
        metadata_publish: text("metadata_publish"),
        default: desired.get_bool("default").unwrap_or(false),
        system: false,
    })
}

fn scope_attributes(auth_server_id: &str, scope: &OAuthScope) -> Attributes {
    let mut attributes = Attributes::new()
        .with(AUTH_SERVER_ID, auth_server_id)
        .with("name", scope.name.as_str())
        .with("default", scope.default)
        .with("system", scope.system);
    attributes.set_opt("description", scope.description.as_deref());
    attributes.set_opt("display_name", scope.display_name.as_deref());
    attributes.set_opt("consent", scope.consent.as_deref());
    attributes.set_opt("metadata_publish", scope.metadata_publish.as_deref());
    attributes
}

async fn create(input: HookInput) -> OktaResult<Created> {
    let auth_server_id = input.desired().require_str(AUTH_SERVER_ID)?;
    let body = scope_body(input.desired())?;
    let scope: OAuthScope = input
        .bundle
        .client()
        .post(&input.ctx, &scopes_path(input.desired())?, &body)
        .await?;
    let id = scope
        .id
        .clone()
        .ok_or_else(|| OktaError::serialization("created scope has no id"))?;
    Ok(Created {
        id,
        observed: scope_attributes(auth_server_id, &scope),
    })
}

async fn read(input: HookInput) -> OktaResult<Attributes> {
    let scope: OAuthScope = input.bundle.client().get(&input.ctx, &scope_path(&input)?).await?;
    Ok(scope_attributes(input.desired().require_str(AUTH_SERVER_ID)?, &scope))
}

async fn update(input: HookInput) -> OktaResult<Attributes> {
    let body = scope_body(input.desired())?;
    let scope: OAuthScope = input
        .bundle
        .client()
        .put(&input.ctx, &scope_path(&input)?, &body)
        .await?;
    Ok(scope_attributes(input.desired().require_str(AUTH_SERVER_ID)?, &scope))
}

async fn delete(input: HookInput) -> OktaResult<()> {
    input.bundle.client().delete(&input.ctx, &scope_path(&input)?).await
}

pub fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(NAME, hook(create), hook(read), hook(delete))
        .update(hook(update))
        .import_parents(&[AUTH_SERVER_ID])
        .consistency(ConsistencyWindow::visible(VISIBILITY_WINDOW))
}
