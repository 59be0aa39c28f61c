//! `okta_app_signon_policy`: an Identity Engine access policy.
//!
//! Apps bound to the policy are moved to the org's default access policy
//! before the policy is deleted. The default policy itself is never deleted.

use tfokta_client::ApiRequest;
use tfokta_core::{OktaError, OktaResult};

use crate::decorators::{protect_system_default, reparent_before_delete, with_lifecycle, LifecycleOrder, SYSTEM};
use crate::defaults::default_policy_id;
use crate::descriptor::{hook, Created, HookInput, ResourceDescriptor};
use crate::instance::{Attributes, STATUS};
use crate::model::policy::ACCESS_POLICY;
use crate::model::{Application, Policy};
use crate::plan::CallStep;
use crate::reparent::ReparentPlan;

pub const NAME: &str = "okta_app_signon_policy";

const DOCUMENTATION: &str =
    "https://developer.okta.com/docs/concepts/oie-intro/#authentication-policies";

fn policy_path(input: &HookInput) -> OktaResult<String> {
    Ok(format!("/api/v1/policies/{}", input.id()?))
}

fn policy_body(desired: &Attributes) -> OktaResult<Policy> {
    let mut policy = Policy::new(ACCESS_POLICY, desired.require_str("name")?);
    policy.description = desired.get_str("description").map(str::to_string);
    Ok(policy)
}

pub(crate) fn policy_attributes(policy: &Policy) -> Attributes {
    let mut attributes = Attributes::new().with("name", policy.name.as_str());
    attributes.set_opt("description", policy.description.as_deref());
    attributes.set_opt(STATUS, policy.status.as_deref());
    attributes.set_opt("priority", policy.priority);
    attributes.set(SYSTEM, policy.system);
    attributes
}

async fn create(input: HookInput) -> OktaResult<Created> {
    let mut body = policy_body(input.desired())?;
    body.status = Some(input.desired().status()?.as_str().to_string());

    let policy: Policy = input
        .bundle
        .client()
        .post(&input.ctx, "/api/v1/policies", &body)
        .await?;
    let id = policy
        .id
        .clone()
        .ok_or_else(|| OktaError::serialization("created policy has no id"))?;
    Ok(Created {
        id,
        observed: policy_attributes(&policy),
    })
}

async fn read(input: HookInput) -> OktaResult<Attributes> {
    let path = policy_path(&input)?;
    let policy: Policy = input.bundle.client().get(&input.ctx, &path).await?;
    Ok(policy_attributes(&policy))
}

async fn update(input: HookInput) -> OktaResult<Attributes> {
    let path = policy_path(&input)?;
    let body = policy_body(input.desired())?;
    let policy: Policy = input.bundle.client().put(&input.ctx, &path, &body).await?;
    Ok(policy_attributes(&policy))
}

async fn plan_delete(input: HookInput) -> OktaResult<ReparentPlan> {
    let id = input.id()?.to_string();
    let default_id = default_policy_id(&input.bundle, &input.ctx, ACCESS_POLICY).await?;

    let apps: Vec<Application> = input
        .bundle
        .client()
        .collect_all(
            &input.ctx,
            &ApiRequest::get(format!("/api/v1/policies/{id}/app")),
            |_: &[Application]| false,
        )
        .await?;

    let mut plan = ReparentPlan::new(default_id.clone());
    for app_id in apps.iter().filter_map(Application::id) {
        plan = plan.rebind(CallStep::put(
            format!("app {app_id}"),
            format!("/api/v1/apps/{app_id}/policies/{default_id}"),
        ));
    }
    Ok(plan.then(CallStep::delete(
        format!("policy {id}"),
        format!("/api/v1/policies/{id}"),
    )))
}

pub fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(
        NAME,
        hook(create),
        hook(read),
        protect_system_default(reparent_before_delete(hook(plan_delete))),
    )
    .update(with_lifecycle(hook(update), LifecycleOrder::AfterUpdate, policy_path))
    .oie_only(DOCUMENTATION)
}
