//! `okta_profile_enrollment_apps`: the apps bound to a profile enrollment policy.
//!
//! The instance id is the policy id. An app always has exactly one
//! enrollment policy, so removing an app means moving it back to the org's
//! default enrollment policy.

use tracing::{info, warn};

use tfokta_client::ApiRequest;
use tfokta_core::{OktaResult, RetryClass};

use crate::decorators::reparent_before_delete;
use crate::defaults::default_policy_id;
use crate::descriptor::{hook, Created, HookInput, ResourceDescriptor};
use crate::instance::Attributes;
use crate::model::policy::PROFILE_ENROLLMENT;
use crate::model::Application;
use crate::plan::{CallPlan, CallStep};
use crate::reparent::ReparentPlan;
use crate::setdiff::set_diff;

pub const NAME: &str = "okta_profile_enrollment_apps";

pub const POLICY_ID: &str = "policy_id";
pub const APPS: &str = "apps";

const DOCUMENTATION: &str =
    "https://developer.okta.com/docs/reference/api/policy/#profile-enrollment-policy";

fn assign_step(app_id: &str, policy_id: &str) -> CallStep {
    CallStep::put(
        format!("app {app_id}"),
        format!("/api/v1/apps/{app_id}/policies/{policy_id}"),
    )
    .retry_class(RetryClass::IdempotentWithConflict)
}

async fn assign(input: &HookInput, policy_id: &str, apps: &[String]) -> OktaResult<()> {
    let plan = apps
        .iter()
        .fold(CallPlan::new(), |plan, app| plan.with(assign_step(app, policy_id)));
    plan.execute(&input.ctx, input.bundle.client()).await?;
    Ok(())
}

/// Plan moving `apps` to the default enrollment policy.
async fn release_plan(input: &HookInput, apps: &[String]) -> OktaResult<ReparentPlan> {
    let default_id = default_policy_id(&input.bundle, &input.ctx, PROFILE_ENROLLMENT).await?;
    Ok(apps
        .iter()
        .fold(ReparentPlan::new(default_id.clone()), |plan, app| {
            plan.rebind(assign_step(app, &default_id))
        }))
}

fn attributes(policy_id: &str, apps: Vec<String>) -> Attributes {
    Attributes::new().with(POLICY_ID, policy_id).with(APPS, apps)
}

async fn create(input: HookInput) -> OktaResult<Created> {
    let policy_id = input.desired().require_str(POLICY_ID)?.to_string();
    let apps = input.desired().get_strings(APPS);
    assign(&input, &policy_id, &apps).await?;
    info!(policy_id = %policy_id, apps = apps.len(), "Assigned apps to enrollment policy");
    Ok(Created {
        observed: attributes(&policy_id, apps),
        id: policy_id,
    })
}

async fn read(input: HookInput) -> OktaResult<Attributes> {
    let policy_id = input.id()?;
    let request = ApiRequest::get(format!("/api/v1/policies/{policy_id}/app"));
    let apps: Vec<Application> = input
        .bundle
        .client()
        .collect_all(&input.ctx, &request, |_: &[Application]| false)
        .await?;
    let ids = apps.iter().filter_map(Application::id).map(str::to_string).collect();
    Ok(attributes(policy_id, ids))
}

async fn update(input: HookInput) -> OktaResult<Attributes> {
    let policy_id = input.id()?;
    let desired = input.desired().get_strings(APPS);
    let diff = set_diff(&input.observed().get_strings(APPS), &desired);

    assign(&input, policy_id, &diff.to_add).await?;
    if !diff.to_remove.is_empty() {
        let plan = release_plan(&input, &diff.to_remove).await?;
        let report = plan.execute(&input.ctx, input.bundle.client()).await?;
        if !report.is_clean() {
            warn!(policy_id, failed = report.failed.len(), "Some apps kept their enrollment policy");
        }
    }
    Ok(attributes(policy_id, desired))
}

async fn plan_delete(input: HookInput) -> OktaResult<ReparentPlan> {
    let mut apps = input.observed().get_strings(APPS);
    if apps.is_empty() {
        apps = input.desired().get_strings(APPS);
    }
    release_plan(&input, &apps).await
}

pub fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(
        NAME,
        hook(create),
        hook(read),
        reparent_before_delete(hook(plan_delete)),
    )
    .update(hook(update))
    .oie_only(DOCUMENTATION)
}
