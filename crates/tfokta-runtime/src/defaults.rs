//! Discovery of the system default policy of a type.

use tracing::{debug, info};

use tfokta_client::ApiRequest;
use tfokta_core::{CallContext, OktaError, OktaResult};

use crate::bundle::ClientBundle;
use crate::locks::DEFAULT_DISCOVERY_LOCK;
use crate::model::Policy;

/// Name of the default policy on endpoints that predate the `system` flag.
pub const LEGACY_DEFAULT_NAME: &str = "Default Policy";

/// Pick the default: the `system` policy, else one named "Default Policy".
pub fn pick_default(policies: &[Policy]) -> Option<&Policy> {
    policies
        .iter()
        .find(|p| p.system)
        .or_else(|| policies.iter().find(|p| p.name == LEGACY_DEFAULT_NAME))
}

/// Find the default policy of `policy_type`, caching it on the bundle.
///
/// Listing happens under a named lock so that concurrent callers share one
/// discovery.
pub async fn find_default_policy(
    bundle: &ClientBundle,
    ctx: &CallContext,
    policy_type: &str,
) -> OktaResult<Policy> {
    if let Some(policy) = bundle.cached_default(policy_type) {
        return Ok(policy);
    }

    let _lock = bundle.locks().acquire(ctx, DEFAULT_DISCOVERY_LOCK).await?;
    if let Some(policy) = bundle.cached_default(policy_type) {
        debug!(policy_type, "Default policy discovered by another caller");
        return Ok(policy);
    }

    let request = ApiRequest::get("/api/v1/policies").query("type", policy_type);
    let policies: Vec<Policy> = bundle
        .client()
        .collect_all(ctx, &request, |acc: &[Policy]| acc.iter().any(|p| p.system))
        .await?;

    let policy = pick_default(&policies).cloned().ok_or_else(|| {
        OktaError::not_found(format!("no default {policy_type} policy found"))
    })?;
    if policy.id.is_none() {
        return Err(OktaError::internal(format!(
            "default {policy_type} policy has no id"
        )));
    }

    info!(policy_type, policy_id = ?policy.id, "Discovered default policy");
    bundle.cache_default(policy_type, policy.clone());
    Ok(policy)
}

/// Id of the default policy of `policy_type`.
pub async fn default_policy_id(
    bundle: &ClientBundle,
    ctx: &CallContext,
    policy_type: &str,
) -> OktaResult<String> {
    let policy = find_default_policy(bundle, ctx, policy_type).await?;
    policy
        .id
        .ok_or_else(|| OktaError::internal(format!("default {policy_type} policy has no id")))
}
