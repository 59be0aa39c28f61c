//! Hook decorators for behaviour shared across kinds.

use std::sync::Arc;

use tracing::{debug, info, warn};

use tfokta_client::{ApiRequest, OktaClient};
use tfokta_core::{CallContext, LifecycleStatus, OktaResult, RetryClass};

use crate::descriptor::{hook, DeleteHook, Hook, HookInput, UpdateHook};
use crate::instance::STATUS;
use crate::reparent::ReparentPlan;

/// Observed attribute set on system-owned defaults.
pub const SYSTEM: &str = "system";

/// Whether the lifecycle call goes before or after the attribute update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOrder {
    BeforeUpdate,
    AfterUpdate,
}

/// Resolves the API path of the instance, e.g. `/api/v1/policies/{id}`.
pub type PathFn = fn(&HookInput) -> OktaResult<String>;

/// `POST {base}/lifecycle/activate` or `.../deactivate`.
pub async fn set_lifecycle(
    ctx: &CallContext,
    client: &OktaClient,
    base_path: &str,
    status: LifecycleStatus,
) -> OktaResult<()> {
    let path = format!("{}/lifecycle/{}", base_path.trim_end_matches('/'), status.transition());
    debug!(path = %path, status = %status, "Changing lifecycle status");
    let request = ApiRequest::post(path).retry_class(RetryClass::IdempotentWithConflict);
    client.execute_empty(ctx, &request).await?;
    Ok(())
}

/// Toggle `status` around `update` when desired and observed differ.
pub fn with_lifecycle(update: UpdateHook, order: LifecycleOrder, base_path: PathFn) -> UpdateHook {
    hook(move |input: HookInput| {
        let update = Arc::clone(&update);
        async move {
            let desired = input.desired().status()?;
            let current = input.observed().status()?;
            let path = base_path(&input)?;
            let toggle = desired != current;
            let ctx = input.ctx.clone();
            let bundle = Arc::clone(&input.bundle);

            if toggle && order == LifecycleOrder::BeforeUpdate {
                set_lifecycle(&ctx, bundle.client(), &path, desired).await?;
            }
            let mut observed = update(input).await?;
            if toggle && order == LifecycleOrder::AfterUpdate {
                set_lifecycle(&ctx, bundle.client(), &path, desired).await?;
            }

            observed.set(STATUS, desired.as_str());
            Ok(observed)
        }
    })
}

/// Make Delete a no-op on system-owned defaults, which the API refuses to delete.
pub fn protect_system_default(delete: DeleteHook) -> DeleteHook {
    hook(move |input: HookInput| {
        let delete = Arc::clone(&delete);
        async move {
            let is_system = input
                .instance
                .observed
                .as_ref()
                .and_then(|o| o.get_bool(SYSTEM))
                .unwrap_or(false);
            if is_system {
                info!(id = ?input.instance.id, "Skipping delete of system default");
                return Ok(());
            }
            delete(input).await
        }
    })
}

/// Delete by executing a re-parenting plan built by `planner`.
///
/// The plan's final step is the destructive call, if any.
pub fn reparent_before_delete(planner: Hook<ReparentPlan>) -> DeleteHook {
    hook(move |input: HookInput| {
        let planner = Arc::clone(&planner);
        async move {
            let ctx = input.ctx.clone();
            let bundle = Arc::clone(&input.bundle);
            let plan = planner(input).await?;

            let report = plan.execute(&ctx, bundle.client()).await?;
            if !report.is_clean() {
                warn!(
                    new_parent = %plan.target,
                    failed = report.failed.len(),
                    "Some dependents were not re-parented"
                );
            }
            Ok(())
        }
    })
}
