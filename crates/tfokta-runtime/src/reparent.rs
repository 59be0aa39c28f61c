//! Re-parenting dependents onto a default sibling.
//!
//! A plan lists every rebind up front. Rebinds are best effort: a failed
//! rebind is logged and recorded in the report and the plan moves on. Only
//! the final step's failure is returned.

use tracing::{info, warn};

use tfokta_client::OktaClient;
use tfokta_core::{CallContext, OktaError, OktaResult};

use crate::plan::CallStep;

#[derive(Debug, Clone, PartialEq)]
pub struct ReparentPlan {
    /// Identifier of the sibling dependents are moved to.
    pub target: String,
    pub rebinds: Vec<CallStep>,
    /// Destructive call issued after the rebinds.
    pub then: Option<CallStep>,
}

/// What happened to each rebind.
#[derive(Debug, Default)]
pub struct ReparentReport {
    pub rebound: Vec<String>,
    pub failed: Vec<(String, OktaError)>,
    pub completed_final: bool,
}

impl ReparentReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl ReparentPlan {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            rebinds: Vec::new(),
            then: None,
        }
    }

    #[must_use]
    pub fn rebind(mut self, step: CallStep) -> Self {
        self.rebinds.push(step);
        self
    }

    #[must_use]
    pub fn then(mut self, step: CallStep) -> Self {
        self.then = Some(step);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rebinds.is_empty() && self.then.is_none()
    }

    pub async fn execute(&self, ctx: &CallContext, client: &OktaClient) -> OktaResult<ReparentReport> {
        let mut report = ReparentReport::default();

        for step in &self.rebinds {
            match step.execute(ctx, client).await {
                Ok(()) => report.rebound.push(step.label.clone()),
                Err(e @ (OktaError::Cancelled | OktaError::Timeout { .. })) => return Err(e),
                Err(e) => {
                    warn!(step = %step.label, new_parent = %self.target, error = %e, "Rebind failed, continuing");
                    report.failed.push((step.label.clone(), e));
                }
            }
        }

        if !self.rebinds.is_empty() {
            info!(
                new_parent = %self.target,
                rebound = report.rebound.len(),
                failed = report.failed.len(),
                "Re-parented dependents"
            );
        }

        if let Some(step) = &self.then {
            step.execute(ctx, client).await?;
            report.completed_final = true;
        }
        Ok(report)
    }
}
