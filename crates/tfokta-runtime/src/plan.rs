//! Ordered call plans.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use tfokta_client::{ApiRequest, OktaClient};
use tfokta_core::{CallContext, OktaResult, RetryClass};

/// One API call of a plan, with a label for logs and reports.
#[derive(Debug, Clone, PartialEq)]
pub struct CallStep {
    pub label: String,
    pub request: ApiRequest,
}

impl CallStep {
    pub fn new(label: impl Into<String>, request: ApiRequest) -> Self {
        Self {
            label: label.into(),
            request,
        }
    }

    pub fn get(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(label, ApiRequest::get(path))
    }

    pub fn put(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(label, ApiRequest::put(path))
    }

    pub fn post(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(label, ApiRequest::post(path))
    }

    pub fn delete(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(label, ApiRequest::delete(path))
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> OktaResult<Self> {
        self.request = self.request.json(body)?;
        Ok(self)
    }

    #[must_use]
    pub fn retry_class(mut self, class: RetryClass) -> Self {
        self.request = self.request.retry_class(class);
        self
    }

    /// Run the call, discarding the body.
    pub async fn execute(&self, ctx: &CallContext, client: &OktaClient) -> OktaResult<()> {
        debug!(step = %self.label, request = %self.request, "Executing step");
        client.execute_empty(ctx, &self.request).await?;
        Ok(())
    }
}

impl fmt::Display for CallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.request)
    }
}

/// Calls executed strictly in order; the first failure stops the plan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallPlan {
    steps: Vec<CallStep>,
}

impl CallPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: CallStep) {
        self.steps.push(step);
    }

    #[must_use]
    pub fn with(mut self, step: CallStep) -> Self {
        self.push(step);
        self
    }

    pub fn steps(&self) -> &[CallStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Execute every step in order, returning how many ran.
    pub async fn execute(&self, ctx: &CallContext, client: &OktaClient) -> OktaResult<usize> {
        for step in &self.steps {
            step.execute(ctx, client).await?;
        }
        Ok(self.steps.len())
    }
}

impl FromIterator<CallStep> for CallPlan {
    fn from_iter<T: IntoIterator<Item = CallStep>>(iter: T) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for CallPlan {
    type Item = CallStep;
    type IntoIter = std::vec::IntoIter<CallStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_keeps_order() {
        let plan: CallPlan = ["a", "b", "c"]
            .iter()
            .map(|id| CallStep::put(format!("add {id}"), format!("/api/v1/groups/00g1/users/{id}")))
            .collect();
        let labels: Vec<&str> = plan.steps().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["add a", "add b", "add c"]);
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_step_body_and_display() {
        let step = CallStep::post("activate", "/api/v1/policies/rst1/lifecycle/activate")
            .json(&json!({}))
            .unwrap()
            .retry_class(RetryClass::IdempotentWithConflict);
        assert_eq!(step.request.retry_class, RetryClass::IdempotentWithConflict);
        assert_eq!(
            step.to_string(),
            "activate (POST /api/v1/policies/rst1/lifecycle/activate)"
        );
    }
}
