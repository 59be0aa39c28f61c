//! Policies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tfokta_core::LifecycleStatus;

pub const ACCESS_POLICY: &str = "ACCESS_POLICY";
pub const PROFILE_ENROLLMENT: &str = "PROFILE_ENROLLMENT";

/// A policy of any type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub policy_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Set on the system-owned default of each type.
    #[serde(default, skip_serializing)]
    pub system: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Value>,
}

impl Policy {
    pub fn new(policy_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            policy_type: policy_type.into(),
            name: name.into(),
            description: None,
            status: None,
            system: false,
            priority: None,
            conditions: None,
        }
    }

    pub fn lifecycle(&self) -> Option<LifecycleStatus> {
        self.status.as_deref().and_then(LifecycleStatus::parse)
    }
}
