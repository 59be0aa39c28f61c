//! Group members.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A user as returned by `GET /api/v1/groups/{id}/users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub profile: Option<Value>,
}

impl GroupMember {
    pub fn login(&self) -> Option<&str> {
        self.profile.as_ref()?.get("login")?.as_str()
    }
}
