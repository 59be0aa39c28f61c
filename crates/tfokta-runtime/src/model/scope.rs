//! Custom authorization server scopes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// `IMPLICIT`, `REQUIRED` or `FLEXIBLE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent: Option<String>,
    /// `ALL_CLIENTS` or `NO_CLIENTS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_publish: Option<String>,
    #[serde(default)]
    pub default: bool,
    #[serde(default, skip_serializing)]
    pub system: bool,
}
