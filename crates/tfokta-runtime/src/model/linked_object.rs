//! Linked object definitions on the user schema.

use serde::{Deserialize, Serialize};

/// One side of a linked object definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedObjectDetails {
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default = "user_type")]
    pub kind: String,
}

fn user_type() -> String {
    "USER".to_string()
}

impl LinkedObjectDetails {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            description: None,
            kind: user_type(),
        }
    }
}

/// Primary/associated relationship, identified by the primary name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedObject {
    pub primary: LinkedObjectDetails,
    pub associated: LinkedObjectDetails,
}
