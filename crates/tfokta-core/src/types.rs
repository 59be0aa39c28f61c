//! Shared value types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Statuses retried for every retrying class.
pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// How the execution layer treats failed attempts of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RetryClass {
    /// Never retried.
    None,
    /// Retried on transient statuses and I/O errors.
    #[default]
    Idempotent,
    /// As `Idempotent`, and also on 409.
    IdempotentWithConflict,
}

impl RetryClass {
    /// Whether an HTTP status is retried under this class.
    pub fn retries_status(self, status: u16) -> bool {
        match self {
            RetryClass::None => false,
            RetryClass::Idempotent => RETRYABLE_STATUSES.contains(&status),
            RetryClass::IdempotentWithConflict => {
                status == 409 || RETRYABLE_STATUSES.contains(&status)
            }
        }
    }

    /// Whether network or I/O failures are retried under this class.
    pub fn retries_io(self) -> bool {
        !matches!(self, RetryClass::None)
    }
}

/// Generation of the target org.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgCapability {
    Classic,
    Oie,
}

impl OrgCapability {
    pub fn is_oie(self) -> bool {
        matches!(self, OrgCapability::Oie)
    }
}

impl fmt::Display for OrgCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrgCapability::Classic => "classic",
            OrgCapability::Oie => "oie",
        })
    }
}

/// Lifecycle status carried by apps, policies and similar entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    #[default]
    Active,
    Inactive,
}

impl LifecycleStatus {
    /// Name of the lifecycle sub-resource that moves an entity into this status.
    pub fn transition(self) -> &'static str {
        match self {
            LifecycleStatus::Active => "activate",
            LifecycleStatus::Inactive => "deactivate",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleStatus::Active => "ACTIVE",
            LifecycleStatus::Inactive => "INACTIVE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "ACTIVE" => Some(LifecycleStatus::Active),
            "INACTIVE" => Some(LifecycleStatus::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CRUD operation a hook implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Import => "import",
        })
    }
}
