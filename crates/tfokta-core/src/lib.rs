//! # Okta reconciliation core
//!
//! Shared foundations for the Okta provider crates.
//!
//! ## Crate Organization
//!
//! - [`config`] - Validated, frozen provider configuration
//! - [`error`] - Error taxonomy with Okta error-body parsing
//! - [`classify`] - HTTP status to drift verdict mapping
//! - [`context`] - Per-call cancellation and deadline
//! - [`ids`] - Import keys and composite identifiers
//! - [`logging`] - Log level and tracing subscriber setup
//! - [`types`] - Retry classes, org capability, lifecycle status

pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod ids;
pub mod logging;
pub mod types;

pub use classify::{classify_status, error_for_status, DriftVerdict, FatalReason, NotFoundPolicy};
pub use config::{AuthMode, PrivateKeyAuth, ProviderConfig, ProviderConfigBuilder, RetrySettings};
pub use context::CallContext;
pub use error::{ApiErrorDetail, OktaError, OktaResult, ResourceContext, TransientReason};
pub use ids::ImportKey;
pub use types::{LifecycleStatus, Operation, OrgCapability, RetryClass};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::classify::{DriftVerdict, NotFoundPolicy};
    pub use crate::config::ProviderConfig;
    pub use crate::context::CallContext;
    pub use crate::error::{OktaError, OktaResult};
    pub use crate::ids::ImportKey;
    pub use crate::types::{LifecycleStatus, Operation, OrgCapability, RetryClass};
}
