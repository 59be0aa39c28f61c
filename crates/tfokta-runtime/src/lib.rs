//! # Okta resource runtime
//!
//! Generic CRUD over resource descriptors, and the reconciliation
//! primitives the descriptors are built from.
//!
//! ## Crate Organization
//!
//! - [`runtime`] - `ResourceRuntime`: OIE gate, locks, hooks, consistency polling
//! - [`descriptor`] - Resource kinds as data plus hook function values
//! - [`bundle`] - `ClientBundle`: client, capability, locks, default cache
//! - [`instance`] - Attribute maps and resource instances
//! - [`decorators`] - Lifecycle toggling, default protection, re-parenting on delete
//! - [`setdiff`], [`backoff`], [`locks`], [`plan`], [`reparent`], [`defaults`] - Primitives
//! - [`model`] - Okta entities
//! - [`kinds`] - Built-in resource kinds
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tfokta_core::{CallContext, ProviderConfig};
//! use tfokta_runtime::{Attributes, ClientBundle, ResourceInstance, ResourceRuntime};
//!
//! # async fn example() -> tfokta_core::OktaResult<()> {
//! let bundle = Arc::new(ClientBundle::new(ProviderConfig::from_env()?)?);
//! let runtime = ResourceRuntime::with_default_kinds(bundle);
//!
//! let desired = Attributes::new()
//!     .with("group_id", "00g1")
//!     .with("users", vec!["00u1", "00u2"]);
//! let created = runtime
//!     .create(&CallContext::new(), "okta_group_memberships", ResourceInstance::new(desired))
//!     .await?;
//! println!("created {:?}", created.id);
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod bundle;
pub mod decorators;
pub mod defaults;
pub mod descriptor;
pub mod instance;
pub mod kinds;
pub mod locks;
pub mod model;
pub mod plan;
pub mod reparent;
pub mod runtime;
pub mod setdiff;

pub use backoff::{PollError, Poller};
pub use bundle::ClientBundle;
pub use decorators::{protect_system_default, reparent_before_delete, with_lifecycle, LifecycleOrder};
pub use descriptor::{hook, ConsistencyWindow, Created, HookInput, ImportSpec, ResourceDescriptor};
pub use instance::{Attributes, ResourceInstance};
pub use locks::{NamedLockGuard, NamedLockRegistry};
pub use plan::{CallPlan, CallStep};
pub use reparent::{ReparentPlan, ReparentReport};
pub use runtime::{ReadOutcome, ResourceRuntime, UpdateOutcome};
pub use setdiff::{set_diff, SetDiff};
