//! # Okta API client
//!
//! HTTP execution layer for the Okta management API.
//!
//! - [`http`] - `OktaClient`: signing, retries, response classification
//! - [`rate_limit`] - Per-family budgets fed by `X-Rate-Limit-*` headers
//! - [`retry`] - Exponential backoff within `[min_wait, max_wait]`
//! - [`pagination`] - `Link` header cursors and `Page<T>`
//! - [`auth`] - Signers for the four authentication modes
//! - [`assertion`] - Client-assertion JWTs for the private-key mode
//! - [`capability`] - Classic vs. Identity Engine probe

pub mod assertion;
pub mod auth;
pub mod capability;
pub mod http;
pub mod pagination;
pub mod rate_limit;
pub mod retry;

pub use auth::{signer_from_config, AuthScheme, Credential, PrivateKeySigner, Signer, StaticSigner};
pub use capability::CapabilityProbe;
pub use http::{ApiRequest, ApiResponse, OktaClient, ResponseEnvelope};
pub use pagination::Page;
pub use rate_limit::{RateLimitBudget, RateLimitFamily};
pub use retry::RetryPolicy;
