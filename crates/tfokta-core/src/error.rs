//! Error types for the reconciliation core.
//!
//! Errors are classified at the point they are created so that the execution
//! layer can decide between retrying and surfacing, and every terminal error
//! carries the HTTP status, the Okta `errorCode`, and the resource it relates to.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Boxed error source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for core operations.
pub type OktaResult<T> = Result<T, OktaError>;

/// Error body returned by the Okta management API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OktaErrorBody {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_summary: Option<String>,
    #[serde(default)]
    pub error_id: Option<String>,
    #[serde(default)]
    pub error_causes: Vec<OktaErrorCause>,
}

/// A single entry of `errorCauses`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OktaErrorCause {
    #[serde(default)]
    pub error_summary: String,
}

/// HTTP-level detail attached to API errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiErrorDetail {
    /// HTTP status, when a response was observed.
    pub status: Option<u16>,
    /// Okta `errorCode` (e.g. `E0000007`).
    pub error_code: Option<String>,
    /// Short human message.
    pub summary: String,
    /// Flattened `errorCauses`.
    pub causes: Vec<String>,
}

const MAX_RAW_BODY: usize = 512;

impl ApiErrorDetail {
    /// Builds the detail from a status and raw response body.
    ///
    /// Okta error bodies are parsed when present; anything else is kept as
    /// a truncated raw summary.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        if let Ok(parsed) = serde_json::from_str::<OktaErrorBody>(body) {
            if parsed.error_code.is_some() || parsed.error_summary.is_some() {
                return Self {
                    status: Some(status),
                    error_code: parsed.error_code,
                    summary: parsed.error_summary.unwrap_or_default(),
                    causes: parsed
                        .error_causes
                        .into_iter()
                        .map(|c| c.error_summary)
                        .filter(|s| !s.is_empty())
                        .collect(),
                };
            }
        }

        let trimmed = body.trim();
        let summary = if trimmed.is_empty() {
            format!("HTTP {status}")
        } else if trimmed.len() > MAX_RAW_BODY {
            let mut end = MAX_RAW_BODY;
            while !trimmed.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}…", &trimmed[..end])
        } else {
            trimmed.to_string()
        };

        Self {
            status: Some(status),
            error_code: None,
            summary,
            causes: Vec::new(),
        }
    }

    /// Detail with only a message, for errors raised before any response.
    pub fn message(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for ApiErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(status) = self.status {
            write!(f, "HTTP {status} ")?;
        }
        if let Some(code) = &self.error_code {
            write!(f, "{code}: ")?;
        }
        write!(f, "{}", self.summary)?;
        if !self.causes.is_empty() {
            write!(f, " ({})", self.causes.join("; "))?;
        }
        Ok(())
    }
}

/// Resource kind and identifier an error relates to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceContext {
    pub kind: Option<String>,
    pub id: Option<String>,
}

impl ResourceContext {
    fn is_empty(&self) -> bool {
        self.kind.is_none() && self.id.is_none()
    }
}

impl fmt::Display for ResourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.id) {
            (Some(kind), Some(id)) => write!(f, " [{kind} {id}]"),
            (Some(kind), None) => write!(f, " [{kind}]"),
            (None, Some(id)) => write!(f, " [{id}]"),
            (None, None) => Ok(()),
        }
    }
}

/// Cause of a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransientReason {
    /// Network or I/O failure, including request timeouts.
    Io,
    /// The rate-limit bucket was exhausted.
    Rate,
    /// The service answered with a 5xx.
    Server,
}

impl fmt::Display for TransientReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransientReason::Io => "io",
            TransientReason::Rate => "rate",
            TransientReason::Server => "server",
        })
    }
}

/// Error that can occur while reconciling against Okta.
#[derive(Debug, Error)]
pub enum OktaError {
    // Pre-flight validation
    /// Provider configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Caller-supplied input (attributes, import key) is invalid.
    #[error("invalid input{context}: {message}")]
    InvalidInput {
        message: String,
        context: ResourceContext,
    },

    // API outcomes
    /// The API rejected the request (4xx other than 401/404/409/429).
    #[error("validation failed{context}: {detail}")]
    Validation {
        detail: ApiErrorDetail,
        context: ResourceContext,
    },

    /// Retry-eligible failure.
    #[error("transient {reason} failure{context}: {detail}")]
    Transient {
        reason: TransientReason,
        detail: ApiErrorDetail,
        context: ResourceContext,
        #[source]
        source: Option<BoxError>,
    },

    /// HTTP 429.
    #[error("rate limited{context}: {detail}")]
    RateLimited {
        detail: ApiErrorDetail,
        retry_after: Option<Duration>,
        context: ResourceContext,
    },

    /// The object does not exist (HTTP 404). Drives drift detection.
    #[error("not found{context}: {detail}")]
    NotFound {
        detail: ApiErrorDetail,
        context: ResourceContext,
    },

    /// HTTP 409.
    #[error("conflict{context}: {detail}")]
    Conflict {
        detail: ApiErrorDetail,
        context: ResourceContext,
    },

    // Authentication
    /// Credentials were rejected or a token could not be obtained.
    #[error("authentication failed: {message}")]
    AuthFailure {
        message: String,
        status: Option<u16>,
    },

    /// Private key could not be loaded or is of an unsupported type.
    #[error("invalid private key: {message}")]
    Key { message: String },

    // Capability gate
    /// Resource requires an Okta Identity Engine org.
    #[error("{resource} is only available on Okta Identity Engine orgs, see {documentation}")]
    OieOnlyUnsupported {
        resource: String,
        documentation: String,
    },

    // Terminal
    /// Non-retryable failure.
    #[error("request failed{context}: {detail}")]
    Fatal {
        detail: ApiErrorDetail,
        context: ResourceContext,
        #[source]
        source: Option<BoxError>,
    },

    /// Transient failures persisted past `max_retries`.
    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<OktaError>,
    },

    /// Response body could not be (de)serialized.
    #[error("serialization error{context}: {message}")]
    Serialization {
        message: String,
        context: ResourceContext,
    },

    /// The call context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The call context deadline passed.
    #[error("deadline exceeded after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// Internal invariant violation.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl OktaError {
    /// Check if this error is transient and the call may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OktaError::Transient { .. } | OktaError::RateLimited { .. }
        )
    }

    /// Check if this error signals an absent object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, OktaError::NotFound { .. })
    }

    /// HTTP status observed for this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            OktaError::Validation { detail, .. }
            | OktaError::Transient { detail, .. }
            | OktaError::RateLimited { detail, .. }
            | OktaError::NotFound { detail, .. }
            | OktaError::Conflict { detail, .. }
            | OktaError::Fatal { detail, .. } => detail.status,
            OktaError::AuthFailure { status, .. } => *status,
            OktaError::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Okta `errorCode` carried by the response, if any.
    pub fn okta_error_code(&self) -> Option<&str> {
        match self {
            OktaError::Validation { detail, .. }
            | OktaError::Transient { detail, .. }
            | OktaError::RateLimited { detail, .. }
            | OktaError::NotFound { detail, .. }
            | OktaError::Conflict { detail, .. }
            | OktaError::Fatal { detail, .. } => detail.error_code.as_deref(),
            OktaError::RetriesExhausted { last, .. } => last.okta_error_code(),
            _ => None,
        }
    }

    /// Stable classification code.
    pub fn error_code(&self) -> &'static str {
        match self {
            OktaError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            OktaError::InvalidInput { .. } => "INVALID_INPUT",
            OktaError::Validation { .. } => "VALIDATION",
            OktaError::Transient { .. } => "TRANSIENT",
            OktaError::RateLimited { .. } => "RATE_LIMITED",
            OktaError::NotFound { .. } => "NOT_FOUND",
            OktaError::Conflict { .. } => "CONFLICT",
            OktaError::AuthFailure { .. } => "AUTH_FAILED",
            OktaError::Key { .. } => "INVALID_KEY",
            OktaError::OieOnlyUnsupported { .. } => "OIE_ONLY",
            OktaError::Fatal { .. } => "FATAL",
            OktaError::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
            OktaError::Serialization { .. } => "SERIALIZATION",
            OktaError::Cancelled => "CANCELLED",
            OktaError::Timeout { .. } => "TIMEOUT",
            OktaError::Internal { .. } => "INTERNAL",
        }
    }

    /// Attach resource kind and identifier, keeping any context already set.
    #[must_use]
    pub fn with_resource(mut self, kind: &str, id: Option<&str>) -> Self {
        if let OktaError::RetriesExhausted { last, .. } = &mut self {
            let inner = std::mem::replace(
                last.as_mut(),
                OktaError::Internal {
                    message: String::new(),
                },
            );
            **last = inner.with_resource(kind, id);
            return self;
        }

        if let Some(context) = self.context_mut() {
            if context.is_empty() {
                context.kind = Some(kind.to_string());
                context.id = id.map(str::to_string);
            } else if context.id.is_none() {
                context.id = id.map(str::to_string);
            }
        }
        self
    }

    /// Resource context, when this variant carries one.
    pub fn context(&self) -> Option<&ResourceContext> {
        match self {
            OktaError::InvalidInput { context, .. }
            | OktaError::Validation { context, .. }
            | OktaError::Transient { context, .. }
            | OktaError::RateLimited { context, .. }
            | OktaError::NotFound { context, .. }
            | OktaError::Conflict { context, .. }
            | OktaError::Fatal { context, .. }
            | OktaError::Serialization { context, .. } => Some(context),
            OktaError::RetriesExhausted { last, .. } => last.context(),
            _ => None,
        }
    }

    fn context_mut(&mut self) -> Option<&mut ResourceContext> {
        match self {
            OktaError::InvalidInput { context, .. }
            | OktaError::Validation { context, .. }
            | OktaError::Transient { context, .. }
            | OktaError::RateLimited { context, .. }
            | OktaError::NotFound { context, .. }
            | OktaError::Conflict { context, .. }
            | OktaError::Fatal { context, .. }
            | OktaError::Serialization { context, .. } => Some(context),
            _ => None,
        }
    }

    // Convenience constructors

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        OktaError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        OktaError::InvalidInput {
            message: message.into(),
            context: ResourceContext::default(),
        }
    }

    /// Create a transient I/O error with source.
    pub fn io_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        OktaError::Transient {
            reason: TransientReason::Io,
            detail: ApiErrorDetail::message(message),
            context: ResourceContext::default(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a fatal error without an HTTP response.
    pub fn fatal(message: impl Into<String>) -> Self {
        OktaError::Fatal {
            detail: ApiErrorDetail::message(message),
            context: ResourceContext::default(),
            source: None,
        }
    }

    /// Create a fatal error with source.
    pub fn fatal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        OktaError::Fatal {
            detail: ApiErrorDetail::message(message),
            context: ResourceContext::default(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an authentication failure.
    pub fn auth(message: impl Into<String>) -> Self {
        OktaError::AuthFailure {
            message: message.into(),
            status: None,
        }
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        OktaError::Serialization {
            message: message.into(),
            context: ResourceContext::default(),
        }
    }

    /// Create a not-found error for an object the caller looked up locally.
    pub fn not_found(message: impl Into<String>) -> Self {
        OktaError::NotFound {
            detail: ApiErrorDetail::message(message),
            context: ResourceContext::default(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        OktaError::Internal {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for OktaError {
    fn from(err: serde_json::Error) -> Self {
        OktaError::serialization(err.to_string())
    }
}
