//! Error and drift classification.
//!
//! Maps an HTTP status (and body) onto a [`DriftVerdict`] for read paths, or a
//! typed [`OktaError`] for write paths. The execution layer decides retries
//! from these verdicts and the runtime decides drift from them.

use std::fmt;
use std::time::Duration;

use crate::error::{ApiErrorDetail, OktaError, ResourceContext, TransientReason};
use crate::types::Operation;

/// Reason attached to a fatal verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FatalReason {
    Validation,
    Auth,
    OieOnly,
    Other,
}

impl fmt::Display for FatalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FatalReason::Validation => "validation",
            FatalReason::Auth => "auth",
            FatalReason::OieOnly => "oie_only",
            FatalReason::Other => "other",
        })
    }
}

/// Outcome of classifying a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftVerdict {
    /// The object exists (2xx).
    Present,
    /// The object is gone (404).
    Absent,
    /// Retry-eligible.
    Transient(TransientReason),
    /// 409.
    Conflict,
    /// Terminal.
    Fatal(FatalReason),
}

impl DriftVerdict {
    /// Whether the execution layer may retry on this verdict.
    pub fn is_transient(self) -> bool {
        matches!(self, DriftVerdict::Transient(_))
    }
}

/// Classify an HTTP status code.
pub fn classify_status(status: u16) -> DriftVerdict {
    match status {
        200..=299 => DriftVerdict::Present,
        404 => DriftVerdict::Absent,
        408 => DriftVerdict::Transient(TransientReason::Io),
        429 => DriftVerdict::Transient(TransientReason::Rate),
        409 => DriftVerdict::Conflict,
        401 => DriftVerdict::Fatal(FatalReason::Auth),
        500..=599 => DriftVerdict::Transient(TransientReason::Server),
        _ => DriftVerdict::Fatal(FatalReason::Validation),
    }
}

/// Build the typed error for a non-2xx response.
///
/// `retry_after` is only used for 429 responses.
pub fn error_for_status(status: u16, body: &str, retry_after: Option<Duration>) -> OktaError {
    let detail = ApiErrorDetail::from_response(status, body);
    let context = ResourceContext::default();

    match classify_status(status) {
        DriftVerdict::Absent => OktaError::NotFound { detail, context },
        DriftVerdict::Conflict => OktaError::Conflict { detail, context },
        DriftVerdict::Transient(TransientReason::Rate) => OktaError::RateLimited {
            detail,
            retry_after,
            context,
        },
        DriftVerdict::Transient(reason) => OktaError::Transient {
            reason,
            detail,
            context,
            source: None,
        },
        DriftVerdict::Fatal(FatalReason::Auth) => OktaError::AuthFailure {
            message: detail.to_string(),
            status: Some(status),
        },
        DriftVerdict::Fatal(FatalReason::Validation) => OktaError::Validation { detail, context },
        DriftVerdict::Present | DriftVerdict::Fatal(_) => OktaError::Fatal {
            detail,
            context,
            source: None,
        },
    }
}

impl OktaError {
    /// Verdict for this error, as seen by a read path.
    pub fn verdict(&self) -> DriftVerdict {
        match self {
            OktaError::NotFound { .. } => DriftVerdict::Absent,
            OktaError::Conflict { .. } => DriftVerdict::Conflict,
            OktaError::RateLimited { .. } => DriftVerdict::Transient(TransientReason::Rate),
            OktaError::Transient { reason, .. } => DriftVerdict::Transient(*reason),
            OktaError::Validation { .. } | OktaError::InvalidInput { .. } => {
                DriftVerdict::Fatal(FatalReason::Validation)
            }
            OktaError::AuthFailure { .. } | OktaError::Key { .. } => {
                DriftVerdict::Fatal(FatalReason::Auth)
            }
            OktaError::OieOnlyUnsupported { .. } => DriftVerdict::Fatal(FatalReason::OieOnly),
            _ => DriftVerdict::Fatal(FatalReason::Other),
        }
    }
}

/// How a CRUD operation treats an absent object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundPolicy {
    /// Report drift so the host clears the identifier.
    ClearState,
    /// Swallow as success.
    TreatAsSuccess,
    /// Ask the host to recreate on the next plan.
    Recreate,
    /// Surface the error.
    Fail,
}

impl NotFoundPolicy {
    pub fn for_operation(operation: Operation) -> Self {
        match operation {
            Operation::Read | Operation::Import => NotFoundPolicy::ClearState,
            Operation::Delete => NotFoundPolicy::TreatAsSuccess,
            Operation::Update => NotFoundPolicy::Recreate,
            Operation::Create => NotFoundPolicy::Fail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status_table() {
        assert_eq!(classify_status(200), DriftVerdict::Present);
        assert_eq!(classify_status(204), DriftVerdict::Present);
        assert_eq!(classify_status(404), DriftVerdict::Absent);
        assert_eq!(
            classify_status(429),
            DriftVerdict::Transient(TransientReason::Rate)
        );
        assert_eq!(
            classify_status(408),
            DriftVerdict::Transient(TransientReason::Io)
        );
        assert_eq!(classify_status(409), DriftVerdict::Conflict);
        assert_eq!(
            classify_status(401),
            DriftVerdict::Fatal(FatalReason::Auth)
        );
        for status in [500, 501, 502, 503, 504] {
            assert_eq!(
                classify_status(status),
                DriftVerdict::Transient(TransientReason::Server)
            );
        }
        for status in [400, 403, 405, 422] {
            assert_eq!(
                classify_status(status),
                DriftVerdict::Fatal(FatalReason::Validation)
            );
        }
    }

    #[test]
    fn test_error_for_status_maps_variants() {
        assert!(error_for_status(404, "", None).is_not_found());
        assert!(matches!(
            error_for_status(409, "", None),
            OktaError::Conflict { .. }
        ));
        assert!(matches!(
            error_for_status(401, "", None),
            OktaError::AuthFailure {
                status: Some(401),
                ..
            }
        ));
        assert!(matches!(
            error_for_status(400, "", None),
            OktaError::Validation { .. }
        ));

        let rate = error_for_status(429, "", Some(Duration::from_secs(2)));
        match rate {
            OktaError::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_secs(2)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_error_verdict_round_trip() {
        for status in [404, 409, 429, 500, 401, 400] {
            let err = error_for_status(status, "", None);
            assert_eq!(err.verdict(), classify_status(status), "status {status}");
        }
    }

    #[test]
    fn test_error_keeps_okta_code() {
        let body = r#"{"errorCode":"E0000007","errorSummary":"Not found: Resource not found: 0oa1 (AppInstance)"}"#;
        let err = error_for_status(404, body, None);
        assert_eq!(err.okta_error_code(), Some("E0000007"));
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_not_found_policy() {
        assert_eq!(
            NotFoundPolicy::for_operation(Operation::Read),
            NotFoundPolicy::ClearState
        );
        assert_eq!(
            NotFoundPolicy::for_operation(Operation::Delete),
            NotFoundPolicy::TreatAsSuccess
        );
        assert_eq!(
            NotFoundPolicy::for_operation(Operation::Update),
            NotFoundPolicy::Recreate
        );
        assert_eq!(
            NotFoundPolicy::for_operation(Operation::Create),
            NotFoundPolicy::Fail
        );
    }
}
