//! Per-family rate-limit budgets.
//!
//! Okta groups endpoints into families that share one bucket. Budgets are
//! updated from `X-Rate-Limit-*` response headers and consulted before every
//! request: a request waits while its family is exhausted, or while the
//! configured ceiling of the bucket has already been consumed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reqwest::header::HeaderMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use tfokta_core::{CallContext, OktaResult};

pub const LIMIT_HEADER: &str = "x-rate-limit-limit";
pub const REMAINING_HEADER: &str = "x-rate-limit-remaining";
pub const RESET_HEADER: &str = "x-rate-limit-reset";
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// Group of endpoints sharing one rate-limit bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RateLimitFamily {
    Apps,
    AppById,
    Groups,
    GroupById,
    Users,
    UserById,
    AuthorizationServers,
    Policies,
    Schemas,
    OAuthToken,
    WellKnown,
    Other,
}

impl RateLimitFamily {
    /// Classify a request path (or full URL) into its family.
    pub fn classify(path_or_url: &str) -> Self {
        let path = match url::Url::parse(path_or_url) {
            Ok(url) => url.path().to_string(),
            Err(_) => path_or_url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
        };
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [".well-known", ..] => RateLimitFamily::WellKnown,
            ["oauth2", "v1", "token", ..] => RateLimitFamily::OAuthToken,
            ["api", "v1", "apps"] => RateLimitFamily::Apps,
            ["api", "v1", "apps", ..] => RateLimitFamily::AppById,
            ["api", "v1", "groups"] => RateLimitFamily::Groups,
            ["api", "v1", "groups", ..] => RateLimitFamily::GroupById,
            ["api", "v1", "users"] => RateLimitFamily::Users,
            ["api", "v1", "users", ..] => RateLimitFamily::UserById,
            ["api", "v1", "authorizationServers", ..] => RateLimitFamily::AuthorizationServers,
            ["api", "v1", "policies", ..] => RateLimitFamily::Policies,
            ["api", "v1", "meta", ..] => RateLimitFamily::Schemas,
            _ => RateLimitFamily::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitFamily::Apps => "apps",
            RateLimitFamily::AppById => "apps/{id}",
            RateLimitFamily::Groups => "groups",
            RateLimitFamily::GroupById => "groups/{id}",
            RateLimitFamily::Users => "users",
            RateLimitFamily::UserById => "users/{id}",
            RateLimitFamily::AuthorizationServers => "authorizationServers",
            RateLimitFamily::Policies => "policies",
            RateLimitFamily::Schemas => "meta",
            RateLimitFamily::OAuthToken => "oauth2/token",
            RateLimitFamily::WellKnown => ".well-known",
            RateLimitFamily::Other => "other",
        }
    }
}

impl fmt::Display for RateLimitFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Budget of one family.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitBudget {
    /// Bucket capacity from `X-Rate-Limit-Limit`.
    pub limit: Option<u32>,
    /// Requests left in the window from `X-Rate-Limit-Remaining`.
    pub remaining: Option<u32>,
    /// End of the current window.
    pub reset_at: Option<Instant>,
    /// Fraction of the bucket the provider may consume.
    pub ceiling: f64,
    /// Requests admitted and not yet completed.
    pub in_flight: u32,
}

impl RateLimitBudget {
    fn new(ceiling: f64) -> Self {
        Self {
            limit: None,
            remaining: None,
            reset_at: None,
            ceiling: ceiling.clamp(0.01, 1.0),
            in_flight: 0,
        }
    }

    /// Requests this provider may use in one window.
    pub fn allowance(&self) -> Option<u32> {
        self.limit
            .map(|limit| ((self.ceiling * f64::from(limit)).floor() as u32).max(1))
    }

    /// Admit one request, or return the instant to wait for.
    fn try_admit(&mut self, now: Instant) -> Result<(), Instant> {
        if let Some(reset_at) = self.reset_at {
            if now >= reset_at {
                self.remaining = self.limit;
                self.reset_at = None;
            }
        }

        if let Some(reset_at) = self.reset_at {
            if self.remaining == Some(0) {
                return Err(reset_at);
            }
            if let (Some(limit), Some(allowance)) = (self.limit, self.allowance()) {
                let consumed = limit.saturating_sub(self.remaining.unwrap_or(limit));
                if consumed.saturating_add(self.in_flight) >= allowance {
                    return Err(reset_at);
                }
            }
        }

        self.in_flight += 1;
        Ok(())
    }
}

/// Rate-limit state shared by every request of one client.
#[derive(Debug)]
pub struct RateLimiter {
    budgets: DashMap<RateLimitFamily, RateLimitBudget>,
    ceiling: f64,
}

impl RateLimiter {
    /// `ceiling` is the fraction of each bucket to use, in `[0.01, 1.0]`.
    pub fn new(ceiling: f64) -> Self {
        Self {
            budgets: DashMap::new(),
            ceiling: ceiling.clamp(0.01, 1.0),
        }
    }

    /// Wait until `family` admits a request.
    ///
    /// The returned guard marks the request in flight until dropped.
    pub async fn acquire(
        self: &Arc<Self>,
        ctx: &CallContext,
        family: RateLimitFamily,
    ) -> OktaResult<RateLimitGuard> {
        loop {
            ctx.check()?;
            let now = Instant::now();
            let admitted = self
                .budgets
                .entry(family)
                .or_insert_with(|| RateLimitBudget::new(self.ceiling))
                .try_admit(now);

            match admitted {
                Ok(()) => {
                    return Ok(RateLimitGuard {
                        limiter: Arc::clone(self),
                        family,
                    })
                }
                Err(reset_at) => {
                    let wait = reset_at.saturating_duration_since(now);
                    debug!(family = %family, wait_ms = wait.as_millis() as u64, "Rate-limit budget exhausted, waiting for reset");
                    ctx.sleep(wait).await?;
                }
            }
        }
    }

    /// Update a family from response headers.
    pub fn observe(&self, family: RateLimitFamily, headers: &HeaderMap) {
        let limit = header_u64(headers, LIMIT_HEADER).map(|v| v.min(u64::from(u32::MAX)) as u32);
        let remaining =
            header_u64(headers, REMAINING_HEADER).map(|v| v.min(u64::from(u32::MAX)) as u32);
        let reset_at = reset_from_headers(headers).map(|wait| Instant::now() + wait);

        if limit.is_none() && remaining.is_none() && reset_at.is_none() {
            return;
        }

        let mut budget = self
            .budgets
            .entry(family)
            .or_insert_with(|| RateLimitBudget::new(self.ceiling));
        if limit.is_some() {
            budget.limit = limit;
        }
        if remaining.is_some() {
            budget.remaining = remaining;
        }
        if reset_at.is_some() {
            budget.reset_at = reset_at;
        }
    }

    /// Block `family` until `until` after a 429.
    pub fn mark_exhausted(&self, family: RateLimitFamily, until: Instant) {
        let mut budget = self
            .budgets
            .entry(family)
            .or_insert_with(|| RateLimitBudget::new(self.ceiling));
        budget.remaining = Some(0);
        budget.reset_at = Some(match budget.reset_at {
            Some(existing) if existing > until => existing,
            _ => until,
        });
        warn!(family = %family, "Rate limit exceeded, family blocked until reset");
    }

    /// Copy of every known budget, ordered by family.
    pub fn snapshot(&self) -> Vec<(RateLimitFamily, RateLimitBudget)> {
        let mut budgets: Vec<_> = self
            .budgets
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        budgets.sort_by_key(|(family, _)| *family);
        budgets
    }

    fn release(&self, family: RateLimitFamily) {
        if let Some(mut budget) = self.budgets.get_mut(&family) {
            budget.in_flight = budget.in_flight.saturating_sub(1);
        }
    }
}

/// Marks one admitted request as in flight.
#[derive(Debug)]
pub struct RateLimitGuard {
    limiter: Arc<RateLimiter>,
    family: RateLimitFamily,
}

impl RateLimitGuard {
    pub fn family(&self) -> RateLimitFamily {
        self.family
    }
}

impl Drop for RateLimitGuard {
    fn drop(&mut self) {
        self.limiter.release(self.family);
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    header_str(headers, name).and_then(|v| v.parse().ok())
}

/// Parse `Retry-After` as delta seconds or an HTTP date.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|at| (at.with_timezone(&Utc) - now).to_std().unwrap_or(Duration::ZERO))
}

/// Time until the window resets according to `X-Rate-Limit-Reset`.
///
/// The epoch value is measured against the response `Date` header when
/// present so that local clock skew does not shorten the wait.
pub fn reset_from_headers(headers: &HeaderMap) -> Option<Duration> {
    let reset = header_u64(headers, RESET_HEADER)?;
    let server_now = header_str(headers, "date")
        .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let reset_at = DateTime::<Utc>::from_timestamp(i64::try_from(reset).ok()?, 0)?;
    Some((reset_at - server_now).to_std().unwrap_or(Duration::ZERO))
}

/// Wait demanded by a 429 response: the larger of `Retry-After` and the
/// bucket reset.
pub fn wait_from_headers(headers: &HeaderMap) -> Option<Duration> {
    let retry_after = header_str(headers, RETRY_AFTER_HEADER)
        .and_then(|v| parse_retry_after(v, Utc::now()));
    match (retry_after, reset_from_headers(headers)) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
