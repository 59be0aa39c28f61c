//! Provider configuration.
//!
//! A [`ProviderConfig`] is produced once by [`ProviderConfigBuilder::build`],
//! which validates every field, and is read-only afterwards.
//!
//! # Security
//!
//! Tokens and private keys are held in [`SecretString`] and never appear in
//! `Debug` output.

use std::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::{OktaError, OktaResult};
use crate::logging::LogLevel;

pub const DEFAULT_BASE_URL: &str = "okta.com";
pub const DEFAULT_MIN_WAIT_SECONDS: u64 = 30;
pub const DEFAULT_MAX_WAIT_SECONDS: u64 = 300;
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const MAX_RETRIES_LIMIT: u32 = 100;
pub const MAX_REQUEST_TIMEOUT_SECONDS: u64 = 300;

/// Credentials used to sign requests.
#[derive(Clone)]
pub enum AuthMode {
    /// Static bearer token from configuration.
    AccessToken { token: SecretString },
    /// Bearer token issued outside the provider and passed via environment.
    ExternalAccessToken { token: SecretString },
    /// Long-lived API token, sent as `SSWS`.
    ApiToken { token: SecretString },
    /// OAuth client credentials with a signed client assertion.
    PrivateKey(PrivateKeyAuth),
}

impl AuthMode {
    /// Short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            AuthMode::AccessToken { .. } => "access_token",
            AuthMode::ExternalAccessToken { .. } => "external_access_token",
            AuthMode::ApiToken { .. } => "api_token",
            AuthMode::PrivateKey(_) => "private_key",
        }
    }
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::AccessToken { .. } => f
                .debug_struct("AccessToken")
                .field("token", &"[REDACTED]")
                .finish(),
            AuthMode::ExternalAccessToken { .. } => f
                .debug_struct("ExternalAccessToken")
                .field("token", &"[REDACTED]")
                .finish(),
            AuthMode::ApiToken { .. } => f
                .debug_struct("ApiToken")
                .field("token", &"[REDACTED]")
                .finish(),
            AuthMode::PrivateKey(auth) => f.debug_tuple("PrivateKey").field(auth).finish(),
        }
    }
}

/// Private-key client credentials.
#[derive(Clone)]
pub struct PrivateKeyAuth {
    pub client_id: String,
    /// Inline PEM or a path to a PEM file.
    pub private_key: SecretString,
    pub private_key_id: Option<String>,
    pub scopes: Vec<String>,
}

impl fmt::Debug for PrivateKeyAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyAuth")
            .field("client_id", &self.client_id)
            .field("private_key", &"[REDACTED]")
            .field("private_key_id", &self.private_key_id)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Retry policy of the execution layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Exponential backoff when true, constant `min_wait` otherwise.
    pub backoff: bool,
    pub min_wait: Duration,
    pub max_wait: Duration,
    pub max_retries: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            backoff: true,
            min_wait: Duration::from_secs(DEFAULT_MIN_WAIT_SECONDS),
            max_wait: Duration::from_secs(DEFAULT_MAX_WAIT_SECONDS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetrySettings {
    /// Settings with no waiting between attempts.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            backoff: true,
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
            max_retries: 3,
        }
    }
}

/// Concurrency knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputSettings {
    pub parallelism: u32,
    /// Percent of each rate-limit bucket the provider may consume.
    pub max_api_capacity: u32,
}

impl Default for ThroughputSettings {
    fn default() -> Self {
        Self {
            parallelism: 1,
            max_api_capacity: 100,
        }
    }
}

impl ThroughputSettings {
    /// Ceiling as a fraction in `[0.01, 1.0]`.
    pub fn capacity_fraction(&self) -> f64 {
        f64::from(self.max_api_capacity.clamp(1, 100)) / 100.0
    }
}

/// Validated, immutable provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    org_name: Option<String>,
    base_url: String,
    org_url: Url,
    http_proxy: Option<Url>,
    auth: AuthMode,
    retry: RetrySettings,
    throughput: ThroughputSettings,
    request_timeout: Option<Duration>,
    log_level: LogLevel,
    classic_org: Option<bool>,
}

impl ProviderConfig {
    pub fn builder() -> ProviderConfigBuilder {
        ProviderConfigBuilder::default()
    }

    /// Build from `OKTA_*` environment variables.
    pub fn from_env() -> OktaResult<Self> {
        ProviderConfigBuilder::from_lookup(|key| std::env::var(key).ok())?.build()
    }

    pub fn org_name(&self) -> Option<&str> {
        self.org_name.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `https://{org_name}.{base_url}` or the configured override.
    pub fn org_url(&self) -> &Url {
        &self.org_url
    }

    /// Absolute URL for a path under the org.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.org_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Audience and target of the client-credentials exchange.
    pub fn token_endpoint(&self) -> String {
        self.endpoint("/oauth2/v1/token")
    }

    pub fn http_proxy(&self) -> Option<&Url> {
        self.http_proxy.as_ref()
    }

    pub fn auth(&self) -> &AuthMode {
        &self.auth
    }

    pub fn retry(&self) -> RetrySettings {
        self.retry
    }

    pub fn throughput(&self) -> ThroughputSettings {
        self.throughput
    }

    /// Bound on one HTTP round trip. `None` means unbounded.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Org generation forced by configuration, skipping the probe.
    pub fn classic_org(&self) -> Option<bool> {
        self.classic_org
    }
}

/// Builder for [`ProviderConfig`].
#[derive(Debug, Clone, Default)]
pub struct ProviderConfigBuilder {
    org_name: Option<String>,
    base_url: Option<String>,
    org_url: Option<String>,
    http_proxy: Option<String>,
    access_token: Option<SecretString>,
    external_access_token: Option<SecretString>,
    api_token: Option<SecretString>,
    client_id: Option<String>,
    private_key: Option<SecretString>,
    private_key_id: Option<String>,
    scopes: Vec<String>,
    backoff: Option<bool>,
    min_wait_seconds: Option<u64>,
    max_wait_seconds: Option<u64>,
    max_retries: Option<u32>,
    parallelism: Option<u32>,
    max_api_capacity: Option<u32>,
    log_level: Option<u8>,
    request_timeout_seconds: Option<u64>,
    classic_org: Option<bool>,
}

impl ProviderConfigBuilder {
    pub fn org_name(mut self, value: impl Into<String>) -> Self {
        self.org_name = Some(value.into());
        self
    }

    pub fn base_url(mut self, value: impl Into<String>) -> Self {
        self.base_url = Some(value.into());
        self
    }

    /// Full org URL, for custom domains and local test servers.
    pub fn org_url(mut self, value: impl Into<String>) -> Self {
        self.org_url = Some(value.into());
        self
    }

    pub fn http_proxy(mut self, value: impl Into<String>) -> Self {
        self.http_proxy = Some(value.into());
        self
    }

    pub fn access_token(mut self, value: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::new(value.into()));
        self
    }

    pub fn external_access_token(mut self, value: impl Into<String>) -> Self {
        self.external_access_token = Some(SecretString::new(value.into()));
        self
    }

    pub fn api_token(mut self, value: impl Into<String>) -> Self {
        self.api_token = Some(SecretString::new(value.into()));
        self
    }

    pub fn client_id(mut self, value: impl Into<String>) -> Self {
        self.client_id = Some(value.into());
        self
    }

    pub fn private_key(mut self, value: impl Into<String>) -> Self {
        self.private_key = Some(SecretString::new(value.into()));
        self
    }

    pub fn private_key_id(mut self, value: impl Into<String>) -> Self {
        self.private_key_id = Some(value.into());
        self
    }

    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn backoff(mut self, value: bool) -> Self {
        self.backoff = Some(value);
        self
    }

    pub fn min_wait_seconds(mut self, value: u64) -> Self {
        self.min_wait_seconds = Some(value);
        self
    }

    pub fn max_wait_seconds(mut self, value: u64) -> Self {
        self.max_wait_seconds = Some(value);
        self
    }

    pub fn max_retries(mut self, value: u32) -> Self {
        self.max_retries = Some(value);
        self
    }

    pub fn parallelism(mut self, value: u32) -> Self {
        self.parallelism = Some(value);
        self
    }

    pub fn max_api_capacity(mut self, value: u32) -> Self {
        self.max_api_capacity = Some(value);
        self
    }

    pub fn log_level(mut self, value: u8) -> Self {
        self.log_level = Some(value);
        self
    }

    pub fn request_timeout_seconds(mut self, value: u64) -> Self {
        self.request_timeout_seconds = Some(value);
        self
    }

    pub fn classic_org(mut self, value: bool) -> Self {
        self.classic_org = Some(value);
        self
    }

    /// Populate from a key lookup using the `OKTA_*` variable names.
    pub fn from_lookup<F>(lookup: F) -> OktaResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::default();

        builder.org_name = get("OKTA_ORG_NAME");
        builder.base_url = get("OKTA_BASE_URL");
        builder.org_url = get("OKTA_ORG_URL");
        builder.http_proxy = get("OKTA_HTTP_PROXY");
        builder.external_access_token = get("OKTA_ACCESS_TOKEN").map(SecretString::new);
        builder.api_token = get("OKTA_API_TOKEN").map(SecretString::new);
        builder.client_id = get("OKTA_API_CLIENT_ID");
        builder.private_key = get("OKTA_API_PRIVATE_KEY").map(SecretString::new);
        builder.private_key_id = get("OKTA_API_PRIVATE_KEY_ID");
        if let Some(scopes) = get("OKTA_API_SCOPES") {
            builder.scopes = scopes
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        builder.backoff = parse_var(&get, "OKTA_BACKOFF")?;
        builder.min_wait_seconds = parse_var(&get, "OKTA_MIN_WAIT_SECONDS")?;
        builder.max_wait_seconds = parse_var(&get, "OKTA_MAX_WAIT_SECONDS")?;
        builder.max_retries = parse_var(&get, "OKTA_MAX_RETRIES")?;
        builder.parallelism = parse_var(&get, "OKTA_PARALLELISM")?;
        builder.max_api_capacity = parse_var(&get, "OKTA_MAX_API_CAPACITY")?;
        builder.log_level = parse_var(&get, "OKTA_LOG_LEVEL")?;
        builder.request_timeout_seconds = parse_var(&get, "OKTA_REQUEST_TIMEOUT")?;
        builder.classic_org = parse_var(&get, "OKTA_CLASSIC_ORG")?;

        Ok(builder)
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> OktaResult<ProviderConfig> {
        let auth = self.resolve_auth()?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let org_url = match (&self.org_url, &self.org_name) {
            (Some(raw), _) => parse_http_url(raw, "org_url")?,
            (None, Some(org)) if !org.trim().is_empty() => {
                parse_http_url(&format!("https://{}.{}", org.trim(), base_url), "org_name")?
            }
            _ => return Err(OktaError::invalid_config("org_name is required")),
        };

        let http_proxy = self
            .http_proxy
            .as_deref()
            .map(|raw| parse_http_url(raw, "http_proxy"))
            .transpose()?;

        let min_wait = self.min_wait_seconds.unwrap_or(DEFAULT_MIN_WAIT_SECONDS);
        let max_wait = self
            .max_wait_seconds
            .unwrap_or(DEFAULT_MAX_WAIT_SECONDS.max(min_wait));
        if max_wait < min_wait {
            return Err(OktaError::invalid_config(format!(
                "max_wait_seconds ({max_wait}) must be >= min_wait_seconds ({min_wait})"
            )));
        }

        let max_retries = self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
        if max_retries > MAX_RETRIES_LIMIT {
            return Err(OktaError::invalid_config(format!(
                "max_retries must be between 0 and {MAX_RETRIES_LIMIT}, got {max_retries}"
            )));
        }

        let parallelism = self.parallelism.unwrap_or(1);
        if parallelism == 0 {
            return Err(OktaError::invalid_config("parallelism must be >= 1"));
        }

        let max_api_capacity = self.max_api_capacity.unwrap_or(100);
        if !(1..=100).contains(&max_api_capacity) {
            return Err(OktaError::invalid_config(format!(
                "max_api_capacity must be between 1 and 100, got {max_api_capacity}"
            )));
        }

        let log_level = match self.log_level {
            Some(n) => LogLevel::from_number(n).ok_or_else(|| {
                OktaError::invalid_config(format!("log_level must be between 1 and 5, got {n}"))
            })?,
            None => LogLevel::default(),
        };

        let request_timeout = match self.request_timeout_seconds.unwrap_or(0) {
            0 => None,
            secs if secs > MAX_REQUEST_TIMEOUT_SECONDS => {
                return Err(OktaError::invalid_config(format!(
                    "request_timeout must be between 0 and {MAX_REQUEST_TIMEOUT_SECONDS}, got {secs}"
                )))
            }
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(ProviderConfig {
            org_name: self.org_name,
            base_url,
            org_url,
            http_proxy,
            auth,
            retry: RetrySettings {
                backoff: self.backoff.unwrap_or(true),
                min_wait: Duration::from_secs(min_wait),
                max_wait: Duration::from_secs(max_wait),
                max_retries,
            },
            throughput: ThroughputSettings {
                parallelism,
                max_api_capacity,
            },
            request_timeout,
            log_level,
            classic_org: self.classic_org,
        })
    }

    fn resolve_auth(&self) -> OktaResult<AuthMode> {
        let private_key_requested =
            self.client_id.is_some() || self.private_key.is_some() || !self.scopes.is_empty();

        let configured = [
            self.access_token.is_some(),
            self.external_access_token.is_some(),
            self.api_token.is_some(),
            private_key_requested,
        ]
        .into_iter()
        .filter(|set| *set)
        .count();

        match configured {
            0 => {
                return Err(OktaError::invalid_config(
                    "one of access_token, api_token or client_id + private_key + scopes is required",
                ))
            }
            1 => {}
            _ => {
                return Err(OktaError::invalid_config(
                    "access_token, api_token and client_id + private_key + scopes are mutually exclusive",
                ))
            }
        }

        if let Some(token) = &self.access_token {
            return Ok(AuthMode::AccessToken {
                token: non_empty_secret(token, "access_token")?,
            });
        }
        if let Some(token) = &self.external_access_token {
            return Ok(AuthMode::ExternalAccessToken {
                token: non_empty_secret(token, "access_token")?,
            });
        }
        if let Some(token) = &self.api_token {
            return Ok(AuthMode::ApiToken {
                token: non_empty_secret(token, "api_token")?,
            });
        }

        let client_id = self
            .client_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| OktaError::invalid_config("client_id is required with private_key"))?;
        let private_key = self
            .private_key
            .as_ref()
            .ok_or_else(|| OktaError::invalid_config("private_key is required with client_id"))
            .and_then(|key| non_empty_secret(key, "private_key"))?;
        if self.scopes.is_empty() {
            return Err(OktaError::invalid_config(
                "scopes must contain at least one scope with client_id",
            ));
        }
        if self.scopes.iter().any(|s| s.trim().is_empty()) {
            return Err(OktaError::invalid_config("scopes must not contain empty values"));
        }

        Ok(AuthMode::PrivateKey(PrivateKeyAuth {
            client_id,
            private_key,
            private_key_id: self.private_key_id.clone().filter(|k| !k.is_empty()),
            scopes: self.scopes.clone(),
        }))
    }
}

fn non_empty_secret(secret: &SecretString, field: &str) -> OktaResult<SecretString> {
    if secret.expose_secret().trim().is_empty() {
        return Err(OktaError::invalid_config(format!("{field} must not be empty")));
    }
    Ok(secret.clone())
}

fn parse_http_url(raw: &str, field: &str) -> OktaResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| OktaError::invalid_config(format!("{field} is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(OktaError::invalid_config(format!(
            "{field} has unsupported scheme: {other}"
        ))),
    }
}

fn parse_var<T, F>(get: &F, key: &str) -> OktaResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| OktaError::invalid_config(format!("{key}: {e}")))
        })
        .transpose()
}
