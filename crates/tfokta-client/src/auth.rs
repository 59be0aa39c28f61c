//! Request signing for the four authentication modes.
//!
//! Static tokens are attached as-is. The private-key mode exchanges a signed
//! client assertion for a bearer token, caches it with its expiry, and
//! refreshes it through a single-flight gate so that concurrent callers never
//! trigger more than one token request.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument, warn};

use tfokta_core::config::{AuthMode, PrivateKeyAuth};
use tfokta_core::{error_for_status, CallContext, OktaError, OktaResult, ProviderConfig, RetryClass};

use crate::assertion::{AssertionKey, CLIENT_ASSERTION_TYPE};
use crate::http::transport_error;
use crate::rate_limit::wait_from_headers;
use crate::retry::RetryPolicy;

/// Tokens are refreshed this long before they expire.
pub const REFRESH_SKEW_SECS: i64 = 30;

/// `Authorization` scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    Ssws,
}

impl AuthScheme {
    fn as_str(self) -> &'static str {
        match self {
            AuthScheme::Bearer => "Bearer",
            AuthScheme::Ssws => "SSWS",
        }
    }
}

/// Credential attached to one request.
#[derive(Clone)]
pub struct Credential {
    scheme: AuthScheme,
    token: SecretString,
}

impl Credential {
    pub fn new(scheme: AuthScheme, token: SecretString) -> Self {
        Self { scheme, token }
    }

    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    /// Value of the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("{} {}", self.scheme.as_str(), self.token.expose_secret())
    }

    fn same_token(&self, other: &str) -> bool {
        self.token.expose_secret() == other
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("scheme", &self.scheme)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Produces the credential for each outbound request.
#[async_trait]
pub trait Signer: Send + Sync + fmt::Debug {
    /// Authentication mode name, for diagnostics.
    fn mode(&self) -> &'static str;

    /// Credential for the next request.
    async fn credential(&self, ctx: &CallContext) -> OktaResult<Credential>;

    /// A request signed with `rejected` came back 401.
    ///
    /// Returns `true` when a different credential is now available and the
    /// request is worth replaying once.
    async fn on_unauthorized(&self, _ctx: &CallContext, _rejected: &Credential) -> OktaResult<bool> {
        Ok(false)
    }
}

/// Signer for access tokens and API tokens.
pub struct StaticSigner {
    mode: &'static str,
    credential: Credential,
}

impl StaticSigner {
    pub fn bearer(token: SecretString) -> Self {
        Self {
            mode: "access_token",
            credential: Credential::new(AuthScheme::Bearer, token),
        }
    }

    pub fn external_bearer(token: SecretString) -> Self {
        Self {
            mode: "external_access_token",
            credential: Credential::new(AuthScheme::Bearer, token),
        }
    }

    pub fn ssws(token: SecretString) -> Self {
        Self {
            mode: "api_token",
            credential: Credential::new(AuthScheme::Ssws, token),
        }
    }
}

impl fmt::Debug for StaticSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticSigner")
            .field("mode", &self.mode)
            .field("credential", &self.credential)
            .finish()
    }
}

#[async_trait]
impl Signer for StaticSigner {
    fn mode(&self) -> &'static str {
        self.mode
    }

    async fn credential(&self, ctx: &CallContext) -> OktaResult<Credential> {
        ctx.check()?;
        Ok(self.credential.clone())
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    #[allow(dead_code)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Cached bearer token, expiry kept apart from the value.
#[derive(Clone)]
struct CachedToken {
    access_token: SecretString,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Returns true if the token is expired or will expire within the skew.
    fn is_expired(&self, skew: Duration) -> bool {
        Utc::now() + skew >= self.expires_at
    }
}

/// Signer for the private-key client-credentials flow.
pub struct PrivateKeySigner {
    client_id: String,
    scopes: Vec<String>,
    token_endpoint: String,
    key: AssertionKey,
    http_client: reqwest::Client,
    retry: RetryPolicy,
    cached_token: RwLock<Option<CachedToken>>,
    refresh_gate: Mutex<()>,
    skew: Duration,
}

impl fmt::Debug for PrivateKeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeySigner")
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("token_endpoint", &self.token_endpoint)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl PrivateKeySigner {
    pub fn new(
        auth: &PrivateKeyAuth,
        token_endpoint: String,
        http_client: reqwest::Client,
        retry: RetryPolicy,
    ) -> OktaResult<Self> {
        let key = AssertionKey::load(&auth.private_key, auth.private_key_id.clone())?;
        Ok(Self {
            client_id: auth.client_id.clone(),
            scopes: auth.scopes.clone(),
            token_endpoint,
            key,
            http_client,
            retry,
            cached_token: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            skew: Duration::seconds(REFRESH_SKEW_SECS),
        })
    }

    async fn cached(&self) -> Option<CachedToken> {
        let cache = self.cached_token.read().await;
        cache
            .as_ref()
            .filter(|token| !token.is_expired(self.skew))
            .cloned()
    }

    fn bearer(token: &CachedToken) -> Credential {
        Credential::new(AuthScheme::Bearer, token.access_token.clone())
    }

    /// Fetch a new token and store it. Caller must hold the refresh gate.
    async fn refresh(&self, ctx: &CallContext) -> OktaResult<CachedToken> {
        let token = self
            .retry
            .execute(ctx, "token_request", RetryClass::Idempotent, move || {
                self.request_token(ctx)
            })
            .await
            .map_err(|e| {
                if matches!(
                    e,
                    OktaError::Cancelled | OktaError::Timeout { .. } | OktaError::AuthFailure { .. }
                ) {
                    return e;
                }
                OktaError::AuthFailure {
                    status: e.status(),
                    message: format!("token refresh failed: {e}"),
                }
            })?;

        *self.cached_token.write().await = Some(token.clone());
        Ok(token)
    }

    #[instrument(skip(self, ctx), fields(client_id = %self.client_id))]
    async fn request_token(&self, ctx: &CallContext) -> OktaResult<CachedToken> {
        let assertion = self.key.sign(&self.client_id, &self.token_endpoint)?;
        let scope = self.scopes.join(" ");
        let form = [
            ("grant_type", "client_credentials"),
            ("scope", scope.as_str()),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", assertion.as_str()),
        ];

        debug!("Requesting access token");
        let (status, headers, body) = ctx
            .run(async {
                let response = self
                    .http_client
                    .post(&self.token_endpoint)
                    .header(ACCEPT, "application/json")
                    .form(&form)
                    .send()
                    .await
                    .map_err(transport_error)?;
                let status = response.status().as_u16();
                let headers = response.headers().clone();
                let body = response.text().await.map_err(transport_error)?;
                Ok((status, headers, body))
            })
            .await?;

        if !(200..300).contains(&status) {
            let error = error_for_status(status, &body, wait_from_headers(&headers));
            if error.is_transient() {
                return Err(error);
            }
            warn!(status, "Token request rejected");
            return Err(OktaError::AuthFailure {
                message: format!("token request failed: {error}"),
                status: Some(status),
            });
        }

        let response: TokenResponse = serde_json::from_str(&body).map_err(|e| OktaError::AuthFailure {
            message: format!("failed to parse token response: {e}"),
            status: Some(status),
        })?;
        let expires_at = Utc::now() + Duration::seconds(response.expires_in.unwrap_or(3600));

        debug!(
            "Acquired new token, expires at {}",
            expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        Ok(CachedToken {
            access_token: SecretString::new(response.access_token),
            expires_at,
        })
    }
}

#[async_trait]
impl Signer for PrivateKeySigner {
    fn mode(&self) -> &'static str {
        "private_key"
    }

    async fn credential(&self, ctx: &CallContext) -> OktaResult<Credential> {
        if let Some(token) = self.cached().await {
            return Ok(Self::bearer(&token));
        }

        let _gate = ctx.run(async { Ok(self.refresh_gate.lock().await) }).await?;
        // another caller may have refreshed while we waited
        if let Some(token) = self.cached().await {
            return Ok(Self::bearer(&token));
        }

        let token = self.refresh(ctx).await?;
        Ok(Self::bearer(&token))
    }

    async fn on_unauthorized(&self, ctx: &CallContext, rejected: &Credential) -> OktaResult<bool> {
        let _gate = ctx.run(async { Ok(self.refresh_gate.lock().await) }).await?;
        {
            let cache = self.cached_token.read().await;
            if let Some(current) = cache.as_ref() {
                if !rejected.same_token(current.access_token.expose_secret()) {
                    debug!("Token already refreshed by another caller");
                    return Ok(true);
                }
            }
        }

        debug!("Access token rejected, forcing refresh");
        *self.cached_token.write().await = None;
        self.refresh(ctx).await?;
        Ok(true)
    }
}

/// Resolve the configured authentication mode into a signer.
pub fn signer_from_config(
    config: &ProviderConfig,
    http_client: reqwest::Client,
) -> OktaResult<Arc<dyn Signer>> {
    let signer: Arc<dyn Signer> = match config.auth() {
        AuthMode::AccessToken { token } => Arc::new(StaticSigner::bearer(token.clone())),
        AuthMode::ExternalAccessToken { token } => {
            Arc::new(StaticSigner::external_bearer(token.clone()))
        }
        AuthMode::ApiToken { token } => Arc::new(StaticSigner::ssws(token.clone())),
        AuthMode::PrivateKey(auth) => Arc::new(PrivateKeySigner::new(
            auth,
            config.token_endpoint(),
            http_client,
            RetryPolicy::new(config.retry()),
        )?),
    };
    Ok(signer)
}
