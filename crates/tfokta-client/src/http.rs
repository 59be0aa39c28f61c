//! Okta management API client with retries, rate limiting and pagination.

use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, instrument, trace, warn};
use url::Url;

use tfokta_core::{
    error_for_status, CallContext, OktaError, OktaResult, ProviderConfig, RetryClass,
};

use crate::auth::{signer_from_config, Signer};
use crate::pagination::{cursor_from_url, next_link, preserve_query, Page};
use crate::rate_limit::{wait_from_headers, RateLimitBudget, RateLimitFamily, RateLimiter};
use crate::retry::RetryPolicy;

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("tfokta/", env!("CARGO_PKG_VERSION"));

/// One API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path under the org URL, or a full URL on the org host.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub retry_class: RetryClass,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retry_class: RetryClass::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> OktaResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    #[must_use]
    pub fn body_value(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn retry_class(mut self, class: RetryClass) -> Self {
        self.retry_class = class;
        self
    }

    pub fn is_mutating(&self) -> bool {
        !matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Status, headers and pagination links of a response.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub headers: HeaderMap,
    pub next_url: Option<String>,
    pub next_cursor: Option<String>,
}

/// Decoded response body with its envelope.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub body: T,
    pub envelope: ResponseEnvelope,
}

/// Map a reqwest failure onto the error taxonomy.
pub(crate) fn transport_error(err: reqwest::Error) -> OktaError {
    if err.is_decode() {
        return OktaError::serialization(format!("failed to decode response: {err}"));
    }
    if err.is_builder() {
        return OktaError::fatal_with_source("invalid request", err);
    }
    let message = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    OktaError::io_with_source(message, err)
}

/// Build the reqwest client shared by API and token endpoint traffic.
pub fn build_http_client(config: &ProviderConfig) -> OktaResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }
    if let Some(proxy) = config.http_proxy() {
        let proxy = reqwest::Proxy::all(proxy.as_str())
            .map_err(|e| OktaError::invalid_config(format!("invalid http_proxy: {e}")))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| OktaError::invalid_config(format!("failed to create HTTP client: {e}")))
}

/// Okta management API client.
#[derive(Debug, Clone)]
pub struct OktaClient {
    http_client: reqwest::Client,
    config: Arc<ProviderConfig>,
    signer: Arc<dyn Signer>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl OktaClient {
    /// Create a client, resolving the signer from the configured auth mode.
    pub fn new(config: ProviderConfig) -> OktaResult<Self> {
        let http_client = build_http_client(&config)?;
        let signer = signer_from_config(&config, http_client.clone())?;
        Ok(Self::from_parts(config, http_client, signer))
    }

    /// Create a client with an explicit signer.
    pub fn with_signer(config: ProviderConfig, signer: Arc<dyn Signer>) -> OktaResult<Self> {
        let http_client = build_http_client(&config)?;
        Ok(Self::from_parts(config, http_client, signer))
    }

    fn from_parts(
        config: ProviderConfig,
        http_client: reqwest::Client,
        signer: Arc<dyn Signer>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.throughput().capacity_fraction()));
        let retry = RetryPolicy::new(config.retry());
        Self {
            http_client,
            config: Arc::new(config),
            signer,
            limiter,
            retry,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn signer(&self) -> &Arc<dyn Signer> {
        &self.signer
    }

    /// Current rate-limit budgets, for diagnostics.
    pub fn rate_limit_snapshot(&self) -> Vec<(RateLimitFamily, RateLimitBudget)> {
        self.limiter.snapshot()
    }

    /// Performs a GET request.
    pub async fn get<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        path: &str,
    ) -> OktaResult<T> {
        Ok(self.execute(ctx, &ApiRequest::get(path)).await?.body)
    }

    /// Performs a POST request.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        ctx: &CallContext,
        path: &str,
        body: &B,
    ) -> OktaResult<T> {
        let request = ApiRequest::post(path).json(body)?;
        Ok(self.execute(ctx, &request).await?.body)
    }

    /// Performs a PUT request.
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        ctx: &CallContext,
        path: &str,
        body: &B,
    ) -> OktaResult<T> {
        let request = ApiRequest::put(path).json(body)?;
        Ok(self.execute(ctx, &request).await?.body)
    }

    /// Performs a DELETE request.
    pub async fn delete(&self, ctx: &CallContext, path: &str) -> OktaResult<()> {
        self.execute_empty(ctx, &ApiRequest::delete(path)).await?;
        Ok(())
    }

    /// Execute a request and decode the body.
    ///
    /// Empty bodies decode as JSON `null`, so `()`, `Option<_>` and
    /// `serde_json::Value` accept 204 responses.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        request: &ApiRequest,
    ) -> OktaResult<ApiResponse<T>> {
        let (envelope, body) = self.send(ctx, request).await?;
        let text = if body.trim().is_empty() { "null" } else { body.as_str() };
        let body = serde_json::from_str(text).map_err(|e| {
            OktaError::serialization(format!("unexpected response to {request}: {e}"))
        })?;
        Ok(ApiResponse { body, envelope })
    }

    /// Execute a request whose body is not needed.
    pub async fn execute_empty(
        &self,
        ctx: &CallContext,
        request: &ApiRequest,
    ) -> OktaResult<ResponseEnvelope> {
        Ok(self.send(ctx, request).await?.0)
    }

    /// Fetch one page of a list endpoint.
    pub async fn list_page<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        request: &ApiRequest,
    ) -> OktaResult<Page<T>> {
        let response = self.execute::<Option<Vec<T>>>(ctx, request).await?;
        Ok(Page {
            items: response.body.unwrap_or_default(),
            next: response.envelope.next_cursor,
            next_url: response.envelope.next_url,
        })
    }

    /// Collect every page of a list endpoint.
    ///
    /// Stops early once `short_circuit` returns true for the items gathered
    /// so far. The first error aborts the collection.
    #[instrument(skip(self, ctx, request, short_circuit), fields(path = %request.path))]
    pub async fn collect_all<T, P>(
        &self,
        ctx: &CallContext,
        request: &ApiRequest,
        mut short_circuit: P,
    ) -> OktaResult<Vec<T>>
    where
        T: DeserializeOwned,
        P: FnMut(&[T]) -> bool,
    {
        let mut items = Vec::new();
        let mut current = request.clone();
        let mut pages = 0u32;

        loop {
            let page = self.list_page::<T>(ctx, &current).await?;
            pages += 1;
            items.extend(page.items);

            if short_circuit(&items) {
                debug!(pages, items = items.len(), "Collection short-circuited");
                return Ok(items);
            }

            match page.next_url {
                Some(next_url) => {
                    let mut next = ApiRequest::get(preserve_query(&next_url, &request.query));
                    next.retry_class = request.retry_class;
                    current = next;
                }
                None => {
                    debug!(pages, items = items.len(), "Collection complete");
                    return Ok(items);
                }
            }
        }
    }

    fn resolve_url(&self, request: &ApiRequest) -> OktaResult<Url> {
        let mut url = if request.path.starts_with("http://") || request.path.starts_with("https://")
        {
            let url = Url::parse(&request.path).map_err(|e| {
                OktaError::invalid_input(format!("invalid URL {}: {e}", request.path))
            })?;
            let org = self.config.org_url();
            if url.host_str() != org.host_str() || url.port_or_known_default() != org.port_or_known_default() {
                return Err(OktaError::invalid_input(format!(
                    "refusing to send credentials to foreign host {}",
                    url.host_str().unwrap_or_default()
                )));
            }
            url
        } else {
            Url::parse(&self.config.endpoint(&request.path)).map_err(|e| {
                OktaError::invalid_input(format!("invalid path {}: {e}", request.path))
            })?
        };

        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Retry loop shared by every call.
    #[instrument(skip(self, ctx, request), fields(method = %request.method, path = %request.path))]
    async fn send(
        &self,
        ctx: &CallContext,
        request: &ApiRequest,
    ) -> OktaResult<(ResponseEnvelope, String)> {
        let url = self.resolve_url(request)?;
        let family = RateLimitFamily::classify(url.as_str());
        let class = request.retry_class;
        let mut attempt: u32 = 0;
        let mut replayed_after_refresh = false;

        loop {
            ctx.check()?;
            let guard = self.limiter.acquire(ctx, family).await?;
            let credential = self.signer.credential(ctx).await?;

            let mut builder = self
                .http_client
                .request(request.method.clone(), url.clone())
                .header(AUTHORIZATION, credential.header_value())
                .header(ACCEPT, "application/json");
            if let Some(body) = &request.body {
                trace!(body = %body, "Request body");
                builder = builder.json(body);
            }

            debug!(attempt, family = %family, "Sending request");
            let sent = ctx
                .run(async {
                    let response = builder.send().await.map_err(transport_error)?;
                    let status = response.status().as_u16();
                    let headers = response.headers().clone();
                    let body = response.text().await.map_err(transport_error)?;
                    Ok((status, headers, body))
                })
                .await;

            let (status, headers, body) = match sent {
                Ok(parts) => parts,
                Err(error) => {
                    drop(guard);
                    if !RetryPolicy::is_retryable(class, &error) {
                        return Err(error);
                    }
                    if attempt >= self.retry.max_retries() {
                        return Err(self.retry.exhausted(attempt, error));
                    }
                    let delay = self.retry.delay_for(attempt, &error);
                    warn!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, error = %error, "Transport error, retrying");
                    ctx.sleep(delay).await?;
                    attempt += 1;
                    continue;
                }
            };

            self.limiter.observe(family, &headers);
            drop(guard);
            debug!(status, "Received response");
            trace!(body = %body, "Response body");

            if (200..300).contains(&status) {
                let next_url = next_link(headers.get_all("link").iter().filter_map(|v| v.to_str().ok()));
                let next_cursor = next_url.as_deref().and_then(cursor_from_url);
                return Ok((
                    ResponseEnvelope {
                        status,
                        headers,
                        next_url,
                        next_cursor,
                    },
                    body,
                ));
            }

            let demanded = if status == 429 { wait_from_headers(&headers) } else { None };
            let error = error_for_status(status, &body, demanded);

            if status == 401 {
                if !replayed_after_refresh && self.signer.on_unauthorized(ctx, &credential).await? {
                    replayed_after_refresh = true;
                    debug!("Replaying request with refreshed credential");
                    continue;
                }
                return Err(error);
            }

            let delay = self.retry.delay_for(attempt, &error);
            if status == 429 {
                // hold the whole family back, not just this caller
                self.limiter.mark_exhausted(family, Instant::now() + delay);
            }

            if !RetryPolicy::is_retryable(class, &error) {
                return Err(error);
            }
            if attempt >= self.retry.max_retries() {
                warn!(status, attempts = attempt + 1, "Max retries exceeded");
                return Err(self.retry.exhausted(attempt, error));
            }

            warn!(
                status,
                attempt = attempt + 1,
                max_retries = self.retry.max_retries(),
                delay_ms = delay.as_millis() as u64,
                "Transient error, retrying"
            );
            ctx.sleep(delay).await?;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OktaClient {
        let config = ProviderConfig::builder()
            .org_name("acme")
            .api_token("00abc")
            .build()
            .unwrap();
        OktaClient::new(config).unwrap()
    }

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::get("/api/v1/policies")
            .query("type", "ACCESS_POLICY")
            .retry_class(RetryClass::None);
        assert_eq!(request.query.len(), 1);
        assert_eq!(request.retry_class, RetryClass::None);
        assert!(!request.is_mutating());
        assert!(ApiRequest::delete("/api/v1/apps/x").is_mutating());
        assert_eq!(request.to_string(), "GET /api/v1/policies");
    }

    #[test]
    fn test_json_body() {
        let request = ApiRequest::post("/api/v1/apps")
            .json(&serde_json::json!({"label": "Docs"}))
            .unwrap();
        assert_eq!(request.body.unwrap()["label"], "Docs");
    }

    #[test]
    fn test_resolve_url() {
        let client = client();
        let url = client
            .resolve_url(&ApiRequest::get("/api/v1/users").query("limit", "200"))
            .unwrap();
        assert_eq!(url.as_str(), "https://acme.okta.com/api/v1/users?limit=200");

        let next = client
            .resolve_url(&ApiRequest::get("https://acme.okta.com/api/v1/users?after=00u1"))
            .unwrap();
        assert_eq!(next.query(), Some("after=00u1"));

        let err = client
            .resolve_url(&ApiRequest::get("https://evil.example.com/api/v1/users"))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_user_agent() {
        assert!(USER_AGENT.starts_with("tfokta/"));
    }
}
