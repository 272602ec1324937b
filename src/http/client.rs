use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{header, Method, Response};
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::observability::api_metrics;
use crate::workspace::ApiError;

pub const JSON_API: &str = "application/vnd.api+json";
pub const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct RateLimits {
    pub requests_per_second: u32,
    pub burst: u32,
    pub request_timeout: Duration,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            requests_per_second: 5,
            burst: 10,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Rate-limited HTTP transport carrying the workspace service credential
pub struct RateLimitedHttpClient {
    client: reqwest::Client,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    token: String,
}

impl std::fmt::Debug for RateLimitedHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedHttpClient")
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl RateLimitedHttpClient {
    pub fn new(token: &str, limits: &RateLimits) -> Result<Self, ApiError> {
        let per_second = NonZeroU32::new(limits.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(limits.burst).unwrap_or(per_second);
        let quota = Quota::per_second(per_second).allow_burst(burst);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        let client = reqwest::Client::builder()
            .timeout(limits.request_timeout)
            .user_agent(concat!("workspace-autopilot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ApiError::Transport {
                endpoint: "client builder".to_string(),
                source,
            })?;

        Ok(Self {
            client,
            rate_limiter,
            token: token.to_string(),
        })
    }

    /// Send an authenticated JSON:API request. Non-success statuses are
    /// returned as `ApiError::Status` with the body preserved.
    pub async fn send_json_api<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .bearer_auth(&self.token)
            .header(header::CONTENT_TYPE, JSON_API)
            .header(header::ACCEPT, JSON_API);

        if let Some(body) = body {
            let payload = serde_json::to_vec(body).map_err(|e| ApiError::Decode {
                endpoint: url.to_string(),
                message: format!("failed to encode request body: {e}"),
            })?;
            request = request.body(payload);
        }

        self.dispatch(method, url, request).await
    }

    /// Upload raw bytes to a service-provided target. The target URL is
    /// pre-authorized, so the bearer credential is not attached.
    pub async fn put_bytes(&self, url: &str, bytes: Vec<u8>) -> Result<Response, ApiError> {
        let request = self
            .client
            .put(url)
            .header(header::CONTENT_TYPE, OCTET_STREAM)
            .body(bytes);

        self.dispatch(Method::PUT, url, request).await
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, ApiError> {
        self.rate_limiter.until_ready().await;
        api_metrics().record_request();
        debug!(method = %method, url = url, "Sending workspace service request");

        let response = request.send().await.map_err(|source| {
            api_metrics().record_error();
            ApiError::Transport {
                endpoint: url.to_string(),
                source,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            api_metrics().record_error();
            let body = response.text().await.unwrap_or_default();
            debug!(method = %method, url = url, status = status.as_u16(), "Request rejected");
            return Err(ApiError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}
