//! HTTP client for the Microsoft Graph API.
//!
//! Wraps `reqwest::Client` with automatic Bearer-token injection from a
//! [`TokenProvider`], a `client-request-id` per attempt, retry logic with
//! exponential back-off for 429 / 5xx / network failures (honouring
//! `Retry-After`), a single token refresh on 401, and transparent JSON
//! envelope parsing.

use crate::auth::TokenProvider;
use crate::error::{GraphError, GraphResult};
use crate::types::{PaginatedResponse, SharepointConfig};
use bytes::Bytes;
use futures_util::TryStreamExt;
use graphdrive_fs::ReadStream;
use log::{debug, warn};
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE, LOCATION, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::StreamReader;
use uuid::Uuid;

/// Base delay for the exponential back-off.
const RETRY_BASE_DELAY_MS: u64 = 500;
const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Result of a single upload-session `PUT`.
#[derive(Debug, Clone)]
pub enum UploadRangeResponse {
    /// 202: the session wants more bytes.
    Accepted(serde_json::Value),
    /// 200 / 201: the final DriveItem.
    Completed(serde_json::Value),
}

/// Low-level Graph API HTTP client.
pub struct GraphApiClient {
    inner: reqwest::Client,
    base_url: String,
    tokens: TokenProvider,
    max_retries: u32,
}

impl GraphApiClient {
    /// Create a new Graph client for one site connection.
    pub fn new(config: Arc<SharepointConfig>) -> GraphResult<Self> {
        let inner = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .user_agent(concat!("graphdrive/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GraphError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            tokens: TokenProvider::new(inner.clone(), config.clone()),
            base_url: config.graph_base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            inner,
        })
    }

    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    /// Full URL for a Graph endpoint path. Absolute URLs (next links,
    /// monitor and upload URLs) pass through untouched.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("https://") || path.starts_with("http://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    // ─── JSON verbs ──────────────────────────────────────────────────

    /// GET with optional query parameters.
    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> GraphResult<serde_json::Value> {
        let url = self.url(path);
        let resp = self.send(true, || self.inner.get(&url).query(query)).await?;
        Self::json_body(resp).await
    }

    /// GET and deserialize into `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> GraphResult<T> {
        let v = self.get(path, &[]).await?;
        Ok(serde_json::from_value(v)?)
    }

    /// GET where a 404 is an answer rather than an error.
    pub async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> GraphResult<Option<T>> {
        match self.get_json(path).await {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// GET every page of a collection, following `@odata.nextLink`.
    pub async fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> GraphResult<Vec<T>> {
        let first = self.get(path, query).await?;
        let mut page: PaginatedResponse<T> = serde_json::from_value(first)?;
        let mut items = std::mem::take(&mut page.value);
        while let Some(next) = page.next_link.take() {
            debug!("Following nextLink ({} items so far)", items.len());
            let v = self.get(&next, &[]).await?;
            page = serde_json::from_value(v)?;
            items.append(&mut page.value);
        }
        Ok(items)
    }

    /// POST JSON body.
    pub async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> GraphResult<serde_json::Value> {
        let url = self.url(path);
        let resp = self.send(true, || self.inner.post(&url).json(body)).await?;
        Self::json_body(resp).await
    }

    /// POST for long-running actions that answer `202 Accepted` with a
    /// monitor URL in `Location`.
    pub async fn post_accepted(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> GraphResult<Option<String>> {
        let url = self.url(path);
        let resp = self.send(true, || self.inner.post(&url).json(body)).await?;
        Ok(resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from))
    }

    /// PATCH JSON body.
    pub async fn patch(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> GraphResult<serde_json::Value> {
        let url = self.url(path);
        let resp = self.send(true, || self.inner.patch(&url).json(body)).await?;
        Self::json_body(resp).await
    }

    /// DELETE a resource.
    pub async fn delete(&self, path: &str) -> GraphResult<()> {
        let url = self.url(path);
        debug!("DELETE {}", url);
        self.send(true, || self.inner.delete(&url)).await?;
        Ok(())
    }

    // ─── Content ─────────────────────────────────────────────────────

    /// GET raw bytes (for downloads). Redirects to the pre-authenticated
    /// download URL are followed by reqwest.
    pub async fn get_bytes(&self, path: &str) -> GraphResult<Bytes> {
        let url = self.url(path);
        debug!("GET (bytes) {}", url);
        let resp = self.send(true, || self.inner.get(&url)).await?;
        resp.bytes().await.map_err(GraphError::from)
    }

    /// GET as an `AsyncRead`, without buffering the body.
    pub async fn get_stream(&self, path: &str) -> GraphResult<ReadStream> {
        let url = self.url(path);
        debug!("GET (stream) {}", url);
        let resp = self.send(true, || self.inner.get(&url)).await?;
        let stream = resp
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        Ok(Box::pin(StreamReader::new(stream)))
    }

    /// PUT raw bytes (for small file uploads).
    pub async fn put_bytes(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> GraphResult<serde_json::Value> {
        let url = self.url(path);
        debug!("PUT (bytes) {} ({} bytes)", url, data.len());
        let resp = self
            .send(true, || {
                self.inner
                    .put(&url)
                    .header(CONTENT_TYPE, content_type)
                    .body(data.clone())
            })
            .await?;
        Self::json_body(resp).await
    }

    /// PUT a byte range for resumable upload (no auth on upload URL).
    pub async fn put_upload_range(
        &self,
        upload_url: &str,
        data: Bytes,
        range_start: u64,
        range_end: u64,
        total_size: u64,
    ) -> GraphResult<UploadRangeResponse> {
        let content_range = format!("bytes {}-{}/{}", range_start, range_end, total_size);
        debug!("PUT upload range: {}", content_range);

        let resp = self
            .send(false, || {
                self.inner
                    .put(upload_url)
                    .header(CONTENT_RANGE, &content_range)
                    .header(CONTENT_TYPE, "application/octet-stream")
                    .body(data.clone())
            })
            .await?;

        let status = resp.status();
        let body = Self::json_body(resp).await?;
        if status == StatusCode::ACCEPTED {
            Ok(UploadRangeResponse::Accepted(body))
        } else {
            Ok(UploadRangeResponse::Completed(body))
        }
    }

    /// GET a pre-authenticated URL (copy monitors).
    pub async fn get_unauthenticated(&self, url: &str) -> GraphResult<serde_json::Value> {
        let resp = self.send(false, || self.inner.get(url)).await?;
        Self::json_body(resp).await
    }

    /// DELETE a pre-authenticated URL (cancelling upload sessions).
    pub async fn delete_unauthenticated(&self, url: &str) -> GraphResult<()> {
        self.send(false, || self.inner.delete(url)).await?;
        Ok(())
    }

    // ─── Internal ────────────────────────────────────────────────────

    /// Send with retries; only successful (< 400) responses are returned.
    async fn send(
        &self,
        authenticated: bool,
        build: impl Fn() -> RequestBuilder,
    ) -> GraphResult<Response> {
        let mut attempt: u32 = 0;
        let mut refreshed = false;
        let mut retry_after: Option<Duration> = None;
        let mut delay: Option<Duration> = None;

        loop {
            if let Some(delay) = delay.take() {
                tokio::time::sleep(delay).await;
            }

            let request_id = Uuid::new_v4().to_string();
            let mut req = build().header("client-request-id", &request_id);
            if authenticated {
                let token = self.tokens.access_token().await?;
                req = req.bearer_auth(token.expose_secret());
            }

            let err = match req.send().await {
                Ok(resp) if resp.status().as_u16() < 400 => {
                    debug!(
                        "Response status={} client-request-id={}",
                        resp.status(),
                        request_id
                    );
                    return Ok(resp);
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    retry_after = Self::parse_retry_after(&resp);
                    let body = resp.text().await.unwrap_or_default();
                    let err = GraphError::from_graph_response(status, &body);
                    debug!(
                        "Graph error status={} client-request-id={}: {}",
                        status, request_id, err
                    );

                    // The token refresh does not count against `max_retries`.
                    if status == 401 && authenticated && !refreshed {
                        warn!("Graph rejected the access token, refreshing once");
                        self.tokens.invalidate().await;
                        refreshed = true;
                        continue;
                    }
                    err
                }
                Err(e) => {
                    retry_after = None;
                    GraphError::from(e)
                }
            };

            if err.is_retryable() && attempt < self.max_retries {
                attempt += 1;
                let wait = retry_after.take().unwrap_or_else(|| Self::backoff(attempt));
                warn!("Retry {}/{} after {:?}", attempt, self.max_retries, wait);
                delay = Some(wait);
                continue;
            }
            return Err(err);
        }
    }

    fn backoff(attempt: u32) -> Duration {
        let factor = 2u64
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        Duration::from_millis(
            RETRY_BASE_DELAY_MS
                .saturating_mul(factor)
                .min(MAX_RETRY_DELAY_MS),
        )
    }

    /// `Retry-After` in delta-seconds form.
    fn parse_retry_after(resp: &Response) -> Option<Duration> {
        resp.headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    async fn json_body(resp: Response) -> GraphResult<serde_json::Value> {
        let body = resp.text().await.map_err(GraphError::from)?;
        // 204 No Content: return null.
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body).map_err(GraphError::from)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
