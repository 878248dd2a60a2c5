//! App-only OAuth2 authentication for Microsoft Graph.
//!
//! Uses the **client credentials** grant against the Microsoft identity
//! platform v2.0 endpoint:
//! `{login_base_url}/{tenant}/oauth2/v2.0/token` with the
//! `https://graph.microsoft.com/.default` scope.
//!
//! [`TokenProvider`] caches the token and only goes back to the identity
//! platform once the cached one is within a minute of expiry or has been
//! explicitly invalidated (after a 401).

use crate::error::{GraphError, GraphResult};
use crate::types::SharepointConfig;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Scope requesting every application permission granted to the app.
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tokens are treated as expired this long before their real expiry.
const EXPIRY_GRACE_SECS: i64 = 60;

/// A bearer token issued by the identity platform.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub secret: SecretString,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Whether the token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_GRACE_SECS) >= self.expires_at
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Public API
// ═══════════════════════════════════════════════════════════════════════

/// Client-credentials token grant (no user, daemon-style).
pub async fn client_credentials_token(
    http: &reqwest::Client,
    config: &SharepointConfig,
) -> GraphResult<AccessToken> {
    let token_url = config.token_url();

    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.expose_secret().as_str()),
        ("grant_type", "client_credentials"),
        ("scope", GRAPH_DEFAULT_SCOPE),
    ];

    debug!("Requesting app-only token from {}", token_url);
    let resp = http
        .post(&token_url)
        .form(&params)
        .send()
        .await
        .map_err(GraphError::from)?;

    let status = resp.status().as_u16();
    let body = resp.text().await.map_err(GraphError::from)?;

    if status != 200 {
        return Err(GraphError::from_token_response(status, &body));
    }

    parse_token_response(&body)
}

/// Caches the app-only token for one connection.
pub struct TokenProvider {
    http: reqwest::Client,
    config: Arc<SharepointConfig>,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, config: Arc<SharepointConfig>) -> Self {
        Self {
            http,
            config,
            cached: Mutex::new(None),
        }
    }

    /// A valid bearer token, fetching a new one when needed.
    ///
    /// The lock is held across the fetch so concurrent callers share a
    /// single token request.
    pub async fn access_token(&self) -> GraphResult<SecretString> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.secret.clone());
            }
            debug!("Cached token expired at {}", token.expires_at);
        }

        let token = client_credentials_token(&self.http, &self.config).await?;
        info!(
            "Acquired Graph token for tenant {} (expires {})",
            self.config.tenant_id, token.expires_at
        );
        let secret = token.secret.clone();
        *cached = Some(token);
        Ok(secret)
    }

    /// Drop the cached token so the next call fetches a fresh one.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Internal helpers
// ═══════════════════════════════════════════════════════════════════════

pub(crate) fn parse_token_response(body: &str) -> GraphResult<AccessToken> {
    let v: serde_json::Value = serde_json::from_str(body)?;

    let access_token = v["access_token"]
        .as_str()
        .ok_or_else(|| GraphError::auth("No access_token in response"))?
        .to_string();

    let expires_in = v["expires_in"].as_i64().unwrap_or(3600);
    let expires_at = Utc::now() + Duration::seconds(expires_in);

    debug!("Parsed token, expires in {}s", expires_in);

    Ok(AccessToken {
        secret: SecretString::new(access_token),
        token_type: v["token_type"].as_str().unwrap_or("Bearer").to_string(),
        expires_at,
    })
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
