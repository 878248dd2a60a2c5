//! Error types for the SharePoint / Microsoft Graph integration.
//!
//! All public API surfaces in this crate return `GraphResult<T>`. At the
//! adapter boundary a [`GraphError`] is converted into
//! [`graphdrive_fs::FsError`] so the facade only ever sees one error type.

use graphdrive_fs::FsError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Convenience alias.
pub type GraphResult<T> = Result<T, GraphError>;

/// Error codes specific to SharePoint / Graph operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphErrorCode {
    /// OAuth2 / token error (HTTP 401 or token endpoint rejection).
    AuthFailed,
    /// Application lacks the required Graph permissions (HTTP 403).
    InsufficientPermissions,
    /// Rate-limited (HTTP 429).
    RateLimited,
    /// Bad request / invalid parameter.
    InvalidRequest,
    /// Resource (item, drive, list) not found (HTTP 404).
    NotFound,
    /// Name collision (HTTP 409).
    Conflict,
    /// Quota exceeded (HTTP 507).
    QuotaExceeded,
    /// Item is locked by another user / process (HTTP 423).
    ItemLocked,
    /// A resumable upload could not be completed.
    UploadSessionFailed,
    /// Connection settings are missing or malformed.
    InvalidConfig,
    /// Network / connectivity error.
    NetworkError,
    /// (De)serialization error.
    SerializationError,
    /// Transient server-side failure (HTTP 5xx other than 507).
    ServiceUnavailable,
    /// Catch-all internal error.
    InternalError,
}

impl fmt::Display for GraphErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Structured error returned by every public function.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("[{code}] {message}{}", fmt_graph_code(.graph_error_code))]
pub struct GraphError {
    pub code: GraphErrorCode,
    pub message: String,
    pub status: Option<u16>,
    pub graph_error_code: Option<String>,
    pub request_id: Option<String>,
}

fn fmt_graph_code(code: &Option<String>) -> String {
    match code {
        Some(gc) => format!(" (graph: {})", gc),
        None => String::new(),
    }
}

impl GraphError {
    /// Create from a code + message.
    pub fn new(code: GraphErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            status: None,
            graph_error_code: None,
            request_id: None,
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(GraphErrorCode::InvalidConfig, msg)
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(GraphErrorCode::NetworkError, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(GraphErrorCode::InternalError, msg)
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(GraphErrorCode::AuthFailed, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(GraphErrorCode::NotFound, msg)
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::new(GraphErrorCode::UploadSessionFailed, msg)
    }

    /// Build an error from a Graph API error response body.
    pub fn from_graph_response(status: u16, body: &str) -> Self {
        let code = match status {
            401 => GraphErrorCode::AuthFailed,
            403 => GraphErrorCode::InsufficientPermissions,
            404 => GraphErrorCode::NotFound,
            409 => GraphErrorCode::Conflict,
            423 => GraphErrorCode::ItemLocked,
            429 => GraphErrorCode::RateLimited,
            507 => GraphErrorCode::QuotaExceeded,
            _ if status >= 500 => GraphErrorCode::ServiceUnavailable,
            _ => GraphErrorCode::InvalidRequest,
        };

        let (graph_code, inner_msg, request_id) = Self::parse_graph_error_body(body);

        let message = inner_msg.unwrap_or_else(|| format!("Graph API error (HTTP {})", status));

        Self {
            code,
            message,
            status: Some(status),
            graph_error_code: graph_code,
            request_id,
        }
    }

    /// Build an error from a token endpoint rejection:
    /// `{ "error": "invalid_client", "error_description": "..." }`.
    pub fn from_token_response(status: u16, body: &str) -> Self {
        let v: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
        let oauth_code = v["error"].as_str().map(String::from);
        let description = v["error_description"]
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| format!("token request failed (HTTP {})", status));
        let code = if status >= 500 {
            GraphErrorCode::ServiceUnavailable
        } else {
            GraphErrorCode::AuthFailed
        };
        Self {
            code,
            message: description,
            status: Some(status),
            graph_error_code: oauth_code,
            request_id: None,
        }
    }

    /// Try to extract Graph error JSON: `{ "error": { "code": "...", "message": "...", "innerError": { "request-id": "..." } } }`.
    fn parse_graph_error_body(body: &str) -> (Option<String>, Option<String>, Option<String>) {
        let Ok(v) = serde_json::from_str::<serde_json::Value>(body) else {
            return (None, None, None);
        };
        let err = &v["error"];
        let code = err["code"].as_str().map(String::from);
        let msg = err["message"].as_str().map(String::from);
        let req_id = err["innerError"]["request-id"].as_str().map(String::from);
        (code, msg, req_id)
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            GraphErrorCode::RateLimited
                | GraphErrorCode::ServiceUnavailable
                | GraphErrorCode::NetworkError
        )
    }

    pub fn is_not_found(&self) -> bool {
        self.code == GraphErrorCode::NotFound
    }

    /// Convert for the facade, naming the path a 404 refers to.
    pub fn into_fs(self, path: &str) -> FsError {
        match self.code {
            GraphErrorCode::NotFound => FsError::FileNotFound(path.to_string()),
            GraphErrorCode::Conflict => FsError::FileExists(path.to_string()),
            _ => FsError::from(self),
        }
    }
}

impl From<GraphError> for FsError {
    fn from(err: GraphError) -> Self {
        FsError::backend(err)
    }
}

impl From<reqwest::Error> for GraphError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network(format!("Request timed out: {}", err))
        } else if err.is_connect() || err.is_request() {
            Self::network(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            Self::new(
                GraphErrorCode::SerializationError,
                format!("Response decode error: {}", err),
            )
        } else {
            Self::internal(format!("HTTP error: {}", err))
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(
            GraphErrorCode::SerializationError,
            format!("JSON error: {}", err),
        )
    }
}

impl From<url::ParseError> for GraphError {
    fn from(err: url::ParseError) -> Self {
        Self::new(
            GraphErrorCode::InvalidRequest,
            format!("URL parse error: {}", err),
        )
    }
}

impl From<std::io::Error> for GraphError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(format!("I/O error: {}", err))
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
