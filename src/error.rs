//! Error taxonomy for every fallible operation in the crate.

use serde_json::{Map, Value};
use std::fmt;

pub type Result<T, E = TrafficError> = std::result::Result<T, E>;

/// Context carried by every error produced from an HTTP status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiError {
    pub message: String,
    pub status: Option<u16>,
    pub url: Option<String>,
    pub response_text: Option<String>,
    pub response_json: Option<Map<String, Value>>,
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(status) = self.status {
            parts.push(format!("status={}", status));
        }
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            parts.push(format!("url={}", url));
        }
        if let Some(rid) = self.request_id.as_deref() {
            parts.push(format!("request_id={}", rid));
        }

        if parts.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{} ({})", self.message, parts.join(", "))
        }
    }
}

/// Discriminant of [`TrafficError`] for callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Validation,
    Connection,
    Authentication,
    NotFound,
    RateLimit,
    Client,
    Server,
    InvalidPayload,
    UnexpectedPayload,
}

#[derive(Debug, thiserror::Error)]
pub enum TrafficError {
    /// Credentials missing for the active authentication mode, or a bad setting.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller-supplied input rejected before any request was sent.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Timeout, DNS or connection failure. Retried per policy before surfacing.
    #[error("Connection error: {message} (url={url}{})", fmt_request_id(.request_id))]
    Connection {
        message: String,
        url: String,
        timeout: bool,
        request_id: Option<String>,
    },

    /// HTTP 401/403 from a resource or the token endpoint.
    #[error("Authentication failed: {0}")]
    Authentication(ApiError),

    /// HTTP 404.
    #[error("Not found: {0}")]
    NotFound(ApiError),

    /// HTTP 429 after the retry budget ran out.
    #[error("Rate limit exceeded: {0}")]
    RateLimit(ApiError),

    /// Any other 4xx (and unexpected non-success statuses).
    #[error("Request error: {0}")]
    Client(ApiError),

    /// HTTP 5xx after the retry budget ran out.
    #[error("Server error: {0}")]
    Server(ApiError),

    /// The body of a successful response was not valid JSON.
    #[error("Invalid JSON response: {message} (url={url}{})", fmt_request_id(.request_id))]
    InvalidPayload {
        message: String,
        url: String,
        request_id: Option<String>,
    },

    /// The body was valid JSON but not an object at the top level.
    #[error("Unexpected JSON payload type: expected object, got {found} (url={url}{})", fmt_request_id(.request_id))]
    UnexpectedPayload {
        found: &'static str,
        url: String,
        request_id: Option<String>,
    },
}

fn fmt_request_id(request_id: &Option<String>) -> String {
    match request_id {
        Some(rid) => format!(", request_id={}", rid),
        None => String::new(),
    }
}

impl TrafficError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrafficError::Configuration(_) => ErrorKind::Configuration,
            TrafficError::Validation(_) => ErrorKind::Validation,
            TrafficError::Connection { .. } => ErrorKind::Connection,
            TrafficError::Authentication(_) => ErrorKind::Authentication,
            TrafficError::NotFound(_) => ErrorKind::NotFound,
            TrafficError::RateLimit(_) => ErrorKind::RateLimit,
            TrafficError::Client(_) => ErrorKind::Client,
            TrafficError::Server(_) => ErrorKind::Server,
            TrafficError::InvalidPayload { .. } => ErrorKind::InvalidPayload,
            TrafficError::UnexpectedPayload { .. } => ErrorKind::UnexpectedPayload,
        }
    }

    /// The HTTP-status context, for errors that were classified from a response.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            TrafficError::Authentication(e)
            | TrafficError::NotFound(e)
            | TrafficError::RateLimit(e)
            | TrafficError::Client(e)
            | TrafficError::Server(e) => Some(e),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.api_error().and_then(|e| e.status)
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            TrafficError::Connection { request_id, .. }
            | TrafficError::InvalidPayload { request_id, .. }
            | TrafficError::UnexpectedPayload { request_id, .. } => request_id.as_deref(),
            other => other.api_error().and_then(|e| e.request_id.as_deref()),
        }
    }

    /// Whether this class of failure is one the executor retries locally.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Connection | ErrorKind::RateLimit | ErrorKind::Server
        )
    }
}
