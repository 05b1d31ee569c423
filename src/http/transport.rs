//! Blocking transport abstraction and its reqwest implementation.

use log::debug;
use std::fmt;
use std::time::Duration;

use super::headers::Headers;
use crate::config::HttpConfig;
use crate::error::{Result, TrafficError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A single request handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Headers,
    /// Form-encoded body fields (POST only).
    pub form: Option<Vec<(String, String)>>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Headers::new(),
            form: None,
            timeout,
        }
    }

    pub fn post_form(url: impl Into<String>, form: Vec<(String, String)>, timeout: Duration) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            query: Vec::new(),
            headers: Headers::new(),
            form: Some(form),
            timeout,
        }
    }
}

/// A response as seen by the retry and classification layers.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Final URL, after any redirects.
    pub url: String,
    pub headers: Headers,
    /// `None` when the body could not be read.
    pub body: Option<String>,
}

impl HttpResponse {
    pub fn new(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            headers: Headers::new(),
            body: Some(body.into()),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Other,
}

/// Failure before any HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Connect,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Other,
            message: message.into(),
        }
    }

    /// Timeouts and connection failures may clear up on their own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            TransportErrorKind::Timeout | TransportErrorKind::Connect
        )
    }

    pub fn into_traffic_error(self, url: &str, request_id: Option<&str>) -> TrafficError {
        TrafficError::Connection {
            timeout: self.kind == TransportErrorKind::Timeout,
            message: self.message,
            url: url.to_string(),
            request_id: request_id.map(str::to_string),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

/// Blocking HTTP transport. Implementations must be safe to share across threads.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Production transport backed by a pooled `reqwest::blocking::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Builds a client honouring the user agent and TLS settings in `config`.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| TrafficError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wraps an already configured client.
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &reqwest::blocking::Client {
        &self.client
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::timeout(format!("request timeout: {}", e))
    } else if e.is_connect() {
        TransportError::connect(format!("connection failed: {}", e))
    } else {
        TransportError::other(format!("request failed: {}", e))
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        builder = builder.timeout(request.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }

        if let Some(form) = &request.form {
            builder = builder.form(form);
        }

        let response = builder.send().map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect::<Headers>();

        let body = match response.text() {
            Ok(text) => Some(text),
            Err(e) => {
                debug!("Failed to read response body from {}: {}", url, e);
                None
            }
        };

        Ok(HttpResponse {
            status,
            url,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reqwest_transport_get_sends_query_and_headers() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/flow")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("in".into(), "bbox:1,2;3,4".into()),
                mockito::Matcher::UrlEncoded("types".into(), "a".into()),
                mockito::Matcher::UrlEncoded("types".into(), "b".into()),
            ]))
            .match_header("x-request-id", "rid-1")
            .with_status(200)
            .with_header("retry-after", "3")
            .with_body(r#"{"ok": true}"#)
            .create();

        let transport = ReqwestTransport::new(&HttpConfig::default()).unwrap();
        let mut request = HttpRequest::get(format!("{}/flow", server.url()), Duration::from_secs(5));
        request.query = vec![
            ("in".to_string(), "bbox:1,2;3,4".to_string()),
            ("types".to_string(), "a".to_string()),
            ("types".to_string(), "b".to_string()),
        ];
        request.headers.insert("X-Request-Id", "rid-1");

        let response = transport.execute(&request).unwrap();

        mock.assert();
        assert_eq!(response.status, 200);
        assert!(response.is_success());
        assert_eq!(response.headers.get("Retry-After"), Some("3"));
        assert_eq!(response.body.as_deref(), Some(r#"{"ok": true}"#));
    }

    #[test]
    fn test_reqwest_transport_posts_form() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/oauth2/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                mockito::Matcher::UrlEncoded("client_id".into(), "id".into()),
            ]))
            .with_status(200)
            .with_body("{}")
            .create();

        let transport = ReqwestTransport::new(&HttpConfig::default()).unwrap();
        let request = HttpRequest::post_form(
            format!("{}/oauth2/token", server.url()),
            vec![
                ("grant_type".to_string(), "client_credentials".to_string()),
                ("client_id".to_string(), "id".to_string()),
            ],
            Duration::from_secs(5),
        );

        let response = transport.execute(&request).unwrap();
        mock.assert();
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_reqwest_transport_connection_refused_is_retryable() {
        // Port 9 (discard) on localhost is essentially never listening
        let transport = ReqwestTransport::new(&HttpConfig::default()).unwrap();
        let request = HttpRequest::get("http://127.0.0.1:9/", Duration::from_secs(2));

        let err = transport.execute(&request).unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {:?}", err);
    }

    #[test]
    fn test_into_traffic_error_keeps_context() {
        let err = TransportError::timeout("request timeout").into_traffic_error("https://x", Some("rid"));
        match err {
            TrafficError::Connection {
                timeout,
                url,
                request_id,
                ..
            } => {
                assert!(timeout);
                assert_eq!(url, "https://x");
                assert_eq!(request_id.as_deref(), Some("rid"));
            }
            other => panic!("Expected connection error, got {:?}", other),
        }
    }

    #[test]
    fn test_other_transport_errors_are_not_retryable() {
        assert!(!TransportError::other("bad builder").is_retryable());
        assert!(TransportError::connect("refused").is_retryable());
    }
}
