//! Resilient GET executor: correlation ids, bounded retries, classification
//! and JSON decoding.

use chrono::Utc;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::classify::classify_failure;
use super::headers::Headers;
use super::query::QueryParams;
use super::redact::{redact_headers, redact_params};
use super::retry::{Sleeper, ThreadSleeper, parse_retry_after};
use super::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::config::HttpConfig;
use crate::error::{Result, TrafficError};

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// A decoded top-level JSON object.
pub type JsonObject = Map<String, Value>;

/// Outcome of one attempt, kept only long enough to log it and pick a delay.
enum Outcome {
    Response(HttpResponse),
    Failed(TransportError),
}

/// Performs GET requests against JSON endpoints with the configured retry policy.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct HttpExecutor {
    transport: Arc<dyn Transport>,
    config: Arc<HttpConfig>,
    sleeper: Arc<dyn Sleeper>,
}

impl HttpExecutor {
    pub fn new(transport: Arc<dyn Transport>, config: HttpConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Replaces the sleeper used between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// GETs `url` and returns the decoded JSON object with the request's
    /// correlation id.
    ///
    /// A caller-supplied `X-Request-Id` header (any casing) is reused;
    /// otherwise one is generated and attached.
    #[tracing::instrument(skip(self, params, headers))]
    pub fn get_json(
        &self,
        url: &str,
        params: &QueryParams,
        mut headers: Headers,
    ) -> Result<(JsonObject, String)> {
        let request_id = match headers.get(REQUEST_ID_HEADER) {
            Some(existing) => existing.to_string(),
            None => {
                let generated = self.config.request_id.generate();
                headers.insert(REQUEST_ID_HEADER, generated.clone());
                generated
            }
        };

        let mut request = HttpRequest::get(url, self.config.retry.timeout);
        request.query = params.to_pairs();
        request.headers = headers;

        let response = self.send_with_retry(&request, params, &request_id)?;

        if !response.is_success() {
            return Err(classify_failure(&response, Some(&request_id)));
        }

        let payload = decode_object(&response, &request_id)?;
        Ok((payload, request_id))
    }

    /// Sends `request` until it succeeds, fails terminally, or the retry budget
    /// runs out. Returns the last response received, whatever its status.
    fn send_with_retry(
        &self,
        request: &HttpRequest,
        params: &QueryParams,
        request_id: &str,
    ) -> Result<HttpResponse> {
        let policy = &self.config.retry;
        let mut retries_remaining = policy.max_retries;
        let mut attempt: u32 = 0;

        loop {
            let started = Instant::now();
            let outcome = match self.transport.execute(request) {
                Ok(response) => Outcome::Response(response),
                Err(e) => Outcome::Failed(e),
            };
            self.log_attempt(request, params, request_id, attempt, &outcome, started.elapsed());

            let delay = match outcome {
                Outcome::Failed(e) => {
                    if !e.is_retryable() || retries_remaining == 0 {
                        debug!("GET {}: giving up after transport error: {}", request.url, e);
                        return Err(e.into_traffic_error(&request.url, Some(request_id)));
                    }
                    let delay = policy.backoff_delay(attempt);
                    warn!(
                        "GET {}: attempt {}/{} failed ({}), retrying in {}ms...",
                        request.url,
                        attempt + 1,
                        policy.max_retries + 1,
                        e,
                        delay.as_millis()
                    );
                    delay
                }
                Outcome::Response(response) => {
                    if !policy.should_retry_status(response.status) || retries_remaining == 0 {
                        return Ok(response);
                    }
                    let delay = self.delay_for_response(&response, attempt);
                    warn!(
                        "GET {}: attempt {}/{} returned HTTP {}, retrying in {}ms...",
                        request.url,
                        attempt + 1,
                        policy.max_retries + 1,
                        response.status,
                        delay.as_millis()
                    );
                    delay
                }
            };

            self.sleeper.sleep(delay);
            retries_remaining -= 1;
            attempt += 1;
        }
    }

    /// Server hint for 429s when it parses, exponential backoff otherwise.
    fn delay_for_response(&self, response: &HttpResponse, attempt: u32) -> Duration {
        if response.status == 429 {
            if let Some(hint) = response
                .headers
                .get("Retry-After")
                .and_then(|v| parse_retry_after(v, Utc::now()))
            {
                return hint;
            }
        }
        self.config.retry.backoff_delay(attempt)
    }

    fn log_attempt(
        &self,
        request: &HttpRequest,
        params: &QueryParams,
        request_id: &str,
        attempt: u32,
        outcome: &Outcome,
        elapsed: Duration,
    ) {
        if !self.config.enable_logging {
            return;
        }

        let headers = redact_headers(&request.headers);
        let params = redact_params(params);
        let elapsed_ms = elapsed.as_millis() as u64;

        match outcome {
            Outcome::Response(response) => tracing::debug!(
                method = request.method.as_str(),
                url = %request.url,
                headers = ?headers,
                params = ?params,
                status = response.status,
                elapsed_ms,
                request_id,
                attempt,
                "HERE API request"
            ),
            Outcome::Failed(e) => tracing::debug!(
                method = request.method.as_str(),
                url = %request.url,
                headers = ?headers,
                params = ?params,
                error = ?e.kind,
                elapsed_ms,
                request_id,
                attempt,
                "HERE API request failed"
            ),
        }
    }
}

fn decode_object(response: &HttpResponse, request_id: &str) -> Result<JsonObject> {
    let body = response
        .body
        .as_deref()
        .ok_or_else(|| TrafficError::InvalidPayload {
            message: "response body could not be read".to_string(),
            url: response.url.clone(),
            request_id: Some(request_id.to_string()),
        })?;

    let value: Value = serde_json::from_str(body).map_err(|e| TrafficError::InvalidPayload {
        message: e.to_string(),
        url: response.url.clone(),
        request_id: Some(request_id.to_string()),
    })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(TrafficError::UnexpectedPayload {
            found: json_type_name(&other),
            url: response.url.clone(),
            request_id: Some(request_id.to_string()),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
