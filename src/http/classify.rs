//! HTTP status to [`TrafficError`] mapping.

use serde_json::{Map, Value};

use super::transport::HttpResponse;
use crate::error::{ApiError, TrafficError};

const FAILURE_MESSAGE: &str = "HERE API request failed";

/// Best-effort extraction of the response text and JSON object.
///
/// Never fails: an unreadable body or a non-object JSON body simply leaves the
/// corresponding field empty.
fn safe_payload(response: &HttpResponse) -> (Option<String>, Option<Map<String, Value>>) {
    let text = response.body.clone();
    let json = text
        .as_deref()
        .and_then(|t| serde_json::from_str::<Value>(t).ok())
        .and_then(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        });
    (text, json)
}

/// Builds the classified error for a response that is not a success.
///
/// | Status | Error |
/// |---|---|
/// | 401, 403 | `Authentication` |
/// | 404 | `NotFound` |
/// | 429 | `RateLimit` |
/// | other 4xx | `Client` |
/// | 5xx | `Server` |
/// | anything else | `Client` |
pub fn classify_failure(response: &HttpResponse, request_id: Option<&str>) -> TrafficError {
    let (response_text, response_json) = safe_payload(response);
    let status = response.status;
    let api = ApiError {
        message: FAILURE_MESSAGE.to_string(),
        status: Some(status),
        url: Some(response.url.clone()),
        response_text,
        response_json,
        request_id: request_id.map(str::to_string),
    };

    match status {
        401 | 403 => TrafficError::Authentication(api),
        404 => TrafficError::NotFound(api),
        429 => TrafficError::RateLimit(api),
        400..=499 => TrafficError::Client(api),
        s if s >= 500 => TrafficError::Server(api),
        _ => TrafficError::Client(api),
    }
}
