//! Secret masking for log output.

use super::headers::Headers;
use super::query::QueryParams;

pub const REDACTED: &str = "<redacted>";

const SECRET_HEADERS: [&str; 1] = ["authorization"];
const SECRET_PARAMS: [&str; 4] = ["apikey", "api_key", "access_token", "token"];

fn is_secret(name: &str, secrets: &[&str]) -> bool {
    secrets.iter().any(|s| s.eq_ignore_ascii_case(name))
}

/// Copy of `headers` with credential-bearing values replaced by [`REDACTED`].
pub fn redact_headers(headers: &Headers) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if is_secret(name, &SECRET_HEADERS) {
                REDACTED
            } else {
                value
            };
            (name.to_string(), value.to_string())
        })
        .collect()
}

/// Flattened copy of `params` with credential-bearing values replaced by [`REDACTED`].
pub fn redact_params(params: &QueryParams) -> Vec<(String, String)> {
    params
        .to_pairs()
        .into_iter()
        .map(|(key, value)| {
            if is_secret(&key, &SECRET_PARAMS) {
                (key, REDACTED.to_string())
            } else {
                (key, value)
            }
        })
        .collect()
}
