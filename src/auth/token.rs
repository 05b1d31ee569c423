//! OAuth access token cache entry and token endpoint response.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::fmt;

/// Lead time before expiry at which a cached token stops being handed out.
pub const SAFETY_MARGIN_SECS: i64 = 5 * 60;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// A bearer token and the instant it expires. Replaced wholesale on refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Usable while `now < expires_at - 5 minutes`.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - ChronoDuration::seconds(SAFETY_MARGIN_SECS)
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Body returned by the client-credentials token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    pub fn into_cached(self, now: DateTime<Utc>) -> CachedToken {
        let expires_in = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let expires_at = i64::try_from(expires_in)
            .ok()
            .and_then(ChronoDuration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        CachedToken::new(self.access_token, expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_outside_safety_margin() {
        let now = Utc::now();
        let token = CachedToken::new("t", now + ChronoDuration::minutes(10));
        assert!(token.is_usable(now));
    }

    #[test]
    fn test_not_usable_inside_safety_margin_or_expired() {
        let now = Utc::now();
        assert!(!CachedToken::new("t", now + ChronoDuration::minutes(5)).is_usable(now));
        assert!(!CachedToken::new("t", now + ChronoDuration::minutes(4)).is_usable(now));
        assert!(!CachedToken::new("t", now - ChronoDuration::minutes(1)).is_usable(now));
    }

    #[test]
    fn test_expires_in_defaults_to_an_hour() {
        let now = Utc::now();
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access_token": "abc", "token_type": "bearer"}"#).unwrap();
        let cached = parsed.into_cached(now);
        assert_eq!(cached.token, "abc");
        assert_eq!(cached.expires_at, now + ChronoDuration::seconds(3600));
    }

    #[test]
    fn test_huge_expires_in_does_not_overflow() {
        let now = Utc::now();
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access_token": "abc", "expires_in": 18446744073709551615}"#)
                .unwrap();
        assert!(parsed.into_cached(now).is_usable(now));
    }

    #[test]
    fn test_debug_hides_token() {
        let token = CachedToken::new("super-secret", Utc::now());
        assert!(!format!("{:?}", token).contains("super-secret"));
    }
}
