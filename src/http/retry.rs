//! Retry policy, backoff computation and `Retry-After` parsing.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::time::Duration;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Statuses retried by default: rate limiting and transient server failures.
pub const DEFAULT_RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Immutable retry settings for one request session.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the initial request. Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Bound on each individual attempt.
    pub timeout: Duration,
    /// Base of the exponential backoff, in seconds.
    pub backoff_factor: f64,
    /// Ceiling applied to the computed backoff.
    pub max_backoff: Duration,
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Duration::from_secs(30),
            backoff_factor: 0.5,
            max_backoff: Duration::from_secs(8),
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// `min(max_backoff, backoff_factor * 2^attempt)`, with `attempt` starting
    /// at 0 for the first retry. No jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let scale = 2_f64.powi(attempt.min(64) as i32);
        let seconds = (self.backoff_factor * scale).min(self.max_backoff.as_secs_f64());
        if seconds.is_finite() && seconds > 0.0 {
            Duration::try_from_secs_f64(seconds).unwrap_or(self.max_backoff)
        } else {
            Duration::ZERO
        }
    }
}

/// Parses a `Retry-After` value: delta-seconds or an HTTP-date (RFC 7231).
///
/// Dates in the past clamp to zero. Returns `None` for anything unparseable so
/// the caller falls back to its computed backoff.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.bytes().all(|b| b.is_ascii_digit()) {
        return value.parse::<u64>().ok().map(Duration::from_secs);
    }

    let date = parse_http_date(value)?;
    let delta = (date - now).num_milliseconds().max(0);
    Some(Duration::from_millis(delta as u64))
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    // IMF-fixdate (and any other RFC 2822 date)
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    // Zone-less variants are read as UTC
    const NAIVE_FORMATS: [&str; 4] = [
        "%a, %d %b %Y %H:%M:%S",
        "%A, %d-%b-%y %H:%M:%S GMT", // RFC 850
        "%a %b %e %H:%M:%S %Y",      // asctime
        "%a %b %d %H:%M:%S %Y",
    ];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Blocking pause between attempts. Injected so tests can observe delays
/// without waiting for them.
#[cfg_attr(test, mockall::automock)]
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.timeout, Duration::from_secs(30));
        for status in [429, 500, 502, 503, 504] {
            assert!(policy.should_retry_status(status));
        }
        assert!(!policy.should_retry_status(400));
        assert!(!policy.should_retry_status(401));
        assert!(!policy.should_retry_status(404));
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(500));
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(4), Duration::from_secs(8));
        assert_eq!(policy.backoff_delay(5), Duration::from_secs(8)); // capped
        assert_eq!(policy.backoff_delay(500), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_zero_factor() {
        let policy = RetryPolicy {
            backoff_factor: 0.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff_delay(3), Duration::ZERO);
    }

    #[test]
    fn test_backoff_with_unbounded_cap() {
        let policy = RetryPolicy {
            backoff_factor: 1.0,
            max_backoff: Duration::MAX,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(8));
        assert_eq!(policy.backoff_delay(64), Duration::MAX);
        assert_eq!(policy.backoff_delay(u32::MAX), Duration::MAX);
    }

    #[test]
    fn test_no_retry() {
        assert_eq!(RetryPolicy::no_retry().max_retries, 0);
    }

    #[test]
    fn test_retry_after_delta_seconds() {
        assert_eq!(parse_retry_after("5", fixed_now()), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(" 0 ", fixed_now()), Some(Duration::ZERO));
    }

    #[test]
    fn test_retry_after_empty() {
        assert_eq!(parse_retry_after("   ", fixed_now()), None);
    }

    #[test]
    fn test_retry_after_http_date_in_past_clamps_to_zero() {
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT", fixed_now()),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_retry_after_http_date_without_zone() {
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00", fixed_now()),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_retry_after_http_date_in_future() {
        assert_eq!(
            parse_retry_after("Sat, 01 Jun 2024 12:00:30 GMT", fixed_now()),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_retry_after_asctime() {
        assert_eq!(
            parse_retry_after("Sat Jun  1 12:01:00 2024", fixed_now()),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_retry_after_invalid() {
        assert_eq!(parse_retry_after("not-a-date", fixed_now()), None);
        assert_eq!(parse_retry_after("-5", fixed_now()), None);
        assert_eq!(parse_retry_after("1.5", fixed_now()), None);
    }
}
