//! Client configuration.
//!
//! [`HttpConfig`] carries transport and retry settings; [`TrafficConfig`]
//! carries endpoint locations. Both are plain values fixed at construction.
//! Environment overrides are read only by [`TrafficConfig::from_env`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TrafficError};
use crate::http::RetryPolicy;
use crate::runtime::Env;

pub const SDK_NAME: &str = "here-traffic-rs";

pub const BASE_URL_V7: &str = "https://data.traffic.hereapi.com/v7";
pub const BASE_URL_V6: &str = "https://traffic.api.here.com/traffic/6.3";
pub const BASE_URL_V3: &str = "https://traffic.api.here.com/v3";
pub const OAUTH_TOKEN_URL: &str = "https://account.api.here.com/oauth2/token";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub fn default_user_agent() -> String {
    format!("{}/{}", SDK_NAME, env!("HERE_TRAFFIC_VERSION"))
}

/// Produces correlation ids for outgoing requests.
#[derive(Clone)]
pub struct RequestIdFactory(Arc<dyn Fn() -> String + Send + Sync>);

impl RequestIdFactory {
    pub fn new(f: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Always returns `id`. Handy for tests and replay tooling.
    pub fn fixed(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(move || id.clone())
    }

    pub fn generate(&self) -> String {
        (self.0)()
    }
}

impl Default for RequestIdFactory {
    fn default() -> Self {
        Self::new(|| uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Debug for RequestIdFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestIdFactory(..)")
    }
}

/// Transport, retry and observability settings shared by every request.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub retry: RetryPolicy,
    pub verify_tls: bool,
    /// Emit one structured record per attempt.
    pub enable_logging: bool,
    pub user_agent: String,
    pub request_id: RequestIdFactory,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            verify_tls: true,
            enable_logging: false,
            user_agent: default_user_agent(),
            request_id: RequestIdFactory::default(),
        }
    }
}

impl HttpConfig {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    pub fn with_request_id(mut self, factory: RequestIdFactory) -> Self {
        self.request_id = factory;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.retry.timeout = timeout;
        self
    }
}

/// Endpoint locations and the default request timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficConfig {
    pub v7_base_url: String,
    pub v6_base_url: String,
    pub v3_base_url: String,
    pub oauth_token_url: String,
    pub http_timeout: Duration,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            v7_base_url: BASE_URL_V7.to_string(),
            v6_base_url: BASE_URL_V6.to_string(),
            v3_base_url: BASE_URL_V3.to_string(),
            oauth_token_url: OAUTH_TOKEN_URL.to_string(),
            http_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TrafficConfig {
    /// Points every API version and the token endpoint at one base URL.
    /// Used against mock servers and staging deployments.
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            v7_base_url: format!("{}/v7", base),
            v6_base_url: format!("{}/traffic/6.3", base),
            v3_base_url: format!("{}/v3", base),
            oauth_token_url: format!("{}/oauth2/token", base),
            http_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Builds a config from environment overrides, falling back to defaults.
    ///
    /// Supported variables:
    /// - `HERE_TRAFFIC_V7_BASE_URL`
    /// - `HERE_TRAFFIC_V6_BASE_URL`
    /// - `HERE_TRAFFIC_V3_BASE_URL`
    /// - `HERE_OAUTH_TOKEN_URL`
    /// - `HERE_HTTP_TIMEOUT_SECONDS`
    ///
    /// Empty or whitespace-only values count as unset.
    #[tracing::instrument(skip(env))]
    pub fn from_env<E: Env + ?Sized>(env: &E) -> Result<Self> {
        let defaults = Self::default();
        let http_timeout = match get_env(env, "HERE_HTTP_TIMEOUT_SECONDS") {
            Some(raw) => parse_timeout("HERE_HTTP_TIMEOUT_SECONDS", &raw)?,
            None => defaults.http_timeout,
        };

        Ok(Self {
            v7_base_url: get_env(env, "HERE_TRAFFIC_V7_BASE_URL").unwrap_or(defaults.v7_base_url),
            v6_base_url: get_env(env, "HERE_TRAFFIC_V6_BASE_URL").unwrap_or(defaults.v6_base_url),
            v3_base_url: get_env(env, "HERE_TRAFFIC_V3_BASE_URL").unwrap_or(defaults.v3_base_url),
            oauth_token_url: get_env(env, "HERE_OAUTH_TOKEN_URL")
                .unwrap_or(defaults.oauth_token_url),
            http_timeout,
        })
    }
}

fn get_env<E: Env + ?Sized>(env: &E, name: &str) -> Option<String> {
    env.env_var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_timeout(name: &str, raw: &str) -> Result<Duration> {
    let seconds: f64 = raw.parse().map_err(|_| {
        TrafficError::Configuration(format!(
            "Environment variable {} must be a number, got {:?}",
            name, raw
        ))
    })?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(TrafficError::Configuration(format!(
            "Environment variable {} must be a non-negative number, got {:?}",
            name, raw
        )));
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        TrafficError::Configuration(format!(
            "Environment variable {} is out of range, got {:?}",
            name, raw
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::runtime::MockEnv;
    use std::collections::HashMap;

    fn env_with(vars: &[(&str, &str)]) -> MockEnv {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut env = MockEnv::new();
        env.expect_env_var().returning(move |key| {
            vars.get(key)
                .cloned()
                .ok_or(std::env::VarError::NotPresent)
        });
        env
    }

    #[test]
    fn test_from_env_defaults() {
        let cfg = TrafficConfig::from_env(&env_with(&[])).unwrap();
        assert_eq!(cfg, TrafficConfig::default());
        assert_eq!(cfg.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_from_env_overrides() {
        let env = env_with(&[
            ("HERE_TRAFFIC_V7_BASE_URL", "https://example.test/v7"),
            ("HERE_OAUTH_TOKEN_URL", "https://example.test/token"),
            ("HERE_HTTP_TIMEOUT_SECONDS", "5"),
        ]);
        let cfg = TrafficConfig::from_env(&env).unwrap();
        assert_eq!(cfg.v7_base_url, "https://example.test/v7");
        assert_eq!(cfg.oauth_token_url, "https://example.test/token");
        assert_eq!(cfg.v6_base_url, BASE_URL_V6);
        assert_eq!(cfg.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_env_invalid_timeout() {
        let env = env_with(&[("HERE_HTTP_TIMEOUT_SECONDS", "not-a-number")]);
        let err = TrafficConfig::from_env(&env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("must be a number"));

        let env = env_with(&[("HERE_HTTP_TIMEOUT_SECONDS", "-1")]);
        assert!(TrafficConfig::from_env(&env).is_err());
    }

    #[test]
    fn test_from_env_timeout_too_large() {
        let env = env_with(&[("HERE_HTTP_TIMEOUT_SECONDS", "1e20")]);
        let err = TrafficConfig::from_env(&env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_from_env_ignores_empty_overrides() {
        let env = env_with(&[
            ("HERE_TRAFFIC_V7_BASE_URL", "   "),
            ("HERE_HTTP_TIMEOUT_SECONDS", ""),
        ]);
        let cfg = TrafficConfig::from_env(&env).unwrap();
        assert_eq!(cfg.v7_base_url, BASE_URL_V7);
        assert_eq!(cfg.http_timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_with_base_url() {
        let cfg = TrafficConfig::with_base_url("http://127.0.0.1:1234/");
        assert_eq!(cfg.v7_base_url, "http://127.0.0.1:1234/v7");
        assert_eq!(cfg.v6_base_url, "http://127.0.0.1:1234/traffic/6.3");
        assert_eq!(cfg.oauth_token_url, "http://127.0.0.1:1234/oauth2/token");
    }

    #[test]
    fn test_request_id_factory() {
        let default = RequestIdFactory::default();
        let a = default.generate();
        let b = default.generate();
        assert!(!a.is_empty());
        assert_ne!(a, b);
        assert_eq!(RequestIdFactory::fixed("rid").generate(), "rid");
    }

    #[test]
    fn test_default_user_agent() {
        assert!(HttpConfig::default().user_agent.starts_with("here-traffic-rs/"));
    }
}
