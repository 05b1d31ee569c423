//! Credentials and OAuth token lifecycle.
//!
//! A [`CredentialManager`] turns a [`Credential`] into the query parameters and
//! headers each request needs. In OAuth mode it owns the only shared mutable
//! state in the crate: the cached bearer token.

mod token;

pub use token::{CachedToken, DEFAULT_EXPIRES_IN_SECS, SAFETY_MARGIN_SECS};

use chrono::Utc;
use log::debug;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{HttpConfig, RequestIdFactory};
use crate::error::{Result, TrafficError};
use crate::http::{
    Headers, HttpRequest, QueryParams, REQUEST_ID_HEADER, Transport, classify_failure,
};
use token::TokenResponse;

/// Query parameter carrying the API key.
pub const API_KEY_PARAM: &str = "apiKey";

/// How requests are authenticated. Exactly one mode is active per manager.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Static key sent as the `apiKey` query parameter.
    ApiKey(String),
    /// Client-credentials pair exchanged for a bearer token.
    OAuth {
        access_key_id: String,
        access_key_secret: String,
    },
}

impl Credential {
    pub fn api_key(key: impl Into<String>) -> Self {
        Credential::ApiKey(key.into())
    }

    pub fn oauth(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Credential::OAuth {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
        }
    }

    pub fn is_oauth(&self) -> bool {
        matches!(self, Credential::OAuth { .. })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Credential::OAuth { access_key_id, .. } => f
                .debug_struct("OAuth")
                .field("access_key_id", access_key_id)
                .field("access_key_secret", &"<redacted>")
                .finish(),
        }
    }
}

/// Produces per-request authentication and manages the OAuth token.
///
/// At most one token request is in flight per manager: callers that find the
/// cache empty or stale serialise on `refresh_lock` and re-check the cache
/// once they hold it, so a burst of concurrent callers costs one round trip.
pub struct CredentialManager {
    credential: Credential,
    token_url: String,
    transport: Arc<dyn Transport>,
    timeout: Duration,
    request_id: RequestIdFactory,
    cache: RwLock<Option<CachedToken>>,
    refresh_lock: Mutex<()>,
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("credential", &self.credential)
            .field("token_url", &self.token_url)
            .field("cache", &*self.cache.read())
            .finish()
    }
}

impl CredentialManager {
    pub fn new(
        credential: Credential,
        token_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        config: &HttpConfig,
    ) -> Self {
        Self {
            credential,
            token_url: token_url.into(),
            transport,
            timeout: config.retry.timeout,
            request_id: config.request_id.clone(),
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Parameters to merge into the query string.
    ///
    /// `{apiKey: key}` in API-key mode, empty in OAuth mode.
    pub fn auth_query_params(&self) -> Result<QueryParams> {
        match &self.credential {
            Credential::ApiKey(key) if key.trim().is_empty() => Err(TrafficError::Configuration(
                "API key is required for API key authentication".to_string(),
            )),
            Credential::ApiKey(key) => Ok(QueryParams::new().with(API_KEY_PARAM, key.as_str())),
            Credential::OAuth { .. } => Ok(QueryParams::new()),
        }
    }

    /// Headers to merge into the request.
    ///
    /// `Authorization: Bearer <token>` in OAuth mode, acquiring or refreshing the
    /// token as needed; empty in API-key mode.
    pub fn auth_headers(&self) -> Result<Headers> {
        match &self.credential {
            Credential::ApiKey(_) => Ok(Headers::new()),
            Credential::OAuth { .. } => {
                let token = self.access_token()?;
                Ok(Headers::new().with("Authorization", format!("Bearer {}", token)))
            }
        }
    }

    /// Returns a usable bearer token, fetching one only when the cache is empty
    /// or within the safety margin of expiry.
    #[tracing::instrument(skip(self))]
    pub fn access_token(&self) -> Result<String> {
        if let Some(token) = self.usable_cached_token() {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock();

        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = self.usable_cached_token() {
            return Ok(token);
        }

        self.fetch_and_store()
    }

    /// Discards the cached token and synchronously acquires a new one.
    #[tracing::instrument(skip(self))]
    pub fn refresh_token(&self) -> Result<String> {
        let _guard = self.refresh_lock.lock();
        *self.cache.write() = None;
        self.fetch_and_store()
    }

    /// Snapshot of the cached token, if any, without validating it.
    pub fn cached_token(&self) -> Option<CachedToken> {
        self.cache.read().clone()
    }

    fn usable_cached_token(&self) -> Option<String> {
        self.cache
            .read()
            .as_ref()
            .filter(|cached| cached.is_usable(Utc::now()))
            .map(|cached| cached.token.clone())
    }

    /// Must be called with `refresh_lock` held.
    fn fetch_and_store(&self) -> Result<String> {
        let fresh = self.fetch_token()?;
        let token = fresh.token.clone();
        *self.cache.write() = Some(fresh);
        Ok(token)
    }

    /// One client-credentials exchange. Not retried.
    fn fetch_token(&self) -> Result<CachedToken> {
        let (client_id, client_secret) = match &self.credential {
            Credential::OAuth {
                access_key_id,
                access_key_secret,
            } if !access_key_id.trim().is_empty() && !access_key_secret.trim().is_empty() => {
                (access_key_id, access_key_secret)
            }
            _ => {
                return Err(TrafficError::Configuration(
                    "OAuth credentials (access_key_id and access_key_secret) are required for OAuth authentication"
                        .to_string(),
                ));
            }
        };

        let request_id = self.request_id.generate();
        debug!("Requesting OAuth token from {} ({})...", self.token_url, request_id);

        let mut request = HttpRequest::post_form(
            &self.token_url,
            vec![
                ("grant_type".to_string(), "client_credentials".to_string()),
                ("client_id".to_string(), client_id.clone()),
                ("client_secret".to_string(), client_secret.clone()),
            ],
            self.timeout,
        );
        request.headers.insert(REQUEST_ID_HEADER, request_id.clone());

        let response = self
            .transport
            .execute(&request)
            .map_err(|e| e.into_traffic_error(&self.token_url, Some(&request_id)))?;

        if !response.is_success() {
            // Any refusal from the token endpoint means the credentials are unusable
            let failure = classify_failure(&response, Some(&request_id));
            let mut api = failure.api_error().cloned().unwrap_or_default();
            api.message = "OAuth token request failed".to_string();
            return Err(TrafficError::Authentication(api));
        }

        let body = response.body.as_deref().unwrap_or_default();
        let parsed: TokenResponse =
            serde_json::from_str(body).map_err(|e| TrafficError::InvalidPayload {
                message: format!("token endpoint response: {}", e),
                url: response.url.clone(),
                request_id: Some(request_id.clone()),
            })?;

        let cached = parsed.into_cached(Utc::now());
        debug!("OAuth token acquired, expires at {}", cached.expires_at);
        Ok(cached)
    }
}
