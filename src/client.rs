//! Entry point bundling all API versions behind one transport and one
//! credential manager.

use std::sync::Arc;

use crate::api::{ApiCore, TrafficApiV3, TrafficApiV6, TrafficApiV7};
use crate::auth::{Credential, CredentialManager};
use crate::config::{HttpConfig, TrafficConfig};
use crate::error::Result;
use crate::http::{HttpExecutor, ReqwestTransport, Transport};
use crate::runtime::Env;

/// Synchronous HERE Traffic client.
///
/// Every request may block for up to
/// `(max_retries + 1) * timeout + total backoff`. From async code use
/// [`AsyncTrafficClient`](crate::AsyncTrafficClient).
#[derive(Clone)]
pub struct TrafficClient {
    config: TrafficConfig,
    auth: Arc<CredentialManager>,
    executor: HttpExecutor,
    v7: TrafficApiV7,
    v6: TrafficApiV6,
    v3: TrafficApiV3,
}

impl TrafficClient {
    /// Builds a client on a pooled reqwest transport.
    pub fn new(credential: Credential, config: TrafficConfig, http: HttpConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&http)?);
        Ok(Self::with_transport(credential, config, http, transport))
    }

    /// Reads endpoint overrides from the environment and seeds the request
    /// timeout from `HERE_HTTP_TIMEOUT_SECONDS`.
    pub fn from_env<E: Env + ?Sized>(
        env: &E,
        credential: Credential,
        http: HttpConfig,
    ) -> Result<Self> {
        let config = TrafficConfig::from_env(env)?;
        let http = http.with_timeout(config.http_timeout);
        Self::new(credential, config, http)
    }

    /// Builds a client on any [`Transport`].
    pub fn with_transport(
        credential: Credential,
        config: TrafficConfig,
        http: HttpConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let auth = Arc::new(CredentialManager::new(
            credential,
            config.oauth_token_url.clone(),
            Arc::clone(&transport),
            &http,
        ));
        let executor = HttpExecutor::new(transport, http);
        Self::assemble(config, auth, executor)
    }

    /// Replaces the executor, e.g. to install a custom sleeper.
    pub fn with_executor(self, executor: HttpExecutor) -> Self {
        Self::assemble(self.config, self.auth, executor)
    }

    fn assemble(
        config: TrafficConfig,
        auth: Arc<CredentialManager>,
        executor: HttpExecutor,
    ) -> Self {
        let core = |base: &str| ApiCore::new(base, Arc::clone(&auth), executor.clone());
        Self {
            v7: TrafficApiV7::new(core(&config.v7_base_url)),
            v6: TrafficApiV6::new(core(&config.v6_base_url)),
            v3: TrafficApiV3::new(core(&config.v3_base_url)),
            config,
            auth,
            executor,
        }
    }

    pub fn v7(&self) -> &TrafficApiV7 {
        &self.v7
    }

    pub fn v6(&self) -> &TrafficApiV6 {
        &self.v6
    }

    pub fn v3(&self) -> &TrafficApiV3 {
        &self.v3
    }

    pub fn auth(&self) -> &CredentialManager {
        &self.auth
    }

    pub fn config(&self) -> &TrafficConfig {
        &self.config
    }

    pub fn executor(&self) -> &HttpExecutor {
        &self.executor
    }
}
