//! Endpoint wrappers for each Traffic API version.
//!
//! The wrappers only build paths and parameters; authentication and the
//! retry loop live in [`ApiCore`].

mod v3;
mod v6;
mod v7;

pub use v3::TrafficApiV3;
pub use v6::TrafficApiV6;
pub use v7::TrafficApiV7;

use std::sync::Arc;

use crate::auth::CredentialManager;
use crate::error::Result;
use crate::http::{HttpExecutor, JsonObject, QueryParams};

/// Base URL, credentials and executor shared by one API version's calls.
#[derive(Clone)]
pub struct ApiCore {
    base_url: String,
    auth: Arc<CredentialManager>,
    executor: HttpExecutor,
}

impl ApiCore {
    pub fn new(
        base_url: impl Into<String>,
        auth: Arc<CredentialManager>,
        executor: HttpExecutor,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            auth,
            executor,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth(&self) -> &CredentialManager {
        &self.auth
    }

    /// GETs `base_url + path`.
    ///
    /// Parameters are layered as `params`, then auth parameters, then `extra`;
    /// later layers replace earlier keys.
    pub fn request(
        &self,
        path: &str,
        params: QueryParams,
        extra: QueryParams,
    ) -> Result<(JsonObject, String)> {
        let mut query = params;
        query.extend(self.auth.auth_query_params()?);
        query.extend(extra);
        let headers = self.auth.auth_headers()?;

        let url = format!("{}{}", self.base_url, path);
        self.executor.get_json(&url, &query, headers)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::auth::Credential;
    use crate::config::{HttpConfig, RequestIdFactory};
    use crate::http::{ReqwestTransport, RetryPolicy};

    /// API-key core pointed at `base_url`, with retries disabled.
    pub fn api_key_core(base_url: String) -> ApiCore {
        let config = HttpConfig::default()
            .with_retry(RetryPolicy::no_retry())
            .with_request_id(RequestIdFactory::fixed("rid-api"));
        let transport = Arc::new(ReqwestTransport::new(&config).unwrap());
        let auth = Arc::new(CredentialManager::new(
            Credential::api_key("test-key"),
            format!("{}/oauth2/token", base_url),
            transport.clone(),
            &config,
        ));
        ApiCore::new(base_url, auth, HttpExecutor::new(transport, config))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::api_key_core;
    use super::*;
    use crate::auth::Credential;
    use crate::config::HttpConfig;
    use crate::error::ErrorKind;
    use crate::http::ReqwestTransport;
    use mockito::Matcher;

    #[test]
    fn test_extra_params_override_earlier_layers() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/v7/flow")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("in".into(), "bbox:1,2;3,4".into()),
                Matcher::UrlEncoded("apiKey".into(), "test-key".into()),
                Matcher::UrlEncoded("units".into(), "metric".into()),
            ]))
            .with_status(200)
            .with_body("{}")
            .create();

        let core = api_key_core(format!("{}/v7/", server.url()));
        let (_, rid) = core
            .request(
                "/flow",
                QueryParams::new().with("in", "circle:0,0;r=1"),
                QueryParams::new()
                    .with("in", "bbox:1,2;3,4")
                    .with("units", "metric"),
            )
            .unwrap();

        mock.assert();
        assert_eq!(rid, "rid-api");
    }

    #[test]
    fn test_oauth_bearer_header_and_no_api_key() {
        let mut server = mockito::Server::new();
        let token = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(r#"{"access_token": "tok-abc", "expires_in": 3600}"#)
            .expect(1)
            .create();
        let resource = server
            .mock("GET", "/v7/availability")
            .match_header("authorization", "Bearer tok-abc")
            .with_status(200)
            .with_body(r#"{"available": true}"#)
            .expect(2)
            .create();

        let config = HttpConfig::default();
        let transport = Arc::new(ReqwestTransport::new(&config).unwrap());
        let auth = Arc::new(CredentialManager::new(
            Credential::oauth("id", "secret"),
            format!("{}/oauth2/token", server.url()),
            transport.clone(),
            &config,
        ));
        let core = ApiCore::new(
            format!("{}/v7", server.url()),
            auth,
            HttpExecutor::new(transport, config),
        );

        for _ in 0..2 {
            core.request("/availability", QueryParams::new(), QueryParams::new())
                .unwrap();
        }

        token.assert();
        resource.assert();
    }

    #[test]
    fn test_missing_api_key_fails_before_network() {
        let mut server = mockito::Server::new();
        let mock = server.mock("GET", Matcher::Any).expect(0).create();

        let config = HttpConfig::default();
        let transport = Arc::new(ReqwestTransport::new(&config).unwrap());
        let auth = Arc::new(CredentialManager::new(
            Credential::api_key(""),
            "http://unused",
            transport.clone(),
            &config,
        ));
        let core = ApiCore::new(server.url(), auth, HttpExecutor::new(transport, config));

        let err = core
            .request("/flow", QueryParams::new(), QueryParams::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        mock.assert();
    }
}
