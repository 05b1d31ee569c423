//! Async facade over [`TrafficClient`].
//!
//! Each call runs the blocking client on tokio's blocking pool; retries,
//! token caching and classification are exactly those of the sync client.

use std::sync::Arc;

use crate::auth::Credential;
use crate::client::TrafficClient;
use crate::config::{HttpConfig, TrafficConfig};
use crate::error::{Result, TrafficError};
use crate::geo::LocationReference;
use crate::http::QueryParams;
use crate::models::{AvailabilityResponse, TrafficFlowResponse, TrafficIncidentResponse};

/// Runs `f` on the blocking pool. A panicked or cancelled task surfaces as a
/// connection error.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TrafficError::Connection {
            message: format!("blocking task failed: {}", e),
            url: String::new(),
            timeout: false,
            request_id: None,
        })?
}

/// Cheap to clone; clones share the underlying client and token cache.
#[derive(Clone)]
pub struct AsyncTrafficClient {
    inner: Arc<TrafficClient>,
}

impl AsyncTrafficClient {
    /// Builds the blocking client off the async runtime.
    pub async fn connect(
        credential: Credential,
        config: TrafficConfig,
        http: HttpConfig,
    ) -> Result<Self> {
        let client = run_blocking(move || TrafficClient::new(credential, config, http)).await?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: TrafficClient) -> Self {
        Self {
            inner: Arc::new(client),
        }
    }

    /// The wrapped synchronous client. Do not call it from async code.
    pub fn blocking(&self) -> &TrafficClient {
        &self.inner
    }

    async fn call<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&TrafficClient) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let client = Arc::clone(&self.inner);
        run_blocking(move || f(&client)).await
    }

    pub async fn v7_flow(
        &self,
        location: LocationReference,
        filter: impl Into<String>,
        extra: QueryParams,
    ) -> Result<TrafficFlowResponse> {
        let filter = filter.into();
        self.call(move |c| c.v7().flow(location, &filter, extra)).await
    }

    pub async fn v7_flow_circle(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: u32,
        location: LocationReference,
        extra: QueryParams,
    ) -> Result<TrafficFlowResponse> {
        self.call(move |c| {
            c.v7()
                .flow_circle(latitude, longitude, radius_meters, location, extra)
        })
        .await
    }

    pub async fn v7_flow_bbox(
        &self,
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
        location: LocationReference,
        extra: QueryParams,
    ) -> Result<TrafficFlowResponse> {
        self.call(move |c| c.v7().flow_bbox(lat1, lon1, lat2, lon2, location, extra))
            .await
    }

    pub async fn v7_incidents(
        &self,
        location: LocationReference,
        filter: impl Into<String>,
        extra: QueryParams,
    ) -> Result<TrafficIncidentResponse> {
        let filter = filter.into();
        self.call(move |c| c.v7().incidents(location, &filter, extra))
            .await
    }

    pub async fn v7_incidents_circle(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: u32,
        location: LocationReference,
        extra: QueryParams,
    ) -> Result<TrafficIncidentResponse> {
        self.call(move |c| {
            c.v7()
                .incidents_circle(latitude, longitude, radius_meters, location, extra)
        })
        .await
    }

    pub async fn v7_incidents_bbox(
        &self,
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
        location: LocationReference,
        extra: QueryParams,
    ) -> Result<TrafficIncidentResponse> {
        self.call(move |c| {
            c.v7()
                .incidents_bbox(lat1, lon1, lat2, lon2, location, extra)
        })
        .await
    }

    pub async fn v7_availability(&self, extra: QueryParams) -> Result<AvailabilityResponse> {
        self.call(move |c| c.v7().availability(extra)).await
    }

    pub async fn v6_flow(
        &self,
        bbox: impl Into<String>,
        extra: QueryParams,
    ) -> Result<TrafficFlowResponse> {
        let bbox = bbox.into();
        self.call(move |c| c.v6().flow(&bbox, extra)).await
    }

    pub async fn v6_flow_bbox(
        &self,
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
        extra: QueryParams,
    ) -> Result<TrafficFlowResponse> {
        self.call(move |c| c.v6().flow_bbox(lat1, lon1, lat2, lon2, extra))
            .await
    }

    pub async fn v6_incidents(
        &self,
        bbox: impl Into<String>,
        extra: QueryParams,
    ) -> Result<TrafficIncidentResponse> {
        let bbox = bbox.into();
        self.call(move |c| c.v6().incidents(&bbox, extra)).await
    }

    pub async fn v6_incidents_bbox(
        &self,
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
        extra: QueryParams,
    ) -> Result<TrafficIncidentResponse> {
        self.call(move |c| c.v6().incidents_bbox(lat1, lon1, lat2, lon2, extra))
            .await
    }

    pub async fn v3_flow(&self, extra: QueryParams) -> Result<TrafficFlowResponse> {
        self.call(move |c| c.v3().flow(extra)).await
    }

    /// Current bearer token, fetched if the cache is empty or stale.
    pub async fn access_token(&self) -> Result<String> {
        self.call(|c| c.auth().access_token()).await
    }

    /// Forces a new token exchange.
    pub async fn refresh_token(&self) -> Result<String> {
        self.call(|c| c.auth().refresh_token()).await
    }
}
