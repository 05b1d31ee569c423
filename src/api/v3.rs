//! Traffic API v3.

use super::ApiCore;
use crate::error::Result;
use crate::http::QueryParams;
use crate::models::TrafficFlowResponse;

#[derive(Clone)]
pub struct TrafficApiV3 {
    core: ApiCore,
}

impl TrafficApiV3 {
    pub fn new(core: ApiCore) -> Self {
        Self { core }
    }

    pub fn base_url(&self) -> &str {
        self.core.base_url()
    }

    #[tracing::instrument(skip(self, extra))]
    pub fn flow(&self, extra: QueryParams) -> Result<TrafficFlowResponse> {
        let (data, request_id) = self.core.request("/flow", QueryParams::new(), extra)?;
        Ok(TrafficFlowResponse::new(data, request_id))
    }
}
