//! Traffic API v6.3 (legacy): bounding-box flow and incidents.

use super::ApiCore;
use crate::error::Result;
use crate::geo::validate_bbox_string;
use crate::http::QueryParams;
use crate::models::{TrafficFlowResponse, TrafficIncidentResponse};

#[derive(Clone)]
pub struct TrafficApiV6 {
    core: ApiCore,
}

impl TrafficApiV6 {
    pub fn new(core: ApiCore) -> Self {
        Self { core }
    }

    pub fn base_url(&self) -> &str {
        self.core.base_url()
    }

    /// Flow inside `bbox`, given as `LAT1,LON1;LAT2,LON2`.
    #[tracing::instrument(skip(self, extra))]
    pub fn flow(&self, bbox: &str, extra: QueryParams) -> Result<TrafficFlowResponse> {
        let params = QueryParams::new().with("bbox", validate_bbox_string(bbox)?);
        let (data, request_id) = self.core.request("/flow.json", params, extra)?;
        Ok(TrafficFlowResponse::new(data, request_id))
    }

    pub fn flow_bbox(
        &self,
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
        extra: QueryParams,
    ) -> Result<TrafficFlowResponse> {
        self.flow(&format!("{},{};{},{}", lat1, lon1, lat2, lon2), extra)
    }

    /// Incidents inside `bbox`, given as `LAT1,LON1;LAT2,LON2`.
    #[tracing::instrument(skip(self, extra))]
    pub fn incidents(&self, bbox: &str, extra: QueryParams) -> Result<TrafficIncidentResponse> {
        let params = QueryParams::new().with("bbox", validate_bbox_string(bbox)?);
        let (data, request_id) = self.core.request("/incidents.json", params, extra)?;
        Ok(TrafficIncidentResponse::new(data, request_id))
    }

    pub fn incidents_bbox(
        &self,
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
        extra: QueryParams,
    ) -> Result<TrafficIncidentResponse> {
        self.incidents(&format!("{},{};{},{}", lat1, lon1, lat2, lon2), extra)
    }
}
