//! Traffic API v7: flow, incidents and availability.

use super::ApiCore;
use crate::error::Result;
use crate::geo::{GeospatialFilter, LocationReference, validate_geospatial_filter};
use crate::http::QueryParams;
use crate::models::{AvailabilityResponse, TrafficFlowResponse, TrafficIncidentResponse};

#[derive(Clone)]
pub struct TrafficApiV7 {
    core: ApiCore,
}

impl TrafficApiV7 {
    pub fn new(core: ApiCore) -> Self {
        Self { core }
    }

    pub fn base_url(&self) -> &str {
        self.core.base_url()
    }

    fn filter_params(location: LocationReference, filter: &str) -> Result<QueryParams> {
        let filter = validate_geospatial_filter(filter)?;
        Ok(QueryParams::new()
            .with("locationReferencing", location.as_str())
            .with("in", filter))
    }

    /// Real-time flow inside `filter` (a circle, bbox or corridor `in=` value).
    #[tracing::instrument(skip(self, extra))]
    pub fn flow(
        &self,
        location: LocationReference,
        filter: &str,
        extra: QueryParams,
    ) -> Result<TrafficFlowResponse> {
        let params = Self::filter_params(location, filter)?;
        let (data, request_id) = self.core.request("/flow", params, extra)?;
        Ok(TrafficFlowResponse::new(data, request_id))
    }

    pub fn flow_circle(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: u32,
        location: LocationReference,
        extra: QueryParams,
    ) -> Result<TrafficFlowResponse> {
        let filter = GeospatialFilter::circle(latitude, longitude, radius_meters)?;
        self.flow(location, &filter, extra)
    }

    pub fn flow_bbox(
        &self,
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
        location: LocationReference,
        extra: QueryParams,
    ) -> Result<TrafficFlowResponse> {
        let filter = GeospatialFilter::bbox(lat1, lon1, lat2, lon2)?;
        self.flow(location, &filter, extra)
    }

    /// Incidents inside `filter`.
    #[tracing::instrument(skip(self, extra))]
    pub fn incidents(
        &self,
        location: LocationReference,
        filter: &str,
        extra: QueryParams,
    ) -> Result<TrafficIncidentResponse> {
        let params = Self::filter_params(location, filter)?;
        let (data, request_id) = self.core.request("/incidents", params, extra)?;
        Ok(TrafficIncidentResponse::new(data, request_id))
    }

    pub fn incidents_circle(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: u32,
        location: LocationReference,
        extra: QueryParams,
    ) -> Result<TrafficIncidentResponse> {
        let filter = GeospatialFilter::circle(latitude, longitude, radius_meters)?;
        self.incidents(location, &filter, extra)
    }

    pub fn incidents_bbox(
        &self,
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
        location: LocationReference,
        extra: QueryParams,
    ) -> Result<TrafficIncidentResponse> {
        let filter = GeospatialFilter::bbox(lat1, lon1, lat2, lon2)?;
        self.incidents(location, &filter, extra)
    }

    #[tracing::instrument(skip(self, extra))]
    pub fn availability(&self, extra: QueryParams) -> Result<AvailabilityResponse> {
        let (data, request_id) = self
            .core
            .request("/availability", QueryParams::new(), extra)?;
        Ok(AvailabilityResponse::new(data, request_id))
    }
}
