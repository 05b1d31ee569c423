//! Client for the HERE Traffic API (v7, v6.3 and v3).
//!
//! [`TrafficClient`] is synchronous and safe to share across threads;
//! [`AsyncTrafficClient`] wraps it for tokio callers.

pub mod api;
pub mod async_client;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod geo;
pub mod http;
pub mod models;
pub mod runtime;

pub use async_client::AsyncTrafficClient;
pub use auth::{Credential, CredentialManager};
pub use client::TrafficClient;
pub use config::{HttpConfig, TrafficConfig};
pub use error::{ApiError, ErrorKind, Result, TrafficError};
pub use geo::{GeospatialFilter, LocationReference};
pub use models::{AvailabilityResponse, TrafficFlowResponse, TrafficIncidentResponse};
