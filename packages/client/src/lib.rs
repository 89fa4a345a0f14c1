#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client for the biodiversity risk analysis backend.
//!
//! The [`AnalysisBackend`] trait captures the backend contract (one method
//! per endpoint) so that orchestration can be driven by any
//! implementation. [`http::HttpBackend`] is the `reqwest`-based
//! implementation configured from [`config::BackendConfig`].

pub mod config;
pub mod http;
#[cfg(feature = "test-utils")]
pub mod stub;

pub use config::BackendConfig;
pub use http::HttpBackend;

use bio_risk_geo::RegionQuery;
use bio_risk_models::{
    Alert, AnalysisResult, Coordinate, ForecastPoint, MitigationPlan, Selection, SimulationParams,
    TrendPoint,
};
use thiserror::Error;

/// Errors from backend requests.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// Endpoint path that failed.
        endpoint: &'static str,
        /// HTTP status code.
        status: u16,
    },

    /// Response body could not be decoded.
    #[error("Failed to decode {endpoint} response: {source}")]
    Decode {
        /// Endpoint path whose body was malformed.
        endpoint: &'static str,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The request did not complete within its deadline.
    #[error("{endpoint} timed out after {secs}s")]
    Timeout {
        /// Endpoint path that timed out.
        endpoint: &'static str,
        /// Deadline in seconds.
        secs: u64,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// The analysis backend contract.
#[async_trait::async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// `POST /analyze-region` with the point and its query box.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    async fn analyze_region(&self, query: &RegionQuery) -> Result<AnalysisResult, ClientError>;

    /// `POST /simulate` with the point, its query box and the policy
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    async fn simulate(
        &self,
        query: &RegionQuery,
        params: &SimulationParams,
    ) -> Result<AnalysisResult, ClientError>;

    /// `GET /trend-data?lat=&lng=`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    async fn trend(&self, at: Coordinate) -> Result<Vec<TrendPoint>, ClientError>;

    /// `GET /forecast?lat=&lng=`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    async fn forecast(&self, at: Coordinate) -> Result<Vec<ForecastPoint>, ClientError>;

    /// `GET /alerts?lat=&lng=`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    async fn alerts(&self, at: Coordinate) -> Result<Vec<Alert>, ClientError>;

    /// `GET /mitigation-plan?lat=&lng=`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    async fn mitigation_plan(&self, at: Coordinate) -> Result<MitigationPlan, ClientError>;

    /// `POST /generate-report` with the selected region or cell; returns
    /// the PDF bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Timeout`] if the report is not produced
    /// within the configured deadline, or another [`ClientError`] if the
    /// request fails.
    async fn generate_report(&self, selection: &Selection) -> Result<Vec<u8>, ClientError>;
}
