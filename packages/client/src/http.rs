//! `reqwest` implementation of [`AnalysisBackend`].

use bio_risk_geo::RegionQuery;
use bio_risk_models::{
    Alert, AnalysisResult, Coordinate, ForecastPoint, MitigationPlan, Selection, SimulationParams,
    TrendPoint,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::BackendConfig;
use crate::{AnalysisBackend, ClientError};

const ANALYZE_REGION: &str = "/analyze-region";
const SIMULATE: &str = "/simulate";
const TREND_DATA: &str = "/trend-data";
const FORECAST: &str = "/forecast";
const ALERTS: &str = "/alerts";
const MITIGATION_PLAN: &str = "/mitigation-plan";
const GENERATE_REPORT: &str = "/generate-report";

/// Request body for `/simulate`: the region query with the simulation
/// parameters flattened alongside it.
#[derive(Serialize)]
struct SimulateBody<'a> {
    #[serde(flatten)]
    query: &'a RegionQuery,
    #[serde(flatten)]
    params: &'a SimulationParams,
}

/// HTTP client for the analysis backend.
pub struct HttpBackend {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpBackend {
    /// Creates a backend client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying HTTP client cannot
    /// be built.
    pub fn new(config: BackendConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    /// Creates a backend client from the embedded configuration and
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the configuration or HTTP client cannot
    /// be built.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(BackendConfig::from_env()?)
    }

    /// The configuration this client was built with.
    #[must_use]
    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }

    async fn post_json<B, T>(&self, endpoint: &'static str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        log::debug!("POST {endpoint}");
        let resp = self
            .client
            .post(self.config.endpoint_url(endpoint))
            .json(body)
            .send()
            .await?;
        decode(endpoint, resp).await
    }

    /// `GET` a list keyed by location. A JSON `null` body is treated as an
    /// empty list.
    async fn get_list<T>(
        &self,
        endpoint: &'static str,
        at: Coordinate,
    ) -> Result<Vec<T>, ClientError>
    where
        T: DeserializeOwned,
    {
        let items: Option<Vec<T>> = self.get_at(endpoint, at).await?;
        Ok(items.unwrap_or_default())
    }

    async fn get_at<T>(&self, endpoint: &'static str, at: Coordinate) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        log::debug!("GET {endpoint} at ({}, {})", at.lat, at.lng);
        let resp = self
            .client
            .get(self.config.endpoint_url(endpoint))
            .query(&[("lat", at.lat), ("lng", at.lng)])
            .send()
            .await?;
        decode(endpoint, resp).await
    }
}

/// Checks the status and decodes a JSON body.
async fn decode<T>(endpoint: &'static str, resp: reqwest::Response) -> Result<T, ClientError>
where
    T: DeserializeOwned,
{
    let status = resp.status();
    if !status.is_success() {
        return Err(ClientError::Status {
            endpoint,
            status: status.as_u16(),
        });
    }

    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|source| ClientError::Decode { endpoint, source })
}

#[async_trait::async_trait]
impl AnalysisBackend for HttpBackend {
    async fn analyze_region(&self, query: &RegionQuery) -> Result<AnalysisResult, ClientError> {
        self.post_json(ANALYZE_REGION, query).await
    }

    async fn simulate(
        &self,
        query: &RegionQuery,
        params: &SimulationParams,
    ) -> Result<AnalysisResult, ClientError> {
        self.post_json(SIMULATE, &SimulateBody { query, params })
            .await
    }

    async fn trend(&self, at: Coordinate) -> Result<Vec<TrendPoint>, ClientError> {
        self.get_list(TREND_DATA, at).await
    }

    async fn forecast(&self, at: Coordinate) -> Result<Vec<ForecastPoint>, ClientError> {
        self.get_list(FORECAST, at).await
    }

    async fn alerts(&self, at: Coordinate) -> Result<Vec<Alert>, ClientError> {
        self.get_list(ALERTS, at).await
    }

    async fn mitigation_plan(&self, at: Coordinate) -> Result<MitigationPlan, ClientError> {
        self.get_at(MITIGATION_PLAN, at).await
    }

    async fn generate_report(&self, selection: &Selection) -> Result<Vec<u8>, ClientError> {
        let timeout = self.config.report_timeout();
        log::info!(
            "Requesting report for {:?} (timeout {timeout:?})",
            selection.location()
        );

        let resp = self
            .client
            .post(self.config.endpoint_url(GENERATE_REPORT))
            .json(selection)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| timeout_or_http(e, self.config.report_timeout_secs))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                endpoint: GENERATE_REPORT,
                status: status.as_u16(),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| timeout_or_http(e, self.config.report_timeout_secs))?;
        Ok(bytes.to_vec())
    }
}

fn timeout_or_http(e: reqwest::Error, secs: u64) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout {
            endpoint: GENERATE_REPORT,
            secs,
        }
    } else {
        ClientError::Http(e)
    }
}
