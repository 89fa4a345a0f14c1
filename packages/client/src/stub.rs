//! Scripted in-memory [`AnalysisBackend`] for tests.
//!
//! `/analyze-region` responses are registered per coordinate and
//! `/simulate` responses are queued in call order; either can be held
//! back behind a gate to control completion order. Trend, forecast and
//! report responses are fixed until replaced, unless a gated reply is
//! queued, which the next call consumes. Failures are reported as
//! [`ClientError::Status`]. Every call is recorded so tests can assert on
//! request order.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bio_risk_geo::RegionQuery;
use bio_risk_models::{
    Alert, AnalysisResult, Coordinate, ForecastPoint, GridCell, Indicators, MitigationPlan,
    MlAssessment, RiskLevel, Rules, Selection, SimulationParams, TrendPoint,
};
use futures::channel::oneshot;

use crate::{AnalysisBackend, ClientError};

/// A backend call as recorded by [`StubBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// `POST /analyze-region`.
    AnalyzeRegion(Coordinate),
    /// `POST /simulate`.
    Simulate(Coordinate, SimulationParams),
    /// `GET /trend-data`.
    Trend(Coordinate),
    /// `GET /forecast`.
    Forecast(Coordinate),
    /// `GET /alerts`.
    Alerts(Coordinate),
    /// `GET /mitigation-plan`.
    MitigationPlan(Coordinate),
    /// `POST /generate-report`.
    GenerateReport(Option<Coordinate>),
}

struct Reply<T> {
    outcome: Result<T, u16>,
    gate: Option<oneshot::Receiver<()>>,
}

/// Scripted backend. See the module docs.
pub struct StubBackend {
    regions: Mutex<Vec<(Coordinate, Reply<AnalysisResult>)>>,
    simulations: Mutex<VecDeque<Reply<AnalysisResult>>>,
    trend: Mutex<Result<Vec<TrendPoint>, u16>>,
    gated_trend: Mutex<VecDeque<Reply<Vec<TrendPoint>>>>,
    forecast: Mutex<Result<Vec<ForecastPoint>, u16>>,
    gated_forecast: Mutex<VecDeque<Reply<Vec<ForecastPoint>>>>,
    alerts: Mutex<Result<Vec<Alert>, u16>>,
    mitigation: Mutex<Result<MitigationPlan, u16>>,
    report: Mutex<Result<Vec<u8>, u16>>,
    gated_report: Mutex<VecDeque<Reply<Vec<u8>>>>,
    calls: Mutex<Vec<Call>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StubBackend {
    /// A backend with no queued primary responses and empty auxiliary
    /// data.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regions: Mutex::new(Vec::new()),
            simulations: Mutex::new(VecDeque::new()),
            trend: Mutex::new(Ok(Vec::new())),
            gated_trend: Mutex::new(VecDeque::new()),
            forecast: Mutex::new(Ok(Vec::new())),
            gated_forecast: Mutex::new(VecDeque::new()),
            alerts: Mutex::new(Ok(Vec::new())),
            mitigation: Mutex::new(Err(404)),
            report: Mutex::new(Err(503)),
            gated_report: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Registers a successful `/analyze-region` response for the result's
    /// own location.
    pub fn push_region(&self, result: AnalysisResult) {
        lock(&self.regions).push((
            result.location,
            Reply {
                outcome: Ok(result),
                gate: None,
            },
        ));
    }

    /// Registers a failing `/analyze-region` response for `at`.
    pub fn push_region_failure(&self, at: Coordinate, status: u16) {
        lock(&self.regions).push((
            at,
            Reply {
                outcome: Err(status),
                gate: None,
            },
        ));
    }

    /// Registers a `/analyze-region` response that is only returned once
    /// the returned sender fires (or is dropped).
    pub fn push_region_gated(&self, result: AnalysisResult) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        lock(&self.regions).push((
            result.location,
            Reply {
                outcome: Ok(result),
                gate: Some(rx),
            },
        ));
        tx
    }

    /// Queues a successful `/simulate` response.
    pub fn push_simulation(&self, result: AnalysisResult) {
        lock(&self.simulations).push_back(Reply {
            outcome: Ok(result),
            gate: None,
        });
    }

    /// Queues a failing `/simulate` response.
    pub fn push_simulation_failure(&self, status: u16) {
        lock(&self.simulations).push_back(Reply {
            outcome: Err(status),
            gate: None,
        });
    }

    /// Queues a `/simulate` response released by the returned sender.
    pub fn push_simulation_gated(&self, result: AnalysisResult) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        lock(&self.simulations).push_back(Reply {
            outcome: Ok(result),
            gate: Some(rx),
        });
        tx
    }

    /// Sets the `/trend-data` response.
    pub fn set_trend(&self, outcome: Result<Vec<TrendPoint>, u16>) {
        *lock(&self.trend) = outcome;
    }

    /// Queues a `/trend-data` reply for the next call, released by the
    /// returned sender.
    pub fn push_trend_gated(&self, outcome: Result<Vec<TrendPoint>, u16>) -> oneshot::Sender<()> {
        gate(&self.gated_trend, outcome)
    }

    /// Sets the `/forecast` response.
    pub fn set_forecast(&self, outcome: Result<Vec<ForecastPoint>, u16>) {
        *lock(&self.forecast) = outcome;
    }

    /// Queues a `/forecast` reply for the next call, released by the
    /// returned sender.
    pub fn push_forecast_gated(
        &self,
        outcome: Result<Vec<ForecastPoint>, u16>,
    ) -> oneshot::Sender<()> {
        gate(&self.gated_forecast, outcome)
    }

    /// Sets the `/alerts` response.
    pub fn set_alerts(&self, outcome: Result<Vec<Alert>, u16>) {
        *lock(&self.alerts) = outcome;
    }

    /// Sets the `/mitigation-plan` response.
    pub fn set_mitigation(&self, outcome: Result<MitigationPlan, u16>) {
        *lock(&self.mitigation) = outcome;
    }

    /// Sets the `/generate-report` response.
    pub fn set_report(&self, outcome: Result<Vec<u8>, u16>) {
        *lock(&self.report) = outcome;
    }

    /// Queues a `/generate-report` reply for the next call, released by the
    /// returned sender.
    pub fn push_report_gated(&self, outcome: Result<Vec<u8>, u16>) -> oneshot::Sender<()> {
        gate(&self.gated_report, outcome)
    }

    /// All calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }
}

async fn release<T>(endpoint: &'static str, reply: Option<Reply<T>>) -> Result<T, ClientError> {
    let Some(reply) = reply else {
        return Err(ClientError::Status {
            endpoint,
            status: 503,
        });
    };
    if let Some(gate) = reply.gate {
        // A dropped sender releases the reply as well.
        let _ = gate.await;
    }
    reply
        .outcome
        .map_err(|status| ClientError::Status { endpoint, status })
}

fn gate<T>(queue: &Mutex<VecDeque<Reply<T>>>, outcome: Result<T, u16>) -> oneshot::Sender<()> {
    let (tx, rx) = oneshot::channel();
    lock(queue).push_back(Reply {
        outcome,
        gate: Some(rx),
    });
    tx
}

/// The next queued reply if there is one, otherwise the fixed response.
async fn queued_or_fixed<T: Clone + Send>(
    endpoint: &'static str,
    queue: &Mutex<VecDeque<Reply<T>>>,
    slot: &Mutex<Result<T, u16>>,
) -> Result<T, ClientError> {
    let reply = lock(queue).pop_front();
    match reply {
        Some(reply) => release(endpoint, Some(reply)).await,
        None => fixed(endpoint, slot),
    }
}

fn fixed<T: Clone>(endpoint: &'static str, slot: &Mutex<Result<T, u16>>) -> Result<T, ClientError> {
    lock(slot)
        .clone()
        .map_err(|status| ClientError::Status { endpoint, status })
}

#[async_trait::async_trait]
impl AnalysisBackend for StubBackend {
    async fn analyze_region(&self, query: &RegionQuery) -> Result<AnalysisResult, ClientError> {
        self.record(Call::AnalyzeRegion(query.coord));
        let reply = {
            let mut regions = lock(&self.regions);
            regions
                .iter()
                .position(|(at, _)| *at == query.coord)
                .map(|idx| regions.remove(idx).1)
        };
        release("/analyze-region", reply).await
    }

    async fn simulate(
        &self,
        query: &RegionQuery,
        params: &SimulationParams,
    ) -> Result<AnalysisResult, ClientError> {
        self.record(Call::Simulate(query.coord, *params));
        let reply = lock(&self.simulations).pop_front();
        release("/simulate", reply).await
    }

    async fn trend(&self, at: Coordinate) -> Result<Vec<TrendPoint>, ClientError> {
        self.record(Call::Trend(at));
        queued_or_fixed("/trend-data", &self.gated_trend, &self.trend).await
    }

    async fn forecast(&self, at: Coordinate) -> Result<Vec<ForecastPoint>, ClientError> {
        self.record(Call::Forecast(at));
        queued_or_fixed("/forecast", &self.gated_forecast, &self.forecast).await
    }

    async fn alerts(&self, at: Coordinate) -> Result<Vec<Alert>, ClientError> {
        self.record(Call::Alerts(at));
        fixed("/alerts", &self.alerts)
    }

    async fn mitigation_plan(&self, at: Coordinate) -> Result<MitigationPlan, ClientError> {
        self.record(Call::MitigationPlan(at));
        fixed("/mitigation-plan", &self.mitigation)
    }

    async fn generate_report(&self, selection: &Selection) -> Result<Vec<u8>, ClientError> {
        self.record(Call::GenerateReport(selection.location()));
        queued_or_fixed("/generate-report", &self.gated_report, &self.report).await
    }
}

/// Builds an analysis centered on `at` with a `cells`-long grid whose
/// cells are offset from the center and share `risk_level`.
#[must_use]
pub fn sample_analysis(at: Coordinate, risk_level: RiskLevel, cells: usize) -> AnalysisResult {
    #[allow(clippy::cast_precision_loss)]
    let grid = (0..cells)
        .map(|i| GridCell {
            grid_id: format!("G-{i}"),
            location: Some(Coordinate::new(
                at.lat + 0.01 * i as f64,
                at.lng - 0.01 * i as f64,
            )),
            indicators: Some(Indicators {
                ndvi: Some(0.5),
                temperature: Some(29.0),
                forest_coverage: Some(60.0),
                biomass: Some(120.0),
                ..Indicators::default()
            }),
            rules: Some(Rules {
                risk_level,
                risk_score: 5.0,
                reasons: vec![],
            }),
            ml: Some(MlAssessment {
                confidence: Some(0.9),
                ..MlAssessment::default()
            }),
            impacts: vec![],
            interventions: vec![],
        })
        .collect();

    AnalysisResult {
        location: at,
        grid_id: Some(format!("G-{}", cells / 2)),
        grid,
        indicators: Some(Indicators {
            ndvi: Some(0.62),
            temperature: Some(31.0),
            forest_coverage: Some(78.3),
            biomass: Some(140.0),
            ..Indicators::default()
        }),
        rules: Some(Rules {
            risk_level,
            risk_score: 6.5,
            reasons: vec!["Vegetation decline".to_string()],
        }),
        ml: Some(MlAssessment {
            confidence: Some(0.94),
            ..MlAssessment::default()
        }),
        impacts: vec![],
        interventions: vec![],
    }
}

/// A single trend point for fixtures.
#[must_use]
pub fn trend_point(date: &str, ndvi: f64) -> TrendPoint {
    TrendPoint {
        date: date.to_string(),
        ndvi,
        temperature: 24.5,
        decline_pct: None,
    }
}

/// A single forecast point for fixtures.
#[must_use]
pub fn forecast_point(date: &str, risk_score: f64) -> ForecastPoint {
    ForecastPoint {
        date: date.to_string(),
        risk_score,
        event: None,
        label: None,
    }
}
