//! HTTP API for fleet state, operator controls, health checks and metrics

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use monitor_lib::{
    health::{ComponentStatus, HealthRegistry},
    models::{MachineId, SensorReading},
    observability::MonitorMetrics,
    scheduler::TickScheduler,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<TickScheduler>,
    pub health_registry: HealthRegistry,
    pub metrics: MonitorMetrics,
}

impl AppState {
    pub fn new(
        scheduler: Arc<TickScheduler>,
        health_registry: HealthRegistry,
        metrics: MonitorMetrics,
    ) -> Self {
        Self {
            scheduler,
            health_registry,
            metrics,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IntervalRequest {
    pub secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IntervalResponse {
    pub effective_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunRequest {
    pub run: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunResponse {
    pub running: bool,
}

/// Operator-supplied sensor values for a direct prediction.
///
/// Omitted fields fall back to mid-range defaults so a caller can vary one
/// sensor without spelling out the whole reading.
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_vibration")]
    pub vibration: f32,
    #[serde(default = "default_pressure")]
    pub pressure: f32,
    #[serde(default = "default_humidity")]
    pub humidity: f32,
    #[serde(default = "default_energy")]
    pub energy_consumption: f32,
}

fn default_temperature() -> f32 {
    75.0
}
fn default_vibration() -> f32 {
    50.0
}
fn default_pressure() -> f32 {
    3.0
}
fn default_humidity() -> f32 {
    60.0
}
fn default_energy() -> f32 {
    2.5
}

impl PredictRequest {
    fn into_reading(self) -> SensorReading {
        SensorReading {
            temperature: self.temperature,
            vibration: self.vibration,
            pressure: self.pressure,
            humidity: self.humidity,
            energy_consumption: self.energy_consumption,
            delta_minutes: 0.0,
            timestamp: chrono::Utc::now(),
        }
    }
}

fn error_body(message: impl Into<String>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": message.into() }))
}

/// Health check response - returns 200 if healthy, 503 if degraded/unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Latest fleet snapshot; 503 until the first tick has completed
async fn fleet(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.scheduler.latest_snapshot().await {
        Some(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            error_body("No fleet snapshot yet, waiting for first tick"),
        )
            .into_response(),
    }
}

/// Rolling maintenance-event log, oldest first
async fn events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.scheduler.recent_events().await)
}

/// Manual evaluation of a single machine
async fn evaluate_machine(
    State(state): State<Arc<AppState>>,
    Path(machine_id): Path<MachineId>,
) -> impl IntoResponse {
    match state.scheduler.evaluate_one(machine_id).await {
        Ok(evaluation) => (StatusCode::OK, Json(evaluation)).into_response(),
        Err(e) => (StatusCode::NOT_FOUND, error_body(e.to_string())).into_response(),
    }
}

/// Direct prediction from an operator-supplied reading; no buffer involved
async fn predict_machine(
    State(state): State<Arc<AppState>>,
    Path(machine_id): Path<MachineId>,
    Json(request): Json<PredictRequest>,
) -> impl IntoResponse {
    match state
        .scheduler
        .predict_manual(machine_id, &request.into_reading())
        .await
    {
        Ok(prediction) => (StatusCode::OK, Json(prediction)).into_response(),
        Err(e) => (StatusCode::NOT_FOUND, error_body(e.to_string())).into_response(),
    }
}

/// Clear every sequence buffer and the event log
async fn reset(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.scheduler.reset().await;
    StatusCode::NO_CONTENT
}

/// Adjust the refresh interval; the response reports the clamped value
async fn set_interval(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IntervalRequest>,
) -> impl IntoResponse {
    let effective = state
        .scheduler
        .set_interval(Duration::from_secs(request.secs));
    Json(IntervalResponse {
        effective_secs: effective.as_secs(),
    })
}

/// Toggle the timer loop on or off
async fn set_running(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RunRequest>,
) -> impl IntoResponse {
    state.scheduler.set_running(request.run);
    Json(RunResponse {
        running: state.scheduler.is_running(),
    })
}

/// Trigger one fleet evaluation immediately
async fn manual_tick(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.scheduler.tick().await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_body(e.to_string()),
        )
            .into_response(),
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/fleet", get(fleet))
        .route("/events", get(events))
        .route("/machines/:id/evaluate", post(evaluate_machine))
        .route("/machines/:id/predict", post(predict_machine))
        .route("/controls/reset", post(reset))
        .route("/controls/interval", post(set_interval))
        .route("/controls/run", post(set_running))
        .route("/controls/tick", post(manual_tick))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
