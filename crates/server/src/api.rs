//! HTTP API: the two serving actions plus health checks and metrics

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serving_lib::{
    health::{ComponentStatus, HealthRegistry},
    FeedbackRecord, InteractionState, PredictionResult, RawInput, ServingError, ServingMetrics,
    ServingPipeline, TelemetryRecord,
};
use std::sync::Arc;
use tracing::info;

/// Shared application state
pub struct AppState {
    pub pipeline: ServingPipeline,
    pub sessions: DashMap<String, InteractionState>,
    pub health_registry: HealthRegistry,
    pub metrics: ServingMetrics,
}

impl AppState {
    pub fn new(
        pipeline: ServingPipeline,
        health_registry: HealthRegistry,
        metrics: ServingMetrics,
    ) -> Self {
        Self {
            pipeline,
            sessions: DashMap::new(),
            health_registry,
            metrics,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunResponse {
    pub session: String,
    pub results: Vec<PredictionResult>,
    pub input_summary: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub score: i32,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub session: String,
    pub records_written: usize,
    pub records: Vec<TelemetryRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(error: &ServingError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match error {
        ServingError::Validation { .. } => StatusCode::BAD_REQUEST,
        ServingError::ModelUnavailable { .. } | ServingError::Inference { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ServingError::Rejected => StatusCode::CONFLICT,
        ServingError::Telemetry(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: error.to_string() }))
}

/// `RunPrediction`: run both model versions and cache the result in the
/// session's interaction state.
async fn run_prediction(
    State(state): State<Arc<AppState>>,
    Path(session): Path<String>,
    Json(input): Json<RawInput>,
) -> Response {
    let mut entry = state.sessions.entry(session.clone()).or_default();
    match state.pipeline.handle_run(entry.value_mut(), &input) {
        Ok(snapshot) => {
            state.metrics.inc_prediction_runs();
            state.metrics.observe_run_latency(snapshot.latency_ms() / 1000.0);
            (
                StatusCode::OK,
                Json(RunResponse {
                    session,
                    results: snapshot.results.to_vec(),
                    input_summary: snapshot.input_summary,
                }),
            )
                .into_response()
        }
        Err(e) => {
            state.metrics.inc_run_failures();
            error_response(&e).into_response()
        }
    }
}

/// `SubmitFeedback`: correlate feedback with the session's cached run and
/// append the telemetry pair. A session that never ran is rejected.
async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    Path(session): Path<String>,
    Json(request): Json<FeedbackRequest>,
) -> Response {
    let feedback = FeedbackRecord {
        score: request.score,
        text: request.text,
    };

    let result = match state.sessions.get(&session) {
        Some(entry) => state.pipeline.handle_submit(entry.value(), &feedback),
        None => state
            .pipeline
            .handle_submit(&InteractionState::Empty, &feedback),
    };

    match result {
        Ok(records) => {
            state.metrics.inc_feedback_submissions();
            state.metrics.add_telemetry_records(records.len() as u64);
            (
                StatusCode::OK,
                Json(FeedbackResponse {
                    session,
                    records_written: records.len(),
                    records: records.to_vec(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            if matches!(e, ServingError::Rejected) {
                state.metrics.inc_feedback_rejections();
            }
            error_response(&e).into_response()
        }
    }
}

/// Health check response - returns 200 if healthy/degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
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

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/sessions/:id/run", post(run_prediction))
        .route("/v1/sessions/:id/feedback", post(submit_feedback))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
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
