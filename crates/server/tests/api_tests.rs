//! Integration tests for the serving HTTP API

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use price_server::api::{AppState, FeedbackResponse, RunResponse};
use serving_lib::{
    health::{components, HealthRegistry},
    serving::{ColumnSpec, ModelManifest, Regressor},
    MemorySink, ModelRegistry, ModelSlot, RawInput, ServingMetrics, ServingPipeline,
    TelemetrySink,
};
use std::sync::Arc;
use tower::ServiceExt;

/// Adds a fixed offset to the area column.
struct OffsetRegressor(f32);

impl Regressor for OffsetRegressor {
    fn predict(&self, dense: &[f32]) -> anyhow::Result<f32> {
        Ok(self.0 + dense[0])
    }
}

fn area_manifest(version: &str) -> ModelManifest {
    ModelManifest {
        model_version: version.to_string(),
        columns: vec![ColumnSpec::Numeric { name: "area".to_string() }],
    }
}

fn sample_input() -> RawInput {
    RawInput {
        area: 5000.0,
        bedrooms: "3".to_string(),
        bathrooms: "2".to_string(),
        stories: "2".to_string(),
        parking: "1".to_string(),
        mainroad: "yes".to_string(),
        guestroom: "no".to_string(),
        basement: "yes".to_string(),
        hotwaterheating: "no".to_string(),
        airconditioning: "yes".to_string(),
        prefarea: "no".to_string(),
        furnishingstatus: "semi-furnished".to_string(),
    }
}

async fn setup_app() -> (Router, Arc<MemorySink>) {
    let registry = Arc::new(ModelRegistry::from_parts(
        ModelSlot::loaded(area_manifest("v1_old"), Box::new(OffsetRegressor(1000.0))),
        ModelSlot::loaded(area_manifest("v2_new"), Box::new(OffsetRegressor(2000.0))),
    ));
    let sink = Arc::new(MemorySink::new());
    let pipeline = ServingPipeline::new(registry, sink.clone() as Arc<dyn TelemetrySink>);

    let health_registry = HealthRegistry::new();
    health_registry.register(components::MODEL_REGISTRY).await;
    health_registry.register(components::TELEMETRY_LOG).await;
    health_registry.set_ready(true).await;

    let state = Arc::new(AppState::new(
        pipeline,
        health_registry,
        ServingMetrics::new(),
    ));
    (price_server::api::create_router(state), sink)
}

fn post_json(uri: &str, body: &impl serde::Serialize) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_run_returns_both_predictions() {
    let (app, _sink) = setup_app().await;

    let response = app
        .oneshot(post_json("/v1/sessions/s1/run", &sample_input()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: RunResponse = read_json(response).await;
    assert_eq!(body.session, "s1");
    assert_eq!(body.results.len(), 2);
    assert_eq!(body.results[0].model_version, "v1_old");
    assert_eq!(body.results[0].model_type, "baseline");
    assert_eq!(body.results[0].prediction, 6000.0);
    assert_eq!(body.results[1].model_version, "v2_new");
    assert_eq!(body.results[1].model_type, "improved");
    assert_eq!(body.results[1].prediction, 7000.0);
    // Both results of a run carry the same combined latency
    assert_eq!(body.results[0].latency_ms, body.results[1].latency_ms);
    assert!(body.input_summary.starts_with("area=5000, bedrooms=3"));
}

#[tokio::test]
async fn test_run_rejects_invalid_categorical() {
    let (app, _sink) = setup_app().await;

    let mut input = sample_input();
    input.bathrooms = "9".to_string();

    let response = app
        .oneshot(post_json("/v1/sessions/s1/run", &input))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = read_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("bathrooms"));
}

#[tokio::test]
async fn test_run_rejects_area_out_of_range() {
    let (app, _sink) = setup_app().await;

    let mut input = sample_input();
    input.area = 500.0;

    let response = app
        .oneshot(post_json("/v1/sessions/s1/run", &input))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_feedback_without_run_is_rejected() {
    let (app, sink) = setup_app().await;

    let response = app
        .oneshot(post_json(
            "/v1/sessions/fresh/feedback",
            &serde_json::json!({ "score": 4 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_feedback_after_run_writes_pair() {
    let (app, sink) = setup_app().await;

    let response = app
        .clone()
        .oneshot(post_json("/v1/sessions/s1/run", &sample_input()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            "/v1/sessions/s1/feedback",
            &serde_json::json!({ "score": 4, "text": "reasonable" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: FeedbackResponse = read_json(response).await;
    assert_eq!(body.records_written, 2);

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].model_version, "v1_old");
    assert_eq!(records[1].model_version, "v2_new");
    for record in &records {
        assert_eq!(record.feedback_score, 4);
        assert_eq!(record.feedback_text, "reasonable");
        assert!(record.input_summary.starts_with("area=5000"));
    }
    assert_eq!(records[0].timestamp, records[1].timestamp);
}

#[tokio::test]
async fn test_feedback_score_out_of_range_writes_nothing() {
    let (app, sink) = setup_app().await;

    let response = app
        .clone()
        .oneshot(post_json("/v1/sessions/s1/run", &sample_input()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            "/v1/sessions/s1/feedback",
            &serde_json::json!({ "score": 9 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let (app, sink) = setup_app().await;

    let response = app
        .clone()
        .oneshot(post_json("/v1/sessions/alice/run", &sample_input()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A different session has no cached run to correlate against
    let response = app
        .oneshot(post_json(
            "/v1/sessions/bob/feedback",
            &serde_json::json!({ "score": 3 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_healthz_endpoint() {
    let (app, _sink) = setup_app().await;

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = read_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["components"]["model_registry"].is_object());
    assert!(body["components"]["telemetry_log"].is_object());
}

#[tokio::test]
async fn test_readyz_endpoint() {
    let (app, _sink) = setup_app().await;

    let response = app
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = read_json(response).await;
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _sink) = setup_app().await;

    let response = app
        .clone()
        .oneshot(post_json("/v1/sessions/s1/run", &sample_input()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("price_server_prediction_runs_total"));
    assert!(text.contains("price_server_run_latency_seconds"));
}
