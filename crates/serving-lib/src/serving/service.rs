//! Prediction service and the two action handlers
//!
//! `PredictionService::run` is the `RunPrediction` action: validate once,
//! derive both feature vectors, invoke both model versions, and measure one
//! combined latency spanning the two calls. `ServingPipeline` wires the
//! service to the session state machine and the telemetry sink, exposing the
//! two command handlers independently of any rendering surface.

use crate::error::ServingError;
use crate::models::{
    FeedbackRecord, InteractionState, ModelVersion, PredictionResult, RawInput, RunSnapshot,
    TelemetryRecord,
};
use crate::serving::adapter::FeatureAdapter;
use crate::serving::feedback::FeedbackCollector;
use crate::serving::registry::ModelRegistry;
use crate::telemetry::TelemetrySink;
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs both model versions for one request.
pub struct PredictionService {
    registry: Arc<ModelRegistry>,
}

impl PredictionService {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Execute one comparison run.
    ///
    /// Fails atomically: validation runs before any model call, and any
    /// failure returns without producing a snapshot, so the caller's cached
    /// state stays whatever it was.
    pub fn run(&self, input: &RawInput) -> Result<RunSnapshot, ServingError> {
        FeatureAdapter::validate(input)?;
        let fv1 = FeatureAdapter::project_v1(input);
        let fv2 = FeatureAdapter::project_v2(input);
        let input_summary = input.summary();

        let start = Instant::now();
        let v1_prediction = self.registry.predict(ModelVersion::V1, &fv1)?;
        let v2_prediction = self.registry.predict(ModelVersion::V2, &fv2)?;
        // One wall-clock figure covering both inferences; downstream
        // dashboards expect a single latency value per comparison run.
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        debug!(
            latency_ms,
            v1_prediction, v2_prediction, "Prediction run completed"
        );

        Ok(RunSnapshot {
            results: [
                PredictionResult {
                    model_version: ModelVersion::V1.label().to_string(),
                    model_type: ModelVersion::V1.model_type().to_string(),
                    prediction: v1_prediction,
                    latency_ms,
                },
                PredictionResult {
                    model_version: ModelVersion::V2.label().to_string(),
                    model_type: ModelVersion::V2.model_type().to_string(),
                    prediction: v2_prediction,
                    latency_ms,
                },
            ],
            input_summary,
        })
    }
}

/// The full request lifecycle behind the two user actions.
pub struct ServingPipeline {
    service: PredictionService,
    sink: Arc<dyn TelemetrySink>,
    last_timestamp: AtomicI64,
}

impl ServingPipeline {
    pub fn new(registry: Arc<ModelRegistry>, sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            service: PredictionService::new(registry),
            sink,
            last_timestamp: AtomicI64::new(0),
        }
    }

    /// `RunPrediction`: on success the session's cached state is replaced in
    /// place; on failure it is left untouched and the previous ready result
    /// (if any) stays visible.
    pub fn handle_run(
        &self,
        state: &mut InteractionState,
        input: &RawInput,
    ) -> Result<RunSnapshot, ServingError> {
        let snapshot = self.service.run(input).map_err(|e| {
            warn!(error = %e, "Prediction run failed");
            e
        })?;
        state.replace(snapshot.clone());
        info!(
            event = "prediction_run",
            latency_ms = snapshot.latency_ms(),
            "Prediction run cached"
        );
        Ok(snapshot)
    }

    /// `SubmitFeedback`: requires a ready state, validates the score, then
    /// appends exactly two telemetry records sharing the run's snapshot.
    /// Submitting repeatedly against the same run is allowed.
    pub fn handle_submit(
        &self,
        state: &InteractionState,
        feedback: &FeedbackRecord,
    ) -> Result<[TelemetryRecord; 2], ServingError> {
        let snapshot = state.snapshot().ok_or(ServingError::Rejected)?;
        FeedbackCollector::validate(feedback)?;

        let records = FeedbackCollector::build_records(snapshot, feedback, self.next_timestamp());
        self.sink
            .append_pair(&records)
            .map_err(ServingError::Telemetry)?;

        info!(
            event = "feedback_logged",
            feedback_score = feedback.score,
            records = 2,
            "Telemetry pair written"
        );
        Ok(records)
    }

    /// Telemetry timestamps are clamped non-decreasing across appends even
    /// if the wall clock steps backwards.
    fn next_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last_timestamp.fetch_max(now, Ordering::AcqRel).max(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serving::registry::{ColumnSpec, ModelManifest, ModelSlot, Regressor};
    use crate::telemetry::MemorySink;
    use std::sync::atomic::AtomicUsize;

    /// Linear stand-in that counts invocations.
    struct AreaRegressor {
        factor: f32,
        calls: Arc<AtomicUsize>,
    }

    impl Regressor for AreaRegressor {
        fn predict(&self, dense: &[f32]) -> anyhow::Result<f32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(dense[0] * self.factor)
        }
    }

    fn area_manifest(version: &str) -> ModelManifest {
        ModelManifest {
            model_version: version.to_string(),
            columns: vec![ColumnSpec::Numeric { name: "area".to_string() }],
        }
    }

    fn test_registry(calls: Arc<AtomicUsize>) -> Arc<ModelRegistry> {
        Arc::new(ModelRegistry::from_parts(
            ModelSlot::loaded(
                area_manifest("v1_old"),
                Box::new(AreaRegressor { factor: 2.0, calls: calls.clone() }),
            ),
            ModelSlot::loaded(
                area_manifest("v2_new"),
                Box::new(AreaRegressor { factor: 3.0, calls }),
            ),
        ))
    }

    fn test_pipeline() -> (ServingPipeline, Arc<MemorySink>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(MemorySink::new());
        let pipeline = ServingPipeline::new(test_registry(calls.clone()), sink.clone());
        (pipeline, sink, calls)
    }

    fn valid_input(area: f64) -> RawInput {
        RawInput {
            area,
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

    #[test]
    fn test_run_produces_ready_state() {
        let (pipeline, _sink, _calls) = test_pipeline();
        let mut state = InteractionState::default();

        let snapshot = pipeline.handle_run(&mut state, &valid_input(5000.0)).unwrap();

        assert!(state.is_ready());
        assert_eq!(snapshot.results[0].model_version, "v1_old");
        assert_eq!(snapshot.results[0].prediction, 10000.0);
        assert_eq!(snapshot.results[1].model_version, "v2_new");
        assert_eq!(snapshot.results[1].prediction, 15000.0);
        assert!(snapshot.latency_ms() >= 0.0);
        assert_eq!(snapshot.input_summary, valid_input(5000.0).summary());
    }

    #[test]
    fn test_results_share_combined_latency() {
        let (pipeline, _sink, _calls) = test_pipeline();
        let mut state = InteractionState::default();

        let snapshot = pipeline.handle_run(&mut state, &valid_input(5000.0)).unwrap();
        assert_eq!(snapshot.results[0].latency_ms, snapshot.results[1].latency_ms);
    }

    #[test]
    fn test_invalid_input_skips_models_and_preserves_state() {
        let (pipeline, _sink, calls) = test_pipeline();
        let mut state = InteractionState::default();
        pipeline.handle_run(&mut state, &valid_input(5000.0)).unwrap();
        let before = state.snapshot().unwrap().clone();
        let calls_before = calls.load(Ordering::SeqCst);

        let mut bad = valid_input(5000.0);
        bad.bathrooms = "9".to_string();
        let err = pipeline.handle_run(&mut state, &bad).unwrap_err();

        assert!(matches!(err, ServingError::Validation { field: "bathrooms", .. }));
        // No model was invoked and the cached run is untouched.
        assert_eq!(calls.load(Ordering::SeqCst), calls_before);
        let after = state.snapshot().unwrap();
        assert_eq!(after.results[0].prediction, before.results[0].prediction);
        assert_eq!(after.input_summary, before.input_summary);
    }

    #[test]
    fn test_unavailable_model_preserves_prior_state() {
        let (pipeline, _sink, _calls) = test_pipeline();
        let mut state = InteractionState::default();
        pipeline.handle_run(&mut state, &valid_input(2000.0)).unwrap();

        let broken = ServingPipeline::new(
            Arc::new(ModelRegistry::from_parts(
                ModelSlot::failed("artifact not found"),
                ModelSlot::failed("artifact not found"),
            )),
            Arc::new(MemorySink::new()),
        );
        let err = broken.handle_run(&mut state, &valid_input(3000.0)).unwrap_err();

        assert!(matches!(err, ServingError::ModelUnavailable { version: ModelVersion::V1, .. }));
        assert_eq!(state.snapshot().unwrap().results[0].prediction, 4000.0);
    }

    #[test]
    fn test_rerun_replaces_cached_run() {
        let (pipeline, _sink, _calls) = test_pipeline();
        let mut state = InteractionState::default();

        pipeline.handle_run(&mut state, &valid_input(2000.0)).unwrap();
        pipeline.handle_run(&mut state, &valid_input(3000.0)).unwrap();

        let snapshot = state.snapshot().unwrap();
        assert_eq!(snapshot.results[0].prediction, 6000.0);
        assert_eq!(snapshot.results[1].prediction, 9000.0);
        assert!(snapshot.input_summary.starts_with("area=3000"));
    }

    #[test]
    fn test_submit_before_run_is_rejected() {
        let (pipeline, sink, _calls) = test_pipeline();
        let state = InteractionState::default();

        let err = pipeline
            .handle_submit(&state, &FeedbackRecord { score: 4, text: None })
            .unwrap_err();

        assert!(matches!(err, ServingError::Rejected));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_submit_writes_exactly_one_pair() {
        let (pipeline, sink, _calls) = test_pipeline();
        let mut state = InteractionState::default();
        pipeline.handle_run(&mut state, &valid_input(5000.0)).unwrap();

        let feedback = FeedbackRecord {
            score: 4,
            text: Some("reasonable".to_string()),
        };
        let records = pipeline.handle_submit(&state, &feedback).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(records[0].model_version, "v1_old");
        assert_eq!(records[0].model_type, "baseline");
        assert_eq!(records[1].model_version, "v2_new");
        assert_eq!(records[1].model_type, "improved");
        assert_eq!(records[0].input_summary, records[1].input_summary);
        assert_eq!(records[0].latency_ms, records[1].latency_ms);
        assert_eq!(records[0].feedback_score, 4);
        assert_eq!(records[1].feedback_score, 4);
        assert_eq!(records[0].feedback_text, "reasonable");
        assert_ne!(records[0].prediction, records[1].prediction);
    }

    #[test]
    fn test_submit_is_repeatable_against_same_run() {
        let (pipeline, sink, _calls) = test_pipeline();
        let mut state = InteractionState::default();
        pipeline.handle_run(&mut state, &valid_input(5000.0)).unwrap();

        let feedback = FeedbackRecord { score: 5, text: None };
        pipeline.handle_submit(&state, &feedback).unwrap();
        pipeline.handle_submit(&state, &feedback).unwrap();

        assert_eq!(sink.len(), 4);
    }

    #[test]
    fn test_out_of_range_score_writes_nothing() {
        let (pipeline, sink, _calls) = test_pipeline();
        let mut state = InteractionState::default();
        pipeline.handle_run(&mut state, &valid_input(5000.0)).unwrap();

        let err = pipeline
            .handle_submit(&state, &FeedbackRecord { score: 6, text: None })
            .unwrap_err();

        assert!(matches!(err, ServingError::Validation { field: "feedback_score", .. }));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_timestamps_non_decreasing_across_submits() {
        let (pipeline, _sink, _calls) = test_pipeline();
        let mut state = InteractionState::default();
        pipeline.handle_run(&mut state, &valid_input(5000.0)).unwrap();

        let feedback = FeedbackRecord { score: 3, text: None };
        let first = pipeline.handle_submit(&state, &feedback).unwrap();
        let second = pipeline.handle_submit(&state, &feedback).unwrap();

        assert!(second[0].timestamp >= first[0].timestamp);
    }

    #[test]
    fn test_input_summary_frozen_at_run_time() {
        let (pipeline, _sink, _calls) = test_pipeline();
        let mut state = InteractionState::default();
        let mut input = valid_input(5000.0);
        pipeline.handle_run(&mut state, &input).unwrap();

        // Widgets change after the run; the snapshot keeps the run-time view.
        input.area = 9000.0;
        let records = pipeline
            .handle_submit(&state, &FeedbackRecord { score: 2, text: None })
            .unwrap();
        assert!(records[0].input_summary.starts_with("area=5000"));
    }
}
