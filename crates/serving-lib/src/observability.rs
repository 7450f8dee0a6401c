//! Prometheus metrics for the serving pipeline

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, GaugeVec, Histogram, IntCounter,
};
use std::sync::OnceLock;

/// Histogram buckets for run latency (seconds); both inferences together
/// are expected to finish well under a second.
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServingMetricsInner> = OnceLock::new();

struct ServingMetricsInner {
    run_latency_seconds: Histogram,
    prediction_runs: IntCounter,
    run_failures: IntCounter,
    feedback_submissions: IntCounter,
    feedback_rejections: IntCounter,
    telemetry_records: IntCounter,
    model_info: GaugeVec,
}

impl ServingMetricsInner {
    fn new() -> Self {
        Self {
            run_latency_seconds: register_histogram!(
                "price_server_run_latency_seconds",
                "Combined wall-clock time of one v1+v2 comparison run",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register run_latency_seconds"),

            prediction_runs: register_int_counter!(
                "price_server_prediction_runs_total",
                "Successful comparison runs"
            )
            .expect("Failed to register prediction_runs_total"),

            run_failures: register_int_counter!(
                "price_server_run_failures_total",
                "Comparison runs that failed validation or inference"
            )
            .expect("Failed to register run_failures_total"),

            feedback_submissions: register_int_counter!(
                "price_server_feedback_submissions_total",
                "Accepted feedback submissions"
            )
            .expect("Failed to register feedback_submissions_total"),

            feedback_rejections: register_int_counter!(
                "price_server_feedback_rejections_total",
                "Feedback submissions rejected for lack of a prior run"
            )
            .expect("Failed to register feedback_rejections_total"),

            telemetry_records: register_int_counter!(
                "price_server_telemetry_records_total",
                "Telemetry records appended to the monitoring log"
            )
            .expect("Failed to register telemetry_records_total"),

            model_info: register_gauge_vec!(
                "price_server_model_info",
                "Loaded model versions",
                &["version", "type"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct ServingMetrics {
    _private: (),
}

impl Default for ServingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServingMetrics {
    /// Create a metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServingMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServingMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_run_latency(&self, duration_secs: f64) {
        self.inner().run_latency_seconds.observe(duration_secs);
    }

    pub fn inc_prediction_runs(&self) {
        self.inner().prediction_runs.inc();
    }

    pub fn inc_run_failures(&self) {
        self.inner().run_failures.inc();
    }

    pub fn inc_feedback_submissions(&self) {
        self.inner().feedback_submissions.inc();
    }

    pub fn inc_feedback_rejections(&self) {
        self.inner().feedback_rejections.inc();
    }

    pub fn add_telemetry_records(&self, count: u64) {
        self.inner().telemetry_records.inc_by(count);
    }

    pub fn set_model_info(&self, version: &str, model_type: &str) {
        self.inner()
            .model_info
            .with_label_values(&[version, model_type])
            .set(1.0);
    }
}
