//! Feedback validation and telemetry packaging

use crate::error::ServingError;
use crate::models::{FeedbackRecord, PredictionResult, RunSnapshot, TelemetryRecord};

/// Accepted feedback score range, inclusive.
pub const SCORE_RANGE: (i32, i32) = (1, 5);

pub struct FeedbackCollector;

impl FeedbackCollector {
    /// Score must be in [1, 5]; text is an opaque passthrough.
    pub fn validate(feedback: &FeedbackRecord) -> Result<(), ServingError> {
        if feedback.score < SCORE_RANGE.0 || feedback.score > SCORE_RANGE.1 {
            return Err(ServingError::validation(
                "feedback_score",
                feedback.score.to_string(),
                format!("{}..={}", SCORE_RANGE.0, SCORE_RANGE.1),
            ));
        }
        Ok(())
    }

    /// Package one submission into its two telemetry records.
    ///
    /// Both records share the run's input summary and combined latency plus
    /// the feedback fields and timestamp; each carries its own model
    /// version, type and prediction.
    pub fn build_records(
        snapshot: &RunSnapshot,
        feedback: &FeedbackRecord,
        timestamp: i64,
    ) -> [TelemetryRecord; 2] {
        let text = feedback.text.clone().unwrap_or_default();
        let make = |result: &PredictionResult| TelemetryRecord {
            model_version: result.model_version.clone(),
            model_type: result.model_type.clone(),
            input_summary: snapshot.input_summary.clone(),
            prediction: result.prediction,
            latency_ms: result.latency_ms,
            feedback_score: feedback.score,
            feedback_text: text.clone(),
            timestamp,
        };
        [make(&snapshot.results[0]), make(&snapshot.results[1])]
    }
}
