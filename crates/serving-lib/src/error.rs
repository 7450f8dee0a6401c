//! Error taxonomy for the serving pipeline
//!
//! All variants are handled at the action boundary (run or submit); none of
//! them may leave a partial interaction state or an unpaired telemetry
//! record behind.

use crate::models::ModelVersion;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServingError {
    /// A field value is outside its declared domain, or a feedback score is
    /// out of range. Recoverable: surfaced to the user, nothing mutated,
    /// nothing written.
    #[error("invalid value {value:?} for field `{field}` (allowed: {allowed})")]
    Validation {
        field: &'static str,
        value: String,
        allowed: String,
    },

    /// The requested model artifact failed to load. Fatal for the run.
    #[error("model {version} is unavailable: {reason}")]
    ModelUnavailable {
        version: ModelVersion,
        reason: String,
    },

    /// The underlying inference call failed on validated input. Defensive:
    /// fatal for the run, any previous ready state is preserved.
    #[error("inference failed for model {version}")]
    Inference {
        version: ModelVersion,
        #[source]
        source: anyhow::Error,
    },

    /// Feedback submitted without a prior successful run. A business-rule
    /// outcome surfaced as a warning, not a fault.
    #[error("no prediction available; run a prediction before submitting feedback")]
    Rejected,

    /// The telemetry sink failed to append the record pair.
    #[error("failed to append telemetry records")]
    Telemetry(#[source] anyhow::Error),
}

impl ServingError {
    pub fn validation(
        field: &'static str,
        value: impl Into<String>,
        allowed: impl Into<String>,
    ) -> Self {
        ServingError::Validation {
            field,
            value: value.into(),
            allowed: allowed.into(),
        }
    }
}
