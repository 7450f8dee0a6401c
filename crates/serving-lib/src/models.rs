//! Core data models for the prediction serving pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two regression model versions served side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelVersion {
    V1,
    V2,
}

impl ModelVersion {
    /// Wire label recorded in telemetry.
    pub fn label(&self) -> &'static str {
        match self {
            ModelVersion::V1 => "v1_old",
            ModelVersion::V2 => "v2_new",
        }
    }

    /// Model family label recorded alongside the version.
    pub fn model_type(&self) -> &'static str {
        match self {
            ModelVersion::V1 => "baseline",
            ModelVersion::V2 => "improved",
        }
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw user-supplied feature values for one prediction request.
///
/// `area` is numeric; the remaining eleven fields are categorical and must
/// belong to the finite domains enforced by the feature adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInput {
    pub area: f64,
    pub bedrooms: String,
    pub bathrooms: String,
    pub stories: String,
    pub parking: String,
    pub mainroad: String,
    pub guestroom: String,
    pub basement: String,
    pub hotwaterheating: String,
    pub airconditioning: String,
    pub prefarea: String,
    pub furnishingstatus: String,
}

impl RawInput {
    /// Human-readable rendering of all twelve fields in a fixed order.
    ///
    /// Captured once at run time and reused verbatim for every telemetry
    /// record written from that run, even if the input changes before submit.
    pub fn summary(&self) -> String {
        format!(
            "area={}, bedrooms={}, bathrooms={}, stories={}, mainroad={}, guestroom={}, \
             basement={}, hotwaterheating={}, airconditioning={}, parking={}, prefarea={}, \
             furnishingstatus={}",
            self.area,
            self.bedrooms,
            self.bathrooms,
            self.stories,
            self.mainroad,
            self.guestroom,
            self.basement,
            self.hotwaterheating,
            self.airconditioning,
            self.parking,
            self.prefarea,
            self.furnishingstatus,
        )
    }
}

/// A single named column handed to the model registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnValue<'a> {
    Number(f64),
    Category(&'a str),
}

/// Ordered, named columns a specific model version consumes.
pub trait FeatureColumns {
    fn columns(&self) -> Vec<(&'static str, ColumnValue<'_>)>;
}

/// Feature vector for the baseline model: area only.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVectorV1 {
    pub area: f64,
}

impl FeatureColumns for FeatureVectorV1 {
    fn columns(&self) -> Vec<(&'static str, ColumnValue<'_>)> {
        vec![("area", ColumnValue::Number(self.area))]
    }
}

/// Feature vector for the improved model: all twelve fields, in the exact
/// order the v2 artifact's preprocessing stage expects (area first, then
/// bedrooms, bathrooms, stories, mainroad, guestroom, basement,
/// hotwaterheating, airconditioning, parking, prefarea, furnishingstatus).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVectorV2 {
    pub area: f64,
    pub bedrooms: String,
    pub bathrooms: String,
    pub stories: String,
    pub mainroad: String,
    pub guestroom: String,
    pub basement: String,
    pub hotwaterheating: String,
    pub airconditioning: String,
    pub parking: String,
    pub prefarea: String,
    pub furnishingstatus: String,
}

impl FeatureColumns for FeatureVectorV2 {
    fn columns(&self) -> Vec<(&'static str, ColumnValue<'_>)> {
        vec![
            ("area", ColumnValue::Number(self.area)),
            ("bedrooms", ColumnValue::Category(&self.bedrooms)),
            ("bathrooms", ColumnValue::Category(&self.bathrooms)),
            ("stories", ColumnValue::Category(&self.stories)),
            ("mainroad", ColumnValue::Category(&self.mainroad)),
            ("guestroom", ColumnValue::Category(&self.guestroom)),
            ("basement", ColumnValue::Category(&self.basement)),
            ("hotwaterheating", ColumnValue::Category(&self.hotwaterheating)),
            ("airconditioning", ColumnValue::Category(&self.airconditioning)),
            ("parking", ColumnValue::Category(&self.parking)),
            ("prefarea", ColumnValue::Category(&self.prefarea)),
            ("furnishingstatus", ColumnValue::Category(&self.furnishingstatus)),
        ]
    }
}

/// One model's output for a single run.
///
/// `latency_ms` is the combined wall-clock time spanning both model calls of
/// the run; both results of a run carry the same value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub model_version: String,
    pub model_type: String,
    pub prediction: f64,
    pub latency_ms: f64,
}

/// Everything captured by one successful run: both predictions plus the
/// input summary frozen at run time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub results: [PredictionResult; 2],
    pub input_summary: String,
}

impl RunSnapshot {
    /// Combined latency of the run, shared by both results.
    pub fn latency_ms(&self) -> f64 {
        self.results[0].latency_ms
    }
}

/// Session-scoped cache of the most recent successful prediction run.
///
/// Starts `Empty`; a successful run replaces the cached snapshot in place.
/// There is no submitted or cleared state: feedback may be submitted any
/// number of times against the same snapshot, and only another successful
/// run overwrites it.
#[derive(Debug, Clone, Default)]
pub enum InteractionState {
    #[default]
    Empty,
    Ready(RunSnapshot),
}

impl InteractionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, InteractionState::Ready(_))
    }

    pub fn snapshot(&self) -> Option<&RunSnapshot> {
        match self {
            InteractionState::Empty => None,
            InteractionState::Ready(snapshot) => Some(snapshot),
        }
    }

    /// Replace the cached run. Only called after a fully successful run, so
    /// a failed run can never leave a partial state behind.
    pub fn replace(&mut self, snapshot: RunSnapshot) {
        *self = InteractionState::Ready(snapshot);
    }
}

/// User feedback for the most recent run. Ephemeral: built for one submit
/// action and never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub score: i32,
    #[serde(default)]
    pub text: Option<String>,
}

/// One persisted log row correlating a served prediction with user feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub model_version: String,
    pub model_type: String,
    pub input_summary: String,
    pub prediction: f64,
    pub latency_ms: f64,
    pub feedback_score: i32,
    pub feedback_text: String,
    pub timestamp: i64,
}
