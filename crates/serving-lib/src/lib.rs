//! Core library for the housing price A/B serving monitor
//!
//! This crate provides the prediction-serving and feedback-telemetry
//! pipeline:
//! - Feature adaptation and domain validation
//! - One-time model artifact loading and versioned inference
//! - The run/submit action handlers and per-session interaction state
//! - The append-only telemetry log
//! - Health checks and Prometheus metrics

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod serving;
pub mod telemetry;

pub use error::ServingError;
pub use models::*;
pub use observability::ServingMetrics;
pub use serving::{
    FeatureAdapter, FeedbackCollector, ModelConfig, ModelRegistry, ModelSlot, PredictionService,
    ServingPipeline,
};
pub use telemetry::{JsonlTelemetryLogger, MemorySink, TelemetrySink};
