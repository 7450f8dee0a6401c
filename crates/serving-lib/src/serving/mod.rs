//! Prediction serving pipeline

mod adapter;
mod feedback;
mod registry;
mod service;

pub use adapter::{FeatureAdapter, AREA_RANGE};
pub use feedback::{FeedbackCollector, SCORE_RANGE};
pub use registry::{
    ColumnSpec, ModelConfig, ModelManifest, ModelRegistry, ModelSlot, OnnxRegressor, Regressor,
};
pub use service::{PredictionService, ServingPipeline};
