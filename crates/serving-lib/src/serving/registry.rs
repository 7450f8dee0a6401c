//! Model registry: one-time artifact loading and versioned inference
//!
//! Loads the two regression artifacts exactly once per process via a
//! `OnceLock` guard. Each artifact is an ONNX linear regressor (run with
//! tract) paired with a JSON manifest that declares its dense input layout,
//! so the categorical encoding ships with the artifact and stays opaque to
//! the feature adapter.

use crate::error::ServingError;
use crate::models::{ColumnValue, FeatureColumns, ModelVersion};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tract_onnx::prelude::*;
use tracing::{info, warn};

/// Process-global registry handle; first access performs the load.
static REGISTRY: OnceLock<Arc<ModelRegistry>> = OnceLock::new();

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Where the model artifacts live on disk.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model_dir: PathBuf,
}

/// One column of a model's dense input layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnSpec {
    /// Passed through as a single f32.
    Numeric { name: String },
    /// Expanded to one f32 per category. Unknown categories encode as all
    /// zeros, matching the artifact's training-time encoder.
    OneHot { name: String, categories: Vec<String> },
}

/// Sidecar manifest shipped next to each ONNX artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    pub model_version: String,
    pub columns: Vec<ColumnSpec>,
}

impl ModelManifest {
    /// Width of the dense vector this layout produces.
    pub fn dense_width(&self) -> usize {
        self.columns
            .iter()
            .map(|spec| match spec {
                ColumnSpec::Numeric { .. } => 1,
                ColumnSpec::OneHot { categories, .. } => categories.len(),
            })
            .sum()
    }

    /// Encode named feature columns into the dense layout.
    ///
    /// A missing column or a kind mismatch is a shape error; the adapter
    /// validates domains long before this point, so failures here are
    /// defensive.
    pub fn encode(&self, features: &dyn FeatureColumns) -> Result<Vec<f32>> {
        let columns = features.columns();
        let lookup: HashMap<&str, ColumnValue<'_>> =
            columns.iter().map(|(name, value)| (*name, *value)).collect();

        let mut dense = Vec::with_capacity(self.dense_width());
        for spec in &self.columns {
            match spec {
                ColumnSpec::Numeric { name } => match lookup.get(name.as_str()) {
                    Some(ColumnValue::Number(value)) => dense.push(*value as f32),
                    Some(ColumnValue::Category(_)) => {
                        anyhow::bail!("column `{}` is categorical, expected numeric", name)
                    }
                    None => anyhow::bail!("feature vector is missing column `{}`", name),
                },
                ColumnSpec::OneHot { name, categories } => match lookup.get(name.as_str()) {
                    Some(ColumnValue::Category(value)) => {
                        for category in categories {
                            dense.push(if category == value { 1.0 } else { 0.0 });
                        }
                    }
                    Some(ColumnValue::Number(_)) => {
                        anyhow::bail!("column `{}` is numeric, expected categorical", name)
                    }
                    None => anyhow::bail!("feature vector is missing column `{}`", name),
                },
            }
        }
        Ok(dense)
    }
}

/// Inference seam over a loaded artifact. Production uses tract; tests
/// inject in-memory doubles.
pub trait Regressor: Send + Sync {
    fn predict(&self, dense: &[f32]) -> Result<f32>;
}

/// ONNX-backed regressor using tract for lightweight inference.
pub struct OnnxRegressor {
    plan: TractModel,
    input_width: usize,
}

impl OnnxRegressor {
    /// Load and optimize an ONNX artifact from bytes.
    pub fn load(model_bytes: &[u8], input_width: usize) -> Result<Self> {
        let plan = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, input_width]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(Self { plan, input_width })
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, dense: &[f32]) -> Result<f32> {
        if dense.len() != self.input_width {
            anyhow::bail!(
                "input has {} values, model expects {}",
                dense.len(),
                self.input_width
            );
        }
        let input: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, self.input_width), dense.to_vec())?.into();
        let result = self.plan.run(tvec!(input.into()))?;
        let output = result.get(0).context("No output from model")?;
        let view = output.to_array_view::<f32>()?;
        view.iter().next().copied().context("Model returned an empty output")
    }
}

/// Outcome of one artifact load. A failed load is remembered rather than
/// propagated; the failure surfaces as `ModelUnavailable` at predict time.
pub enum ModelSlot {
    Loaded {
        manifest: ModelManifest,
        regressor: Box<dyn Regressor>,
    },
    Failed(String),
}

impl ModelSlot {
    pub fn loaded(manifest: ModelManifest, regressor: Box<dyn Regressor>) -> Self {
        ModelSlot::Loaded { manifest, regressor }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        ModelSlot::Failed(reason.into())
    }
}

/// Holds both model versions behind an immutable, process-lifetime handle.
pub struct ModelRegistry {
    v1: ModelSlot,
    v2: ModelSlot,
}

impl ModelRegistry {
    /// Return the process-global registry, loading both artifacts on first
    /// access. Concurrent first calls cannot double-load: the `OnceLock`
    /// runs the loader exactly once and every caller shares the handle.
    pub fn ensure_loaded(config: &ModelConfig) -> Arc<ModelRegistry> {
        REGISTRY.get_or_init(|| Arc::new(Self::load(config))).clone()
    }

    /// Load both artifacts from the configured directory. Never fails as a
    /// whole; a broken artifact is recorded per slot.
    pub fn load(config: &ModelConfig) -> Self {
        Self {
            v1: Self::load_slot(&config.model_dir, ModelVersion::V1),
            v2: Self::load_slot(&config.model_dir, ModelVersion::V2),
        }
    }

    /// Assemble a registry from pre-built slots. Used by tests and by any
    /// embedder that manages artifacts itself.
    pub fn from_parts(v1: ModelSlot, v2: ModelSlot) -> Self {
        Self { v1, v2 }
    }

    fn load_slot(dir: &Path, version: ModelVersion) -> ModelSlot {
        match Self::try_load(dir, version) {
            Ok((manifest, regressor)) => {
                info!(
                    version = %version,
                    manifest_version = %manifest.model_version,
                    input_width = manifest.dense_width(),
                    "Loaded model artifact"
                );
                ModelSlot::loaded(manifest, regressor)
            }
            Err(e) => {
                warn!(version = %version, error = %e, "Failed to load model artifact");
                ModelSlot::failed(format!("{e:#}"))
            }
        }
    }

    fn try_load(dir: &Path, version: ModelVersion) -> Result<(ModelManifest, Box<dyn Regressor>)> {
        let stem = match version {
            ModelVersion::V1 => "model_v1",
            ModelVersion::V2 => "model_v2",
        };

        let manifest_path = dir.join(format!("{stem}.json"));
        let manifest_bytes = std::fs::read(&manifest_path)
            .with_context(|| format!("Failed to read manifest {:?}", manifest_path))?;
        let manifest: ModelManifest = serde_json::from_slice(&manifest_bytes)
            .with_context(|| format!("Failed to parse manifest {:?}", manifest_path))?;

        let artifact_path = dir.join(format!("{stem}.onnx"));
        let model_bytes = std::fs::read(&artifact_path)
            .with_context(|| format!("Failed to read artifact {:?}", artifact_path))?;
        let regressor = OnnxRegressor::load(&model_bytes, manifest.dense_width())?;

        Ok((manifest, Box::new(regressor)))
    }

    fn slot(&self, version: ModelVersion) -> &ModelSlot {
        match version {
            ModelVersion::V1 => &self.v1,
            ModelVersion::V2 => &self.v2,
        }
    }

    /// Load failure reason for a version, if its artifact is unavailable.
    pub fn load_failure(&self, version: ModelVersion) -> Option<&str> {
        match self.slot(version) {
            ModelSlot::Loaded { .. } => None,
            ModelSlot::Failed(reason) => Some(reason),
        }
    }

    /// Run one model version over a feature vector.
    pub fn predict(
        &self,
        version: ModelVersion,
        features: &dyn FeatureColumns,
    ) -> Result<f64, ServingError> {
        let (manifest, regressor) = match self.slot(version) {
            ModelSlot::Loaded { manifest, regressor } => (manifest, regressor),
            ModelSlot::Failed(reason) => {
                return Err(ServingError::ModelUnavailable {
                    version,
                    reason: reason.clone(),
                })
            }
        };

        let dense = manifest
            .encode(features)
            .map_err(|source| ServingError::Inference { version, source })?;
        let value = regressor
            .predict(&dense)
            .map_err(|source| ServingError::Inference { version, source })?;
        Ok(f64::from(value))
    }
}
