//! Price server - serves two housing price model versions side by side
//!
//! Exposes the run/submit actions over HTTP, records combined per-run
//! latency, and appends prediction+feedback telemetry to an append-only
//! monitoring log.

use anyhow::{Context, Result};
use price_server::{api, config};
use serving_lib::{
    health::{components, HealthRegistry},
    JsonlTelemetryLogger, ModelConfig, ModelRegistry, ModelVersion, ServingMetrics,
    ServingPipeline,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!(version = SERVER_VERSION, "Starting price-server");

    let config = config::ServerConfig::load()?;

    // One-time model load; failures are recorded per slot and surface as
    // 503s on the affected runs.
    let registry = ModelRegistry::ensure_loaded(&ModelConfig {
        model_dir: PathBuf::from(&config.model_dir),
    });

    let health_registry = HealthRegistry::new();
    health_registry.register(components::MODEL_REGISTRY).await;
    health_registry.register(components::TELEMETRY_LOG).await;
    for version in [ModelVersion::V1, ModelVersion::V2] {
        if let Some(reason) = registry.load_failure(version) {
            health_registry
                .set_degraded(components::MODEL_REGISTRY, format!("{version}: {reason}"))
                .await;
        }
    }

    let metrics = ServingMetrics::new();
    metrics.set_model_info(ModelVersion::V1.label(), ModelVersion::V1.model_type());
    metrics.set_model_info(ModelVersion::V2.label(), ModelVersion::V2.model_type());

    let logger = JsonlTelemetryLogger::open(&config.telemetry_path)
        .context("Failed to open telemetry log")?;
    info!(path = %config.telemetry_path, "Telemetry log opened");

    let pipeline = ServingPipeline::new(registry, Arc::new(logger));
    let app_state = Arc::new(api::AppState::new(
        pipeline,
        health_registry.clone(),
        metrics,
    ));

    // Mark server as ready after initialization
    health_registry.set_ready(true).await;

    let _api_server = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    Ok(())
}
