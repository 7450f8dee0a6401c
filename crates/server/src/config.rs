//! Server configuration

use anyhow::Result;
use serde::Deserialize;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding the model artifacts and manifests
    #[serde(default = "default_model_dir")]
    pub model_dir: String,

    /// Path of the append-only telemetry log
    #[serde(default = "default_telemetry_path")]
    pub telemetry_path: String,
}

fn default_api_port() -> u16 {
    8080
}

fn default_model_dir() -> String {
    "./models".to_string()
}

fn default_telemetry_path() -> String {
    "./monitoring_logs.jsonl".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            model_dir: default_model_dir(),
            telemetry_path: default_telemetry_path(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `PRICE_*` environment variables, falling back
    /// to defaults.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("PRICE"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }
}
