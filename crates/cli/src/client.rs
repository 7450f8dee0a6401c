//! API client for communicating with the price serving API

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

/// API client for the price serving API
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Run both model versions for one input
    pub async fn run_prediction(&self, session: &str, input: &PredictionInput) -> Result<RunResponse> {
        let path = format!("v1/sessions/{}/run", session);
        let url = self.base_url.join(&path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(input)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Submit feedback against the session's most recent run.
    ///
    /// A 409 means the session has no run to correlate against; that is a
    /// normal outcome for the caller to report, not a transport failure.
    pub async fn submit_feedback(
        &self,
        session: &str,
        feedback: &FeedbackInput,
    ) -> Result<FeedbackOutcome> {
        let path = format!("v1/sessions/{}/feedback", session);
        let url = self.base_url.join(&path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(feedback)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            let error: ErrorResponse = response.json().await.unwrap_or(ErrorResponse {
                error: "no prediction run to correlate feedback with".to_string(),
            });
            return Ok(FeedbackOutcome::Rejected(error.error));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        let logged = response.json().await.context("Failed to parse response")?;
        Ok(FeedbackOutcome::Logged(logged))
    }
}

/// Result of a feedback submission
#[derive(Debug)]
pub enum FeedbackOutcome {
    Logged(FeedbackResponse),
    Rejected(String),
}

// API request/response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionInput {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub model_version: String,
    pub model_type: String,
    pub prediction: f64,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    pub session: String,
    pub results: Vec<PredictionResult>,
    pub input_summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackInput {
    pub score: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub session: String,
    pub records_written: usize,
    pub records: Vec<TelemetryRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
