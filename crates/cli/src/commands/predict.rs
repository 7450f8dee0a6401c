//! Prediction command: run both model versions for one input

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, PredictionInput};
use crate::output::{format_latency, format_price, OutputFormat};

/// Row for the prediction comparison table
#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "Model")]
    model_version: String,
    #[tabled(rename = "Type")]
    model_type: String,
    #[tabled(rename = "Predicted Price")]
    prediction: String,
    #[tabled(rename = "Latency")]
    latency: String,
}

/// Run a comparison prediction and print both results
pub async fn run_prediction(
    client: &ApiClient,
    session: &str,
    input: PredictionInput,
    format: OutputFormat,
) -> Result<()> {
    let response = client.run_prediction(session, &input).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&response)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            let rows: Vec<PredictionRow> = response
                .results
                .iter()
                .map(|r| PredictionRow {
                    model_version: r.model_version.clone(),
                    model_type: r.model_type.clone(),
                    prediction: format_price(r.prediction),
                    latency: format_latency(r.latency_ms),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nInput: {}", response.input_summary);
        }
    }

    Ok(())
}
