//! Feedback command: score the most recent prediction run

use anyhow::Result;

use crate::client::{ApiClient, FeedbackInput, FeedbackOutcome};
use crate::output::{format_timestamp, print_success, print_warning, OutputFormat};

/// Submit feedback against the session's cached run
pub async fn submit_feedback(
    client: &ApiClient,
    session: &str,
    score: i32,
    text: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let outcome = client
        .submit_feedback(session, &FeedbackInput { score, text })
        .await?;

    match outcome {
        FeedbackOutcome::Logged(response) => match format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&response)?;
                println!("{}", json);
            }
            OutputFormat::Table => {
                print_success(&format!(
                    "Feedback logged: {} records written",
                    response.records_written
                ));
                for record in &response.records {
                    println!(
                        "  {} ({}): score={} at {}",
                        record.model_version,
                        record.model_type,
                        record.feedback_score,
                        format_timestamp(record.timestamp)
                    );
                }
            }
        },
        FeedbackOutcome::Rejected(reason) => {
            print_warning(&reason);
        }
    }

    Ok(())
}
