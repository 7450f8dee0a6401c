//! Housing Price Monitor CLI
//!
//! A command-line tool for running side-by-side price predictions and
//! submitting feedback against the price serving API.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::PredictionInput;
use commands::{feedback, predict};

/// Housing Price Monitor CLI
#[derive(Parser)]
#[command(name = "price")]
#[command(author, version, about = "CLI for the Housing Price Monitor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via PRICE_API_URL env var)
    #[arg(long, env = "PRICE_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Session that correlates predictions with later feedback
    #[arg(long, env = "PRICE_SESSION", default_value = "cli")]
    pub session: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run both model versions for one house and compare predictions
    Predict {
        /// Area in square feet (1000-20000)
        #[arg(long)]
        area: f64,

        /// Number of bedrooms (1-6)
        #[arg(long, default_value = "3")]
        bedrooms: String,

        /// Number of bathrooms (1-4)
        #[arg(long, default_value = "2")]
        bathrooms: String,

        /// Number of stories (1-4)
        #[arg(long, default_value = "2")]
        stories: String,

        /// Number of parking spots (0-3)
        #[arg(long, default_value = "1")]
        parking: String,

        /// Connected to a main road (yes/no)
        #[arg(long, default_value = "yes")]
        mainroad: String,

        /// Has a guest room (yes/no)
        #[arg(long, default_value = "no")]
        guestroom: String,

        /// Has a basement (yes/no)
        #[arg(long, default_value = "no")]
        basement: String,

        /// Has hot water heating (yes/no)
        #[arg(long, default_value = "no")]
        hotwaterheating: String,

        /// Has air conditioning (yes/no)
        #[arg(long, default_value = "no")]
        airconditioning: String,

        /// In a preferred area (yes/no)
        #[arg(long, default_value = "no")]
        prefarea: String,

        /// Furnishing status (furnished, semi-furnished, unfurnished)
        #[arg(long, default_value = "semi-furnished")]
        furnishingstatus: String,
    },

    /// Submit feedback for the session's most recent prediction run
    Feedback {
        /// Accuracy score (1-5)
        #[arg(long)]
        score: i32,

        /// Optional free-text comment
        #[arg(long)]
        text: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Predict {
            area,
            bedrooms,
            bathrooms,
            stories,
            parking,
            mainroad,
            guestroom,
            basement,
            hotwaterheating,
            airconditioning,
            prefarea,
            furnishingstatus,
        } => {
            let input = PredictionInput {
                area,
                bedrooms,
                bathrooms,
                stories,
                parking,
                mainroad,
                guestroom,
                basement,
                hotwaterheating,
                airconditioning,
                prefarea,
                furnishingstatus,
            };
            predict::run_prediction(&client, &cli.session, input, cli.format).await?;
        }
        Commands::Feedback { score, text } => {
            feedback::submit_feedback(&client, &cli.session, score, text, cli.format).await?;
        }
    }

    Ok(())
}
