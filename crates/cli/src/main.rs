//! Fleet Maintenance Monitor CLI
//!
//! A command-line tool for viewing fleet status, the maintenance event
//! log, and driving operator controls on a running monitor daemon.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{controls, events, fleet, predict};

/// Fleet Maintenance Monitor CLI
#[derive(Parser)]
#[command(name = "fmc")]
#[command(author, version, about = "CLI for the Fleet Maintenance Monitor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via FMC_API_URL env var)
    #[arg(long, env = "FMC_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the latest fleet snapshot
    Fleet,

    /// Show the rolling maintenance event log
    Events,

    /// Evaluate a single machine on demand
    Machine {
        /// Machine id (1-based roster id)
        id: u32,
    },

    /// Predict from hand-entered sensor values (no buffer involved)
    Predict {
        /// Machine id (1-based roster id)
        id: u32,

        /// Temperature in degrees Celsius
        #[arg(long, default_value_t = 75.0)]
        temperature: f32,

        /// Vibration level
        #[arg(long, default_value_t = 50.0)]
        vibration: f32,

        /// Pressure in bar
        #[arg(long, default_value_t = 3.0)]
        pressure: f32,

        /// Relative humidity in percent
        #[arg(long, default_value_t = 60.0)]
        humidity: f32,

        /// Energy consumption in kWh
        #[arg(long, default_value_t = 2.5)]
        energy: f32,
    },

    /// Clear every sequence buffer and the event log
    Reset,

    /// Set the refresh interval between fleet ticks
    Interval {
        /// Interval in seconds (clamped to the daemon's bounds)
        #[arg(value_name = "secs")]
        secs: u64,
    },

    /// Start the daemon's timer loop
    Start,

    /// Stop the daemon's timer loop
    Stop,

    /// Trigger one fleet evaluation immediately
    Tick,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Fleet => {
            fleet::show_fleet(&client, cli.format).await?;
        }
        Commands::Events => {
            events::show_events(&client, cli.format).await?;
        }
        Commands::Machine { id } => {
            fleet::evaluate_machine(&client, id, cli.format).await?;
        }
        Commands::Predict {
            id,
            temperature,
            vibration,
            pressure,
            humidity,
            energy,
        } => {
            let request = client::PredictRequest {
                temperature,
                vibration,
                pressure,
                humidity,
                energy_consumption: energy,
            };
            predict::predict(&client, id, request, cli.format).await?;
        }
        Commands::Reset => {
            controls::reset(&client).await?;
        }
        Commands::Interval { secs } => {
            controls::set_interval(&client, secs).await?;
        }
        Commands::Start => {
            controls::set_running(&client, true).await?;
        }
        Commands::Stop => {
            controls::set_running(&client, false).await?;
        }
        Commands::Tick => {
            controls::tick(&client, cli.format).await?;
        }
    }

    Ok(())
}
