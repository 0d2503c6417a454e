//! Flightboard Entry Point
//!
//! Runs one sync of the flight sheet into its Discord message and exits.
//! Exit code 0 when the board was edited, posted or skipped; 1 on any
//! failure, including configuration errors caught before the network is
//! touched.

mod app;
mod telemetry;

use flightboard_core::{FlightboardConfig, FlightboardResult, SyncOutcome};
use std::process::ExitCode;
use telemetry::TelemetryConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(e) = telemetry::init(&TelemetryConfig::from_env()) {
        eprintln!("flightboard: {}", e);
        return ExitCode::FAILURE;
    }

    match run().await {
        Ok(outcome) => {
            tracing::info!(
                outcome = %outcome,
                message_id = ?outcome.message_id().map(|id| id.get()),
                "Flight board sync finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "Flight board sync failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> FlightboardResult<SyncOutcome> {
    let config = FlightboardConfig::from_env()?;
    let job = app::build_job(&config)?;
    job.run().await
}
