//! Wiring configuration into a runnable job

use flightboard_clients::{DiscordClient, GoogleSheetsClient, SheetCellStateStore};
use flightboard_core::{FlightboardConfig, FlightboardResult, StateBackend};
use flightboard_render::Renderer;
use flightboard_sync::{FileStateStore, RetryPolicy, StateStore, SyncJob, UpsertCoordinator};
use std::sync::Arc;

/// Slot key used inside the local state file.
pub const FILE_SLOT_KEY: &str = "message_id";

/// Build the job from validated configuration. Makes no network calls.
pub fn build_job(config: &FlightboardConfig) -> FlightboardResult<SyncJob> {
    let sheets = GoogleSheetsClient::from_config(&config.client)?;
    let discord = DiscordClient::from_config(&config.client)?;

    let (state, slot_key): (Arc<dyn StateStore>, String) = match &config.state {
        StateBackend::SheetCell { cell } => (
            Arc::new(SheetCellStateStore::new(sheets.clone(), config.table.clone())),
            cell.clone(),
        ),
        StateBackend::File { path } => (
            Arc::new(FileStateStore::new(path.clone())),
            FILE_SLOT_KEY.to_string(),
        ),
    };

    tracing::info!(
        table = %config.table,
        channel_id = config.client.channel_id,
        state = ?config.state,
        max_attempts = config.retry.max_attempts,
        "Configuration loaded"
    );

    Ok(SyncJob::new(
        config.table.clone(),
        Arc::new(sheets),
        state,
        Renderer::new(config.render.clone()),
        UpsertCoordinator::new(
            Arc::new(discord),
            RetryPolicy::from_config(&config.retry),
            slot_key,
        ),
    ))
}
