//! One scheduled run: fetch, render, upsert.

use crate::coordinator::UpsertCoordinator;
use crate::traits::{StateStore, TableSource};
use chrono::Utc;
use flightboard_core::{FlightboardResult, SyncOutcome, TableRef, Timestamp};
use flightboard_render::Renderer;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// The full per-invocation pipeline with its collaborators injected.
pub struct SyncJob {
    table: TableRef,
    source: Arc<dyn TableSource>,
    state: Arc<dyn StateStore>,
    renderer: Renderer,
    coordinator: UpsertCoordinator,
}

impl SyncJob {
    pub fn new(
        table: TableRef,
        source: Arc<dyn TableSource>,
        state: Arc<dyn StateStore>,
        renderer: Renderer,
        coordinator: UpsertCoordinator,
    ) -> Self {
        Self {
            table,
            source,
            state,
            renderer,
            coordinator,
        }
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// Run once, stamping the message with the current time.
    pub async fn run(&self) -> FlightboardResult<SyncOutcome> {
        self.run_at(Utc::now()).await
    }

    /// Run once with an explicit render timestamp.
    ///
    /// Source failures abort the run before anything is rendered.
    pub async fn run_at(&self, now: Timestamp) -> FlightboardResult<SyncOutcome> {
        let run_id = Uuid::now_v7();
        let span = tracing::info_span!("sync_run", run_id = %run_id, table = %self.table);

        self.run_inner(now).instrument(span).await
    }

    async fn run_inner(&self, now: Timestamp) -> FlightboardResult<SyncOutcome> {
        let snapshot = self.source.fetch_rows(&self.table).await?;
        let rendered = self.renderer.render(&snapshot, now);
        tracing::info!(
            rows = snapshot.len(),
            data_rows = rendered.data_rows,
            entries = rendered.entries.len(),
            content_hash = %rendered.content_hash(),
            "Rendered flight board"
        );

        let outcome = self.coordinator.sync(&rendered, self.state.as_ref()).await?;
        tracing::info!(outcome = %outcome, "Sync complete");
        Ok(outcome)
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
