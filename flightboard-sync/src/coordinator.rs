//! Upsert coordinator: edit the known message or post a new one.

use crate::retry::{RetryFailure, RetryPolicy};
use crate::traits::{ChatTransport, StateStore};
use flightboard_core::{
    FlightboardResult, MessageId, RenderedMessage, SkipReason, SyncOutcome, TransportError,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Keeps exactly one live message in sync with the rendered board.
///
/// `sync` holds an internal lock for the whole read, decide and write cycle,
/// so concurrent calls on one coordinator never both create a message.
pub struct UpsertCoordinator {
    transport: Arc<dyn ChatTransport>,
    retry: RetryPolicy,
    slot_key: String,
    lock: Mutex<()>,
}

impl UpsertCoordinator {
    /// Create a coordinator storing the message id under `slot_key`.
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        retry: RetryPolicy,
        slot_key: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            retry,
            slot_key: slot_key.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn slot_key(&self) -> &str {
        &self.slot_key
    }

    /// Upsert `rendered` into the chat channel.
    ///
    /// # Returns
    /// * `Ok(SyncOutcome::Skipped)` - The snapshot had no data rows; nothing touched
    /// * `Ok(SyncOutcome::Edited)` - The stored message was edited; state unchanged
    /// * `Ok(SyncOutcome::Created)` - A new message was posted and its id stored
    /// * `Err(_)` - State failure, or a transport failure other than a stale id
    pub async fn sync(
        &self,
        rendered: &RenderedMessage,
        state: &dyn StateStore,
    ) -> FlightboardResult<SyncOutcome> {
        if rendered.is_empty_snapshot() {
            tracing::info!("Snapshot has no data rows, skipping");
            return Ok(SyncOutcome::Skipped(SkipReason::EmptySnapshot));
        }

        let _guard = self.lock.lock().await;

        if let Some(id) = self.stored_id(state).await? {
            let edited = self
                .retry
                .run("edit_message", || self.transport.edit_message(id, rendered))
                .await;
            match edited {
                Ok(()) => {
                    tracing::info!(message_id = %id, "Edited existing message");
                    return Ok(SyncOutcome::Edited(id));
                }
                Err(RetryFailure::Fatal(err)) if err.is_not_found() => {
                    tracing::warn!(
                        message_id = %id,
                        "Stored message no longer exists, posting a new one"
                    );
                }
                Err(failure) => return Err(TransportError::from(failure).into()),
            }
        }

        let id = self
            .retry
            .run("create_message", || self.transport.create_message(rendered))
            .await
            .map_err(TransportError::from)?;

        if let Err(err) = state.write_slot(&self.slot_key, &id.to_string()).await {
            tracing::error!(
                message_id = %id,
                slot = %self.slot_key,
                error = %err,
                "Posted message but failed to persist its id"
            );
            return Err(err.into());
        }

        tracing::info!(message_id = %id, "Posted new message");
        Ok(SyncOutcome::Created(id))
    }

    async fn stored_id(&self, state: &dyn StateStore) -> FlightboardResult<Option<MessageId>> {
        let raw = state.read_slot(&self.slot_key).await?;
        Ok(raw.and_then(|value| {
            let parsed = MessageId::parse(&value);
            if parsed.is_none() && !value.trim().is_empty() {
                tracing::warn!(
                    slot = %self.slot_key,
                    value = %value,
                    "Ignoring malformed stored message id"
                );
            }
            parsed
        }))
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
