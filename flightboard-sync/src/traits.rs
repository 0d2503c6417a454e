//! Collaborator traits.
//!
//! The coordinator only ever talks to these seams; HTTP implementations
//! live in `flightboard-clients` and test doubles in
//! `flightboard-test-utils`.

use async_trait::async_trait;
use flightboard_core::{
    MessageId, RenderedMessage, SourceError, StateError, TableRef, TableSnapshot, TransportError,
};

/// Reads the current snapshot of a table.
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Fetch every row of the table, header rows included.
    ///
    /// # Returns
    /// * `Ok(TableSnapshot)` - Rows in sheet order
    /// * `Err(SourceError)` - Fatal for the run, never retried
    async fn fetch_rows(&self, table: &TableRef) -> Result<TableSnapshot, SourceError>;
}

/// Durable key/value slot holding the last posted message id.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the raw slot value. Absent slots read as `None`.
    async fn read_slot(&self, key: &str) -> Result<Option<String>, StateError>;

    /// Overwrite the slot value.
    async fn write_slot(&self, key: &str, value: &str) -> Result<(), StateError>;
}

/// Posts and edits the single mirrored message.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post a new message.
    ///
    /// # Returns
    /// * `Ok(MessageId)` - Id of the created message
    /// * `Err(TransportError)` - Classified failure
    async fn create_message(&self, message: &RenderedMessage) -> Result<MessageId, TransportError>;

    /// Replace the content of an existing message.
    ///
    /// # Returns
    /// * `Ok(())` - Edited
    /// * `Err(TransportError::NotFound)` - The message no longer exists
    /// * `Err(_)` - Any other classified failure
    async fn edit_message(
        &self,
        id: MessageId,
        message: &RenderedMessage,
    ) -> Result<(), TransportError>;
}
