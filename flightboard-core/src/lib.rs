//! Flightboard Core - Data Types
//!
//! Pure data structures shared by every other crate: table snapshots, the
//! rendered message document, message identifiers and sync outcomes.
//! No I/O lives here.

pub mod config;
pub mod error;

pub use config::{
    ApiToken, ClientConfig, FlightboardConfig, RenderConfig, RetryConfig, StateBackend,
    DEFAULT_SHEET_NAME,
};
pub use error::{
    ConfigError, FlightboardError, FlightboardResult, SourceError, StateError, TransportError,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

// ============================================================================
// TABLE TYPES
// ============================================================================

/// One row of the source table: an ordered sequence of string cells.
pub type Row = Vec<String>;

/// Address of a worksheet inside a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

impl TableRef {
    pub fn new(spreadsheet_id: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.spreadsheet_id, self.sheet_name)
    }
}

/// The full ordered row set returned by one fetch, header rows included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub rows: Vec<Row>,
}

impl TableSnapshot {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Build a snapshot from string literals. Handy for fixtures.
    pub fn from_cells<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows after the first `header_rows` rows.
    pub fn data_rows(&self, header_rows: usize) -> &[Row] {
        self.rows.get(header_rows..).unwrap_or(&[])
    }
}

// ============================================================================
// RENDERED MESSAGE
// ============================================================================

/// One rendered entry, derived from a single valid row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub body: String,
}

/// The formatted document ready for the chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub title: String,
    pub timestamp: Timestamp,
    pub entries: Vec<Entry>,
    pub footer: String,
    /// RGB accent color.
    pub color: u32,
    /// Rows found after the header rows, valid or not.
    pub data_rows: usize,
}

impl RenderedMessage {
    /// True when the snapshot carried no data rows at all. Such a message is
    /// never posted.
    pub fn is_empty_snapshot(&self) -> bool {
        self.data_rows == 0
    }

    /// Hex SHA-256 over title, entries and footer. The timestamp is excluded
    /// so identical table content hashes identically across runs.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_bytes());
        hasher.update([0u8]);
        for entry in &self.entries {
            hasher.update(entry.name.as_bytes());
            hasher.update([0u8]);
            hasher.update(entry.body.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(self.footer.as_bytes());
        hex::encode(hasher.finalize())
    }
}

// ============================================================================
// MESSAGE IDENTIFIER
// ============================================================================

/// Identifier of a posted chat message (a numeric snowflake).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MessageId(u64);

impl MessageId {
    /// Wrap a raw id. Zero is not a valid id.
    pub fn new(raw: u64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    /// Parse a stored value. Non-numeric, empty or zero values yield `None`
    /// and are treated as "no message posted yet".
    pub fn parse(value: &str) -> Option<Self> {
        value.trim().parse::<u64>().ok().and_then(Self::new)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<MessageId> for String {
    fn from(id: MessageId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for MessageId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MessageId::parse(&value).ok_or_else(|| format!("invalid message id: {value:?}"))
    }
}

// ============================================================================
// SYNC OUTCOME
// ============================================================================

/// Why a run did not contact the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// The snapshot had no rows beyond the header rows.
    EmptySnapshot,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptySnapshot => write!(f, "snapshot has no data rows"),
        }
    }
}

/// Result of one upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// The known message was edited in place.
    Edited(MessageId),
    /// A new message was posted and its id persisted.
    Created(MessageId),
    /// Nothing was posted.
    Skipped(SkipReason),
}

impl SyncOutcome {
    pub fn message_id(&self) -> Option<MessageId> {
        match self {
            SyncOutcome::Edited(id) | SyncOutcome::Created(id) => Some(*id),
            SyncOutcome::Skipped(_) => None,
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Edited(id) => write!(f, "updated existing message {}", id),
            SyncOutcome::Created(id) => write!(f, "posted new message {}", id),
            SyncOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
