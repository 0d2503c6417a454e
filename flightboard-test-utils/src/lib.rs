//! Flightboard Test Utilities
//!
//! Shared test infrastructure for the flightboard workspace:
//! - Test doubles for the table source and chat transport
//! - Proptest generators for rows, snapshots and transport failures
//! - Fixtures for the common table layouts
//! - Assertions on sync results

// Re-export the in-memory state store from its source crate
pub use flightboard_sync::MemoryStateStore;

// Re-export core types for convenience
pub use flightboard_core::{
    Entry, FlightboardConfig, FlightboardError, FlightboardResult, MessageId, RenderedMessage,
    Row, SkipReason, SourceError, StateError, SyncOutcome, TableRef, TableSnapshot, Timestamp,
    TransportError,
};

use async_trait::async_trait;
use flightboard_sync::{ChatTransport, TableSource};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// TABLE SOURCE DOUBLE
// ============================================================================

/// Returns the same snapshot (or error) on every fetch.
#[derive(Debug)]
pub struct StaticTableSource {
    result: Mutex<Result<TableSnapshot, SourceError>>,
    fetches: AtomicU64,
}

impl StaticTableSource {
    pub fn new(snapshot: TableSnapshot) -> Self {
        Self {
            result: Mutex::new(Ok(snapshot)),
            fetches: AtomicU64::new(0),
        }
    }

    pub fn failing(err: SourceError) -> Self {
        Self {
            result: Mutex::new(Err(err)),
            fetches: AtomicU64::new(0),
        }
    }

    /// Replace the snapshot served by later fetches.
    pub fn set_snapshot(&self, snapshot: TableSnapshot) {
        *locked(&self.result) = Ok(snapshot);
    }

    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TableSource for StaticTableSource {
    async fn fetch_rows(&self, _table: &TableRef) -> Result<TableSnapshot, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        locked(&self.result).clone()
    }
}

// ============================================================================
// CHAT TRANSPORT DOUBLE
// ============================================================================

/// One call observed by [`ScriptedTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCall {
    Create,
    Edit(MessageId),
}

/// First id handed out by [`ScriptedTransport`].
pub const FIRST_SCRIPTED_ID: u64 = 1_458_205_750_617_833_596;

/// Simulated chat channel with scriptable failures.
///
/// Without a script the transport behaves like a real channel: creates
/// store the message under a fresh id, edits of unknown ids fail with
/// `NotFound`. Queued results are consumed first, one per call; a queued
/// `Ok` edit still needs the message to exist.
#[derive(Debug)]
pub struct ScriptedTransport {
    messages: Mutex<HashMap<MessageId, RenderedMessage>>,
    edit_script: Mutex<VecDeque<Result<(), TransportError>>>,
    create_script: Mutex<VecDeque<Result<MessageId, TransportError>>>,
    calls: Mutex<Vec<TransportCall>>,
    next_id: AtomicU64,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(HashMap::new()),
            edit_script: Mutex::new(VecDeque::new()),
            create_script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(FIRST_SCRIPTED_ID),
        }
    }

    /// A channel that already contains a message with `id`.
    pub fn with_message(id: MessageId) -> Self {
        let transport = Self::new();
        transport.seed_message(id);
        transport
    }

    /// Pretend a message with `id` was posted earlier.
    pub fn seed_message(&self, id: MessageId) {
        locked(&self.messages).insert(id, placeholder_message());
    }

    /// Remove a message, as a moderator deleting it would.
    pub fn delete_message(&self, id: MessageId) {
        locked(&self.messages).remove(&id);
    }

    /// Queue the result of the next edit call.
    pub fn push_edit_result(&self, result: Result<(), TransportError>) {
        locked(&self.edit_script).push_back(result);
    }

    /// Queue the result of the next create call.
    pub fn push_create_result(&self, result: Result<MessageId, TransportError>) {
        locked(&self.create_script).push_back(result);
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        locked(&self.calls).clone()
    }

    pub fn create_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, TransportCall::Create))
            .count()
    }

    pub fn edit_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, TransportCall::Edit(_)))
            .count()
    }

    /// Messages currently present in the channel.
    pub fn live_messages(&self) -> usize {
        locked(&self.messages).len()
    }

    /// Current content of a message, if it exists.
    pub fn message(&self, id: MessageId) -> Option<RenderedMessage> {
        locked(&self.messages).get(&id).cloned()
    }

    fn allocate_id(&self) -> MessageId {
        let raw = self.next_id.fetch_add(1, Ordering::SeqCst);
        MessageId::new(raw).unwrap_or_else(|| self.allocate_id())
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn create_message(&self, message: &RenderedMessage) -> Result<MessageId, TransportError> {
        locked(&self.calls).push(TransportCall::Create);
        let scripted = locked(&self.create_script).pop_front();
        let id = match scripted {
            Some(Ok(id)) => id,
            Some(Err(err)) => return Err(err),
            None => self.allocate_id(),
        };
        locked(&self.messages).insert(id, message.clone());
        Ok(id)
    }

    async fn edit_message(
        &self,
        id: MessageId,
        message: &RenderedMessage,
    ) -> Result<(), TransportError> {
        locked(&self.calls).push(TransportCall::Edit(id));
        if let Some(result) = locked(&self.edit_script).pop_front() {
            result?;
        }
        match locked(&self.messages).get_mut(&id) {
            Some(existing) => {
                *existing = message.clone();
                Ok(())
            }
            None => Err(TransportError::NotFound {
                message_id: id.to_string(),
            }),
        }
    }
}

fn placeholder_message() -> RenderedMessage {
    fixtures::rendered_message(Vec::new(), 1)
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for flightboard types.

    use super::*;
    use proptest::prelude::*;

    /// A cell: usually short text, sometimes empty or padded.
    pub fn arb_cell() -> impl Strategy<Value = String> {
        prop_oneof![
            2 => Just(String::new()),
            6 => "[A-Za-z0-9:]{1,12}",
            1 => " [A-Za-z]{1,8} ",
        ]
    }

    /// A destination name, including the known ones and the empty name.
    pub fn arb_destination() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("Torn".to_string()),
            Just("Mexico".to_string()),
            Just("Cayman Islands".to_string()),
            Just("Japan".to_string()),
            "[A-Za-z][a-z]{0,10}",
        ]
    }

    /// A row with between `min` and `max` cells (inclusive).
    pub fn arb_row(min: usize, max: usize) -> impl Strategy<Value = Row> {
        (arb_destination(), prop::collection::vec(arb_cell(), min.saturating_sub(1)..max))
            .prop_map(|(destination, rest)| {
                let mut row = Vec::with_capacity(rest.len() + 1);
                row.push(destination);
                row.extend(rest);
                row
            })
    }

    /// A full seven-column row.
    pub fn arb_full_row() -> impl Strategy<Value = Row> {
        arb_row(7, 8)
    }

    /// A snapshot with the two header rows followed by up to `max_rows`
    /// data rows of mixed widths.
    pub fn arb_snapshot(max_rows: usize) -> impl Strategy<Value = TableSnapshot> {
        prop::collection::vec(arb_row(1, 9), 0..=max_rows).prop_map(|data| {
            let mut rows = vec![
                vec![String::new()],
                fixtures::HEADER.iter().map(|h| h.to_string()).collect(),
            ];
            rows.extend(data);
            TableSnapshot::new(rows)
        })
    }

    pub fn arb_message_id() -> impl Strategy<Value = MessageId> {
        (1u64..u64::MAX).prop_filter_map("non-zero", MessageId::new)
    }

    /// Transport failures the retry policy will try again.
    pub fn arb_retryable_error() -> impl Strategy<Value = TransportError> {
        prop_oneof![
            proptest::option::of(0u64..5_000)
                .prop_map(|retry_after_ms| TransportError::RateLimited { retry_after_ms }),
            prop_oneof![Just(500u16), Just(502), Just(503), Just(504)].prop_map(|status| {
                TransportError::Transient {
                    status: Some(status),
                    reason: "server error".to_string(),
                }
            }),
        ]
    }

    /// Transport failures that end a run immediately and are not "not found".
    pub fn arb_fatal_error() -> impl Strategy<Value = TransportError> {
        prop_oneof![
            prop_oneof![Just(400u16), Just(401), Just(403)].prop_map(|status| {
                TransportError::Permanent {
                    status: Some(status),
                    reason: "rejected".to_string(),
                }
            }),
            Just(TransportError::InvalidResponse {
                reason: "missing id".to_string(),
            }),
        ]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built snapshots and messages for common scenarios.

    use super::*;
    use chrono::{TimeZone, Utc};

    /// Header row of the flight sheet.
    pub const HEADER: [&str; 7] = [
        "Destination",
        "Outbound",
        "Inbound",
        "Return",
        "Item",
        "Suggestion",
        "Code",
    ];

    /// Fixed render time so rendered messages compare equal.
    pub fn fixed_time() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26)
            .single()
            .unwrap_or_else(Utc::now)
    }

    pub fn table_ref() -> TableRef {
        TableRef::new("1AbCdEfGhIjKlMnOpQrStUvWxYz", "travelDestinations")
    }

    /// The canonical scenario: state cell "123", one Torn row.
    pub fn scenario_snapshot() -> TableSnapshot {
        TableSnapshot::from_cells(vec![
            vec!["123"],
            vec!["header"],
            vec!["Torn", "10:00", "10:05", "10:20", "Plushie", "", "TC"],
        ])
    }

    /// State row and header, no data.
    pub fn header_only_snapshot() -> TableSnapshot {
        TableSnapshot::from_cells(vec![vec![""], HEADER.to_vec()])
    }

    /// A realistic board with several destinations, one short row and one
    /// row with empty times.
    pub fn board_snapshot() -> TableSnapshot {
        TableSnapshot::from_cells(vec![
            vec![""],
            HEADER.to_vec(),
            vec!["Mexico", "10:00", "10:26", "10:52", "Dahlia", "", "MX"],
            vec!["Japan", "11:15", "13:40", "16:05", "Cherry Blossom", "Buy 19", "JP"],
            vec!["Canada", "09:30"],
            vec!["Cayman Islands", "", "", "", "Banana Orchid", "", "CI"],
            vec!["argentina", "12:00", "14:47", "17:34", "Ceibo Flower", "", "AR"],
        ])
    }

    pub fn rendered_message(entries: Vec<Entry>, data_rows: usize) -> RenderedMessage {
        RenderedMessage {
            title: "✈️ Smugglers Flight Paths".to_string(),
            timestamp: fixed_time(),
            entries,
            footer: "Auto-updates via GitHub Actions".to_string(),
            color: flightboard_render::EMBED_COLOR,
            data_rows,
        }
    }

    /// Environment map with every required variable set.
    pub fn required_env() -> HashMap<String, String> {
        [
            ("DISCORD_TOKEN", "test-bot-token"),
            ("FLIGHT_CHANNEL_ID", "1458203844474572801"),
            ("SPREADSHEET_ID", "1AbCdEfGhIjKlMnOpQrStUvWxYz"),
            ("GOOGLE_ACCESS_TOKEN", "ya29.test-token"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    /// Configuration loaded from [`required_env`].
    pub fn minimal_config() -> FlightboardResult<FlightboardConfig> {
        let env = required_env();
        Ok(FlightboardConfig::from_lookup(|key| env.get(key).cloned())?)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on sync results.

    use super::*;

    #[track_caller]
    pub fn assert_edited(result: &FlightboardResult<SyncOutcome>, id: MessageId) {
        match result {
            Ok(SyncOutcome::Edited(edited)) => assert_eq!(*edited, id, "Edited the wrong message"),
            other => panic!("Expected Edited({}), got: {:?}", id, other),
        }
    }

    /// Assert a create and return the new id.
    #[track_caller]
    pub fn assert_created(result: &FlightboardResult<SyncOutcome>) -> MessageId {
        match result {
            Ok(SyncOutcome::Created(id)) => *id,
            other => panic!("Expected Created, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_skipped(result: &FlightboardResult<SyncOutcome>) {
        match result {
            Ok(SyncOutcome::Skipped(SkipReason::EmptySnapshot)) => {}
            other => panic!("Expected Skipped, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_transport_error<T: std::fmt::Debug>(result: &FlightboardResult<T>) {
        match result {
            Err(FlightboardError::Transport(_)) => {}
            other => panic!("Expected Transport error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_retries_exhausted<T: std::fmt::Debug>(
        result: &FlightboardResult<T>,
        operation: &str,
        attempts: u32,
    ) {
        match result {
            Err(FlightboardError::Transport(TransportError::RetriesExhausted {
                operation: op,
                attempts: n,
                ..
            })) => {
                assert_eq!(op, operation, "Wrong operation exhausted");
                assert_eq!(*n, attempts, "Wrong attempt count");
            }
            other => panic!("Expected RetriesExhausted, got: {:?}", other),
        }
    }
}

// ============================================================================
// SELF-TESTS
// ============================================================================
