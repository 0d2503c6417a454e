//! Error types for flightboard operations

use std::time::Duration;
use thiserror::Error;

/// Configuration errors. Always raised before any network call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Incompatible options: {option_a} and {option_b}")]
    IncompatibleOptions { option_a: String, option_b: String },
}

/// Tabular data source errors. These are never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Request for table {table} failed: {reason}")]
    RequestFailed { table: String, reason: String },

    #[error("Table {table} returned status {status}: {message}")]
    Status {
        table: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response for table {table}: {reason}")]
    InvalidResponse { table: String, reason: String },
}

/// Chat transport errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Message {message_id} not found")]
    NotFound { message_id: String },

    #[error("Rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Transient transport failure (status {status:?}): {reason}")]
    Transient { status: Option<u16>, reason: String },

    #[error("Transport rejected request (status {status:?}): {reason}")]
    Permanent { status: Option<u16>, reason: String },

    #[error("Invalid transport response: {reason}")]
    InvalidResponse { reason: String },

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },
}

impl TransportError {
    /// The addressed message no longer exists remotely.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound { .. })
    }

    /// Rate limits and transient server/network failures may succeed on a
    /// later attempt. Everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::RateLimited { .. } | TransportError::Transient { .. }
        )
    }

    /// Server-provided wait before the next attempt, if any.
    pub fn retry_hint(&self) -> Option<Duration> {
        match self {
            TransportError::RateLimited {
                retry_after_ms: Some(ms),
            } => Some(Duration::from_millis(*ms)),
            _ => None,
        }
    }
}

/// State store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("State file {path} I/O failed: {reason}")]
    Io { path: String, reason: String },

    #[error("State file {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Remote state slot {key} failed: {reason}")]
    Remote { key: String, reason: String },
}

/// Master error type for all flightboard errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlightboardError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("State error: {0}")]
    State(#[from] StateError),
}

/// Result type alias for flightboard operations.
pub type FlightboardResult<T> = Result<T, FlightboardError>;

// =============================================================================
// TESTS
// =============================================================================
