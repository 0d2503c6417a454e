//! Flightboard Clients - HTTP Collaborators
//!
//! Concrete implementations of the `flightboard-sync` collaborator traits:
//! Google Sheets for the table and its state cell, Discord for the board
//! message. Every client is constructed explicitly from configuration.

pub mod discord;
pub mod sheets;

pub use discord::DiscordClient;
pub use sheets::{GoogleSheetsClient, SheetCellStateStore};

use flightboard_core::ConfigError;
use std::time::Duration;

const USER_AGENT: &str = concat!("flightboard/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client construction: rustls, a per-request timeout and a
/// stable user agent.
pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ConfigError::InvalidValue {
            field: "FLIGHTBOARD_REQUEST_TIMEOUT_MS".to_string(),
            value: timeout.as_millis().to_string(),
            reason: format!("failed to build HTTP client: {}", e),
        })
}
