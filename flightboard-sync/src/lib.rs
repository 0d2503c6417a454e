//! Flightboard Sync - Upsert Pipeline
//!
//! Collaborator traits, the retry policy, the upsert coordinator, local
//! state stores and the per-run job tying fetch, render and upsert together.

pub mod coordinator;
pub mod job;
pub mod retry;
pub mod state;
pub mod traits;

pub use coordinator::UpsertCoordinator;
pub use job::SyncJob;
pub use retry::{Backoff, RetryFailure, RetryPolicy, Retryable};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{ChatTransport, StateStore, TableSource};
