//! Discord chat transport
//!
//! The board is one embed in one channel: created with
//! `POST /channels/{channel}/messages`, kept current with
//! `PATCH /channels/{channel}/messages/{id}`.

mod client;
mod types;

pub use client::{classify_status, DiscordClient};
pub use types::{
    Embed, EmbedField, EmbedFooter, MessagePayload, MAX_EMBED_FIELDS, MAX_EMBED_TOTAL_CHARS,
    UNKNOWN_CHANNEL_CODE,
};
