//! Discord REST request and response types

use flightboard_core::{RenderedMessage, Timestamp};
use serde::{Deserialize, Serialize};

/// Platform limit on fields per embed.
pub const MAX_EMBED_FIELDS: usize = 25;
/// Platform limit on a field name, in characters.
pub const MAX_FIELD_NAME_CHARS: usize = 256;
/// Platform limit on a field value, in characters.
pub const MAX_FIELD_VALUE_CHARS: usize = 1024;
/// Platform limit on an embed title, in characters.
pub const MAX_TITLE_CHARS: usize = 256;
/// Platform limit on footer text, in characters.
pub const MAX_FOOTER_CHARS: usize = 2048;
/// Platform limit on title, field names, field values and footer combined.
pub const MAX_EMBED_TOTAL_CHARS: usize = 6000;

/// Discord error code for an unknown channel.
pub const UNKNOWN_CHANNEL_CODE: u64 = 10003;

// ============================================================================
// MESSAGE TYPES
// ============================================================================

/// Body of a create or edit call: one embed, nothing else.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagePayload {
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    pub timestamp: Timestamp,
    pub fields: Vec<EmbedField>,
    pub footer: EmbedFooter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

impl MessagePayload {
    /// Build the embed for a rendered board.
    ///
    /// Returns the payload and the number of entries dropped to stay under
    /// [`MAX_EMBED_FIELDS`] and [`MAX_EMBED_TOTAL_CHARS`]. Entries are kept
    /// in order; the first one that would overflow the total ends the embed.
    pub fn from_rendered(message: &RenderedMessage) -> (Self, usize) {
        let title = truncate_chars(&message.title, MAX_TITLE_CHARS);
        let footer = truncate_chars(&message.footer, MAX_FOOTER_CHARS);
        let mut budget =
            MAX_EMBED_TOTAL_CHARS.saturating_sub(title.chars().count() + footer.chars().count());

        let mut fields = Vec::new();
        for entry in message.entries.iter().take(MAX_EMBED_FIELDS) {
            let name = truncate_chars(&entry.name, MAX_FIELD_NAME_CHARS);
            let value = truncate_chars(&entry.body, MAX_FIELD_VALUE_CHARS);
            let size = name.chars().count() + value.chars().count();
            if size > budget {
                break;
            }
            budget -= size;
            fields.push(EmbedField {
                name,
                value,
                inline: false,
            });
        }
        let dropped = message.entries.len() - fields.len();

        let embed = Embed {
            title,
            color: message.color,
            timestamp: message.timestamp,
            fields,
            footer: EmbedFooter { text: footer },
        };
        (Self { embeds: vec![embed] }, dropped)
    }

    /// Characters counted against [`MAX_EMBED_TOTAL_CHARS`].
    pub fn total_chars(&self) -> usize {
        self.embeds
            .iter()
            .map(|embed| {
                embed.title.chars().count()
                    + embed.footer.text.chars().count()
                    + embed
                        .fields
                        .iter()
                        .map(|f| f.name.chars().count() + f.value.chars().count())
                        .sum::<usize>()
            })
            .sum()
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// The part of a message object we read back.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub id: String,
}

// ============================================================================
// ERROR TYPES
// ============================================================================

/// JSON error body. Rate limit responses carry `retry_after` in seconds.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub retry_after: Option<f64>,
}
