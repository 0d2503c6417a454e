//! Flightboard Render - Table Snapshot to Message
//!
//! A pure function from fetched rows to a [`RenderedMessage`]. No I/O, no
//! clock reads: the caller supplies the timestamp so identical input and
//! configuration always produce identical output.

pub mod prefixes;

pub use prefixes::{PrefixTable, DEFAULT_PREFIX};

use chrono::Utc;
use flightboard_core::{Entry, RenderConfig, RenderedMessage, TableSnapshot, Timestamp};

/// Accent color of the rendered message.
pub const EMBED_COLOR: u32 = 0x3498DB;

/// Rendered in place of an empty optional cell.
pub const PLACEHOLDER: &str = "-";

// ============================================================================
// ROW PARSING
// ============================================================================

/// Positional fields of one flight row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlightRow<'a> {
    pub destination: &'a str,
    pub outbound: &'a str,
    pub inbound: &'a str,
    pub returning: &'a str,
    pub item: &'a str,
    pub suggestion: &'a str,
    pub code: &'a str,
}

impl<'a> FlightRow<'a> {
    /// Extract the positional fields. Rows with fewer than `min_columns`
    /// cells are rejected; cells missing past `min_columns` read as empty.
    pub fn parse(cells: &'a [String], min_columns: usize) -> Option<Self> {
        if cells.len() < min_columns {
            return None;
        }
        let cell = |idx: usize| cells.get(idx).map(|c| c.trim()).unwrap_or("");
        Some(Self {
            destination: cell(0),
            outbound: cell(1),
            inbound: cell(2),
            returning: cell(3),
            item: cell(4),
            suggestion: cell(5),
            code: cell(6),
        })
    }
}

fn or_placeholder(value: &str) -> &str {
    if value.is_empty() {
        PLACEHOLDER
    } else {
        value
    }
}

// ============================================================================
// RENDERER
// ============================================================================

/// Renders table snapshots according to a [`RenderConfig`].
#[derive(Debug, Clone)]
pub struct Renderer {
    config: RenderConfig,
    prefixes: PrefixTable,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        let prefixes = PrefixTable::with_overrides(&config.prefix_overrides);
        Self { config, prefixes }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render a snapshot stamped with the current time.
    pub fn render_now(&self, snapshot: &TableSnapshot) -> RenderedMessage {
        self.render(snapshot, Utc::now())
    }

    /// Render a snapshot.
    ///
    /// Skips the configured header rows, drops rows shorter than
    /// `min_columns`, and emits one entry per remaining row. With
    /// `sort_by_name` entries are ordered by case-insensitive destination
    /// (empty first); the sort is stable, so equal names keep row order.
    pub fn render(&self, snapshot: &TableSnapshot, now: Timestamp) -> RenderedMessage {
        let data = snapshot.data_rows(self.config.header_rows);

        let mut rows: Vec<FlightRow<'_>> = data
            .iter()
            .filter_map(|cells| FlightRow::parse(cells, self.config.min_columns))
            .collect();

        let skipped = data.len() - rows.len();
        if skipped > 0 {
            tracing::debug!(
                skipped,
                min_columns = self.config.min_columns,
                "Skipping rows with too few columns"
            );
        }

        if self.config.sort_by_name {
            rows.sort_by_cached_key(|row| row.destination.to_lowercase());
        }

        RenderedMessage {
            title: self.config.title.clone(),
            timestamp: now,
            entries: rows.iter().map(|row| self.entry(row)).collect(),
            footer: self.config.footer.clone(),
            color: EMBED_COLOR,
            data_rows: data.len(),
        }
    }

    /// Render a single parsed row.
    pub fn entry(&self, row: &FlightRow<'_>) -> Entry {
        let prefix = self.prefixes.lookup(row.destination);
        let name = format!("{}{} {}", prefix, row.code, row.destination)
            .trim_end()
            .to_string();

        let mut body = format!(
            "🛫 Out: **{}** 🛬 In: **{}** ↩ Return: **{}**\n📦 Item: **{}**",
            or_placeholder(row.outbound),
            or_placeholder(row.inbound),
            or_placeholder(row.returning),
            or_placeholder(row.item),
        );
        if !row.suggestion.is_empty() {
            body.push_str("\n💡 ");
            body.push_str(row.suggestion);
        }

        Entry { name, body }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
