//! Google Sheets table source and cell state store

mod client;
mod types;

pub use client::{sheet_range, GoogleSheetsClient, SheetCellStateStore};
pub use types::ValueRange;
