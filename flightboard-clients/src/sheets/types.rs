//! Google Sheets v4 values API types

use serde::{Deserialize, Serialize};

/// A block of cell values, as read by `values.get` and written by
/// `values.update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    /// Trailing empty rows and cells are omitted by the API.
    #[serde(default)]
    pub values: Vec<Vec<String>>,
}

impl ValueRange {
    /// A single-cell update body.
    pub fn single(range: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            range: Some(range.into()),
            major_dimension: Some("ROWS".to_string()),
            values: vec![vec![value.into()]],
        }
    }

    /// The top-left value, if the range holds anything.
    pub fn first_value(&self) -> Option<&str> {
        self.values
            .first()
            .and_then(|row| row.first())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}
