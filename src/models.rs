//! Core data models used throughout Price Watch.
//!
//! These types represent the values that flow through the
//! fetch → extract → classify → notify pipeline.

use serde::Serialize;

/// Title and price pulled out of a product page by an extraction rule.
///
/// `price` is `None` when the page matched the site layout but no parsable
/// price was found. That is distinct from a price of `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedItem {
    pub title: String,
    pub price: Option<f64>,
}

/// Result of the retrying fetch loop for one target.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub success: bool,
    /// Body of the last response obtained, if any.
    pub raw_content: Option<String>,
    pub item: Option<ExtractedItem>,
    /// Number of network attempts actually made.
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// Persisted price state, one row per URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    pub url: String,
    pub title: String,
    pub price: Option<f64>,
    pub updated_at: i64,
}

/// Classification of a new price observation against the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    NotFound,
    New,
    Up,
    Down,
    Equal,
}

impl ChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::NotFound => "not found",
            ChangeStatus::New => "new",
            ChangeStatus::Up => "up",
            ChangeStatus::Down => "down",
            ChangeStatus::Equal => "equal",
        }
    }

    /// Only actual price movements are worth a notification.
    pub fn is_change(&self) -> bool {
        matches!(self, ChangeStatus::Up | ChangeStatus::Down)
    }
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A [`ChangeStatus`] together with the price it was computed against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub status: ChangeStatus,
    pub old_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotificationResult {
    pub delivered: bool,
    pub diagnostic: Option<String>,
}

impl NotificationResult {
    pub fn failed(diagnostic: impl Into<String>) -> Self {
        Self {
            delivered: false,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// Outcome of one full price check, suitable for table/CSV/JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub url: String,
    pub success: bool,
    pub title: Option<String>,
    pub price: Option<f64>,
    pub old_price: Option<f64>,
    pub status: Option<ChangeStatus>,
    /// `None` when no notification was due, otherwise whether it was delivered.
    pub notified: Option<bool>,
}

impl CheckResult {
    pub fn failed(url: &str) -> Self {
        Self {
            url: url.to_string(),
            success: false,
            title: None,
            price: None,
            old_price: None,
            status: None,
            notified: None,
        }
    }
}
