//! `{time}` placeholder substitution for request fields

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved placeholder replaced by the epoch-millisecond value of "now"
pub const TIME_PLACEHOLDER: &str = "{time}";

/// How many placeholder occurrences a single field gets substituted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderMode {
    /// Only the first occurrence
    #[default]
    First,
    /// Every occurrence
    All,
}

/// Resolves `{time}` against one instant captured per call
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    timestamp: String,
    mode: PlaceholderMode,
}

impl TemplateResolver {
    pub fn new(now: DateTime<Utc>, mode: PlaceholderMode) -> Self {
        Self {
            timestamp: now.timestamp_millis().to_string(),
            mode,
        }
    }

    /// Trim `text` and substitute the placeholder
    pub fn resolve(&self, text: &str) -> String {
        let trimmed = text.trim();
        match self.mode {
            PlaceholderMode::First => trimmed.replacen(TIME_PLACEHOLDER, &self.timestamp, 1),
            PlaceholderMode::All => trimmed.replace(TIME_PLACEHOLDER, &self.timestamp),
        }
    }

    /// The decimal millisecond value substituted for the placeholder
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// Resolve a single string with replace-first semantics
pub fn resolve(text: &str, now: DateTime<Utc>) -> String {
    TemplateResolver::new(now, PlaceholderMode::First).resolve(text)
}
