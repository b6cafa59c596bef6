use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Where a cached interpretation came from.
///
/// `CachedRead` is only ever reported to a writer that lost the race for a
/// slot; it is never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    Generated,
    Fallback,
    CachedRead,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generated => write!(f, "generated"),
            Self::Fallback => write!(f, "fallback"),
            Self::CachedRead => write!(f, "cached-read"),
        }
    }
}

impl std::str::FromStr for Origin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generated" => Ok(Self::Generated),
            "fallback" => Ok(Self::Fallback),
            "cached-read" => Ok(Self::CachedRead),
            _ => Err(format!("Unknown interpretation origin: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InterpretationEntry {
    pub id: i64,
    pub owner: String,
    pub event_identity: String,
    pub kind: String,
    pub event_date: NaiveDate,
    /// Raw provider (or fallback) payload, stored without normalization.
    pub content: serde_json::Value,
    pub origin: Origin,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl InterpretationEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// An interpretation about to be written. Timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInterpretation {
    pub owner: String,
    pub event_identity: String,
    pub kind: String,
    pub event_date: NaiveDate,
    pub content: serde_json::Value,
    pub origin: Origin,
    pub ttl: chrono::Duration,
}

/// Result of a first-writer-wins put.
#[derive(Debug, Clone, PartialEq)]
pub struct PutOutcome {
    /// The row now stored for the slot.
    pub entry: InterpretationEntry,
    /// `false` when a live row already occupied the slot and nothing was written.
    pub written: bool,
}

/// Caller supplied context forwarded into generation prompts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationContext {
    pub display_name: Option<String>,
    pub chart_summary: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub generated: usize,
    pub fallback: usize,
    pub already_cached: usize,
    pub failed: usize,
}

impl ReconcileReport {
    pub fn total(&self) -> usize {
        self.generated + self.fallback + self.already_cached + self.failed
    }
}
