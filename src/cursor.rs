use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

/// Format used for cursors this crate produces itself.
pub const CURSOR_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Value of a stream's ordering field.
///
/// The raw text is kept as received and is what goes into filters and stored
/// checkpoints. Ordering is chronological: values parse as RFC 3339 and compare
/// by instant, so `10:00:00Z` sorts before `10:00:00.5Z` whatever the number of
/// fractional digits. Equal instants and unparseable values fall back to the
/// raw text; unparseable values sort before every timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.format(CURSOR_FORMAT).to_string())
    }

    /// Lower bound for a stream that has never been synchronized.
    pub fn lookback_from(now: DateTime<Utc>, lookback: Duration) -> Self {
        let lookback = chrono::Duration::from_std(lookback).unwrap_or(chrono::Duration::MAX);
        let start = now
            .checked_sub_signed(lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self::from_datetime(start)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Instant the cursor denotes, when it is an RFC 3339 timestamp.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.0)
            .ok()
            .map(|at| at.with_timezone(&Utc))
    }

    /// Cursor text usable as one object key segment: colons are stripped and
    /// path separators become underscores.
    pub fn key_safe(&self) -> String {
        self.0
            .chars()
            .filter(|c| *c != ':')
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect()
    }
}

impl Ord for Cursor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant()
            .cmp(&other.instant())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
