use super::{FeedError, Result};
use crate::cursor::Cursor;
use serde::Deserialize;
use serde_json::Value;

/// One batch returned by a single feed request.
#[derive(Debug, Clone)]
pub struct Page {
    /// Records in feed order, newest first.
    pub records: Vec<Value>,
    /// Continuation URI; `None` on the terminal page.
    pub next_link: Option<String>,
    /// Response body exactly as received.
    pub raw: Vec<u8>,
    /// Oldest and newest cursor values, `None` for an empty page.
    pub bounds: Option<PageBounds>,
    /// HTTP requests issued for this page, retries included.
    pub attempts: u32,
    /// How many of those requests were throttled.
    pub throttled: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBounds {
    pub oldest: Cursor,
    pub newest: Cursor,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    #[serde(default)]
    value: Vec<Value>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

impl Page {
    /// Parses a feed response body.
    ///
    /// Boundaries are found by scanning every record rather than trusting the
    /// feed's newest-first ordering. A page that breaks that ordering is
    /// logged but still accepted.
    pub fn parse(raw: Vec<u8>, cursor_field: &str) -> Result<Self> {
        let body: PageBody = serde_json::from_slice(&raw)?;
        let bounds = scan_bounds(&body.value, cursor_field)?;

        Ok(Self {
            records: body.value,
            next_link: body.next_link,
            raw,
            bounds,
            attempts: 1,
            throttled: 0,
        })
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_terminal(&self) -> bool {
        self.next_link.is_none()
    }
}

fn cursor_at(records: &[Value], index: usize, field: &str) -> Result<Cursor> {
    records[index]
        .get(field)
        .and_then(Value::as_str)
        .map(Cursor::new)
        .ok_or_else(|| FeedError::MissingCursor {
            field: field.to_string(),
            index,
        })
}

fn scan_bounds(records: &[Value], field: &str) -> Result<Option<PageBounds>> {
    if records.is_empty() {
        return Ok(None);
    }

    let first = cursor_at(records, 0, field)?;
    let last = cursor_at(records, records.len() - 1, field)?;
    let mut newest = first.clone();
    let mut oldest = first.clone();

    for index in 1..records.len() {
        let cursor = cursor_at(records, index, field)?;
        if cursor > newest {
            newest = cursor;
        } else if cursor < oldest {
            oldest = cursor;
        }
    }

    if newest != first || oldest != last {
        tracing::warn!(
            field,
            first = %first,
            last = %last,
            newest = %newest,
            oldest = %oldest,
            "Page is not ordered newest first"
        );
    }

    Ok(Some(PageBounds { oldest, newest }))
}
