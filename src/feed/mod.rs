pub mod client;
pub mod page;
pub mod retry;
pub mod transport;

pub use client::FeedClient;
pub use page::{Page, PageBounds};
pub use retry::{FixedDelay, RetryDecision, RetryPolicy, ThrottleSignal};
pub use transport::{FeedResponse, FeedTransport, HttpFeedTransport};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned status {status} for {uri}: {body}")]
    Status { status: u16, uri: String, body: String },

    #[error("malformed feed response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record {index} has no string field '{field}'")]
    MissingCursor { field: String, index: usize },

    #[error("invalid feed URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("gave up on {uri} after {attempts} throttled attempts")]
    ThrottleGaveUp { uri: String, attempts: u32 },
}

impl FeedError {
    /// Failures worth retrying: transport errors and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            FeedError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            FeedError::Status { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
