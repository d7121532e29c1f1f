use super::page::Page;
use super::retry::{RetryDecision, RetryPolicy, ThrottleSignal};
use super::transport::FeedTransport;
use super::{FeedError, Result};
use crate::auth::AccessToken;
use crate::cursor::Cursor;
use crate::stream::LogStream;
use crate::sync::SyncState;
use futures::Stream;
use reqwest::Url;
use std::sync::Arc;

/// Sole status the feed uses to signal throttling.
const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Pages through a remote audit log feed.
///
/// The feed must return records newest first; see [`Page::parse`] for how
/// pages that break this are handled.
pub struct FeedClient {
    transport: Arc<dyn FeedTransport>,
    retry: Arc<dyn RetryPolicy>,
    api_root: String,
    page_size: u32,
}

impl FeedClient {
    /// `api_root` is the versioned API base, e.g. `https://graph.microsoft.com/beta`.
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        retry: Arc<dyn RetryPolicy>,
        api_root: &str,
        page_size: u32,
    ) -> Self {
        Self {
            transport,
            retry,
            api_root: api_root.trim_end_matches('/').to_string(),
            page_size,
        }
    }

    /// First request of a run: records strictly newer than `bound`.
    pub fn initial_uri(&self, stream: &LogStream, bound: &Cursor) -> Result<String> {
        let base = format!("{}/{}", self.api_root, stream.resource_path);
        let mut url = Url::parse(&base).map_err(|e| FeedError::InvalidUri {
            uri: base.clone(),
            reason: e.to_string(),
        })?;

        url.query_pairs_mut()
            .append_pair("$top", &self.page_size.to_string())
            .append_pair("$filter", &format!("{} gt {}", stream.cursor_field, bound));

        Ok(url.into())
    }

    /// Lazy sequence of pages, following continuation links until the terminal page.
    ///
    /// Each continuation link replaces the previous request entirely. The
    /// sequence can only be restarted from the top by calling this again.
    pub fn pages<'a>(
        &'a self,
        token: &'a AccessToken,
        stream: &'a LogStream,
        bound: &Cursor,
    ) -> impl Stream<Item = Result<Page>> + 'a {
        let first = self.initial_uri(stream, bound);

        futures::stream::try_unfold(Some(first), move |next| async move {
            let uri = match next {
                Some(uri) => uri?,
                None => return Ok::<_, FeedError>(None),
            };

            let page = self.fetch_page(&uri, token, &stream.cursor_field).await?;
            match &page.next_link {
                Some(link) => tracing::info!(next = %link, "Next page found"),
                None => tracing::debug!("Terminal page reached"),
            }
            let next = page.next_link.clone().map(Ok);
            Ok(Some((page, next)))
        })
    }

    /// Fetches one page, reissuing the identical request while it is throttled.
    pub async fn fetch_page(
        &self,
        uri: &str,
        token: &AccessToken,
        cursor_field: &str,
    ) -> Result<Page> {
        let mut attempts = 0u32;
        let mut throttled = 0u32;
        let mut transient = 0u32;

        loop {
            attempts += 1;

            let response = match self.transport.get(uri, token).await {
                Ok(response) => response,
                Err(e) if e.is_transient() => {
                    transient += 1;
                    self.back_off_transient(uri, transient, e).await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            tracing::info!(
                uri,
                status = response.status,
                content_length = response.body.len(),
                "Fetched feed page"
            );

            if response.status == STATUS_TOO_MANY_REQUESTS {
                throttled += 1;
                let signal = ThrottleSignal {
                    uri: uri.to_string(),
                    status: response.status,
                    headers: response.headers.clone(),
                    body: response.body_text(),
                    attempt: throttled,
                };
                tracing::warn!(
                    uri,
                    attempt = throttled,
                    state = %SyncState::Throttled,
                    headers = ?signal.headers,
                    body = %signal.body,
                    "Request was throttled"
                );

                match self.retry.on_throttled(&signal) {
                    RetryDecision::Wait(wait) => {
                        tracing::info!(wait_ms = wait.as_millis() as u64, "Waiting before retry");
                        tokio::time::sleep(wait).await;
                        tracing::info!(uri, state = %SyncState::Paging, "Reissuing throttled request");
                        continue;
                    }
                    RetryDecision::GiveUp => {
                        return Err(FeedError::ThrottleGaveUp {
                            uri: uri.to_string(),
                            attempts: throttled,
                        });
                    }
                }
            }

            if !(200..300).contains(&response.status) {
                let error = FeedError::Status {
                    status: response.status,
                    uri: uri.to_string(),
                    body: response.body_text(),
                };
                if error.is_transient() {
                    transient += 1;
                    self.back_off_transient(uri, transient, error).await?;
                    continue;
                }
                return Err(error);
            }

            let mut page = Page::parse(response.body, cursor_field)?;
            page.attempts = attempts;
            page.throttled = throttled;
            return Ok(page);
        }
    }

    async fn back_off_transient(&self, uri: &str, attempt: u32, error: FeedError) -> Result<()> {
        match self.retry.on_transient(attempt) {
            RetryDecision::Wait(wait) => {
                tracing::warn!(
                    uri,
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    error = %error,
                    "Transient feed failure, retrying"
                );
                tokio::time::sleep(wait).await;
                Ok(())
            }
            RetryDecision::GiveUp => {
                tracing::error!(uri, attempts = attempt, error = %error, "Transient retries exhausted");
                Err(error)
            }
        }
    }
}
