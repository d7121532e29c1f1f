use crate::archive::{ArchiveError, ArchiveWriter};
use crate::auth::{AuthError, CredentialProvider};
use crate::cursor::Cursor;
use crate::feed::{FeedClient, FeedError};
use crate::storage::checkpoint::{Checkpoint, CheckpointError, CheckpointStore};
use crate::stream::{LogStream, StreamCatalog};
use chrono::Utc;
use futures::TryStreamExt;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

/// Fatal failures of one stream's run. None of them advance the checkpoint.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("archival error: {0}")]
    Archive(#[from] ArchiveError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Init,
    Authenticated,
    Paging,
    Throttled,
    Advancing,
    Done,
    UnknownStream,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Init => "init",
            SyncState::Authenticated => "authenticated",
            SyncState::Paging => "paging",
            SyncState::Throttled => "throttled",
            SyncState::Advancing => "advancing",
            SyncState::Done => "done",
            SyncState::UnknownStream => "unknown_stream",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub stream_id: String,
    /// Feed requests issued, throttled and retried ones included.
    pub requests: u32,
    pub throttled: u32,
    pub pages: usize,
    pub artifacts: usize,
    pub records: usize,
    pub previous_cursor: Cursor,
    pub new_cursor: Cursor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    /// The stream id is not in the catalog; nothing was touched.
    UnknownStream,
}

/// Runs the load, authenticate, page, archive, advance cycle for one stream at a time.
pub struct SyncEngine {
    catalog: StreamCatalog,
    credentials: Arc<dyn CredentialProvider>,
    checkpoints: Arc<dyn CheckpointStore>,
    feed: FeedClient,
    archive: ArchiveWriter,
    feed_resource: String,
}

impl SyncEngine {
    /// `feed_resource` is the resource feed tokens are requested for.
    pub fn new(
        catalog: StreamCatalog,
        credentials: Arc<dyn CredentialProvider>,
        checkpoints: Arc<dyn CheckpointStore>,
        feed: FeedClient,
        archive: ArchiveWriter,
        feed_resource: &str,
    ) -> Self {
        Self {
            catalog,
            credentials,
            checkpoints,
            feed,
            archive,
            feed_resource: feed_resource.to_string(),
        }
    }

    pub fn catalog(&self) -> &StreamCatalog {
        &self.catalog
    }

    /// Synchronizes one stream.
    ///
    /// Pages are archived as they arrive. The checkpoint is written once,
    /// after the terminal page, so a failure anywhere earlier leaves it where
    /// it was and the next run fetches the same range again.
    pub async fn sync_stream(&self, stream_id: &str) -> Result<SyncOutcome, SyncError> {
        let Some(stream) = self.catalog.get(stream_id) else {
            warn!(stream_id, state = %SyncState::UnknownStream, "Unknown stream, nothing to do");
            return Ok(SyncOutcome::UnknownStream);
        };

        let span = tracing::info_span!("sync", stream_id, run_id = %Uuid::new_v4());
        let result = self.run(stream).instrument(span.clone()).await;

        let _entered = span.enter();
        match result {
            Ok(report) => {
                info!(
                    requests = report.requests,
                    throttled = report.throttled,
                    pages = report.pages,
                    artifacts = report.artifacts,
                    records = report.records,
                    new_cursor = %report.new_cursor,
                    state = %SyncState::Done,
                    "Sync complete"
                );
                Ok(SyncOutcome::Completed(report))
            }
            Err(e) => {
                error!(error = %e, "Sync failed, checkpoint not advanced");
                Err(e)
            }
        }
    }

    /// Synchronizes streams one after another. A failed stream does not stop the rest.
    pub async fn sync_streams<'a, I>(
        &self,
        stream_ids: I,
    ) -> Vec<(String, Result<SyncOutcome, SyncError>)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut results = Vec::new();
        for stream_id in stream_ids {
            let result = self.sync_stream(stream_id).await;
            results.push((stream_id.to_string(), result));
        }
        results
    }

    async fn run(&self, stream: &LogStream) -> Result<SyncReport, SyncError> {
        info!(
            destination = %stream.destination,
            cursor_field = %stream.cursor_field,
            state = %SyncState::Init,
            "Starting sync"
        );
        self.archive.ensure_destination(&stream.destination).await?;
        let checkpoint = self.checkpoints.load(stream).await?;
        let bound = checkpoint.last_cursor.clone();
        info!(last_cursor = %bound, "Previous checkpoint");

        let token = self.credentials.token(&self.feed_resource).await?;
        info!(state = %SyncState::Authenticated, "Acquired feed token");

        let mut report = SyncReport {
            stream_id: stream.stream_id.clone(),
            requests: 0,
            throttled: 0,
            pages: 0,
            artifacts: 0,
            records: 0,
            previous_cursor: bound.clone(),
            new_cursor: bound.clone(),
        };
        // Never below the loaded bound, so the checkpoint cannot regress
        let mut max_seen = bound.clone();

        info!(state = %SyncState::Paging, "Paging through feed");
        let pages = self.feed.pages(&token, stream, &bound);
        futures::pin_mut!(pages);

        while let Some(page) = pages.try_next().await? {
            report.pages += 1;
            report.requests += page.attempts;
            report.throttled += page.throttled;

            if let Some(artifact) = self.archive.archive(&stream.destination, &page).await? {
                report.artifacts += 1;
                report.records += artifact.record_count;
            }

            if let Some(bounds) = &page.bounds {
                if bounds.newest > max_seen {
                    max_seen = bounds.newest.clone();
                }
            }
        }

        info!(state = %SyncState::Advancing, last_cursor = %max_seen, "Advancing checkpoint");
        let next = Checkpoint {
            last_cursor: max_seen.clone(),
            last_run_at: Some(Utc::now()),
        };
        self.checkpoints.save(stream, &next).await?;
        info!(last_cursor = %next.last_cursor, "Recorded new checkpoint");

        report.new_cursor = max_seen;
        Ok(report)
    }
}
