use super::traits::{BlobError, BlobStore, Metadata};
use crate::cursor::Cursor;
use crate::stream::LogStream;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Metadata key holding the exclusive lower bound for the next fetch.
pub const METADATA_LAST_CURSOR: &str = "last_datetime";

/// Metadata key holding the completion time of the last successful run.
pub const METADATA_LAST_RUN: &str = "last_execution";

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("blob error: {0}")]
    Blob(#[from] BlobError),
}

pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Persisted synchronization state of one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub last_cursor: Cursor,
    /// `None` when no run has completed yet or the stored value is unreadable.
    pub last_run_at: Option<DateTime<Utc>>,
}

impl Checkpoint {
    /// State used when a stream has no stored checkpoint.
    pub fn cold_start(now: DateTime<Utc>, lookback: Duration) -> Self {
        Self {
            last_cursor: Cursor::lookback_from(now, lookback),
            last_run_at: None,
        }
    }
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read only. Never reports "not found": a missing record or destination
    /// yields the cold-start default.
    async fn load(&self, stream: &LogStream) -> Result<Checkpoint>;

    /// Replaces the stored record in one write.
    async fn save(&self, stream: &LogStream, checkpoint: &Checkpoint) -> Result<()>;
}

/// Checkpoints kept in the metadata of each stream's destination container.
pub struct BlobCheckpointStore {
    blobs: Arc<dyn BlobStore>,
    lookback: Duration,
}

impl BlobCheckpointStore {
    pub fn new(blobs: Arc<dyn BlobStore>, lookback: Duration) -> Self {
        Self { blobs, lookback }
    }
}

#[async_trait]
impl CheckpointStore for BlobCheckpointStore {
    async fn load(&self, stream: &LogStream) -> Result<Checkpoint> {
        let metadata = match self.blobs.get_metadata(&stream.destination).await {
            Ok(metadata) => metadata,
            Err(BlobError::ContainerNotFound(_)) => Metadata::new(),
            Err(e) => return Err(e.into()),
        };

        let Some(cursor) = metadata.get(METADATA_LAST_CURSOR) else {
            let checkpoint = Checkpoint::cold_start(Utc::now(), self.lookback);
            tracing::info!(
                stream_id = %stream.stream_id,
                last_cursor = %checkpoint.last_cursor,
                "No checkpoint found, starting from lookback window"
            );
            return Ok(checkpoint);
        };

        let last_run_at = metadata.get(METADATA_LAST_RUN).and_then(|raw| {
            match DateTime::parse_from_rfc3339(raw) {
                Ok(at) => Some(at.with_timezone(&Utc)),
                Err(e) => {
                    tracing::debug!(value = %raw, error = %e, "Unparseable last run time");
                    None
                }
            }
        });

        let checkpoint = Checkpoint {
            last_cursor: Cursor::new(cursor.clone()),
            last_run_at,
        };
        tracing::info!(
            stream_id = %stream.stream_id,
            last_cursor = %checkpoint.last_cursor,
            "Loaded checkpoint"
        );
        Ok(checkpoint)
    }

    async fn save(&self, stream: &LogStream, checkpoint: &Checkpoint) -> Result<()> {
        let mut metadata = Metadata::new();
        metadata.insert(
            METADATA_LAST_CURSOR.to_string(),
            checkpoint.last_cursor.to_string(),
        );
        if let Some(at) = checkpoint.last_run_at {
            metadata.insert(METADATA_LAST_RUN.to_string(), at.to_rfc3339());
        }

        self.blobs.set_metadata(&stream.destination, &metadata).await?;
        tracing::debug!(
            stream_id = %stream.stream_id,
            last_cursor = %checkpoint.last_cursor,
            "Checkpoint saved"
        );
        Ok(())
    }
}
