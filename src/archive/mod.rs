use crate::feed::page::{Page, PageBounds};
use crate::storage::traits::{BlobError, BlobStore};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to prepare destination '{container}': {source}")]
    Destination {
        container: String,
        #[source]
        source: BlobError,
    },

    #[error("failed to write artifact '{name}': {source}")]
    Write {
        name: String,
        #[source]
        source: BlobError,
    },
}

/// One archived page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub content_type: String,
    pub record_count: usize,
    pub size: usize,
    /// Hex SHA-256 of the stored content.
    pub sha256: String,
}

/// How artifact names are derived from page boundaries.
#[derive(Debug, Clone)]
pub struct ArtifactNaming {
    pub prefix: String,
    pub extension: String,
}

impl Default for ArtifactNaming {
    fn default() -> Self {
        Self {
            prefix: "logs".to_string(),
            extension: "json".to_string(),
        }
    }
}

impl ArtifactNaming {
    /// `{prefix}_{oldest}_{newest}_{count}.{extension}`, colons stripped from the cursors.
    pub fn name(&self, bounds: &PageBounds, record_count: usize) -> String {
        format!(
            "{}_{}_{}_{}.{}",
            self.prefix,
            bounds.oldest.key_safe(),
            bounds.newest.key_safe(),
            record_count,
            self.extension
        )
    }
}

/// Writes each non-empty page verbatim as one object.
///
/// There is no read-before-write: archiving the same range again rewrites an
/// object with the same name and the same bytes.
pub struct ArchiveWriter {
    blobs: Arc<dyn BlobStore>,
    naming: ArtifactNaming,
    content_type: String,
}

impl ArchiveWriter {
    pub fn new(blobs: Arc<dyn BlobStore>, naming: ArtifactNaming, content_type: &str) -> Self {
        Self {
            blobs,
            naming,
            content_type: content_type.to_string(),
        }
    }

    /// Creates the destination container when it does not exist yet.
    pub async fn ensure_destination(&self, destination: &str) -> Result<(), ArchiveError> {
        self.blobs
            .create_container_if_absent(destination)
            .await
            .map_err(|source| ArchiveError::Destination {
                container: destination.to_string(),
                source,
            })
    }

    /// Returns `None` without writing anything for a page with no records.
    pub async fn archive(
        &self,
        destination: &str,
        page: &Page,
    ) -> Result<Option<Artifact>, ArchiveError> {
        let Some(bounds) = &page.bounds else {
            tracing::info!("No new data");
            return Ok(None);
        };

        let name = self.naming.name(bounds, page.record_count());
        self.blobs
            .put_object(destination, &name, &page.raw, &self.content_type)
            .await
            .map_err(|source| ArchiveError::Write {
                name: name.clone(),
                source,
            })?;

        let artifact = Artifact {
            name,
            content_type: self.content_type.clone(),
            record_count: page.record_count(),
            size: page.raw.len(),
            sha256: format!("{:x}", Sha256::digest(&page.raw)),
        };

        tracing::info!(
            destination,
            artifact = %artifact.name,
            records = artifact.record_count,
            bytes = artifact.size,
            sha256 = %artifact.sha256,
            "Uploaded artifact"
        );
        Ok(Some(artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::filesystem::FsBlobStore;
    use crate::storage::memory::MemoryBlobStore;

    fn page(body: serde_json::Value) -> Page {
        Page::parse(serde_json::to_vec(&body).unwrap(), "activityDateTime").unwrap()
    }

    fn three_records() -> Page {
        page(serde_json::json!({"value": [
            {"id": "c", "activityDateTime": "2024-01-03T10:00:00Z"},
            {"id": "b", "activityDateTime": "2024-01-02T10:00:00Z"},
            {"id": "a", "activityDateTime": "2024-01-01T10:00:00Z"},
        ]}))
    }

    async fn writer() -> (Arc<MemoryBlobStore>, ArchiveWriter) {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.create_container_if_absent("logs-audit").await.unwrap();
        let writer = ArchiveWriter::new(blobs.clone(), ArtifactNaming::default(), "application/json");
        (blobs, writer)
    }

    #[tokio::test]
    async fn test_archive_names_from_bounds_and_count() {
        let (blobs, writer) = writer().await;
        let page = three_records();

        let artifact = writer.archive("logs-audit", &page).await.unwrap().unwrap();

        assert_eq!(artifact.name, "logs_2024-01-01T100000Z_2024-01-03T100000Z_3.json");
        assert_eq!(artifact.record_count, 3);
        let stored = blobs.object("logs-audit", &artifact.name).unwrap();
        assert_eq!(stored.content, page.raw);
        assert_eq!(stored.content_type, "application/json");
    }

    #[tokio::test]
    async fn test_archive_same_page_twice_is_identical() {
        let (blobs, writer) = writer().await;
        let page = three_records();

        let first = writer.archive("logs-audit", &page).await.unwrap().unwrap();
        let stored_first = blobs.object("logs-audit", &first.name).unwrap();
        let second = writer.archive("logs-audit", &page).await.unwrap().unwrap();
        let stored_second = blobs.object("logs-audit", &second.name).unwrap();

        assert_eq!(first, second);
        assert_eq!(stored_first.content, stored_second.content);
        assert_eq!(blobs.keys("logs-audit").len(), 1);
    }

    #[tokio::test]
    async fn test_empty_page_writes_nothing() {
        let (blobs, writer) = writer().await;
        let empty = page(serde_json::json!({"value": []}));

        assert!(writer.archive("logs-audit", &empty).await.unwrap().is_none());
        assert_eq!(blobs.op_counts().puts, 0);
    }

    #[tokio::test]
    async fn test_path_like_cursor_stays_inside_container() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path().join("archive");
        let blobs = Arc::new(FsBlobStore::new(&root));
        let writer = ArchiveWriter::new(blobs, ArtifactNaming::default(), "application/json");
        writer.ensure_destination("logs-audit").await.unwrap();

        let hostile = page(serde_json::json!({"value": [
            {"activityDateTime": "x/../../../escaped"},
        ]}));
        let artifact = writer.archive("logs-audit", &hostile).await.unwrap().unwrap();

        assert_eq!(artifact.name, "logs_x_.._.._.._escaped_x_.._.._.._escaped_1.json");
        assert!(root.join("logs-audit").join(&artifact.name).is_file());
        assert!(!temp.path().join("escaped_1.json").exists());
    }

    #[tokio::test]
    async fn test_ensure_destination_creates_container() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let writer = ArchiveWriter::new(blobs.clone(), ArtifactNaming::default(), "application/json");

        writer.ensure_destination("logs-audit").await.unwrap();
        writer.ensure_destination("logs-audit").await.unwrap();

        assert!(blobs.metadata("logs-audit").is_some());
        assert_eq!(blobs.op_counts().creates, 2);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let (blobs, writer) = writer().await;
        blobs.fail_puts(true);

        let err = writer.archive("logs-audit", &three_records()).await.unwrap_err();
        assert!(matches!(err, ArchiveError::Write { .. }));
    }
}
