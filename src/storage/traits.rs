use async_trait::async_trait;
use std::collections::HashMap;

/// Container metadata as stored by the blob backend.
pub type Metadata = HashMap<String, String>;

/// Key/metadata store with create-if-absent containers.
///
/// A container holds immutable objects plus a small metadata map. Writing the
/// metadata replaces the whole map in one operation.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn create_container_if_absent(&self, container: &str) -> Result<(), BlobError>;

    async fn get_metadata(&self, container: &str) -> Result<Metadata, BlobError>;

    async fn set_metadata(&self, container: &str, metadata: &Metadata) -> Result<(), BlobError>;

    async fn put_object(
        &self,
        container: &str,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), BlobError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("invalid object key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("blob service returned {status} for {operation}: {message}")]
    Service {
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("credential error: {0}")]
    Credential(#[from] crate::auth::AuthError),
}
