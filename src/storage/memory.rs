use super::traits::{BlobError, BlobStore, Metadata};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
struct Container {
    metadata: Metadata,
    objects: HashMap<String, StoredObject>,
}

/// In-process blob store.
///
/// Counts every operation so callers can assert which side effects a run had.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    containers: Mutex<HashMap<String, Container>>,
    ops: Mutex<OpCounts>,
    fail_puts: Mutex<bool>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OpCounts {
    pub creates: usize,
    pub metadata_reads: usize,
    pub metadata_writes: usize,
    pub puts: usize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn op_counts(&self) -> OpCounts {
        *self.ops.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every subsequent `put_object` fail.
    pub fn fail_puts(&self, fail: bool) {
        *self.fail_puts.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    pub fn object(&self, container: &str, key: &str) -> Option<StoredObject> {
        let containers = self.containers.lock().unwrap_or_else(|e| e.into_inner());
        containers
            .get(container)
            .and_then(|c| c.objects.get(key))
            .cloned()
    }

    /// Object keys in a container, sorted.
    pub fn keys(&self, container: &str) -> Vec<String> {
        let containers = self.containers.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = containers
            .get(container)
            .map(|c| c.objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    pub fn metadata(&self, container: &str) -> Option<Metadata> {
        let containers = self.containers.lock().unwrap_or_else(|e| e.into_inner());
        containers.get(container).map(|c| c.metadata.clone())
    }

    fn count(&self, f: impl FnOnce(&mut OpCounts)) {
        f(&mut self.ops.lock().unwrap_or_else(|e| e.into_inner()));
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn create_container_if_absent(&self, container: &str) -> Result<(), BlobError> {
        self.count(|c| c.creates += 1);
        let mut containers = self.containers.lock().unwrap_or_else(|e| e.into_inner());
        containers.entry(container.to_string()).or_default();
        Ok(())
    }

    async fn get_metadata(&self, container: &str) -> Result<Metadata, BlobError> {
        self.count(|c| c.metadata_reads += 1);
        let containers = self.containers.lock().unwrap_or_else(|e| e.into_inner());
        containers
            .get(container)
            .map(|c| c.metadata.clone())
            .ok_or_else(|| BlobError::ContainerNotFound(container.to_string()))
    }

    async fn set_metadata(&self, container: &str, metadata: &Metadata) -> Result<(), BlobError> {
        self.count(|c| c.metadata_writes += 1);
        let mut containers = self.containers.lock().unwrap_or_else(|e| e.into_inner());
        let entry = containers
            .get_mut(container)
            .ok_or_else(|| BlobError::ContainerNotFound(container.to_string()))?;
        entry.metadata = metadata.clone();
        Ok(())
    }

    async fn put_object(
        &self,
        container: &str,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), BlobError> {
        self.count(|c| c.puts += 1);
        if *self.fail_puts.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(BlobError::Service {
                operation: "put_object",
                status: 503,
                message: "injected failure".to_string(),
            });
        }
        let mut containers = self.containers.lock().unwrap_or_else(|e| e.into_inner());
        let entry = containers
            .get_mut(container)
            .ok_or_else(|| BlobError::ContainerNotFound(container.to_string()))?;
        entry.objects.insert(
            key.to_string(),
            StoredObject {
                content: content.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}
