use super::traits::{BlobError, BlobStore, Metadata};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

const METADATA_FILE: &str = ".metadata.json";

/// Blob store on a local directory tree.
///
/// Each container is a directory under `root`. Container metadata lives in a
/// JSON file inside it, replaced with write-then-rename so a reader never sees
/// a half-written map.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn container_dir(&self, container: &str) -> PathBuf {
        self.root.join(container)
    }

    async fn existing_container(&self, container: &str) -> Result<PathBuf, BlobError> {
        let dir = self.container_dir(container);
        match fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(BlobError::ContainerNotFound(container.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::ContainerNotFound(container.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Keys must name one file directly inside the container directory.
fn check_key(key: &str) -> Result<(), BlobError> {
    let invalid = |reason| BlobError::InvalidKey {
        key: key.to_string(),
        reason,
    };
    if key.contains(['/', '\\']) {
        return Err(invalid("contains a path separator"));
    }
    let mut components = Path::new(key).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name != METADATA_FILE => Ok(()),
        (Some(Component::Normal(_)), None) => Err(invalid("reserved for container metadata")),
        _ => Err(invalid("not a single file name")),
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn create_container_if_absent(&self, container: &str) -> Result<(), BlobError> {
        fs::create_dir_all(self.container_dir(container)).await?;
        Ok(())
    }

    async fn get_metadata(&self, container: &str) -> Result<Metadata, BlobError> {
        let dir = self.existing_container(container).await?;
        match fs::read(dir.join(METADATA_FILE)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Metadata::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_metadata(&self, container: &str, metadata: &Metadata) -> Result<(), BlobError> {
        let dir = self.existing_container(container).await?;
        let tmp = dir.join(format!("{}.tmp", METADATA_FILE));
        fs::write(&tmp, serde_json::to_vec_pretty(metadata)?).await?;
        fs::rename(&tmp, dir.join(METADATA_FILE)).await?;
        Ok(())
    }

    async fn put_object(
        &self,
        container: &str,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), BlobError> {
        check_key(key)?;
        let dir = self.existing_container(container).await?;
        let path = dir.join(key);
        fs::write(&path, content).await?;
        tracing::trace!(path = %path.display(), content_type, bytes = content.len(), "Wrote object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_metadata_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = FsBlobStore::new(temp.path());
        store.create_container_if_absent("logs-audit").await.unwrap();

        assert!(store.get_metadata("logs-audit").await.unwrap().is_empty());

        let metadata = Metadata::from([("last_datetime".to_string(), "2024-01-03T00:00:00Z".to_string())]);
        store.set_metadata("logs-audit", &metadata).await.unwrap();

        assert_eq!(store.get_metadata("logs-audit").await.unwrap(), metadata);
        assert!(!temp.path().join("logs-audit").join(".metadata.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_put_object_writes_file() {
        let temp = TempDir::new().unwrap();
        let store = FsBlobStore::new(temp.path());
        store.create_container_if_absent("logs").await.unwrap();
        store
            .put_object("logs", "page.json", b"{\"value\":[]}", "application/json")
            .await
            .unwrap();

        let written = std::fs::read(temp.path().join("logs").join("page.json")).unwrap();
        assert_eq!(written, b"{\"value\":[]}");
    }

    #[tokio::test]
    async fn test_put_object_rejects_escaping_keys() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("archive");
        let store = FsBlobStore::new(&root);
        store.create_container_if_absent("logs").await.unwrap();

        for key in [
            "logs_x/../../../escaped_1.json",
            "..",
            ".",
            "",
            "sub\\page.json",
            "/abs.json",
            ".metadata.json",
        ] {
            let result = store.put_object("logs", key, b"{}", "application/json").await;
            assert!(
                matches!(result, Err(BlobError::InvalidKey { .. })),
                "key {key:?} was accepted"
            );
        }

        assert!(!temp.path().join("escaped_1.json").exists());
        let entries: Vec<_> = std::fs::read_dir(root.join("logs")).unwrap().collect();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_missing_container() {
        let temp = TempDir::new().unwrap();
        let store = FsBlobStore::new(temp.path());

        assert!(matches!(
            store.get_metadata("nope").await,
            Err(BlobError::ContainerNotFound(_))
        ));
        assert!(matches!(
            store.put_object("nope", "k", b"", "text/plain").await,
            Err(BlobError::ContainerNotFound(_))
        ));
    }
}
