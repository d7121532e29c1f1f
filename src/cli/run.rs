use crate::archive::{ArchiveWriter, ArtifactNaming};
use crate::auth::{AuthError, ClientCredentialsProvider, CredentialProvider};
use crate::config::parse::{load_config, ConfigError};
use crate::config::types::{Config, StorageConfig};
use crate::feed::{FeedClient, FeedError, FixedDelay, HttpFeedTransport};
use crate::storage::{AzureBlobStore, BlobCheckpointStore, BlobError, BlobStore, FsBlobStore};
use crate::stream::StreamCatalog;
use crate::sync::{SyncEngine, SyncOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config not found; searched ~/.config/auditsync/config.yml and /etc/auditsync/config.yml \
             (use --config <path>, or run 'auditsync config init' to generate one)")]
    ConfigNotFound,

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("credential provider error: {0}")]
    Auth(#[from] AuthError),

    #[error("blob store error: {0}")]
    Blob(#[from] BlobError),

    #[error("feed client error: {0}")]
    Feed(#[from] FeedError),

    #[error("{failed} of {total} streams failed")]
    StreamsFailed { failed: usize, total: usize },
}

/// Synchronizes the requested streams, or every configured stream when none are named.
pub async fn run(config_path: Option<PathBuf>, streams: Vec<String>) -> Result<(), RunError> {
    let config_path = config_path.ok_or(RunError::ConfigNotFound)?;
    info!(config_path = %config_path.display(), "Loading configuration");
    let config = load_config(&config_path)?;

    let engine = build_engine(&config)?;

    let stream_ids: Vec<String> = if streams.is_empty() {
        config.streams.iter().map(|s| s.id.clone()).collect()
    } else {
        streams
    };

    let results = engine
        .sync_streams(stream_ids.iter().map(String::as_str))
        .await;

    let total = results.len();
    let mut failed = 0;
    for (stream_id, result) in results {
        match result {
            Ok(SyncOutcome::Completed(report)) => info!(
                stream_id = %stream_id,
                artifacts = report.artifacts,
                records = report.records,
                "Stream synchronized"
            ),
            Ok(SyncOutcome::UnknownStream) => {
                warn!(stream_id = %stream_id, "Stream skipped: not recognized")
            }
            Err(e) => {
                failed += 1;
                error!(stream_id = %stream_id, error = %e, "Stream failed");
            }
        }
    }

    if failed > 0 {
        return Err(RunError::StreamsFailed { failed, total });
    }
    Ok(())
}

/// Wires the production collaborators named by `config` into an engine.
pub fn build_engine(config: &Config) -> Result<SyncEngine, RunError> {
    let credentials: Arc<dyn CredentialProvider> = Arc::new(ClientCredentialsProvider::new(
        config.authority(),
        &config.credentials.tenant_id,
        &config.credentials.client_id,
        &config.credentials.client_secret,
        config.feed.timeout,
    )?);

    let blobs: Arc<dyn BlobStore> = match &config.storage {
        StorageConfig::Azure { account, timeout } => {
            info!(account = %account, suffix = %config.storage_suffix(), "Using Azure blob storage");
            Arc::new(AzureBlobStore::new(
                account,
                config.storage_suffix(),
                credentials.clone(),
                *timeout,
            )?)
        }
        StorageConfig::Filesystem { path } => {
            info!(path = %path.display(), "Using filesystem blob storage");
            Arc::new(FsBlobStore::new(path))
        }
    };

    let checkpoints = Arc::new(BlobCheckpointStore::new(blobs.clone(), config.sync.lookback));

    let feed = FeedClient::new(
        Arc::new(HttpFeedTransport::new(config.feed.timeout)?),
        Arc::new(FixedDelay::from_config(&config.retry)),
        &config.feed_api_root(),
        config.feed.page_size,
    );

    let archive = ArchiveWriter::new(
        blobs,
        ArtifactNaming {
            prefix: config.sync.artifact_prefix.clone(),
            ..ArtifactNaming::default()
        },
        &config.sync.content_type,
    );

    let catalog = StreamCatalog::from_config(&config.streams);
    info!(streams = catalog.len(), "Stream catalog built");

    Ok(SyncEngine::new(
        catalog,
        credentials,
        checkpoints,
        feed,
        archive,
        config.feed_endpoint(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_build_engine_from_filesystem_config() {
        let config = parse_config(
            r#"
credentials:
  tenant_id: tenant
  client_id: client
  client_secret: secret
storage:
  backend: filesystem
  path: /tmp/auditsync-test
streams:
  - id: directoryAudits
    destination: logs-audit
  - id: riskyUsers
    destination: logs-risky
"#,
        )
        .unwrap();

        let engine = build_engine(&config).unwrap();
        assert_eq!(engine.catalog().len(), 1);
        assert!(engine.catalog().get("directoryAudits").is_some());
    }

    #[tokio::test]
    async fn test_missing_config_path() {
        let err = run(None, vec![]).await.unwrap_err();
        assert!(matches!(err, RunError::ConfigNotFound));
    }
}
