use auditsync::config::types::{Cloud, StorageConfig};
use auditsync::config::{generate::generate_starter_config, load_config, ConfigError};
use auditsync::stream::StreamCatalog;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_generated_config_is_valid() {
    std::env::set_var("AUDITSYNC_TENANT_ID", "00000000-0000-0000-0000-000000000001");
    std::env::set_var("AUDITSYNC_CLIENT_ID", "00000000-0000-0000-0000-000000000002");
    std::env::set_var("AUDITSYNC_CLIENT_SECRET", "not-a-real-secret");

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");
    fs::write(&config_path, generate_starter_config()).unwrap();

    let config = load_config(&config_path).expect("Generated config should be valid");

    assert_eq!(config.cloud, Cloud::Public);
    assert_eq!(config.credentials.tenant_id, "00000000-0000-0000-0000-000000000001");
    assert!(matches!(config.storage, StorageConfig::Azure { ref account, .. } if account == "auditarchive"));
    assert_eq!(config.retry.interval, Duration::from_secs(10));
    assert_eq!(config.retry.max_attempts, None);
    assert_eq!(config.sync.lookback, Duration::from_secs(90 * 24 * 3600));

    let catalog = StreamCatalog::from_config(&config.streams);
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.get("directoryAudits").unwrap().destination, "logs-audit");
    assert_eq!(catalog.get("signIns").unwrap().cursor_field, "createdDateTime");
}

#[test]
fn test_missing_config_file() {
    let err = load_config(std::path::Path::new("/nonexistent/auditsync.yml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
    assert!(err.to_string().contains("/nonexistent/auditsync.yml"));
}

#[test]
fn test_yaml_error_names_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("broken.yml");
    fs::write(&config_path, "credentials: [not, a, map\n").unwrap();

    let err = load_config(&config_path).unwrap_err();
    assert!(err.to_string().contains("broken.yml"));
}

#[test]
fn test_custom_stream_with_cursor_field() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");
    fs::write(
        &config_path,
        r#"
cloud: usgov
credentials:
  tenant_id: tenant
  client_id: client
  client_secret: secret
storage:
  backend: filesystem
  path: ~/auditsync-archive
streams:
  - id: alerts
    destination: logs-alerts
    cursor_field: createdDateTime
    path: security/alerts_v2
"#,
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    if let StorageConfig::Filesystem { path } = &config.storage {
        assert!(!path.starts_with("~"));
    }
    assert_eq!(config.feed_api_root(), "https://graph.microsoft.us/beta");

    let catalog = StreamCatalog::from_config(&config.streams);
    let stream = catalog.get("alerts").unwrap();
    assert_eq!(stream.cursor_field, "createdDateTime");
    assert_eq!(stream.resource_path, "security/alerts_v2");
}
