pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# AUDITSYNC CONFIGURATION
# =============================================================================
# Mirrors audit log feeds into blob storage, one destination container per
# stream. Each run resumes from the checkpoint stored in the container's
# metadata and archives every fetched page as one immutable object.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/auditsync/config.yml
#   3. /etc/auditsync/config.yml
#
# Values of the form $env{NAME} are replaced with environment variables before
# the file is parsed.

# Sovereign cloud providing default endpoints: 'public' or 'usgov'
cloud: public

# Individual endpoint overrides (optional)
# endpoints:
#   authority: https://login.microsoftonline.com/
#   feed: https://graph.microsoft.com/
#   storage_suffix: core.windows.net

# Application registration. Needs AuditLog.Read.All on the feed and the
# Storage Blob Data Contributor role on the storage account.
credentials:
  tenant_id: $env{AUDITSYNC_TENANT_ID}
  client_id: $env{AUDITSYNC_CLIENT_ID}
  client_secret: $env{AUDITSYNC_CLIENT_SECRET}

# Where artifacts and checkpoints go: 'azure' or 'filesystem'
storage:
  backend: azure
  account: auditarchive
  timeout: 60s
# storage:
#   backend: filesystem
#   path: ~/auditsync-archive

feed:
  api_version: beta
  # Records requested per page
  page_size: 500
  timeout: 60s

sync:
  # Start point for streams that have no checkpoint yet
  lookback: 90days
  artifact_prefix: logs
  content_type: application/json

retry:
  # Wait between retries of a throttled request
  interval: 10s
  # Give up after this many throttled attempts; omit to retry forever
  # max_attempts: 30
  # Random extra wait added to each retry
  jitter: 0s
  # Retries of timeouts, connection failures and 5xx responses
  transient_retries: 3

# Streams to synchronize, in order. Built-in cursor fields exist for
# directoryAudits, signIns and provisioning; other feeds need cursor_field.
streams:
  - id: directoryAudits
    destination: logs-audit
  - id: signIns
    destination: logs-signin
"#
    .to_string()
}
