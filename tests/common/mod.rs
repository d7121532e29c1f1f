#![allow(dead_code)]

use async_trait::async_trait;
use auditsync::archive::{ArchiveWriter, ArtifactNaming};
use auditsync::auth::{AccessToken, AuthError, CredentialProvider};
use auditsync::feed::{FeedClient, FeedResponse, FeedTransport, FixedDelay};
use auditsync::storage::{BlobCheckpointStore, MemoryBlobStore};
use auditsync::stream::{LogStream, StreamCatalog};
use auditsync::sync::SyncEngine;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const API_ROOT: &str = "https://graph.example.test/beta";
pub const FEED_RESOURCE: &str = "https://graph.example.test/";
pub const LOOKBACK: Duration = Duration::from_secs(90 * 24 * 3600);

/// Feed transport replaying canned responses.
///
/// Records each requested URI and, when a store is attached, how many objects
/// had been written at the moment of each request.
#[derive(Default)]
pub struct ScriptedFeed {
    responses: Mutex<VecDeque<FeedResponse>>,
    requested: Mutex<Vec<String>>,
    puts_at_request: Mutex<Vec<usize>>,
    store: Option<Arc<MemoryBlobStore>>,
}

impl ScriptedFeed {
    pub fn new(responses: Vec<FeedResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        })
    }

    pub fn observing(responses: Vec<FeedResponse>, store: Arc<MemoryBlobStore>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            store: Some(store),
            ..Self::default()
        })
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub fn puts_at_request(&self) -> Vec<usize> {
        self.puts_at_request.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl FeedTransport for ScriptedFeed {
    async fn get(&self, uri: &str, token: &AccessToken) -> auditsync::feed::Result<FeedResponse> {
        assert_eq!(token.secret(), "feed-token");
        self.requested.lock().unwrap().push(uri.to_string());
        if let Some(store) = &self.store {
            self.puts_at_request
                .lock()
                .unwrap()
                .push(store.op_counts().puts);
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("feed script exhausted"))
    }
}

#[derive(Default)]
pub struct CountingCredentials {
    calls: Mutex<Vec<String>>,
    fail: bool,
}

impl CountingCredentials {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CredentialProvider for CountingCredentials {
    async fn token(&self, resource: &str) -> Result<AccessToken, AuthError> {
        self.calls.lock().unwrap().push(resource.to_string());
        if self.fail {
            return Err(AuthError::Rejected {
                status: 401,
                error: "invalid_client".to_string(),
                description: "AADSTS7000215: Invalid client secret provided.".to_string(),
            });
        }
        Ok(AccessToken::new(
            "feed-token",
            Utc::now() + chrono::Duration::hours(1),
        ))
    }
}

pub fn audit_stream() -> LogStream {
    LogStream::new("directoryAudits", "activityDateTime", "logs-audit")
}

pub fn engine(
    feed: Arc<ScriptedFeed>,
    credentials: Arc<CountingCredentials>,
    blobs: Arc<MemoryBlobStore>,
    retry: FixedDelay,
) -> SyncEngine {
    let mut catalog = StreamCatalog::new();
    catalog.insert(audit_stream());
    catalog.insert(LogStream::new("signIns", "createdDateTime", "logs-signin"));

    SyncEngine::new(
        catalog,
        credentials,
        Arc::new(BlobCheckpointStore::new(blobs.clone(), LOOKBACK)),
        FeedClient::new(feed, Arc::new(retry), API_ROOT, 500),
        ArchiveWriter::new(blobs, ArtifactNaming::default(), "application/json"),
        FEED_RESOURCE,
    )
}

/// Page of audit records with the given timestamps, newest first.
pub fn audit_page(timestamps: &[&str], next_link: Option<&str>) -> FeedResponse {
    let records: Vec<Value> = timestamps
        .iter()
        .enumerate()
        .map(|(i, ts)| json!({ "id": format!("rec-{i}"), "activityDateTime": ts, "category": "UserManagement" }))
        .collect();
    let mut body = json!({
        "@odata.context": "https://graph.example.test/beta/$metadata#auditLogs/directoryAudits",
        "value": records,
    });
    if let Some(link) = next_link {
        body["@odata.nextLink"] = json!(link);
    }
    FeedResponse {
        status: 200,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: serde_json::to_vec(&body).unwrap(),
    }
}

pub fn throttled() -> FeedResponse {
    FeedResponse {
        status: 429,
        headers: vec![("retry-after".to_string(), "10".to_string())],
        body: br#"{"error":{"code":"TooManyRequests","message":"Too many requests"}}"#.to_vec(),
    }
}

pub fn server_error(status: u16) -> FeedResponse {
    FeedResponse {
        status,
        headers: vec![],
        body: br#"{"error":{"code":"UnknownError"}}"#.to_vec(),
    }
}

/// Value of the `$filter` query parameter of a feed URI.
pub fn filter_of(uri: &str) -> String {
    let url = reqwest::Url::parse(uri).unwrap();
    url.query_pairs()
        .find(|(k, _)| k == "$filter")
        .map(|(_, v)| v.into_owned())
        .expect("no $filter in uri")
}
