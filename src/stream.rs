use crate::config::types::StreamConfig;
use std::collections::BTreeMap;

/// Cursor fields of the audit log feeds known without configuration.
const BUILTIN_CURSOR_FIELDS: &[(&str, &str)] = &[
    ("directoryAudits", "activityDateTime"),
    ("signIns", "createdDateTime"),
    ("provisioning", "activityDateTime"),
];

pub fn builtin_cursor_field(stream_id: &str) -> Option<&'static str> {
    BUILTIN_CURSOR_FIELDS
        .iter()
        .find(|(id, _)| *id == stream_id)
        .map(|(_, field)| *field)
}

/// One independently synchronized log feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStream {
    pub stream_id: String,
    /// Per-record timestamp field used for ordering and filtering.
    pub cursor_field: String,
    /// Container receiving this stream's artifacts and checkpoint.
    pub destination: String,
    /// Feed path relative to the versioned API root.
    pub resource_path: String,
}

impl LogStream {
    pub fn new(
        stream_id: impl Into<String>,
        cursor_field: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        let stream_id = stream_id.into();
        let resource_path = format!("auditLogs/{}", stream_id);
        Self {
            stream_id,
            cursor_field: cursor_field.into(),
            destination: destination.into(),
            resource_path,
        }
    }

    pub fn with_resource_path(mut self, path: impl Into<String>) -> Self {
        self.resource_path = path.into().trim_matches('/').to_string();
        self
    }
}

/// Streams the engine knows how to synchronize, by id.
#[derive(Debug, Clone, Default)]
pub struct StreamCatalog {
    streams: BTreeMap<String, LogStream>,
}

impl StreamCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the catalog from configured streams.
    ///
    /// A configured stream without an explicit cursor field and without a
    /// built-in one is left out, so requests for it resolve as unrecognized.
    pub fn from_config(streams: &[StreamConfig]) -> Self {
        let mut catalog = Self::new();
        for config in streams {
            let cursor_field = config
                .cursor_field
                .clone()
                .or_else(|| builtin_cursor_field(&config.id).map(str::to_string));

            let Some(cursor_field) = cursor_field else {
                tracing::warn!(stream_id = %config.id, "No cursor field known for stream");
                continue;
            };

            let mut stream = LogStream::new(&config.id, cursor_field, &config.destination);
            if let Some(path) = &config.path {
                stream = stream.with_resource_path(path);
            }
            catalog.insert(stream);
        }
        catalog
    }

    pub fn insert(&mut self, stream: LogStream) {
        self.streams.insert(stream.stream_id.clone(), stream);
    }

    pub fn get(&self, stream_id: &str) -> Option<&LogStream> {
        self.streams.get(stream_id)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogStream> {
        self.streams.values()
    }
}
