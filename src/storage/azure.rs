use super::traits::{BlobError, BlobStore, Metadata};
use crate::auth::CredentialProvider;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;

/// Resource that blob service tokens are scoped to.
pub const STORAGE_RESOURCE: &str = "https://storage.azure.com/";

const API_VERSION: &str = "2021-08-06";
const META_PREFIX: &str = "x-ms-meta-";

/// Azure Blob Storage over its REST API, authenticated with bearer tokens.
pub struct AzureBlobStore {
    account_url: String,
    credentials: Arc<dyn CredentialProvider>,
    client: reqwest::Client,
}

impl AzureBlobStore {
    /// `endpoint_suffix` is e.g. `core.windows.net` or `core.usgovcloudapi.net`.
    pub fn new(
        account: &str,
        endpoint_suffix: &str,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self, BlobError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            account_url: format!("https://{}.blob.{}", account, endpoint_suffix),
            credentials,
            client,
        })
    }

    /// Store against an explicit service URL (emulators, private endpoints).
    pub fn with_account_url(
        account_url: &str,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self, BlobError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            account_url: account_url.trim_end_matches('/').to_string(),
            credentials,
            client,
        })
    }

    pub fn account_url(&self) -> &str {
        &self.account_url
    }

    fn container_url(&self, container: &str) -> String {
        format!("{}/{}", self.account_url, container)
    }

    /// Object URL with `key` percent-encoded as a single path segment.
    fn blob_url(&self, container: &str, key: &str) -> Result<Url, BlobError> {
        let invalid = |reason| BlobError::InvalidKey {
            key: key.to_string(),
            reason,
        };
        let mut url =
            Url::parse(&self.container_url(container)).map_err(|_| invalid("unparseable account URL"))?;
        url.path_segments_mut()
            .map_err(|_| invalid("account URL cannot carry a path"))?
            .push(key);
        Ok(url)
    }

    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, BlobError> {
        let token = self.credentials.token(STORAGE_RESOURCE).await?;
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(token.secret())
            .header("x-ms-version", API_VERSION)
            .header("x-ms-date", rfc1123_now()))
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn create_container_if_absent(&self, container: &str) -> Result<(), BlobError> {
        let url = format!("{}?restype=container", self.container_url(container));
        let response = self.request(Method::PUT, &url).await?.send().await?;

        match response.status() {
            StatusCode::CREATED => {
                tracing::info!(container, "Created container");
                Ok(())
            }
            StatusCode::CONFLICT => Ok(()),
            _ => Err(service_error("create_container", response).await),
        }
    }

    async fn get_metadata(&self, container: &str) -> Result<Metadata, BlobError> {
        let url = format!(
            "{}?restype=container&comp=metadata",
            self.container_url(container)
        );
        let response = self.request(Method::GET, &url).await?.send().await?;

        match response.status() {
            s if s.is_success() => Ok(metadata_from_headers(response.headers())),
            StatusCode::NOT_FOUND => Err(BlobError::ContainerNotFound(container.to_string())),
            _ => Err(service_error("get_metadata", response).await),
        }
    }

    async fn set_metadata(&self, container: &str, metadata: &Metadata) -> Result<(), BlobError> {
        let url = format!(
            "{}?restype=container&comp=metadata",
            self.container_url(container)
        );
        let mut request = self.request(Method::PUT, &url).await?;
        for (key, value) in metadata {
            let name = format!("{}{}", META_PREFIX, key);
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send().await?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(BlobError::ContainerNotFound(container.to_string())),
            _ => Err(service_error("set_metadata", response).await),
        }
    }

    async fn put_object(
        &self,
        container: &str,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<(), BlobError> {
        let url = self.blob_url(container, key)?;
        let response = self
            .request(Method::PUT, url.as_str())
            .await?
            .header("x-ms-blob-type", "BlockBlob")
            .header(CONTENT_TYPE, content_type)
            .body(content.to_vec())
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(BlobError::ContainerNotFound(container.to_string())),
            _ => Err(service_error("put_object", response).await),
        }
    }
}

fn rfc1123_now() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn metadata_from_headers(headers: &HeaderMap<HeaderValue>) -> Metadata {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let key = name.as_str().strip_prefix(META_PREFIX)?;
            let value = value.to_str().ok()?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

async fn service_error(operation: &'static str, response: Response) -> BlobError {
    BlobError::Service {
        operation,
        status: response.status().as_u16(),
        message: response.text().await.unwrap_or_default(),
    }
}
