use super::Result;
use crate::auth::AccessToken;
use async_trait::async_trait;
use std::time::Duration;

/// Raw response to a feed request.
#[derive(Debug, Clone)]
pub struct FeedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl FeedResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issues one authenticated GET against the feed.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn get(&self, uri: &str, token: &AccessToken) -> Result<FeedResponse>;
}

#[derive(Debug, Clone)]
pub struct HttpFeedTransport {
    client: reqwest::Client,
}

impl HttpFeedTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedTransport for HttpFeedTransport {
    async fn get(&self, uri: &str, token: &AccessToken) -> Result<FeedResponse> {
        let response = self
            .client
            .get(uri)
            .bearer_auth(token.secret())
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(FeedResponse {
            status,
            headers,
            body,
        })
    }
}
