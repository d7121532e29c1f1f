use super::{AccessToken, AuthError, CredentialProvider};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// Tokens are refreshed once they have less than this left.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_LIFETIME_SECS: i64 = 3600;

/// OAuth2 client-credentials grant against an Azure AD style authority.
pub struct ClientCredentialsProvider {
    token_url: String,
    client_id: String,
    client_secret: String,
    client: reqwest::Client,
    cache: Mutex<HashMap<String, AccessToken>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

impl ClientCredentialsProvider {
    pub fn new(
        authority: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            token_url: token_url(authority, tenant_id),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            client,
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    async fn request_token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];

        let response = self.client.post(&self.token_url).form(&form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed: TokenErrorResponse =
                serde_json::from_str(&body).unwrap_or(TokenErrorResponse {
                    error: "unknown_error".to_string(),
                    error_description: body,
                });
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                error: parsed.error,
                description: parsed.error_description,
            });
        }

        let body: TokenResponse = response.json().await?;
        let secret = body.access_token.ok_or(AuthError::MissingToken)?;
        let lifetime = body
            .expires_in
            .as_ref()
            .and_then(parse_expires_in)
            .unwrap_or(DEFAULT_LIFETIME_SECS);

        Ok(AccessToken::new(
            secret,
            Utc::now() + chrono::Duration::seconds(lifetime),
        ))
    }
}

#[async_trait]
impl CredentialProvider for ClientCredentialsProvider {
    async fn token(&self, resource: &str) -> Result<AccessToken, AuthError> {
        let scope = scope_for(resource);
        let mut cache = self.cache.lock().await;

        if let Some(token) = cache.get(&scope) {
            if token.is_fresh(chrono::Duration::seconds(REFRESH_MARGIN_SECS)) {
                return Ok(token.clone());
            }
        }

        tracing::debug!(scope = %scope, "Requesting access token");
        let token = self.request_token(&scope).await?;
        tracing::info!(scope = %scope, expires_at = %token.expires_at(), "Acquired access token");
        cache.insert(scope, token.clone());
        Ok(token)
    }
}

fn token_url(authority: &str, tenant_id: &str) -> String {
    format!(
        "{}/{}/oauth2/v2.0/token",
        authority.trim_end_matches('/'),
        tenant_id
    )
}

fn scope_for(resource: &str) -> String {
    format!("{}/.default", resource.trim_end_matches('/'))
}

// v1 endpoints send expires_in as a string, v2 as a number
fn parse_expires_in(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
