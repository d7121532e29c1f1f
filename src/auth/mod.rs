pub mod client_credentials;

pub use client_credentials::ClientCredentialsProvider;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

/// Exchanges configured credentials for short-lived bearer tokens.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Token scoped to `resource`, e.g. `https://graph.microsoft.com/`.
    async fn token(&self, resource: &str) -> Result<AccessToken, AuthError>;
}

#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True while the token has more than `margin` of life left.
    pub fn is_fresh(&self, margin: chrono::Duration) -> bool {
        Utc::now() + margin < self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token endpoint rejected credentials ({status}): {error}: {description}")]
    Rejected {
        status: u16,
        error: String,
        description: String,
    },

    #[error("token response missing access_token")]
    MissingToken,
}
