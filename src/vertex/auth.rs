use async_trait::async_trait;
use google_cloud_auth::credentials::CredentialsFile;
use google_cloud_auth::project::Config;
use google_cloud_auth::token::DefaultTokenSourceProvider;
use google_cloud_token::{TokenSource, TokenSourceProvider};
use std::sync::Arc;

use crate::config::ConnectionSettings;
use crate::services::{BackendError, ChatError};

const CLOUD_PLATFORM_SCOPES: [&str; 1] = ["https://www.googleapis.com/auth/cloud-platform"];

/// Supplies the `Authorization` header value for Vertex AI requests.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn authorization(&self) -> Result<String, BackendError>;
}

/// A token minted elsewhere, e.g. `gcloud auth print-access-token`.
#[derive(Clone)]
pub struct StaticAccessToken {
    header: String,
}

impl StaticAccessToken {
    pub fn new(token: &str) -> Self {
        let token = token.trim();
        let header = if token.starts_with("Bearer ") {
            token.to_string()
        } else {
            format!("Bearer {}", token)
        };
        Self { header }
    }
}

impl std::fmt::Debug for StaticAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticAccessToken([REDACTED])")
    }
}

#[async_trait]
impl AccessTokenProvider for StaticAccessToken {
    async fn authorization(&self) -> Result<String, BackendError> {
        Ok(self.header.clone())
    }
}

/// Refreshing OAuth tokens from a service account key or Application
/// Default Credentials.
pub struct GoogleAccessToken {
    source: Arc<dyn TokenSource>,
}

impl GoogleAccessToken {
    pub async fn from_application_default() -> Result<Self, ChatError> {
        let config = Config::default().with_scopes(&CLOUD_PLATFORM_SCOPES);
        let provider = DefaultTokenSourceProvider::new(config).await.map_err(|e| {
            ChatError::configuration(format!("failed to load application default credentials: {}", e))
        })?;

        Ok(Self {
            source: provider.token_source(),
        })
    }

    pub async fn from_service_account_json(json: &str) -> Result<Self, ChatError> {
        let credentials = CredentialsFile::new_from_str(json).await.map_err(|e| {
            ChatError::configuration(format!("invalid service account credentials: {}", e))
        })?;

        let config = Config::default().with_scopes(&CLOUD_PLATFORM_SCOPES);
        let provider = DefaultTokenSourceProvider::new_with_credentials(config, Box::new(credentials))
            .await
            .map_err(|e| {
                ChatError::configuration(format!("failed to initialise service account credentials: {}", e))
            })?;

        Ok(Self {
            source: provider.token_source(),
        })
    }
}

#[async_trait]
impl AccessTokenProvider for GoogleAccessToken {
    async fn authorization(&self) -> Result<String, BackendError> {
        // The token source answers with "<type> <token>", ready for the header.
        self.source
            .token()
            .await
            .map_err(|e| BackendError::auth(e.to_string()))
    }
}

/// Pick a credential source: explicit access token, then service account
/// JSON, then Application Default Credentials.
pub async fn token_provider_from_settings(
    settings: &ConnectionSettings,
) -> Result<Arc<dyn AccessTokenProvider>, ChatError> {
    if let Some(token) = settings.access_token.as_deref().filter(|t| !t.trim().is_empty()) {
        tracing::info!("Using static access token for Vertex AI");
        return Ok(Arc::new(StaticAccessToken::new(token)));
    }

    if let Some(json) = settings
        .google_credentials_json
        .as_deref()
        .filter(|j| !j.trim().is_empty())
    {
        // Reject obviously broken JSON before handing it to the credential loader.
        serde_json::from_str::<serde_json::Value>(json).map_err(|_| {
            ChatError::configuration("Google Credentials JSON is not valid JSON. Please check the format.")
        })?;
        tracing::info!("Using service account credentials for Vertex AI");
        return Ok(Arc::new(GoogleAccessToken::from_service_account_json(json).await?));
    }

    tracing::info!("Using application default credentials for Vertex AI");
    Ok(Arc::new(GoogleAccessToken::from_application_default().await?))
}
