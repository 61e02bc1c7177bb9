//! Google Cloud access tokens for the Vertex AI backends.
//!
//! By default tokens come from Application Default Credentials (a service
//! account key, gcloud user credentials or the metadata server); `gcp_auth`
//! caches them and mints a new one before expiry. A token supplied through
//! the configured environment variable replaces this and is used unchanged
//! for the life of the process.

use crate::error::{AppError, AppResult};
use std::sync::Arc;

/// OAuth scope covering Vertex AI generation and RAG retrieval.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Supplies a bearer token for each backend call.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> AppResult<String>;
}

/// A fixed bearer token.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait::async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> AppResult<String> {
        Ok(self.0.clone())
    }
}

/// Tokens minted and refreshed from Application Default Credentials.
pub struct DefaultCredentials {
    provider: Arc<dyn gcp_auth::TokenProvider>,
}

impl DefaultCredentials {
    /// Find credentials in the environment.
    ///
    /// # Errors
    /// Returns a configuration error when no credential source is available.
    pub async fn discover() -> AppResult<Self> {
        let provider = gcp_auth::provider().await.map_err(|e| {
            AppError::Config(format!("No Google Cloud credentials found: {}", e))
        })?;
        Ok(Self { provider })
    }
}

#[async_trait::async_trait]
impl TokenSource for DefaultCredentials {
    async fn access_token(&self) -> AppResult<String> {
        let token = self
            .provider
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| AppError::backend("auth", format!("Failed to obtain access token: {}", e)))?;
        Ok(token.as_str().to_string())
    }
}

/// The token source for the service: `fixed_token` when present, otherwise
/// Application Default Credentials.
pub async fn token_source(fixed_token: Option<String>) -> AppResult<Arc<dyn TokenSource>> {
    match fixed_token {
        Some(token) => {
            tracing::info!("Using the access token from the environment; it is not refreshed");
            Ok(Arc::new(StaticToken::new(token)))
        }
        None => {
            let credentials = DefaultCredentials::discover().await?;
            tracing::info!("Using Application Default Credentials");
            Ok(Arc::new(credentials))
        }
    }
}
