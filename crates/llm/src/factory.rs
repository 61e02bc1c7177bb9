//! LLM provider factory.
//!
//! This module builds the configured LLM client once at startup.

use crate::client::LlmClient;
use crate::providers::{ollama::DEFAULT_OLLAMA_URL, GeminiClient, OllamaClient};
use crate::types::{LlmSettings, ProviderType};
use rulegate_core::{AppError, AppResult, TokenSource};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// `tokens` authenticates Gemini calls and is ignored by Ollama.
///
/// # Errors
/// Returns error if:
/// - Provider is unknown
/// - Gemini is selected without a project
/// - The HTTP client cannot be built
pub fn create_client(
    settings: &LlmSettings,
    tokens: Arc<dyn TokenSource>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&settings.provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", settings.provider)))?;

    match provider {
        ProviderType::Gemini => {
            if settings.project_id.is_empty() {
                return Err(AppError::Config(
                    "Gemini provider requires a project id".to_string(),
                ));
            }
            let mut client = GeminiClient::new(
                &settings.project_id,
                &settings.region,
                tokens,
                settings.timeout(),
            )?;
            if let Some(endpoint) = &settings.endpoint {
                client = client.with_base_url(endpoint);
            }
            Ok(Arc::new(client))
        }
        ProviderType::Ollama => {
            let base_url = settings.endpoint.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
            Ok(Arc::new(OllamaClient::with_base_url(base_url, settings.timeout())?))
        }
    }
}
