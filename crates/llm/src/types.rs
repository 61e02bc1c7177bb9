//! LLM configuration types.
//!
//! This module defines the settings the factory needs to build a provider.

use rulegate_core::AppConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Gemini,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" | "vertex" | "vertexai" => Some(Self::Gemini),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }
}

/// Settings for building an LLM client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmSettings {
    /// Provider name ("gemini" or "ollama")
    pub provider: String,

    /// Google Cloud project (Gemini)
    pub project_id: String,

    /// Google Cloud region (Gemini)
    pub region: String,

    /// Custom endpoint; the provider default is used when absent
    pub endpoint: Option<String>,

    /// HTTP timeout per call, in seconds
    pub timeout_secs: u64,
}

impl LlmSettings {
    /// Derive client settings from the service configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let endpoint = match ProviderType::parse(&config.provider) {
            Some(ProviderType::Ollama) => Some(config.ollama_endpoint.clone()),
            _ => None,
        };

        Self {
            provider: config.provider.clone(),
            project_id: config.project_id.clone(),
            region: config.region.clone(),
            endpoint,
            timeout_secs: config.backend_timeout_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!(ProviderType::parse("gemini"), Some(ProviderType::Gemini));
        assert_eq!(ProviderType::parse("Vertex"), Some(ProviderType::Gemini));
        assert_eq!(ProviderType::parse("ollama"), Some(ProviderType::Ollama));
        assert_eq!(ProviderType::parse("openai"), None);
        assert_eq!(ProviderType::Ollama.as_str(), "ollama");
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = AppConfig::default();
        config.project_id = "my-project".to_string();
        config.provider = "ollama".to_string();

        let settings = LlmSettings::from_config(&config);
        assert_eq!(settings.project_id, "my-project");
        assert_eq!(settings.endpoint.as_deref(), Some("http://localhost:11434"));
        assert_eq!(settings.timeout(), Duration::from_secs(30));
    }
}
