//! Gemini on Vertex AI.
//!
//! Calls the `generateContent` REST method with a bearer token obtained from
//! the shared [`TokenSource`] for every request.

use super::{api_error, http_client};
use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use rulegate_core::{AppError, AppResult, TokenSource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Gemini client for the Vertex AI REST API.
pub struct GeminiClient {
    base_url: String,
    project_id: String,
    region: String,
    tokens: Arc<dyn TokenSource>,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(
        project_id: impl Into<String>,
        region: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let region = region.into();
        Ok(Self {
            base_url: format!("https://{}-aiplatform.googleapis.com", region),
            project_id: project_id.into(),
            region,
            tokens,
            client: http_client(timeout)?,
        })
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.base_url, self.project_id, self.region, model
        )
    }

    fn to_gemini_request(&self, request: &LlmRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            system_instruction: request.system.as_ref().map(|system| Content {
                role: None,
                parts: vec![Part {
                    text: system.clone(),
                }],
            }),
            generation_config: GenerationConfig {
                response_mime_type: request.json_output.then_some("application/json"),
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }

    fn convert_response(&self, model: &str, response: GenerateContentResponse) -> AppResult<LlmResponse> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::backend("llm", "Gemini returned no candidates"))?;

        if let Some(reason) = candidate.finish_reason.as_deref() {
            if reason != "STOP" {
                tracing::warn!(finish_reason = reason, "Gemini finished early");
            }
        }

        let content = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        let usage = response.usage_metadata.unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: response.model_version.unwrap_or_else(|| model.to_string()),
            usage: LlmUsage::new(usage.prompt_token_count, usage.candidates_token_count),
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, "Sending generateContent request");

        let token = self.tokens.access_token().await?;
        let body = self.to_gemini_request(request);

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::backend("llm", format!("Failed to send request to Gemini: {}", e)))?;

        if !response.status().is_success() {
            return Err(api_error("Gemini", response).await);
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::backend("llm", format!("Failed to read Gemini response: {}", e)))?;

        let response = self.convert_response(&request.model, payload)?;
        tracing::debug!(
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Received completion from Gemini"
        );

        Ok(response)
    }
}
