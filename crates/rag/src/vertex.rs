//! Vertex AI RAG Engine retrieval.
//!
//! Calls the `retrieveContexts` REST method with the corpus as the single
//! RAG resource, authenticated by the shared [`TokenSource`].

use crate::retriever::{dedup_by_text, Retriever};
use rulegate_core::domain::RetrievedContext;
use rulegate_core::{AppError, AppResult, TokenSource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveContextsRequest {
    vertex_rag_store: VertexRagStore,
    query: RagQuery,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VertexRagStore {
    rag_resources: Vec<RagResource>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RagResource {
    rag_corpus: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RagQuery {
    text: String,
    rag_retrieval_config: RagRetrievalConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RagRetrievalConfig {
    top_k: usize,
}

#[derive(Debug, Default, Deserialize)]
struct RetrieveContextsResponse {
    #[serde(default)]
    contexts: Option<RagContexts>,
}

#[derive(Debug, Default, Deserialize)]
struct RagContexts {
    #[serde(default)]
    contexts: Vec<RagContext>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RagContext {
    #[serde(default)]
    source_uri: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    score: Option<f64>,
}

/// Retriever backed by the Vertex AI RAG Engine.
pub struct VertexRagClient {
    base_url: String,
    project_id: String,
    region: String,
    tokens: Arc<dyn TokenSource>,
    client: reqwest::Client,
}

impl VertexRagClient {
    pub fn new(
        project_id: impl Into<String>,
        region: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let region = region.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: format!("https://{}-aiplatform.googleapis.com", region),
            project_id: project_id.into(),
            region,
            tokens,
            client,
        })
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}:retrieveContexts",
            self.base_url, self.project_id, self.region
        )
    }

    /// Full resource name for a corpus id.
    ///
    /// Numeric or short ids are expanded under this client's project and region.
    fn corpus_resource(&self, corpus_id: &str) -> String {
        if corpus_id.starts_with("projects/") {
            return corpus_id.to_string();
        }
        format!(
            "projects/{}/locations/{}/ragCorpora/{}",
            self.project_id, self.region, corpus_id
        )
    }

    fn build_request(&self, query: &str, corpus_id: &str, top_k: usize) -> RetrieveContextsRequest {
        RetrieveContextsRequest {
            vertex_rag_store: VertexRagStore {
                rag_resources: vec![RagResource {
                    rag_corpus: self.corpus_resource(corpus_id),
                }],
            },
            query: RagQuery {
                text: query.to_string(),
                rag_retrieval_config: RagRetrievalConfig { top_k },
            },
        }
    }
}

fn convert_response(response: RetrieveContextsResponse) -> Vec<RetrievedContext> {
    let contexts = response
        .contexts
        .unwrap_or_default()
        .contexts
        .into_iter()
        .map(|c| RetrievedContext {
            text: c.text,
            score: c.score.unwrap_or(0.0),
            source_uri: c.source_uri,
            ..Default::default()
        })
        .collect();

    dedup_by_text(contexts)
}

#[async_trait::async_trait]
impl Retriever for VertexRagClient {
    async fn retrieve_contexts(
        &self,
        query: &str,
        corpus_id: &str,
        top_k: usize,
    ) -> AppResult<Vec<RetrievedContext>> {
        tracing::debug!(corpus_id, top_k, "Retrieving contexts");

        let token = self.tokens.access_token().await?;
        let body = self.build_request(query, corpus_id, top_k);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::backend("retrieve", format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::backend(
                "retrieve",
                format!("RAG API error ({}): {}", status, error_text),
            ));
        }

        let payload: RetrieveContextsResponse = response
            .json()
            .await
            .map_err(|e| AppError::backend("retrieve", format!("Failed to read response: {}", e)))?;

        Ok(convert_response(payload))
    }
}
