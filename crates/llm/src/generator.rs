//! Query rewriting and answer generation on top of an LLM client.

use crate::client::{LlmClient, LlmRequest};
use rulegate_core::domain::{
    sanitize_citations, AnswerResult, QueryContext, RetrievedContext, RewriteResult,
};
use rulegate_core::{AppError, AppResult};
use rulegate_prompt::{PromptName, PromptTemplates};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

const REWRITE_TEMPERATURE: f32 = 0.2;
const ANSWER_TEMPERATURE: f32 = 0.3;
const ANSWER_MAX_TOKENS: u32 = 16384;

/// Characters of an unparsable reply kept in the log.
const REPLY_EXCERPT_CHARS: usize = 200;

/// The generation collaborator of the ask pipeline.
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    /// Turn a Japanese question into an English retrieval query.
    async fn rewrite_query(
        &self,
        question_ja: &str,
        context: Option<&QueryContext>,
    ) -> AppResult<RewriteResult>;

    /// Answer the question from retrieved passages.
    ///
    /// Citation excerpts are word-limited and missing source URLs are
    /// replaced with `fallback_source_url`.
    async fn generate_answer(
        &self,
        question_ja: &str,
        contexts: &[RetrievedContext],
        fallback_source_url: &str,
    ) -> AppResult<AnswerResult>;
}

/// [`Generator`] backed by prompt templates and an [`LlmClient`].
pub struct RulesGenerator {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptTemplates>,
    model: String,
    rewrite_model: String,
}

impl RulesGenerator {
    pub fn new(
        client: Arc<dyn LlmClient>,
        prompts: Arc<PromptTemplates>,
        model: impl Into<String>,
        rewrite_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            prompts,
            model: model.into(),
            rewrite_model: rewrite_model.into(),
        }
    }
}

#[async_trait::async_trait]
impl Generator for RulesGenerator {
    async fn rewrite_query(
        &self,
        question_ja: &str,
        context: Option<&QueryContext>,
    ) -> AppResult<RewriteResult> {
        let context_json = match context {
            Some(ctx) => serde_json::to_string(ctx)?,
            None => "{}".to_string(),
        };

        let vars = HashMap::from([
            ("question_ja", question_ja.to_string()),
            ("context_json", context_json),
        ]);
        let prompt = self
            .prompts
            .build(PromptName::RewriteSystem, PromptName::RewriteUser, &vars)?;

        let request = LlmRequest::new(prompt.user, &self.rewrite_model)
            .with_system(prompt.system)
            .with_temperature(REWRITE_TEMPERATURE)
            .with_json_output();

        let response = self.client.complete(&request).await?;
        parse_reply(&response.content, "rewrite")
    }

    async fn generate_answer(
        &self,
        question_ja: &str,
        contexts: &[RetrievedContext],
        fallback_source_url: &str,
    ) -> AppResult<AnswerResult> {
        let vars = HashMap::from([
            ("question_ja", question_ja.to_string()),
            ("contexts_json", serde_json::to_string(contexts)?),
        ]);
        let prompt = self
            .prompts
            .build(PromptName::AnswerSystem, PromptName::AnswerUser, &vars)?;

        let request = LlmRequest::new(prompt.user, &self.model)
            .with_system(prompt.system)
            .with_temperature(ANSWER_TEMPERATURE)
            .with_max_tokens(ANSWER_MAX_TOKENS)
            .with_json_output();

        let response = self.client.complete(&request).await?;
        let mut answer: AnswerResult = parse_reply(&response.content, "answer")?;
        sanitize_citations(&mut answer.citations, fallback_source_url);

        Ok(answer)
    }
}

/// Decode a JSON reply, tolerating a surrounding markdown code fence.
fn parse_reply<T: DeserializeOwned>(raw: &str, what: &str) -> AppResult<T> {
    serde_json::from_str(strip_code_fence(raw)).map_err(|e| {
        let excerpt: String = raw.chars().take(REPLY_EXCERPT_CHARS).collect();
        tracing::warn!(reply = %excerpt, error = %e, "Unparsable {} reply", what);
        AppError::Serialization(format!("parse {} response: {}", what, e))
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string ("json") up to the first newline
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}
