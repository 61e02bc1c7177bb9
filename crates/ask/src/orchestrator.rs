//! Ask orchestration.
//!
//! Drives one question through the pipeline:
//! 1. Validates the request and resolves per-request overrides
//! 2. Rewrites the question into an English retrieval query
//! 3. Retrieves scored passages from the corpus
//! 4. Applies the confidence gate
//! 5. Generates the answer and re-sanitizes its citations

use rulegate_core::domain::{
    sanitize_citations, AskRequest, AskResponse, Meta, RetrievedContext,
};
use rulegate_core::{AppConfig, AppError, AppResult};
use rulegate_llm::Generator;
use rulegate_rag::{corpus_name, Retriever};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Pipeline defaults taken from the service configuration.
#[derive(Debug, Clone)]
pub struct AskSettings {
    /// Corpus identifier handed to the retriever as-is
    pub corpus_id: String,
    pub default_top_k: usize,
    pub default_min_confidence: f64,
    /// Replaces empty citation source URLs
    pub fallback_source_url: String,
}

impl AskSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            corpus_id: config.rag_corpus_id.clone(),
            default_top_k: config.default_top_k,
            default_min_confidence: config.default_min_confidence,
            fallback_source_url: config.source_url.clone(),
        }
    }
}

/// Wall-clock time spent in each stage.
///
/// `generate` is zero when the confidence gate short-circuits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub rewrite: Duration,
    pub retrieve: Duration,
    pub generate: Duration,
    pub total: Duration,
}

/// Result of a successful ask: an answer or the not-found response.
#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub response: AskResponse,
    pub timings: StageTimings,
}

/// Runs the ask pipeline against injected backends.
pub struct Orchestrator {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    settings: AskSettings,
}

impl Orchestrator {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        settings: AskSettings,
    ) -> Self {
        Self {
            retriever,
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &AskSettings {
        &self.settings
    }

    /// Answer one question.
    ///
    /// A weak retrieval result is not an error: it yields the canonical
    /// not-found response. Backend failures are tagged with their stage.
    pub async fn ask(&self, mut request: AskRequest) -> AppResult<AskOutcome> {
        let started = Instant::now();

        request.validate()?;

        let top_k = request.effective_top_k(self.settings.default_top_k);
        let min_confidence = request.effective_min_confidence(self.settings.default_min_confidence);

        let span = tracing::info_span!(
            "ask",
            discipline = %request.discipline,
            rule_edition = %request.rule_edition,
            top_k,
            min_confidence
        );

        self.run(request, top_k, min_confidence, started)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        request: AskRequest,
        top_k: usize,
        min_confidence: f64,
        started: Instant,
    ) -> AppResult<AskOutcome> {
        let mut timings = StageTimings::default();

        if let Some(style) = request.options.as_ref().map(|o| o.answer_style.as_str()) {
            if !style.is_empty() {
                tracing::debug!(answer_style = style, "Answer style hint ignored");
            }
        }

        // Rewrite
        let stage_start = Instant::now();
        let rewritten = self
            .generator
            .rewrite_query(&request.question_ja, request.context.as_ref())
            .await;
        timings.rewrite = stage_start.elapsed();
        let rewritten = rewritten.map_err(|e| stage_failed("rewrite", timings.rewrite, e))?;

        tracing::info!(
            q_en = %rewritten.query_en,
            rewrite_ms = millis(timings.rewrite),
            "Query rewritten"
        );

        // Retrieve
        let stage_start = Instant::now();
        let contexts = self
            .retriever
            .retrieve_contexts(&rewritten.query_en, &self.settings.corpus_id, top_k)
            .await;
        timings.retrieve = stage_start.elapsed();
        let contexts = contexts.map_err(|e| stage_failed("retrieve", timings.retrieve, e))?;

        let max_score = max_score(&contexts);
        tracing::info!(
            max_score,
            num_contexts = contexts.len(),
            retrieve_ms = millis(timings.retrieve),
            "Retrieval done"
        );

        let corpus = corpus_name(
            &self.settings.corpus_id,
            &request.discipline,
            &request.rule_edition,
        );
        let echoed = request.wants_contexts().then(|| contexts.clone());

        // Gate
        if max_score < min_confidence {
            tracing::info!(
                max_score,
                threshold = min_confidence,
                "Below confidence threshold"
            );

            let mut response = AskResponse::not_found(corpus, top_k);
            response.contexts = echoed;
            timings.total = started.elapsed();
            return Ok(AskOutcome { response, timings });
        }

        // Generate
        let stage_start = Instant::now();
        let answer = self
            .generator
            .generate_answer(
                &request.question_ja,
                &contexts,
                &self.settings.fallback_source_url,
            )
            .await;
        timings.generate = stage_start.elapsed();
        let mut answer = answer.map_err(|e| stage_failed("generate", timings.generate, e))?;

        sanitize_citations(&mut answer.citations, &self.settings.fallback_source_url);
        timings.total = started.elapsed();

        tracing::info!(
            confidence = answer.confidence,
            num_citations = answer.citations.len(),
            rewrite_ms = millis(timings.rewrite),
            retrieve_ms = millis(timings.retrieve),
            generate_ms = millis(timings.generate),
            total_ms = millis(timings.total),
            "Answer generated"
        );

        Ok(AskOutcome {
            response: AskResponse {
                answer_ja: answer.answer_ja,
                confidence: answer.confidence,
                citations: answer.citations,
                meta: Meta::new(corpus, top_k),
                contexts: echoed,
            },
            timings,
        })
    }
}

/// Highest score among the passages, 0.0 when there are none.
fn max_score(contexts: &[RetrievedContext]) -> f64 {
    contexts.iter().map(|c| c.score).fold(0.0, f64::max)
}

/// Log a stage failure and tag backend errors with the stage.
fn stage_failed(stage: &'static str, elapsed: Duration, err: AppError) -> AppError {
    tracing::error!(
        stage,
        elapsed_ms = millis(elapsed),
        error = %err,
        "Pipeline stage failed"
    );
    match err {
        AppError::Backend { message, .. } => AppError::backend(stage, message),
        other => other,
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}
