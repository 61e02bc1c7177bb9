//! Retrieval abstraction.

use rulegate_core::domain::RetrievedContext;
use rulegate_core::AppResult;
use std::collections::HashSet;

/// The retrieval collaborator of the ask pipeline.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Fetch up to `top_k` scored passages for `query` from `corpus_id`.
    ///
    /// Passages with identical text appear once, at the position of their
    /// first occurrence.
    async fn retrieve_contexts(
        &self,
        query: &str,
        corpus_id: &str,
        top_k: usize,
    ) -> AppResult<Vec<RetrievedContext>>;
}

/// Drop passages whose text was already seen, keeping backend order.
pub fn dedup_by_text(contexts: Vec<RetrievedContext>) -> Vec<RetrievedContext> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(contexts.len());

    for context in contexts {
        if seen.insert(context.text.clone()) {
            unique.push(context);
        } else {
            tracing::debug!("Skipping duplicate context");
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(text: &str, score: f64) -> RetrievedContext {
        RetrievedContext {
            text: text.to_string(),
            score,
            ..Default::default()
        }
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let contexts = vec![
            context("gate touch", 0.9),
            context("missed gate", 0.7),
            context("gate touch", 0.5),
        ];

        let unique = dedup_by_text(contexts);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].score, 0.9);
        assert_eq!(unique[1].text, "missed gate");
    }

    #[test]
    fn test_dedup_is_exact_match() {
        let unique = dedup_by_text(vec![context("Gate", 0.1), context("gate", 0.1)]);
        assert_eq!(unique.len(), 2);
    }
}
