//! Corpus naming.

/// Name reported as `meta.rag_corpus` for a request.
///
/// Full resource names (`projects/...`) are returned unchanged; anything else
/// resolves to `icf_{discipline}_{rule_edition}`.
pub fn corpus_name(corpus_id: &str, discipline: &str, rule_edition: &str) -> String {
    if corpus_id.starts_with("projects") {
        return corpus_id.to_string();
    }
    format!("icf_{}_{}", discipline, rule_edition)
}
