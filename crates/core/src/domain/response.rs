//! Response payloads and the intermediate results exchanged with backends.

use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Canonical answer returned when no passage clears the confidence gate.
pub const NOT_FOUND_ANSWER: &str = "ルール本文に該当箇所が見当たりません";

/// JSON response for `POST /api/ask`.
///
/// Answers and not-found results share this shape and the same status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer_ja: String,
    pub confidence: f64,
    pub citations: Vec<Citation>,
    pub meta: Meta,

    /// Retrieved evidence, present only when the caller asked for it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<RetrievedContext>>,
}

/// A structured reference substantiating part of an answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub rule_id: String,

    #[serde(default, deserialize_with = "super::null_as_default")]
    pub section_title: String,

    #[serde(default, deserialize_with = "super::null_as_default")]
    pub quote_en: String,

    #[serde(default, deserialize_with = "super::null_as_default")]
    pub source_url: String,

    #[serde(default, deserialize_with = "super::null_as_default")]
    pub score: f64,
}

/// Response metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub rag_corpus: String,
    pub top_k: usize,
    pub warnings: Vec<String>,
}

impl Meta {
    pub fn new(rag_corpus: impl Into<String>, top_k: usize) -> Self {
        Self {
            rag_corpus: rag_corpus.into(),
            top_k,
            warnings: Vec::new(),
        }
    }
}

impl AskResponse {
    /// The standard "not found in rules" response.
    pub fn not_found(rag_corpus: impl Into<String>, top_k: usize) -> Self {
        Self {
            answer_ja: NOT_FOUND_ANSWER.to_string(),
            confidence: 0.0,
            citations: Vec::new(),
            meta: Meta::new(rag_corpus, top_k),
            contexts: None,
        }
    }

    /// Whether this is the canonical not-found result.
    pub fn is_not_found(&self) -> bool {
        self.answer_ja == NOT_FOUND_ANSWER && self.citations.is_empty()
    }
}

/// Body of every non-200 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            error: err.public_message(),
            code: err.category().as_str().to_string(),
            details: String::new(),
        }
    }
}

/// A single passage returned by retrieval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub text: String,

    /// Relevance as reported by the backend; not clamped to 1.0
    pub score: f64,

    #[serde(
        default,
        deserialize_with = "super::null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub source_uri: String,

    #[serde(
        default,
        deserialize_with = "super::null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub rule_id: String,

    #[serde(
        default,
        deserialize_with = "super::null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub section_title: String,
}

/// Output of query rewriting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewriteResult {
    #[serde(rename = "q_en")]
    pub query_en: String,

    #[serde(
        rename = "keywords_en",
        default,
        deserialize_with = "super::null_as_default"
    )]
    pub keywords_en: Vec<String>,

    #[serde(rename = "q_ja", default, deserialize_with = "super::null_as_default")]
    pub query_ja: String,
}

/// Output of answer generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub answer_ja: String,

    /// Absent or `null` citations decode as an empty list
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub citations: Vec<Citation>,

    #[serde(default, deserialize_with = "super::null_as_default")]
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_response() {
        let resp = AskResponse::not_found("icf_canoe_slalom_2025", 8);
        assert_eq!(resp.answer_ja, NOT_FOUND_ANSWER);
        assert_eq!(resp.confidence, 0.0);
        assert!(resp.citations.is_empty());
        assert_eq!(resp.meta.rag_corpus, "icf_canoe_slalom_2025");
        assert_eq!(resp.meta.top_k, 8);
        assert!(resp.meta.warnings.is_empty());
        assert!(resp.is_not_found());
    }

    #[test]
    fn test_response_json_shape() {
        let resp = AskResponse::not_found("corpus", 8);
        let value = serde_json::to_value(&resp).unwrap();

        for field in ["answer_ja", "confidence", "citations", "meta"] {
            assert!(value.get(field).is_some(), "missing field {}", field);
        }
        assert!(value["citations"].is_array());
        assert!(value["meta"]["warnings"].is_array());
        assert!(value.get("contexts").is_none());
    }

    #[test]
    fn test_error_response_from_app_error() {
        let err = AppError::RateLimited;
        let body = ErrorResponse::from(&err);
        assert_eq!(body.error, "rate limit exceeded");
        assert_eq!(body.code, "rate_limit");

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_rewrite_result_wire_names() {
        let json = r#"{"q_en":"penalty for gate touch","keywords_en":["gate","penalty"],"q_ja":"ゲート"}"#;
        let rewrite: RewriteResult = serde_json::from_str(json).unwrap();
        assert_eq!(rewrite.query_en, "penalty for gate touch");
        assert_eq!(rewrite.keywords_en.len(), 2);

        let minimal: RewriteResult = serde_json::from_str(r#"{"q_en":"q"}"#).unwrap();
        assert!(minimal.keywords_en.is_empty());
        assert!(minimal.query_ja.is_empty());
    }

    #[test]
    fn test_answer_result_null_citations() {
        let json = r#"{"answer_ja":"回答","citations":null,"confidence":0.8}"#;
        let answer: AnswerResult = serde_json::from_str(json).unwrap();
        assert!(answer.citations.is_empty());

        let missing: AnswerResult = serde_json::from_str(r#"{"answer_ja":"回答"}"#).unwrap();
        assert!(missing.citations.is_empty());
        assert_eq!(missing.confidence, 0.0);
    }

    #[test]
    fn test_answer_result_null_citation_fields() {
        let json = r#"{
            "answer_ja": "2秒のペナルティです。",
            "citations": [{
                "rule_id": "28.1",
                "section_title": null,
                "quote_en": "q",
                "source_url": null,
                "score": 0.9
            }],
            "confidence": null
        }"#;
        let mut answer: AnswerResult = serde_json::from_str(json).unwrap();
        assert_eq!(answer.confidence, 0.0);
        assert_eq!(answer.citations[0].section_title, "");
        assert_eq!(answer.citations[0].source_url, "");

        crate::domain::sanitize_citations(&mut answer.citations, "https://www.canoeicf.com/rules");
        assert_eq!(answer.citations[0].source_url, "https://www.canoeicf.com/rules");
        assert_eq!(answer.citations[0].rule_id, "28.1");
    }

    #[test]
    fn test_rewrite_result_null_fields() {
        let json = r#"{"q_en":"gate touch penalty","keywords_en":null,"q_ja":null}"#;
        let rewrite: RewriteResult = serde_json::from_str(json).unwrap();
        assert_eq!(rewrite.query_en, "gate touch penalty");
        assert!(rewrite.keywords_en.is_empty());
        assert!(rewrite.query_ja.is_empty());
    }
}

