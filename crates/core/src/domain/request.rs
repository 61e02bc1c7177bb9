//! Incoming question model and its validation rules.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Discipline used when the caller leaves it blank.
pub const DEFAULT_DISCIPLINE: &str = "canoe_slalom";

/// Rule edition used when the caller leaves it blank.
pub const DEFAULT_RULE_EDITION: &str = "2025";

/// Maximum question length in characters (not bytes).
pub const MAX_QUESTION_CHARS: usize = 1000;

/// Smallest accepted `top_k` override.
pub const MIN_TOP_K: usize = 1;

/// Largest accepted `top_k` override.
pub const MAX_TOP_K: usize = 20;

/// JSON body for `POST /api/ask`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskRequest {
    /// The question, in the user's language
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub question_ja: String,

    /// Sport discipline (defaults to `canoe_slalom`)
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub discipline: String,

    /// Rule book edition (defaults to `2025`)
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub rule_edition: String,

    /// Optional situational context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<QueryContext>,

    /// Optional per-request overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<RequestOptions>,
}

/// Free-text situational context attached to a question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    #[serde(
        default,
        deserialize_with = "super::null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub boat_class: String,

    #[serde(
        default,
        deserialize_with = "super::null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub race_phase: String,

    #[serde(
        default,
        deserialize_with = "super::null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub notes: String,
}

/// Per-request overrides. Out-of-range values fall back to configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,

    /// Echo the retrieved evidence in the response
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub return_contexts: bool,

    #[serde(
        default,
        deserialize_with = "super::null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub answer_style: String,
}

impl AskRequest {
    /// Create a request for a question with no overrides.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question_ja: question.into(),
            ..Default::default()
        }
    }

    /// Validate required fields and fill in defaults.
    ///
    /// Blank `discipline` and `rule_edition` are replaced in place.
    pub fn validate(&mut self) -> AppResult<()> {
        if self.question_ja.is_empty() {
            return Err(AppError::Validation("question_ja is required".to_string()));
        }

        if self.question_ja.chars().count() > MAX_QUESTION_CHARS {
            return Err(AppError::Validation(format!(
                "question_ja must be <= {} characters",
                MAX_QUESTION_CHARS
            )));
        }

        if self.discipline.is_empty() {
            self.discipline = DEFAULT_DISCIPLINE.to_string();
        }

        if self.rule_edition.is_empty() {
            self.rule_edition = DEFAULT_RULE_EDITION.to_string();
        }

        Ok(())
    }

    /// The caller's `top_k` if it lies in `[1, 20]`, otherwise `default_top_k`.
    pub fn effective_top_k(&self, default_top_k: usize) -> usize {
        self.options
            .as_ref()
            .and_then(|o| o.top_k)
            .filter(|v| (MIN_TOP_K as i64..=MAX_TOP_K as i64).contains(v))
            .map(|v| v as usize)
            .unwrap_or(default_top_k)
    }

    /// The caller's `min_confidence` if it lies in `[0.0, 1.0]`, otherwise `default_min_confidence`.
    pub fn effective_min_confidence(&self, default_min_confidence: f64) -> f64 {
        self.options
            .as_ref()
            .and_then(|o| o.min_confidence)
            .filter(|v| (0.0..=1.0).contains(v))
            .unwrap_or(default_min_confidence)
    }

    /// Whether the caller asked for the raw evidence to be echoed back.
    pub fn wants_contexts(&self) -> bool {
        self.options.as_ref().is_some_and(|o| o.return_contexts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_options(options: RequestOptions) -> AskRequest {
        AskRequest {
            options: Some(options),
            ..AskRequest::new("ゲートに触った場合のペナルティは？")
        }
    }

    #[test]
    fn test_validate_empty_question() {
        let mut req = AskRequest::new("");
        let err = req.validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_validate_too_long_question() {
        let mut req = AskRequest::new("あ".repeat(MAX_QUESTION_CHARS + 1));
        let err = req.validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("1000"));
    }

    #[test]
    fn test_validate_counts_characters_not_bytes() {
        // 1000 three-byte characters is 3000 bytes but still within bounds
        let mut req = AskRequest::new("あ".repeat(MAX_QUESTION_CHARS));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_validate_fills_defaults() {
        let mut req = AskRequest::new("question");
        req.validate().unwrap();
        assert_eq!(req.discipline, DEFAULT_DISCIPLINE);
        assert_eq!(req.rule_edition, DEFAULT_RULE_EDITION);
    }

    #[test]
    fn test_validate_keeps_explicit_values() {
        let mut req = AskRequest {
            discipline: "canoe_sprint".to_string(),
            rule_edition: "2024".to_string(),
            ..AskRequest::new("question")
        };
        req.validate().unwrap();
        assert_eq!(req.discipline, "canoe_sprint");
        assert_eq!(req.rule_edition, "2024");
    }

    #[test]
    fn test_effective_top_k_in_range() {
        let req = with_options(RequestOptions {
            top_k: Some(5),
            ..Default::default()
        });
        assert_eq!(req.effective_top_k(8), 5);

        let req = with_options(RequestOptions {
            top_k: Some(20),
            ..Default::default()
        });
        assert_eq!(req.effective_top_k(8), 20);
    }

    #[test]
    fn test_effective_top_k_out_of_range_falls_back() {
        for bad in [0, -3, 21, 1000] {
            let req = with_options(RequestOptions {
                top_k: Some(bad),
                ..Default::default()
            });
            assert_eq!(req.effective_top_k(8), 8, "top_k {} should fall back", bad);
        }
    }

    #[test]
    fn test_effective_top_k_absent() {
        let req = AskRequest::new("q");
        assert_eq!(req.effective_top_k(8), 8);
    }

    #[test]
    fn test_effective_min_confidence() {
        let req = with_options(RequestOptions {
            min_confidence: Some(0.7),
            ..Default::default()
        });
        assert_eq!(req.effective_min_confidence(0.55), 0.7);

        for bad in [-0.1, 1.01, f64::NAN] {
            let req = with_options(RequestOptions {
                min_confidence: Some(bad),
                ..Default::default()
            });
            assert_eq!(req.effective_min_confidence(0.55), 0.55);
        }
    }

    #[test]
    fn test_deserialize_minimal_body() {
        let req: AskRequest = serde_json::from_str(r#"{"question_ja":"テスト"}"#).unwrap();
        assert_eq!(req.question_ja, "テスト");
        assert!(req.context.is_none());
        assert!(req.options.is_none());
        assert!(!req.wants_contexts());
    }

    #[test]
    fn test_deserialize_full_body() {
        let json = r#"{
            "question_ja": "テスト",
            "discipline": "canoe_slalom",
            "rule_edition": "2025",
            "context": {"boat_class": "K1", "race_phase": "final"},
            "options": {"top_k": 3, "min_confidence": 0.4, "return_contexts": true}
        }"#;
        let req: AskRequest = serde_json::from_str(json).unwrap();
        let ctx = req.context.as_ref().unwrap();
        assert_eq!(ctx.boat_class, "K1");
        assert_eq!(ctx.notes, "");
        assert_eq!(req.effective_top_k(8), 3);
        assert!(req.wants_contexts());
    }

    #[test]
    fn test_null_fields_take_defaults() {
        let json = r#"{
            "question_ja": "q",
            "discipline": null,
            "rule_edition": null,
            "context": {"boat_class": null, "notes": "wet"},
            "options": {"answer_style": null, "return_contexts": null, "top_k": null}
        }"#;
        let mut req: AskRequest = serde_json::from_str(json).unwrap();
        req.validate().unwrap();

        assert_eq!(req.discipline, DEFAULT_DISCIPLINE);
        assert_eq!(req.rule_edition, DEFAULT_RULE_EDITION);
        assert_eq!(req.context.as_ref().unwrap().boat_class, "");
        assert_eq!(req.context.as_ref().unwrap().notes, "wet");
        assert!(!req.wants_contexts());
        assert_eq!(req.effective_top_k(8), 8);
    }

    #[test]
    fn test_null_question_is_validation_error() {
        let mut req: AskRequest = serde_json::from_str(r#"{"question_ja":null}"#).unwrap();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }
}
