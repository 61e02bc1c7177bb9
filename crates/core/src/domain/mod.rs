//! Request and response models for the ask pipeline.
//!
//! These types are shared by the retrieval and generation adapters, the
//! orchestrator and the HTTP binding, and define the JSON wire shape.

pub mod citation;
pub mod request;
pub mod response;

use serde::{Deserialize, Deserializer};

pub use citation::{enforce_word_limit, sanitize_citations, MAX_QUOTE_WORDS};
pub use request::{
    AskRequest, QueryContext, RequestOptions, DEFAULT_DISCIPLINE, DEFAULT_RULE_EDITION,
    MAX_QUESTION_CHARS, MAX_TOP_K, MIN_TOP_K,
};
pub use response::{
    AnswerResult, AskResponse, Citation, ErrorResponse, Meta, RetrievedContext, RewriteResult,
    NOT_FOUND_ANSWER,
};

/// Decode an explicit `null` as the type's default, like a missing key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
