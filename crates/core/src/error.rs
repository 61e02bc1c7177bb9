//! Error types for Rulegate.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! prompt, backend and request errors, together with the stable category
//! tags reported to callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, machine-readable error category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    RateLimit,
    BackendError,
    Unknown,
}

impl ErrorCategory {
    /// Get the wire tag for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::RateLimit => "rate_limit",
            Self::BackendError => "backend_error",
            Self::Unknown => "unknown",
        }
    }

    /// HTTP status code for this category.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::RateLimit => 429,
            Self::BackendError => 502,
            Self::Unknown => 500,
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for Rulegate.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or out-of-bound request input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Admission denied by the rate limiter
    #[error("rate limit exceeded")]
    RateLimited,

    /// A retrieval or generation backend call failed
    #[error("Backend error during {stage}: {message}")]
    Backend { stage: String, message: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Unexpected failures
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a backend error tagged with the pipeline stage that failed.
    pub fn backend(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Category reported to callers.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::RateLimited => ErrorCategory::RateLimit,
            Self::Backend { .. } => ErrorCategory::BackendError,
            Self::Config(_)
            | Self::Io(_)
            | Self::Prompt(_)
            | Self::Serialization(_)
            | Self::Internal(_) => ErrorCategory::Unknown,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        self.category().status_code()
    }

    /// Message safe to show to callers.
    ///
    /// Validation messages are passed through; backend and internal causes
    /// are replaced with generic text.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::RateLimited => "rate limit exceeded".to_string(),
            Self::Backend { stage, .. } => match stage.as_str() {
                "rewrite" => "query rewrite failed".to_string(),
                "retrieve" => "context retrieval failed".to_string(),
                "generate" => "answer generation failed".to_string(),
                _ => "backend request failed".to_string(),
            },
            _ => "internal server error".to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_status_codes() {
        assert_eq!(AppError::Validation("x".into()).status_code(), 400);
        assert_eq!(AppError::RateLimited.status_code(), 429);
        assert_eq!(AppError::backend("retrieve", "boom").status_code(), 502);
        assert_eq!(AppError::Internal("x".into()).status_code(), 500);
        assert_eq!(AppError::Serialization("x".into()).status_code(), 500);
    }

    #[test]
    fn test_category_tags() {
        assert_eq!(ErrorCategory::Validation.as_str(), "validation");
        assert_eq!(ErrorCategory::RateLimit.as_str(), "rate_limit");
        assert_eq!(ErrorCategory::BackendError.as_str(), "backend_error");
        assert_eq!(ErrorCategory::Unknown.as_str(), "unknown");

        let json = serde_json::to_string(&ErrorCategory::BackendError).unwrap();
        assert_eq!(json, "\"backend_error\"");
    }

    #[test]
    fn test_public_message_hides_backend_cause() {
        let err = AppError::backend("generate", "upstream said: secret project id 42");
        let msg = err.public_message();
        assert_eq!(msg, "answer generation failed");
        assert!(!msg.contains("secret"));
    }

    #[test]
    fn test_public_message_hides_internal_cause() {
        let err = AppError::Serialization("expected value at line 1 column 1".into());
        assert_eq!(err.public_message(), "internal server error");
    }

    #[test]
    fn test_validation_message_passthrough() {
        let err = AppError::Validation("question_ja is required".into());
        assert_eq!(err.public_message(), "question_ja is required");
    }
}
