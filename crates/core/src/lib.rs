//! Rulegate Core Library
//!
//! This crate provides the foundational pieces shared by every Rulegate crate:
//! - Error handling (`AppError`, `AppResult`, `ErrorCategory`)
//! - Logging infrastructure
//! - Configuration management
//! - Google Cloud access tokens
//! - Request and response models for the ask pipeline

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use auth::{StaticToken, TokenSource};
pub use config::AppConfig;
pub use error::{AppError, AppResult, ErrorCategory};
