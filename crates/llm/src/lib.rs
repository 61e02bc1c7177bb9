//! LLM integration crate for Rulegate.
//!
//! This crate provides a provider-agnostic abstraction for interacting with
//! Large Language Models (LLMs) and the generation collaborator of the ask
//! pipeline built on top of it.
//!
//! # Providers
//! - **Gemini**: Vertex AI `generateContent` (default)
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use rulegate_core::StaticToken;
//! use rulegate_llm::{create_client, LlmRequest, LlmSettings};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = LlmSettings {
//!     provider: "ollama".to_string(),
//!     project_id: String::new(),
//!     region: String::new(),
//!     endpoint: None,
//!     timeout_secs: 30,
//! };
//! let client = create_client(&settings, Arc::new(StaticToken::new("unused")))?;
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod generator;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use generator::{Generator, RulesGenerator};
pub use providers::{GeminiClient, OllamaClient};
pub use types::{LlmSettings, ProviderType};
