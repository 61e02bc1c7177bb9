//! Prompt templates for Rulegate.
//!
//! This crate loads the prompt document and renders its templates:
//! - Markdown prompt file with one `## name` section per template
//! - Handlebars rendering of `{{name}}` placeholders
//! - Startup validation (missing or malformed templates are fatal)

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use loader::{load_prompts, parse_prompt_sections};
pub use types::{BuiltPrompt, PromptName, PromptTemplates};
