//! Prompt types for Rulegate.

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The four templates the prompt document must define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptName {
    RewriteSystem,
    RewriteUser,
    AnswerSystem,
    AnswerUser,
}

impl PromptName {
    /// All required templates, in document order.
    pub const ALL: [PromptName; 4] = [
        Self::RewriteSystem,
        Self::RewriteUser,
        Self::AnswerSystem,
        Self::AnswerUser,
    ];

    /// Section heading used in the prompt document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RewriteSystem => "query_rewrite_system",
            Self::RewriteUser => "query_rewrite_user",
            Self::AnswerSystem => "answer_system",
            Self::AnswerUser => "answer_user",
        }
    }
}

impl std::fmt::Display for PromptName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registered prompt templates, ready to render.
///
/// Built once at startup and shared read-only between requests.
#[derive(Debug)]
pub struct PromptTemplates {
    pub(crate) registry: Handlebars<'static>,
    pub(crate) sources: HashMap<PromptName, String>,
}

impl PromptTemplates {
    /// Raw template text for `name`.
    pub fn source(&self, name: PromptName) -> &str {
        self.sources.get(&name).map(String::as_str).unwrap_or_default()
    }
}

/// A rendered system/user message pair ready for LLM execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System instruction
    pub system: String,

    /// User message
    pub user: String,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names() {
        let names: Vec<&str> = PromptName::ALL.iter().map(|n| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "query_rewrite_system",
                "query_rewrite_user",
                "answer_system",
                "answer_user"
            ]
        );
    }

    #[test]
    fn test_built_prompt_creation() {
        let built = BuiltPrompt::new("System message", "User message");
        assert_eq!(built.system, "System message");
        assert_eq!(built.user, "User message");
    }
}
