//! Template registration and rendering.

use crate::types::{BuiltPrompt, PromptName, PromptTemplates};
use handlebars::Handlebars;
use rulegate_core::{AppError, AppResult};
use std::collections::HashMap;

impl PromptTemplates {
    /// Register every template with a Handlebars registry.
    ///
    /// HTML escaping is disabled; placeholders without a value render empty.
    pub fn from_sources(sources: HashMap<PromptName, String>) -> AppResult<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);

        for name in PromptName::ALL {
            let template = sources.get(&name).ok_or_else(|| {
                AppError::Prompt(format!("Missing template: {}", name.as_str()))
            })?;

            registry
                .register_template_string(name.as_str(), template)
                .map_err(|e| {
                    AppError::Prompt(format!(
                        "Failed to register template {}: {}",
                        name.as_str(),
                        e
                    ))
                })?;
        }

        Ok(Self { registry, sources })
    }

    /// Render one template with `{{name}}` placeholders substituted.
    pub fn render(&self, name: PromptName, variables: &HashMap<&str, String>) -> AppResult<String> {
        self.registry
            .render(name.as_str(), variables)
            .map_err(|e| {
                AppError::Prompt(format!("Failed to render template {}: {}", name.as_str(), e))
            })
    }

    /// Render a system/user pair.
    pub fn build(
        &self,
        system: PromptName,
        user: PromptName,
        variables: &HashMap<&str, String>,
    ) -> AppResult<BuiltPrompt> {
        tracing::debug!("Building prompt: {} + {}", system, user);

        Ok(BuiltPrompt::new(
            self.render(system, variables)?,
            self.render(user, variables)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(answer_user: &str) -> HashMap<PromptName, String> {
        HashMap::from([
            (PromptName::RewriteSystem, "Rewrite system".to_string()),
            (
                PromptName::RewriteUser,
                "Q: {{question_ja}} C: {{context_json}}".to_string(),
            ),
            (PromptName::AnswerSystem, "Answer system".to_string()),
            (PromptName::AnswerUser, answer_user.to_string()),
        ])
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let prompts = PromptTemplates::from_sources(sources("{{question_ja}}")).unwrap();
        let vars = HashMap::from([
            ("question_ja", "テスト質問".to_string()),
            ("context_json", r#"{"boat_class":"K1"}"#.to_string()),
        ]);

        let rendered = prompts.render(PromptName::RewriteUser, &vars).unwrap();
        assert_eq!(rendered, r#"Q: テスト質問 C: {"boat_class":"K1"}"#);
    }

    #[test]
    fn test_render_does_not_escape() {
        let prompts = PromptTemplates::from_sources(sources("{{contexts_json}}")).unwrap();
        let vars = HashMap::from([("contexts_json", r#"[{"text":"a & b <c>"}]"#.to_string())]);

        let rendered = prompts.render(PromptName::AnswerUser, &vars).unwrap();
        assert_eq!(rendered, r#"[{"text":"a & b <c>"}]"#);
    }

    #[test]
    fn test_render_missing_variable_is_empty() {
        let prompts = PromptTemplates::from_sources(sources("Q: {{question_ja}}")).unwrap();
        let rendered = prompts
            .render(PromptName::AnswerUser, &HashMap::new())
            .unwrap();
        assert_eq!(rendered, "Q: ");
    }

    #[test]
    fn test_build_pair() {
        let prompts = PromptTemplates::from_sources(sources("{{question_ja}}")).unwrap();
        let vars = HashMap::from([("question_ja", "質問".to_string())]);

        let built = prompts
            .build(PromptName::AnswerSystem, PromptName::AnswerUser, &vars)
            .unwrap();
        assert_eq!(built.system, "Answer system");
        assert_eq!(built.user, "質問");
    }

    #[test]
    fn test_malformed_template_rejected() {
        let result = PromptTemplates::from_sources(sources("{{#if question_ja}}unclosed"));
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_missing_template_rejected() {
        let mut partial = sources("{{question_ja}}");
        partial.remove(&PromptName::AnswerSystem);
        assert!(PromptTemplates::from_sources(partial).is_err());
    }
}
