//! Prompt loader for the markdown prompt document.
//!
//! Each template is a `## <name>` heading followed by a fenced code block;
//! the trimmed contents of the first block under the heading are the template.

use crate::types::{PromptName, PromptTemplates};
use rulegate_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;

/// Load and register all prompt templates from `path`.
///
/// Fails when the file cannot be read, a required section is missing or
/// empty, or a template does not compile.
///
/// # Example
/// ```no_run
/// use rulegate_prompt::load_prompts;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompts = load_prompts(Path::new("prompts/prompts.md"))?;
/// # Ok(())
/// # }
/// ```
pub fn load_prompts(path: &Path) -> AppResult<PromptTemplates> {
    tracing::debug!("Loading prompts from: {:?}", path);

    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::Prompt(format!("Failed to read prompts file {:?}: {}", path, e))
    })?;

    let mut sections = parse_prompt_sections(&contents);

    let mut templates = HashMap::new();
    for name in PromptName::ALL {
        let body = sections.remove(name.as_str()).ok_or_else(|| {
            AppError::Prompt(format!("Prompt section {:?} not found in {:?}", name.as_str(), path))
        })?;

        if body.is_empty() {
            return Err(AppError::Prompt(format!(
                "Prompt section {:?} in {:?} has no template",
                name.as_str(),
                path
            )));
        }

        templates.insert(name, body);
    }

    let prompts = PromptTemplates::from_sources(templates)?;

    tracing::info!("Loaded {} prompt templates from {:?}", PromptName::ALL.len(), path);

    Ok(prompts)
}

/// Extract named sections from a markdown document.
pub fn parse_prompt_sections(content: &str) -> HashMap<String, String> {
    let mut sections = HashMap::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in content.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            if let Some((name, body)) = current.take() {
                sections.insert(name, extract_code_block(&body));
            }
            current = Some((heading.trim().to_string(), Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }

    if let Some((name, body)) = current {
        sections.insert(name, extract_code_block(&body));
    }

    sections
}

/// Contents of the first fenced code block in `lines`, trimmed.
fn extract_code_block(lines: &[&str]) -> String {
    let mut block = Vec::new();
    let mut in_block = false;

    for line in lines {
        if line.trim().starts_with("```") {
            if in_block {
                break;
            }
            in_block = true;
            continue;
        }
        if in_block {
            block.push(*line);
        }
    }

    block.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DOCUMENT: &str = r#"# Prompts

Some introduction that is not part of any template.

## query_rewrite_system

```text
You translate questions.
```

## query_rewrite_user

```text
Question: {{question_ja}}
Context: {{context_json}}
```

## answer_system

Notes outside the fence are ignored.

```
Answer in Japanese.
```

## answer_user

```text
Question: {{question_ja}}
Passages: {{contexts_json}}
```
"#;

    #[test]
    fn test_parse_sections() {
        let sections = parse_prompt_sections(DOCUMENT);
        assert_eq!(sections.len(), 4);
        assert_eq!(sections["query_rewrite_system"], "You translate questions.");
        assert_eq!(
            sections["query_rewrite_user"],
            "Question: {{question_ja}}\nContext: {{context_json}}"
        );
        assert_eq!(sections["answer_system"], "Answer in Japanese.");
    }

    #[test]
    fn test_section_without_code_block_is_empty() {
        let sections = parse_prompt_sections("## lonely\n\nno fence here\n");
        assert_eq!(sections["lonely"], "");
    }

    #[test]
    fn test_load_valid_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prompts.md");
        fs::write(&path, DOCUMENT).unwrap();

        let prompts = load_prompts(&path).unwrap();
        assert_eq!(prompts.source(PromptName::AnswerSystem), "Answer in Japanese.");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = load_prompts(&dir.path().join("missing.md"));
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_load_missing_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prompts.md");
        let truncated = DOCUMENT.split("## answer_user").next().unwrap();
        fs::write(&path, truncated).unwrap();

        let err = load_prompts(&path).unwrap_err();
        assert!(err.to_string().contains("answer_user"));
    }

    #[test]
    fn test_load_shipped_prompts() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../prompts/prompts.md");
        let prompts = load_prompts(&path).unwrap();
        for name in PromptName::ALL {
            assert!(!prompts.source(name).is_empty(), "{} is empty", name);
        }
    }
}
