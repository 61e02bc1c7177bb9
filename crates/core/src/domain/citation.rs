//! Citation sanitizing shared by the generator and the orchestrator.

use super::response::Citation;

/// Maximum words allowed in a citation excerpt.
pub const MAX_QUOTE_WORDS: usize = 25;

/// Truncate `text` to `max_words` whitespace-separated words.
///
/// Appends `...` to the last kept word when truncation happens; text already
/// within the limit is returned unchanged, so applying this twice is a no-op.
pub fn enforce_word_limit(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }
    format!("{}...", words[..max_words].join(" "))
}

/// Enforce the excerpt limit and fill missing source URLs in place.
pub fn sanitize_citations(citations: &mut [Citation], fallback_source_url: &str) {
    for citation in citations.iter_mut() {
        citation.quote_en = enforce_word_limit(&citation.quote_en, MAX_QUOTE_WORDS);
        if citation.source_url.is_empty() {
            citation.source_url = fallback_source_url.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (1..=n)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_short_text_unchanged() {
        let text = "A 2-second penalty is applied for each gate touch.";
        assert_eq!(enforce_word_limit(text, MAX_QUOTE_WORDS), text);
    }

    #[test]
    fn test_exact_limit_unchanged() {
        let text = words(25);
        assert_eq!(enforce_word_limit(&text, 25), text);
    }

    #[test]
    fn test_truncates_long_text() {
        let result = enforce_word_limit(&words(40), 25);
        assert_eq!(result.split_whitespace().count(), 25);
        assert!(result.ends_with("w25..."));
    }

    #[test]
    fn test_idempotent() {
        let once = enforce_word_limit(&words(40), 25);
        let twice = enforce_word_limit(&once, 25);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_collapses_whitespace_only_when_truncating() {
        let text = "a  b\tc";
        assert_eq!(enforce_word_limit(text, 5), text);
        assert_eq!(enforce_word_limit(text, 2), "a b...");
    }

    #[test]
    fn test_sanitize_fills_empty_source_url() {
        let mut citations = vec![
            Citation {
                rule_id: "29.4".to_string(),
                source_url: String::new(),
                ..Default::default()
            },
            Citation {
                rule_id: "30.1".to_string(),
                source_url: "https://example.com/rules#30".to_string(),
                ..Default::default()
            },
        ];

        sanitize_citations(&mut citations, "https://www.canoeicf.com/rules");

        assert_eq!(citations[0].source_url, "https://www.canoeicf.com/rules");
        assert_eq!(citations[1].source_url, "https://example.com/rules#30");
    }

    #[test]
    fn test_sanitize_truncates_quotes() {
        let mut citations = vec![Citation {
            quote_en: words(40),
            source_url: "https://example.com".to_string(),
            ..Default::default()
        }];

        sanitize_citations(&mut citations, "https://fallback");
        let before = citations.clone();
        sanitize_citations(&mut citations, "https://fallback");

        assert_eq!(citations, before);
        assert_eq!(citations[0].quote_en.split_whitespace().count(), 25);
    }
}
