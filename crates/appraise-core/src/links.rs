//! URL extraction from submission text.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

static URL_RE: OnceLock<Regex> = OnceLock::new();

fn url_re() -> &'static Regex {
    // Excluding <> keeps chat-style <https://...|label> wrapping out of the match.
    URL_RE.get_or_init(|| Regex::new(r"https?://[^\s<>|]+").unwrap())
}

/// Scan free text for http(s) URLs.
///
/// Candidates that do not parse as absolute URLs with a host are dropped, as
/// is trailing sentence punctuation. First-appearance order is preserved and
/// repeats are deduplicated.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for m in url_re().find_iter(text) {
        let candidate = m
            .as_str()
            .trim_end_matches(['.', ',', ';', ':', '!', '?', ')']);
        let valid = matches!(Url::parse(candidate), Ok(u) if u.host_str().is_some());
        if valid && seen.insert(candidate.to_string()) {
            urls.push(candidate.to_string());
        }
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_urls_in_order() {
        let text = "design: https://docs.google.com/document/d/abc/edit and \
                    thread https://team.slack.com/archives/C042/p1700000000123456";
        let urls = extract_urls(text);
        assert_eq!(
            urls,
            vec![
                "https://docs.google.com/document/d/abc/edit",
                "https://team.slack.com/archives/C042/p1700000000123456",
            ]
        );
    }

    #[test]
    fn ignores_text_without_urls() {
        assert!(extract_urls("no links here, just prose").is_empty());
    }

    #[test]
    fn trims_trailing_punctuation() {
        let urls = extract_urls("see https://example.com/doc.");
        assert_eq!(urls, vec!["https://example.com/doc"]);
    }

    #[test]
    fn strips_chat_style_wrapping() {
        let urls = extract_urls("<https://example.com/page|the page>");
        assert_eq!(urls, vec!["https://example.com/page"]);
    }

    #[test]
    fn deduplicates_repeats() {
        let text = "https://example.com/doc again https://example.com/doc";
        assert_eq!(extract_urls(text).len(), 1);
    }

    #[test]
    fn rejects_hostless_candidates() {
        assert!(extract_urls("broken http:// end").is_empty());
    }
}
