//! Search Augmentation
//!
//! Fetches topical snippets used to ground open-ended tutoring prompts. The
//! search service is an external collaborator; this module defines the
//! boundary (`SearchProvider`), an HTTP client for a Custom-Search-style
//! endpoint, and a disabled provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod web;

pub use web::WebSearchClient;

/// One ranked search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

/// Errors raised by a search provider
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Request(String),

    #[error("Search API returned error: {0}")]
    Status(u16),

    #[error("Failed to parse search results: {0}")]
    Parse(String),

    #[error("Search not configured: {0}")]
    NotConfigured(String),
}

/// Search service boundary
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Ranked results for `text` within `subject`, best first
    async fn query(&self, text: &str, subject: &str) -> Result<Vec<SearchResult>, SearchError>;
}

/// Provider used when search augmentation is disabled
pub struct NoSearch;

#[async_trait]
impl SearchProvider for NoSearch {
    async fn query(&self, _text: &str, _subject: &str) -> Result<Vec<SearchResult>, SearchError> {
        Ok(Vec::new())
    }
}

/// Render results as a numbered context block.
///
/// Returns `None` when there is nothing to add to the prompt.
pub fn format_context(results: &[SearchResult]) -> Option<String> {
    let entries: Vec<String> = results
        .iter()
        .filter(|r| !r.snippet.trim().is_empty())
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[{}] {}\n{}\nSource: {}",
                i + 1,
                r.title.trim(),
                r.snippet.trim(),
                r.link.trim()
            )
        })
        .collect();

    if entries.is_empty() {
        return None;
    }

    Some(entries.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, snippet: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            snippet: snippet.to_string(),
            link: format!("https://example.com/{}", title.to_lowercase()),
        }
    }

    #[test]
    fn test_format_context_numbers_entries() {
        let context = format_context(&[
            result("Fractions", "A fraction represents part of a whole."),
            result("Empty", "   "),
            result("Decimals", "Decimals are fractions with powers of ten."),
        ])
        .unwrap();

        assert!(context.starts_with("[1] Fractions\nA fraction represents part of a whole."));
        assert!(context.contains("[2] Decimals"));
        assert!(!context.contains("Empty"));
    }

    #[test]
    fn test_format_context_empty() {
        assert_eq!(format_context(&[]), None);
        assert_eq!(format_context(&[result("Blank", "")]), None);
    }

    #[tokio::test]
    async fn test_no_search_returns_nothing() {
        let results = NoSearch.query("photosynthesis", "Biology").await.unwrap();
        assert!(results.is_empty());
    }
}
