//! HTTP search client for a Custom-Search-style JSON API.
//!
//! Issues `GET {base_url}?key=..&cx=..&q=<subject> <text>&num=N` and maps
//! `items[].{title, snippet, link}`.

use super::{SearchError, SearchProvider, SearchResult};
use crate::config::SearchConfig;
use crate::secrets::{SecretCache, SecretManager};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Secret key holding the search API key
pub const SEARCH_API_KEY: &str = "search_api_key";

/// Upper bound the API accepts for `num`
const MAX_RESULTS_PER_REQUEST: usize = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
}

pub struct WebSearchClient {
    config: SearchConfig,
    secret_cache: Arc<SecretCache>,
    client: reqwest::Client,
}

impl WebSearchClient {
    pub fn new(config: SearchConfig, secret_cache: Arc<SecretCache>) -> Self {
        Self {
            config,
            secret_cache,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl SearchProvider for WebSearchClient {
    async fn query(&self, text: &str, subject: &str) -> Result<Vec<SearchResult>, SearchError> {
        if self.config.engine_id.trim().is_empty() {
            return Err(SearchError::NotConfigured(
                "search.engine_id is empty".to_string(),
            ));
        }

        let api_key = self
            .secret_cache
            .get_secret(SEARCH_API_KEY)
            .map_err(|e| SearchError::NotConfigured(e.to_string()))?;

        let query = format!("{} {}", subject.trim(), text.trim());
        let num = self.config.max_results.clamp(1, MAX_RESULTS_PER_REQUEST).to_string();

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("key", api_key.expose()),
                ("cx", self.config.engine_id.as_str()),
                ("q", query.trim()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Request(SecretManager::scrub_text(&e.to_string())))?;

        if !response.status().is_success() {
            return Err(SearchError::Status(response.status().as_u16()));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))?;

        let results: Vec<SearchResult> = body
            .items
            .into_iter()
            .take(self.config.max_results)
            .map(|item| SearchResult {
                title: item.title,
                snippet: item.snippet,
                link: item.link,
            })
            .collect();

        tracing::debug!("Search for '{}' returned {} results", query, results.len());
        Ok(results)
    }
}
