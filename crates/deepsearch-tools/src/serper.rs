//! Serper (google.serper.dev) search provider.

use crate::web::{SearchProvider, SearchResult};
use async_trait::async_trait;
use deepsearch_config::SearchConfig;
use deepsearch_protocol::ToolError;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Search provider backed by the Serper JSON API.
#[derive(Debug, Clone)]
pub struct SerperSearchProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl SerperSearchProvider {
    /// Create a provider from an explicit endpoint and key.
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Build a provider from config, reading the key from `search.api_key_env`.
    pub fn from_config(config: &SearchConfig) -> Result<Self, ToolError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ToolError::NotConfigured(format!("missing {}", config.api_key_env)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ToolError::NotConfigured(err.to_string()))?;
        Ok(Self::new(client, config.endpoint.clone(), api_key))
    }
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperOrganic>,
}

#[derive(Debug, Deserialize)]
struct SerperOrganic {
    #[serde(default)]
    title: String,
    link: Option<String>,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl SearchProvider for SerperSearchProvider {
    fn name(&self) -> &str {
        "serper"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ToolError> {
        debug!("serper search (query_len={}, limit={})", query.len(), limit);
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": query, "num": limit }))
            .send()
            .await
            .map_err(|err| ToolError::ExecutionFailed(format!("search request failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            warn!("serper search failed (status={})", status);
            return Err(ToolError::ExecutionFailed(format!(
                "search provider returned HTTP {status}"
            )));
        }
        let parsed: SerperResponse = response
            .json()
            .await
            .map_err(|err| ToolError::ExecutionFailed(format!("invalid search response: {err}")))?;
        Ok(organic_results(parsed, limit))
    }
}

fn organic_results(response: SerperResponse, limit: usize) -> Vec<SearchResult> {
    response
        .organic
        .into_iter()
        .filter_map(|hit| {
            let link = hit.link?;
            Some(SearchResult {
                title: hit.title,
                link,
                snippet: hit.snippet,
            })
        })
        .take(limit)
        .collect()
}
