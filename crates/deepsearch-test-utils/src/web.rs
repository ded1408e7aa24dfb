use async_trait::async_trait;
use deepsearch_protocol::ToolError;
use deepsearch_tools::{PageScrape, PageScraper, SearchProvider, SearchResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Search provider returning a fixed result list and recording queries.
#[derive(Debug, Default)]
pub struct StubSearchProvider {
    results: Vec<SearchResult>,
    pub queries: Mutex<Vec<String>>,
}

impl StubSearchProvider {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Results pointing at `links`, titled after their position.
    pub fn with_links(links: &[&str]) -> Self {
        Self::new(
            links
                .iter()
                .enumerate()
                .map(|(index, link)| SearchResult {
                    title: format!("Result {}", index + 1),
                    link: link.to_string(),
                    snippet: format!("Snippet for {link}"),
                })
                .collect(),
        )
    }
}

#[async_trait]
impl SearchProvider for StubSearchProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ToolError> {
        self.queries.lock().push(query.to_string());
        Ok(self.results.iter().take(limit).cloned().collect())
    }
}

/// Scraper spy: counts calls and fails every URL containing "broken".
#[derive(Debug, Default)]
pub struct CountingScraper {
    calls: AtomicUsize,
    pub requested: Mutex<Vec<Vec<String>>>,
}

impl CountingScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageScraper for CountingScraper {
    async fn scrape(&self, urls: &[String]) -> Result<Vec<PageScrape>, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push(urls.to_vec());
        Ok(urls
            .iter()
            .map(|url| {
                if url.contains("broken") {
                    PageScrape::failed(url, "HTTP 500 Internal Server Error")
                } else {
                    PageScrape::ok(url, format!("Content of {url}"))
                }
            })
            .collect())
    }
}
