//! Search and page-fetch provider interfaces used by the research tools.

use async_trait::async_trait;
use deepsearch_protocol::ToolError;
use serde::{Deserialize, Serialize};

/// One organic search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    /// Result title.
    pub title: String,
    /// Result URL.
    pub link: String,
    /// Result snippet.
    #[serde(default)]
    pub snippet: String,
}

/// Web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;
    /// Run a query and return at most `limit` organic results.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ToolError>;
}

/// Outcome of fetching a single URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageScrape {
    /// Requested URL.
    pub url: String,
    /// Whether readable content was extracted.
    pub success: bool,
    /// Extracted text when `success` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Failure reason when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageScrape {
    /// Successful fetch with extracted content.
    pub fn ok(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: true,
            content: Some(content.into()),
            error: None,
        }
    }

    /// Failed fetch with a reason.
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: false,
            content: None,
            error: Some(error.into()),
        }
    }
}

/// Bulk page fetcher.
///
/// Implementations return one entry per requested URL, in request order.
/// Per-URL failures are reported in the entries; `Err` is reserved for
/// failures of the whole batch.
#[async_trait]
pub trait PageScraper: Send + Sync {
    /// Fetch all URLs and extract readable text.
    async fn scrape(&self, urls: &[String]) -> Result<Vec<PageScrape>, ToolError>;
}

/// Aggregate result returned by the `scrapePages` tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BulkScrapeResult {
    /// True only when every URL succeeded.
    pub success: bool,
    /// Per-URL results in request order.
    pub results: Vec<PageScrape>,
    /// Human-readable outcome.
    pub summary: String,
    /// Failure description when any URL failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// URLs that failed, in request order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_urls: Option<Vec<String>>,
}

impl BulkScrapeResult {
    /// Aggregate per-URL results.
    pub fn from_pages(results: Vec<PageScrape>) -> Self {
        let total = results.len();
        let failed_urls: Vec<String> = results
            .iter()
            .filter(|page| !page.success)
            .map(|page| page.url.clone())
            .collect();
        let failed = failed_urls.len();

        if failed == 0 {
            return Self {
                success: true,
                results,
                summary: format!("Successfully scraped {total} page(s)"),
                error: None,
                failed_urls: None,
            };
        }

        let summary = if failed == total {
            format!("Failed to scrape all {total} page(s)")
        } else {
            format!(
                "Scraped {} of {total} pages; {failed} failed",
                total - failed
            )
        };
        Self {
            success: false,
            results,
            summary,
            error: Some(format!("{failed} of {total} URLs could not be scraped")),
            failed_urls: Some(failed_urls),
        }
    }
}
