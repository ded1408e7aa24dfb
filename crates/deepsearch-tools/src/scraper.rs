//! HTTP page scraper that turns HTML into plain text.

use crate::web::{PageScrape, PageScraper};
use async_trait::async_trait;
use deepsearch_config::ScraperConfig;
use deepsearch_protocol::ToolError;
use futures_util::future::join_all;
use futures_util::{Stream, StreamExt};
use log::{debug, info};
use std::fmt::Display;
use std::io::Cursor;
use std::time::Duration;
use url::Url;

/// Line width used when rendering HTML to text.
const TEXT_WIDTH: usize = 120;

/// Fetches pages concurrently with `reqwest` and extracts text with `html2text`.
#[derive(Debug, Clone)]
pub struct HttpPageScraper {
    client: reqwest::Client,
    max_chars: usize,
    max_bytes: usize,
}

impl HttpPageScraper {
    /// Create a scraper from an existing client.
    pub fn new(client: reqwest::Client, max_chars: usize, max_bytes: usize) -> Self {
        Self {
            client,
            max_chars,
            max_bytes,
        }
    }

    /// Build a scraper from config.
    pub fn from_config(config: &ScraperConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ToolError::NotConfigured(err.to_string()))?;
        Ok(Self::new(client, config.max_chars, config.max_bytes))
    }

    async fn scrape_one(&self, raw_url: &str) -> PageScrape {
        match self.fetch_text(raw_url).await {
            Ok(content) => PageScrape::ok(raw_url, content),
            Err(reason) => {
                debug!("page scrape failed (url={}, reason={})", raw_url, reason);
                PageScrape::failed(raw_url, reason)
            }
        }
    }

    async fn fetch_text(&self, raw_url: &str) -> Result<String, String> {
        let url = parse_http_url(raw_url)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| format!("request failed: {err}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("text/html")
            .to_ascii_lowercase();
        let (bytes, truncated) = read_capped(response.bytes_stream(), self.max_bytes).await?;
        if truncated {
            debug!(
                "page body truncated (url={}, max_bytes={})",
                raw_url, self.max_bytes
            );
        }
        let body = String::from_utf8_lossy(&bytes).into_owned();

        let text = if content_type.contains("html") {
            html_to_text(&body)
        } else if content_type.starts_with("text/") || content_type.contains("json") {
            body
        } else {
            return Err(format!("unsupported content type: {content_type}"));
        };
        let text = text.trim();
        if text.is_empty() {
            return Err("no readable content".to_string());
        }
        Ok(truncate_chars(text, self.max_chars))
    }
}

#[async_trait]
impl PageScraper for HttpPageScraper {
    async fn scrape(&self, urls: &[String]) -> Result<Vec<PageScrape>, ToolError> {
        info!("scraping pages (count={})", urls.len());
        let pages = join_all(urls.iter().map(|url| self.scrape_one(url))).await;
        Ok(pages)
    }
}

/// Read a body stream until it ends or `max_bytes` is reached.
///
/// Returns the bytes read and whether the body was cut off.
async fn read_capped<S, B, E>(stream: S, max_bytes: usize) -> Result<(Vec<u8>, bool), String>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| format!("failed to read body: {err}"))?;
        let chunk = chunk.as_ref();
        let room = max_bytes.saturating_sub(bytes.len());
        if chunk.len() > room {
            bytes.extend_from_slice(&chunk[..room]);
            return Ok((bytes, true));
        }
        bytes.extend_from_slice(chunk);
    }
    Ok((bytes, false))
}

/// Accept only absolute http(s) URLs.
fn parse_http_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|err| format!("invalid URL: {err}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(format!("unsupported URL scheme: {scheme}")),
    }
}

fn html_to_text(html: &str) -> String {
    html2text::from_read(Cursor::new(html.as_bytes()), TEXT_WIDTH)
        .unwrap_or_else(|_| html.to_string())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{HttpPageScraper, html_to_text, parse_http_url, read_capped, truncate_chars};
    use crate::web::PageScraper;
    use futures_util::stream;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn body_reads_stop_at_the_byte_cap() {
        let chunks = vec![
            Ok::<_, String>(vec![b'a'; 6]),
            Ok(vec![b'b'; 6]),
            Err("stream should not be polled this far".to_string()),
        ];
        let (bytes, truncated) = read_capped(stream::iter(chunks), 8).await.expect("read");
        assert!(truncated);
        assert_eq!(bytes, b"aaaaaabb".to_vec());
    }

    #[tokio::test]
    async fn bodies_under_the_cap_are_read_whole() {
        let chunks = vec![Ok::<_, String>(b"hello ".to_vec()), Ok(b"world".to_vec())];
        let (bytes, truncated) = read_capped(stream::iter(chunks), 64).await.expect("read");
        assert!(!truncated);
        assert_eq!(String::from_utf8(bytes).expect("utf8"), "hello world");

        let err = read_capped(stream::iter(vec![Err::<Vec<u8>, _>("reset")]), 64)
            .await
            .expect_err("stream error");
        assert_eq!(err, "failed to read body: reset");
    }

    #[test]
    fn html_is_rendered_as_text() {
        let text = html_to_text("<html><body><h1>Title</h1><p>Hello <b>world</b></p></body></html>");
        assert!(text.contains("Title"));
        assert!(text.contains("Hello"));
        assert!(!text.contains("<p>"));
    }

    #[test]
    fn only_http_urls_are_accepted() {
        assert!(parse_http_url("https://example.com/a").is_ok());
        let err = parse_http_url("ftp://example.com").expect_err("ftp");
        assert_eq!(err, "unsupported URL scheme: ftp");
        assert!(parse_http_url("not a url").is_err());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[tokio::test]
    async fn invalid_urls_fail_per_entry_without_network() {
        let scraper = HttpPageScraper::new(reqwest::Client::new(), 100, 1024);
        let pages = scraper
            .scrape(&["mailto:someone@example.com".to_string()])
            .await
            .expect("scrape");
        assert_eq!(pages.len(), 1);
        assert!(!pages[0].success);
        assert_eq!(
            pages[0].error.as_deref(),
            Some("unsupported URL scheme: mailto")
        );
    }
}
