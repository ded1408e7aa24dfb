//! Key-value cache seam and the caching page scraper.

use crate::web::{PageScrape, PageScraper};
use async_trait::async_trait;
use deepsearch_protocol::ToolError;
use log::{debug, warn};
use parking_lot::RwLock;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Prefix for scrape cache keys.
const SCRAPE_KEY_PREFIX: &str = "scrapePages:";

/// Key-value store for cached tool results.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a live entry.
    async fn get(&self, key: &str) -> Result<Option<Value>, ToolError>;
    /// Store an entry; `ttl` of `None` keeps it until evicted externally.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), ToolError>;
}

/// Process-local cache.
///
/// Expired entries are dropped on read and on every write. Entries without a
/// TTL stay until the process exits, so prefer the sqlite cache for
/// long-running servers without `cache.ttl_secs`.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

struct MemoryEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl MemoryCacheStore {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, ToolError> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at.is_none_or(|at| at > now) => {
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
            }
        }
        self.entries.write().remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), ToolError> {
        let now = Instant::now();
        let expires_at = ttl.map(|ttl| now + ttl);
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.expires_at.is_none_or(|at| at > now));
        entries.insert(key.to_string(), MemoryEntry { value, expires_at });
        Ok(())
    }
}

/// Cache key for a URL set: order and duplicates do not matter.
pub fn scrape_cache_key(urls: &[String]) -> String {
    let unique: BTreeSet<&str> = urls.iter().map(String::as_str).collect();
    let mut hasher = Sha256::new();
    for url in unique {
        hasher.update(url.as_bytes());
        hasher.update(b"\n");
    }
    format!("{SCRAPE_KEY_PREFIX}{}", hex::encode(hasher.finalize()))
}

/// Page scraper that serves repeated URL sets from a cache.
pub struct CachedPageScraper {
    inner: Arc<dyn PageScraper>,
    cache: Arc<dyn CacheStore>,
    ttl: Option<Duration>,
}

impl CachedPageScraper {
    /// Wrap `inner` with `cache`.
    pub fn new(
        inner: Arc<dyn PageScraper>,
        cache: Arc<dyn CacheStore>,
        ttl: Option<Duration>,
    ) -> Self {
        Self { inner, cache, ttl }
    }

    async fn lookup(&self, key: &str, urls: &[String]) -> Option<Vec<PageScrape>> {
        let stored = match self.cache.get(key).await {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(err) => {
                warn!("scrape cache read failed (key={}): {}", key, err);
                return None;
            }
        };
        let pages: Vec<PageScrape> = match serde_json::from_value(stored) {
            Ok(pages) => pages,
            Err(err) => {
                warn!("scrape cache entry unreadable (key={}): {}", key, err);
                return None;
            }
        };
        reorder_pages(pages, urls)
    }
}

#[async_trait]
impl PageScraper for CachedPageScraper {
    async fn scrape(&self, urls: &[String]) -> Result<Vec<PageScrape>, ToolError> {
        let key = scrape_cache_key(urls);
        if let Some(pages) = self.lookup(&key, urls).await {
            debug!("scrape cache hit (key={}, urls={})", key, urls.len());
            return Ok(pages);
        }

        debug!("scrape cache miss (key={}, urls={})", key, urls.len());
        let pages = self.inner.scrape(urls).await?;
        if pages.iter().any(|page| page.success) {
            match serde_json::to_value(&pages) {
                Ok(value) => {
                    if let Err(err) = self.cache.set(&key, value, self.ttl).await {
                        warn!("scrape cache write failed (key={}): {}", key, err);
                    }
                }
                Err(err) => warn!("scrape result not cacheable (key={}): {}", key, err),
            }
        }
        Ok(pages)
    }
}

/// Arrange stored pages in the caller's URL order; `None` when a URL is missing.
fn reorder_pages(pages: Vec<PageScrape>, urls: &[String]) -> Option<Vec<PageScrape>> {
    let by_url: HashMap<&str, &PageScrape> =
        pages.iter().map(|page| (page.url.as_str(), page)).collect();
    urls.iter()
        .map(|url| by_url.get(url.as_str()).map(|page| (*page).clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{CacheStore, CachedPageScraper, MemoryCacheStore, scrape_cache_key};
    use crate::web::{PageScrape, PageScraper};
    use async_trait::async_trait;
    use deepsearch_protocol::ToolError;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct SpyScraper {
        calls: Mutex<Vec<Vec<String>>>,
        failing: HashSet<String>,
    }

    #[async_trait]
    impl PageScraper for SpyScraper {
        async fn scrape(&self, urls: &[String]) -> Result<Vec<PageScrape>, ToolError> {
            self.calls.lock().push(urls.to_vec());
            Ok(urls
                .iter()
                .map(|url| {
                    if self.failing.contains(url) {
                        PageScrape::failed(url, "HTTP 500")
                    } else {
                        PageScrape::ok(url, format!("content of {url}"))
                    }
                })
                .collect())
        }
    }

    fn urls(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn cache_key_ignores_order_and_duplicates() {
        let a = scrape_cache_key(&urls(&["https://b.test", "https://a.test"]));
        let b = scrape_cache_key(&urls(&["https://a.test", "https://b.test", "https://a.test"]));
        let c = scrape_cache_key(&urls(&["https://a.test"]));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("scrapePages:"));
        assert_eq!(a.len(), "scrapePages:".len() + 64);
    }

    #[tokio::test]
    async fn identical_url_sets_fetch_once() {
        let spy = Arc::new(SpyScraper::default());
        let scraper = CachedPageScraper::new(spy.clone(), Arc::new(MemoryCacheStore::new()), None);

        let first = scraper
            .scrape(&urls(&["https://a.test", "https://b.test"]))
            .await
            .expect("first");
        let second = scraper
            .scrape(&urls(&["https://b.test", "https://a.test"]))
            .await
            .expect("second");

        assert_eq!(spy.calls.lock().len(), 1);
        assert_eq!(first[0].url, "https://a.test");
        assert_eq!(second[0].url, "https://b.test");
        assert_eq!(second[1].url, "https://a.test");
    }

    #[tokio::test]
    async fn total_failures_are_not_cached() {
        let spy = Arc::new(SpyScraper {
            failing: HashSet::from(["https://down.test".to_string()]),
            ..SpyScraper::default()
        });
        let cache = Arc::new(MemoryCacheStore::new());
        let scraper = CachedPageScraper::new(spy.clone(), cache.clone(), None);

        for _ in 0..2 {
            scraper
                .scrape(&urls(&["https://down.test"]))
                .await
                .expect("scrape");
        }
        assert_eq!(spy.calls.lock().len(), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn partial_failures_are_cached() {
        let spy = Arc::new(SpyScraper {
            failing: HashSet::from(["https://down.test".to_string()]),
            ..SpyScraper::default()
        });
        let scraper = CachedPageScraper::new(spy.clone(), Arc::new(MemoryCacheStore::new()), None);
        let list = urls(&["https://up.test", "https://down.test"]);
        scraper.scrape(&list).await.expect("first");
        let second = scraper.scrape(&list).await.expect("second");
        assert_eq!(spy.calls.lock().len(), 1);
        assert!(!second[1].success);
    }

    #[tokio::test]
    async fn memory_entries_expire_after_ttl() {
        let cache = MemoryCacheStore::new();
        cache
            .set("k", json!(1), Some(Duration::from_millis(0)))
            .await
            .expect("set");
        cache.set("forever", json!(2), None).await.expect("set");
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(cache.get("k").await.expect("get"), None);
        assert_eq!(cache.get("forever").await.expect("get"), Some(json!(2)));
    }

    #[tokio::test]
    async fn writes_prune_expired_entries() {
        let cache = MemoryCacheStore::new();
        cache
            .set("stale-a", json!(1), Some(Duration::from_millis(0)))
            .await
            .expect("set");
        cache
            .set("stale-b", json!(2), Some(Duration::from_millis(0)))
            .await
            .expect("set");
        tokio::time::sleep(Duration::from_millis(5)).await;

        cache.set("fresh", json!(3), None).await.expect("set");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh").await.expect("get"), Some(json!(3)));
    }
}
