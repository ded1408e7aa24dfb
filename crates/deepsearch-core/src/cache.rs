//! SQLite-backed cache store for tool results.

use async_trait::async_trait;
use chrono::Utc;
use deepsearch_protocol::ToolError;
use deepsearch_tools::CacheStore;
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    expires_at INTEGER
);
"#;

/// Cache persisted in SQLite; expiry is checked on read.
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

impl SqliteCacheStore {
    /// Open (or create) the cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ToolError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|err| ToolError::Cache(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(cache_error)?;
        info!("opened cache database (path={})", path.display());
        Self::with_connection(conn)
    }

    /// Open a private in-memory cache.
    pub fn open_in_memory() -> Result<Self, ToolError> {
        Self::with_connection(Connection::open_in_memory().map_err(cache_error)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, ToolError> {
        conn.execute_batch(SCHEMA).map_err(cache_error)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, ToolError> {
        let conn = self.conn.lock();
        let row: Option<(String, Option<i64>)> = conn
            .query_row(
                "SELECT value, expires_at FROM cache_entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(cache_error)?;
        let Some((value, expires_at)) = row else {
            return Ok(None);
        };
        if expires_at.is_some_and(|at| at <= Utc::now().timestamp_millis()) {
            debug!("evicting expired cache entry (key={})", key);
            conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
                .map_err(cache_error)?;
            return Ok(None);
        }
        serde_json::from_str(&value)
            .map(Some)
            .map_err(|err| ToolError::Cache(err.to_string()))
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), ToolError> {
        let encoded = serde_json::to_string(&value).map_err(|err| ToolError::Cache(err.to_string()))?;
        let expires_at =
            ttl.map(|ttl| Utc::now().timestamp_millis() + ttl.as_millis().min(i64::MAX as u128) as i64);
        self.conn
            .lock()
            .execute(
                "INSERT INTO cache_entries (key, value, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
                params![key, encoded, expires_at],
            )
            .map_err(cache_error)?;
        Ok(())
    }
}

fn cache_error(err: rusqlite::Error) -> ToolError {
    ToolError::Cache(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::SqliteCacheStore;
    use deepsearch_tools::CacheStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn set_overwrites_existing_key() {
        let cache = SqliteCacheStore::open_in_memory().expect("cache");
        cache.set("k", json!(1), None).await.expect("set");
        cache.set("k", json!({ "v": 2 }), None).await.expect("upsert");
        assert_eq!(cache.get("k").await.expect("get"), Some(json!({ "v": 2 })));
        assert_eq!(cache.get("missing").await.expect("get"), None);
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let cache = SqliteCacheStore::open_in_memory().expect("cache");
        cache
            .set("k", json!("stale"), Some(Duration::ZERO))
            .await
            .expect("set");
        assert_eq!(cache.get("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn entries_persist_across_reopen() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("cache.db");
        {
            let cache = SqliteCacheStore::open(&path).expect("cache");
            cache
                .set("k", json!(["a"]), Some(Duration::from_secs(3600)))
                .await
                .expect("set");
        }
        let cache = SqliteCacheStore::open(&path).expect("reopen");
        assert_eq!(cache.get("k").await.expect("get"), Some(json!(["a"])));
    }
}
