//! SQLite-backed state store.

use super::{ChatRecord, StateError, StateStore};
use chrono::{DateTime, SecondsFormat, Utc};
use deepsearch_protocol::{ChatMessage, Role};
use log::{debug, info, warn};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::fs;
use std::path::Path;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chats (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    chat_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    id TEXT NOT NULL,
    role TEXT NOT NULL,
    parts TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (chat_id, position),
    FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_chats_user_updated ON chats(user_id, updated_at DESC);
"#;

/// State store persisting chats in a single SQLite database.
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
}

impl SqliteStateStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!("opened chat database (path={})", path.display());
        Self::with_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StateError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StateError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl StateStore for SqliteStateStore {
    fn create_chat(&self, chat: &ChatRecord, messages: &[ChatMessage]) -> Result<(), StateError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO chats (id, user_id, title, version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                chat.id,
                chat.user_id,
                chat.title,
                chat.version,
                encode_timestamp(chat.created_at),
                encode_timestamp(chat.updated_at),
            ],
        )?;
        if inserted == 0 {
            return Err(StateError::ChatExists(chat.id.clone()));
        }
        insert_messages(&tx, &chat.id, messages)?;
        tx.commit()?;
        info!(
            "created chat (chat_id={}, user_id={}, messages={})",
            chat.id,
            chat.user_id,
            messages.len()
        );
        Ok(())
    }

    fn load_chat(&self, chat_id: &str) -> Result<Option<ChatRecord>, StateError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, user_id, title, version, created_at, updated_at FROM chats WHERE id = ?1",
                params![chat_id],
                chat_row,
            )
            .optional()?;
        row.map(ChatRow::into_record).transpose()
    }

    fn load_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>, StateError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, role, parts, created_at FROM messages WHERE chat_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt
            .query_map(params![chat_id], |row| {
                Ok(MessageRow {
                    id: row.get(0)?,
                    role: row.get(1)?,
                    parts: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(MessageRow::into_message).collect()
    }

    fn replace_messages(
        &self,
        chat_id: &str,
        expected_version: i64,
        messages: &[ChatMessage],
    ) -> Result<i64, StateError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let updated = tx.execute(
            "UPDATE chats SET version = version + 1, updated_at = ?1 WHERE id = ?2 AND version = ?3",
            params![encode_timestamp(Utc::now()), chat_id, expected_version],
        )?;
        if updated == 0 {
            let actual: Option<i64> = tx
                .query_row(
                    "SELECT version FROM chats WHERE id = ?1",
                    params![chat_id],
                    |row| row.get(0),
                )
                .optional()?;
            return Err(match actual {
                None => StateError::ChatMissing(chat_id.to_string()),
                Some(actual) => {
                    warn!(
                        "rejected stale message write (chat_id={}, expected={}, actual={})",
                        chat_id, expected_version, actual
                    );
                    StateError::VersionConflict {
                        chat_id: chat_id.to_string(),
                        expected: expected_version,
                        actual,
                    }
                }
            });
        }
        tx.execute("DELETE FROM messages WHERE chat_id = ?1", params![chat_id])?;
        insert_messages(&tx, chat_id, messages)?;
        tx.commit()?;
        let version = expected_version + 1;
        debug!(
            "replaced chat messages (chat_id={}, messages={}, version={})",
            chat_id,
            messages.len(),
            version
        );
        Ok(version)
    }

    fn list_chats(&self, user_id: &str) -> Result<Vec<ChatRecord>, StateError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, version, created_at, updated_at FROM chats
             WHERE user_id = ?1 ORDER BY updated_at DESC, created_at DESC",
        )?;
        let rows = stmt
            .query_map(params![user_id], chat_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(ChatRow::into_record).collect()
    }

    fn delete_chat(&self, chat_id: &str) -> Result<bool, StateError> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM chats WHERE id = ?1", params![chat_id])?;
        if deleted > 0 {
            info!("deleted chat (chat_id={})", chat_id);
        }
        Ok(deleted > 0)
    }
}

fn insert_messages(
    conn: &Connection,
    chat_id: &str,
    messages: &[ChatMessage],
) -> Result<(), StateError> {
    let mut stmt = conn.prepare(
        "INSERT INTO messages (chat_id, position, id, role, parts, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (position, message) in messages.iter().enumerate() {
        stmt.execute(params![
            chat_id,
            position as i64,
            message.id,
            message.role.as_str(),
            serde_json::to_string(&message.parts)?,
            encode_timestamp(message.created_at),
        ])?;
    }
    Ok(())
}

struct ChatRow {
    id: String,
    user_id: String,
    title: String,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl ChatRow {
    fn into_record(self) -> Result<ChatRecord, StateError> {
        Ok(ChatRecord {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            version: self.version,
            created_at: decode_timestamp(&self.created_at)?,
            updated_at: decode_timestamp(&self.updated_at)?,
        })
    }
}

fn chat_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatRow> {
    Ok(ChatRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        version: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

struct MessageRow {
    id: String,
    role: String,
    parts: String,
    created_at: String,
}

impl MessageRow {
    fn into_message(self) -> Result<ChatMessage, StateError> {
        Ok(ChatMessage {
            id: self.id,
            role: self.role.parse::<Role>()?,
            parts: serde_json::from_str(&self.parts)?,
            created_at: decode_timestamp(&self.created_at)?,
        })
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_timestamp(value: &str) -> Result<DateTime<Utc>, StateError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| StateError::InvalidTimestamp(format!("{value}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::{SqliteStateStore, decode_timestamp, encode_timestamp};
    use crate::state::{ChatRecord, StateError, StateStore};
    use chrono::{TimeZone, Utc};
    use deepsearch_protocol::{ChatMessage, Role};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn timestamps_round_trip_with_full_precision() {
        let value = Utc
            .timestamp_opt(1_700_000_000, 123_456_789)
            .single()
            .expect("timestamp");
        let encoded = encode_timestamp(value);
        assert_eq!(encoded, "2023-11-14T22:13:20.123456789Z");
        assert_eq!(decode_timestamp(&encoded).expect("decode"), value);
    }

    #[test]
    fn creating_the_same_chat_twice_fails() {
        let store = SqliteStateStore::open_in_memory().expect("store");
        let chat = ChatRecord::new("c1", "alice", "Hello");
        store.create_chat(&chat, &[]).expect("create");
        let err = store.create_chat(&chat, &[]).expect_err("duplicate");
        assert!(matches!(err, StateError::ChatExists(id) if id == "c1"));
    }

    #[test]
    fn data_survives_reopen() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("chats.db");
        let message = ChatMessage::text(Role::User, "persist me");
        {
            let store = SqliteStateStore::open(&path).expect("store");
            store
                .create_chat(&ChatRecord::new("c1", "alice", "persist me"), &[message.clone()])
                .expect("create");
        }
        let store = SqliteStateStore::open(&path).expect("reopen");
        assert_eq!(store.load_messages("c1").expect("messages"), vec![message]);
    }

    #[test]
    fn deleting_a_chat_cascades_to_messages() {
        let store = SqliteStateStore::open_in_memory().expect("store");
        store
            .create_chat(
                &ChatRecord::new("c1", "alice", "t"),
                &[ChatMessage::text(Role::User, "hi")],
            )
            .expect("create");
        assert!(store.delete_chat("c1").expect("delete"));
        assert!(!store.delete_chat("c1").expect("delete again"));
        let count: i64 = store
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 0);
    }

    #[test]
    fn unknown_stored_role_is_reported() {
        let store = SqliteStateStore::open_in_memory().expect("store");
        store
            .create_chat(
                &ChatRecord::new("c1", "alice", "t"),
                &[ChatMessage::text(Role::User, "hi")],
            )
            .expect("create");
        store
            .conn
            .lock()
            .execute("UPDATE messages SET role = 'robot' WHERE chat_id = 'c1'", [])
            .expect("corrupt role");

        let err = store.load_messages("c1").expect_err("corrupt row");
        let StateError::InvalidRole(role) = err else {
            panic!("expected invalid role error");
        };
        assert_eq!(role.0, "robot");
    }
}
