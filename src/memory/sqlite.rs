//! SQLite-backed durable key-value store.
//!
//! The long-term tier lives in a single `long_term (key, value)` table with
//! JSON-serialized values. A fresh connection is opened per operation so the
//! store stays `Send + Sync` without holding a connection across await points.
//! The short-term tier remains process-local.

use std::path::PathBuf;

use async_trait::async_trait;
use dashmap::DashMap;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::KeyValueStore;

/// Durable [`KeyValueStore`] backed by a SQLite database file.
pub struct SqliteStore {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    short_term: DashMap<String, Value>,
}

impl SqliteStore {
    /// Open (creating if needed) the store at the given path.
    ///
    /// # Arguments
    /// * `db_path` - Optional path to the database file.
    ///   Defaults to `./data/puppetos_memory.db`.
    pub fn new(db_path: Option<PathBuf>) -> Result<Self, anyhow::Error> {
        let db_path = db_path.unwrap_or_else(|| PathBuf::from("./data/puppetos_memory.db"));

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = Self {
            db_path,
            short_term: DashMap::new(),
        };
        store.initialize_db()?;
        Ok(store)
    }

    fn initialize_db(&self) -> Result<(), anyhow::Error> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS long_term (key TEXT PRIMARY KEY, value TEXT)",
            [],
        )?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    fn set_short_term(&self, key: &str, value: Value) {
        self.short_term.insert(key.to_string(), value);
    }

    fn get_short_term(&self, key: &str) -> Option<Value> {
        self.short_term.get(key).map(|v| v.clone())
    }

    fn clear_short_term(&self) {
        self.short_term.clear();
    }

    async fn set_long_term(&self, key: &str, value: Value) -> Result<(), anyhow::Error> {
        let serialized = serde_json::to_string(&value)?;
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT OR REPLACE INTO long_term (key, value) VALUES (?1, ?2)",
            params![key, serialized],
        )?;
        Ok(())
    }

    async fn get_long_term(&self, key: &str) -> Result<Option<Value>, anyhow::Error> {
        let conn = Connection::open(&self.db_path)?;
        let row: Option<String> = conn
            .query_row(
                "SELECT value FROM long_term WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        match row {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn delete_long_term(&self, key: &str) -> Result<(), anyhow::Error> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute("DELETE FROM long_term WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(Some(dir.path().join("test.db"))).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn long_term_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        {
            let store = SqliteStore::new(Some(path.clone())).unwrap();
            store.set_long_term("k", json!(["a", "b"])).await.unwrap();
        }
        let store = SqliteStore::new(Some(path)).unwrap();
        assert_eq!(store.get_long_term("k").await.unwrap(), Some(json!(["a", "b"])));
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let (_dir, store) = temp_store();
        store.set_long_term("k", json!(1)).await.unwrap();
        store.set_long_term("k", json!(2)).await.unwrap();
        assert_eq!(store.get_long_term("k").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn delete_absent_key_is_noop() {
        let (_dir, store) = temp_store();
        store.delete_long_term("missing").await.unwrap();
        assert_eq!(store.get_long_term("missing").await.unwrap(), None);
    }
}
