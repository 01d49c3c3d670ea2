// Persistent key-value storage for the access token.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// Synchronous string storage that survives restarts.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

/// SQLite-backed store. Pass `":memory:"` for an ephemeral database.
pub struct SqliteTokenStore {
    conn: Mutex<Connection>,
}

impl SqliteTokenStore {
    pub fn open(path: &Path) -> Result<Self> {
        if path != Path::new(":memory:") {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create store directory {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open token store at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA busy_timeout = 5000;

             CREATE TABLE IF NOT EXISTS client_state (
                 key   TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );",
        )
        .context("failed to create token store schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(Path::new(":memory:"))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("token store mutex poisoned"))
    }
}

impl TokenStore for SqliteTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT value FROM client_state WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("failed to read `{key}` from token store"))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO client_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .with_context(|| format!("failed to write `{key}` to token store"))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Process-local store for tests and embedders that do not persist.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::default();
        if let Ok(mut values) = store.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow!("memory store mutex poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .map_err(|_| anyhow!("memory store mutex poisoned"))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_as_none() {
        let store = SqliteTokenStore::in_memory().unwrap();
        assert_eq!(store.get("access_key").unwrap(), None);
    }

    #[test]
    fn set_then_get_returns_latest_value() {
        let store = SqliteTokenStore::in_memory().unwrap();
        store.set("access_key", "first").unwrap();
        store.set("access_key", "second").unwrap();
        assert_eq!(store.get("access_key").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn keys_are_independent() {
        let store = SqliteTokenStore::in_memory().unwrap();
        store.set("access_key", "T").unwrap();
        store.set("other", "x").unwrap();
        assert_eq!(store.get("access_key").unwrap().as_deref(), Some("T"));
        assert_eq!(store.get("other").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn value_survives_reopening_the_file() {
        let dir = std::env::temp_dir().join(format!("eightpack_store_test_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("client.db");

        {
            let store = SqliteTokenStore::open(&path).unwrap();
            store.set("access_key", "persisted").unwrap();
        }
        let reopened = SqliteTokenStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("access_key").unwrap().as_deref(),
            Some("persisted")
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryTokenStore::with_value("access_key", "seed");
        assert_eq!(store.get("access_key").unwrap().as_deref(), Some("seed"));
        store.set("access_key", "").unwrap();
        assert_eq!(store.get("access_key").unwrap().as_deref(), Some(""));
    }
}
