//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The save manager sees a plain key-value `Storage`; it never executes SQL.

use crate::error::GameResult;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

/// Key-value string storage. Every call may fail.
pub trait Storage {
    fn get(&self, key: &str) -> GameResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> GameResult<()>;
    fn remove(&mut self, key: &str) -> GameResult<()>;

    /// Stored size of `key` in bytes, 0 when absent.
    fn size_of(&self, key: &str) -> GameResult<usize> {
        Ok(self.get(key)?.map_or(0, |v| v.len()))
    }
}

pub struct SqliteStore {
    conn: Connection,
    path: Option<String>, // None for :memory:
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> GameResult<Self> {
        let conn = Connection::open(path)?;
        // WAL only matters for real files.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> GameResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, path: None })
    }

    /// Open and migrate in one step.
    pub fn open_migrated(path: &str) -> GameResult<Self> {
        let store = Self::open(path)?;
        store.migrate()?;
        Ok(store)
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> GameResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_storage.sql"))?;
        Ok(())
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Keys currently stored, in order.
    pub fn keys(&self) -> GameResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv_store ORDER BY key ASC")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

impl Storage for SqliteStore {
    fn get(&self, key: &str) -> GameResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> GameResult<()> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }
}
