use anyhow::{Context, Result};
use rusqlite::Connection;
#[cfg(test)]
use std::collections::HashMap;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::Mutex;

use crate::types::{PredictionRecord, Purpose};

const KEY_THEME: &str = "theme";
const KEY_PURPOSE: &str = "selectedPurpose";
const KEY_HISTORY: &str = "predictionHistory";

/// A flat string key-value store. Setting an empty value removes the key.
pub trait KvBackend: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

pub struct SqliteKv {
    conn: Connection,
}

/// `<data_local_dir>/homeval`, or `./homeval` when the platform has none.
pub fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("homeval");
    path
}

impl SqliteKv {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).context("Failed to open database")?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }

    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join("homeval.db")
    }
}

impl KvBackend for SqliteKv {
    fn get(&self, key: &str) -> Option<String> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            return self.remove(key);
        }
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryKv {
    map: Mutex<HashMap<String, String>>,
}

#[cfg(test)]
impl KvBackend for MemoryKv {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            return self.remove(key);
        }
        let mut map = self
            .map
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut map = self
            .map
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        map.remove(key);
        Ok(())
    }
}

/// Typed accessors over whichever backend is injected.
pub struct Store {
    backend: Box<dyn KvBackend>,
}

impl Store {
    pub fn new(backend: impl KvBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(MemoryKv::default())
    }

    // -- Theme --

    pub fn theme(&self) -> Option<String> {
        self.backend.get(KEY_THEME)
    }

    pub fn set_theme(&self, name: &str) -> Result<()> {
        self.backend.set(KEY_THEME, name)
    }

    // -- Purpose --

    pub fn purpose(&self) -> Purpose {
        self.backend
            .get(KEY_PURPOSE)
            .map(|s| Purpose::parse(&s))
            .unwrap_or_default()
    }

    pub fn set_purpose(&self, purpose: Purpose) -> Result<()> {
        match purpose.as_str() {
            Some(s) => self.backend.set(KEY_PURPOSE, s),
            None => self.backend.remove(KEY_PURPOSE),
        }
    }

    // -- History --

    /// A corrupt log reads as empty, the same as a missing one.
    pub fn history(&self) -> Vec<PredictionRecord> {
        let Some(text) = self.backend.get(KEY_HISTORY) else {
            return Vec::new();
        };
        match serde_json::from_str(&text) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("discarding unreadable prediction history: {}", e);
                Vec::new()
            }
        }
    }

    pub fn set_history(&self, records: &[PredictionRecord]) -> Result<()> {
        let text = serde_json::to_string(records).context("Failed to serialize history")?;
        self.backend.set(KEY_HISTORY, &text)
    }

    pub fn clear_history(&self) -> Result<()> {
        self.backend.remove(KEY_HISTORY)
    }
}
