//! Key/value backends for the two storage keys.
//!
//! Both the dataset slot and the seen index sit on a [`Backend`], which is
//! injected so tests can run against [`MemoryBackend`]. On disk everything
//! lives in one SQLite `kv` table; a put is a single upsert statement so a
//! reader never sees a half-written value.

use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};

use crate::error::BackendError;

pub trait Backend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError>;
    fn put(&self, key: &str, value: &str) -> Result<(), BackendError>;
    fn remove(&self, key: &str) -> Result<(), BackendError>;

    /// False for backends that drop writes on the floor.
    fn is_durable(&self) -> bool {
        true
    }
}

/// Resolve the data directory (~/.local/share/estatewatch or platform equivalent)
pub fn default_data_dir() -> Result<PathBuf, BackendError> {
    let dirs = directories::ProjectDirs::from("", "", "estatewatch")
        .ok_or_else(|| BackendError::DataDir("no home directory".to_string()))?;
    Ok(dirs.data_dir().to_path_buf())
}

/// Open the on-disk backend, falling back to [`NullBackend`] when storage is
/// unavailable so analysis keeps working without durability.
pub fn open_default(data_dir: Option<&Path>) -> Rc<dyn Backend> {
    let dir = match data_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => default_data_dir(),
    };

    let opened = dir.and_then(|dir| {
        std::fs::create_dir_all(&dir)?;
        SqliteBackend::open(&dir.join("estatewatch.db"))
    });

    match opened {
        Ok(backend) => Rc::new(backend),
        Err(e) => {
            warn!(error = %e, "storage unavailable, continuing without persistence");
            Rc::new(NullBackend)
        }
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// Database handle. Open once per command, share across the store and the seen index.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        debug!(path = %path.display(), "opened sqlite backend");
        Ok(SqliteBackend { conn })
    }

    pub fn open_in_memory() -> Result<Self, BackendError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(SqliteBackend { conn })
    }
}

impl Backend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let updated_at = chrono::Utc::now().timestamp();

        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, updated_at],
        )?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// Process-local backend, used by tests and as a scratch store.
#[derive(Default)]
pub struct MemoryBackend {
    slots: RefCell<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.slots.borrow().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.slots.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        self.slots.borrow_mut().remove(key);
        Ok(())
    }
}

/// Stand-in when no storage is available: accepts writes, never returns data.
pub struct NullBackend;

impl Backend for NullBackend {
    fn get(&self, _key: &str) -> Result<Option<String>, BackendError> {
        Ok(None)
    }

    fn put(&self, _key: &str, _value: &str) -> Result<(), BackendError> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), BackendError> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }
}
