//! Persistence backends for the tracker state
//!
//! The store mirrors every mutation into a key/value backend: each of the
//! four collections is one key holding a JSON value.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use crate::models::{PartialState, StorageKey};

/// Key/value persistence contract
pub trait Storage: Send + Sync {
    /// Read the requested keys; keys that were never written stay `None`
    fn get(&self, keys: &[StorageKey]) -> Result<PartialState>;

    /// Write every key present in `state`, leaving the others untouched
    fn set(&self, state: &PartialState) -> Result<()>;
}

fn encode(state: &PartialState) -> Result<Vec<(StorageKey, String)>> {
    let mut values = Vec::new();
    if let Some(problems) = &state.problems {
        values.push((StorageKey::Problems, serde_json::to_string(problems)?));
    }
    if let Some(lists) = &state.lists {
        values.push((StorageKey::Lists, serde_json::to_string(lists)?));
    }
    if let Some(todo) = &state.todo_list {
        values.push((StorageKey::TodoList, serde_json::to_string(todo)?));
    }
    if let Some(profiles) = &state.profiles {
        values.push((StorageKey::Profiles, serde_json::to_string(profiles)?));
    }
    Ok(values)
}

fn decode_into(state: &mut PartialState, key: StorageKey, raw: &str) -> Result<()> {
    let context = || format!("Failed to decode stored value for '{}'", key);
    match key {
        StorageKey::Problems => {
            state.problems = Some(serde_json::from_str(raw).with_context(context)?)
        }
        StorageKey::Lists => state.lists = Some(serde_json::from_str(raw).with_context(context)?),
        StorageKey::TodoList => {
            state.todo_list = Some(serde_json::from_str(raw).with_context(context)?)
        }
        StorageKey::Profiles => {
            state.profiles = Some(serde_json::from_str(raw).with_context(context)?)
        }
    }
    Ok(())
}

/// SQLite-backed storage
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open or create the database
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(path).context("Failed to open database")?;
        Self::with_connection(conn)
    }

    /// Database that lives only as long as this value
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection mutex poisoned"))
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            -- One row per persisted collection
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    /// Last time `key` was written, if ever
    pub fn updated_at(&self, key: StorageKey) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT updated_at FROM kv WHERE key = ?1",
            params![key.as_str()],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }
}

impl Storage for SqliteStorage {
    fn get(&self, keys: &[StorageKey]) -> Result<PartialState> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut state = PartialState::default();

        for key in keys {
            let raw: Option<String> = stmt
                .query_row(params![key.as_str()], |row| row.get(0))
                .optional()?;
            if let Some(raw) = raw {
                decode_into(&mut state, *key, &raw)?;
            }
        }

        Ok(state)
    }

    fn set(&self, state: &PartialState) -> Result<()> {
        let values = encode(state)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        for (key, value) in &values {
            tx.execute(
                r#"INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                   ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
                params![key.as_str(), value, &now],
            )?;
        }

        tx.commit().context("Failed to commit state write")?;
        tracing::debug!(keys = ?state.keys(), "State persisted");
        Ok(())
    }
}

/// Volatile storage, mostly for tests and dry runs
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<StorageKey, Value>>,
    writes: Mutex<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls so far
    pub fn writes(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or_default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, keys: &[StorageKey]) -> Result<PartialState> {
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow!("Storage mutex poisoned"))?;
        let mut state = PartialState::default();
        for key in keys {
            if let Some(value) = values.get(key) {
                decode_into(&mut state, *key, &value.to_string())?;
            }
        }
        Ok(state)
    }

    fn set(&self, state: &PartialState) -> Result<()> {
        let encoded = encode(state)?;
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow!("Storage mutex poisoned"))?;
        for (key, raw) in encoded {
            values.insert(key, serde_json::from_str(&raw)?);
        }
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DEFAULT_LIST, Problem};

    fn sample_problem() -> Problem {
        Problem {
            id: 1,
            name: "Max Flow".into(),
            url: "https://codeforces.com/problemset/problem/1/A".into(),
            judge: None,
            rating: "2000".into(),
            tags: vec!["graph".into()],
            notes: String::new(),
            list: DEFAULT_LIST.into(),
            solved: true,
            added_date: String::new(),
        }
    }

    #[test]
    fn sqlite_returns_only_written_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::open(&dir.path().join("nested/kipit.sqlite")).unwrap();

        storage
            .set(&PartialState {
                lists: Some(vec![DEFAULT_LIST.into(), "Work".into()]),
                ..Default::default()
            })
            .unwrap();

        let state = storage.get(&StorageKey::ALL).unwrap();
        assert_eq!(state.lists, Some(vec![DEFAULT_LIST.into(), "Work".into()]));
        assert!(state.problems.is_none());
        assert!(state.todo_list.is_none());
        assert!(storage.updated_at(StorageKey::Lists).unwrap().is_some());
        assert!(storage.updated_at(StorageKey::Problems).unwrap().is_none());
    }

    #[test]
    fn sqlite_overwrites_existing_key_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kipit.sqlite");

        {
            let storage = SqliteStorage::open(&path).unwrap();
            storage
                .set(&PartialState {
                    problems: Some(vec![sample_problem()]),
                    todo_list: Some(vec![1]),
                    ..Default::default()
                })
                .unwrap();
            storage
                .set(&PartialState {
                    todo_list: Some(vec![]),
                    ..Default::default()
                })
                .unwrap();
        }

        let storage = SqliteStorage::open(&path).unwrap();
        let state = storage
            .get(&[StorageKey::Problems, StorageKey::TodoList])
            .unwrap();
        assert_eq!(state.problems, Some(vec![sample_problem()]));
        assert_eq!(state.todo_list, Some(vec![]));
    }

    #[test]
    fn memory_storage_counts_writes() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.writes(), 0);

        let mut profiles = crate::models::Profiles::new();
        profiles.insert("Codeforces".into(), "tourist".into());
        storage
            .set(&PartialState {
                profiles: Some(profiles.clone()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(storage.writes(), 1);
        let state = storage.get(&[StorageKey::Profiles]).unwrap();
        assert_eq!(state.profiles, Some(profiles));
    }
}
