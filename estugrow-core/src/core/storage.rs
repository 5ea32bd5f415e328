//! SQLite-backed [`KvStore`].

use crate::{KvStore, PersistenceError};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL
);";

/// A key-value table inside a SQLite database file.
///
/// Each write is one upsert inside a transaction, so a value is replaced
/// atomically. Calls run on tokio's blocking pool.
pub struct SqliteKvStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKvStore {
    /// Creates (or reuses) the database at `path` and ensures the table exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self::from_connection(conn))
    }

    /// Opens an existing store, rejecting files that do not contain the table.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;

        let table_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = 'kv_store'",
            [],
            |row| row.get(0),
        )?;
        if table_count != 1 {
            return Err(PersistenceError::InvalidStore(
                "Not an EstuGrow database".to_string(),
            ));
        }

        Ok(Self::from_connection(conn))
    }

    /// Opens `path` if it exists, otherwise creates it.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T, PersistenceError>
    where
        F: FnOnce(&mut Connection) -> Result<T, PersistenceError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| PersistenceError::Task("connection lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| PersistenceError::Task(e.to_string()))?
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let key = key.to_string();
        self.with_connection(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv_store WHERE key = ?1",
                    [&key],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn write(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        let key = key.to_string();
        let value = value.to_vec();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                rusqlite::params![key, value],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_write_then_read_back() {
        let temp = NamedTempFile::new().unwrap();
        let store = SqliteKvStore::create(temp.path()).unwrap();

        assert!(store.read("notes").await.unwrap().is_none());
        store.write("notes", b"first").await.unwrap();
        store.write("notes", b"second").await.unwrap();
        assert_eq!(store.read("notes").await.unwrap().unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let temp = NamedTempFile::new().unwrap();
        {
            let store = SqliteKvStore::create(temp.path()).unwrap();
            store.write("notes", b"[]").await.unwrap();
        }

        let store = SqliteKvStore::open(temp.path()).unwrap();
        assert_eq!(store.read("notes").await.unwrap().unwrap(), b"[]");
    }

    #[test]
    fn test_open_invalid_database() {
        let temp = NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "not a database").unwrap();

        assert!(SqliteKvStore::open(temp.path()).is_err());
    }

    #[test]
    fn test_open_database_without_table() {
        let temp = NamedTempFile::new().unwrap();
        Connection::open(temp.path())
            .unwrap()
            .execute("CREATE TABLE unrelated (id INTEGER PRIMARY KEY)", [])
            .unwrap();

        let result = SqliteKvStore::open(temp.path());
        assert!(matches!(result, Err(PersistenceError::InvalidStore(_))));
    }

    #[test]
    fn test_table_holds_only_key_and_value() {
        let temp = NamedTempFile::new().unwrap();
        SqliteKvStore::create(temp.path()).unwrap();

        let conn = Connection::open(temp.path()).unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM pragma_table_info('kv_store') ORDER BY cid")
            .unwrap();
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(columns, vec!["key".to_string(), "value".to_string()]);
    }
}
