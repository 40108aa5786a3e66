//! SQLite connection handle
//!
//! One connection per process. Async callers reach it through
//! [`SqliteStore::interact`], which moves the closure onto tokio's blocking
//! pool. The connection sits in an `Option` so [`SqliteStore::close`] can
//! release it explicitly; any later call fails with `StoreError::Closed`.

use crate::encoding::TimestampEncoding;
use crate::error::StoreError;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tsi_instant::{AmbientTimezone, Instant};

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// Private in-memory database, gone when the connection closes
    Memory,
    /// Database file
    File(PathBuf),
}

impl DatabaseTarget {
    /// Parse a connection string: `:memory:`, `sqlite::memory:`,
    /// `sqlite://path`, `sqlite:path`, or a bare path
    #[must_use]
    pub fn parse(url: &str) -> Self {
        let trimmed = url.trim();
        let path = trimmed
            .strip_prefix("sqlite://")
            .or_else(|| trimmed.strip_prefix("sqlite:"))
            .unwrap_or(trimmed);

        if path.is_empty() || path == ":memory:" {
            Self::Memory
        } else {
            Self::File(PathBuf::from(path))
        }
    }
}

impl FromStr for DatabaseTarget {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str(":memory:"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Shared handle to the process-wide connection
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Option<Connection>>>,
    target: DatabaseTarget,
    timezone: AmbientTimezone,
    encoding: TimestampEncoding,
}

impl SqliteStore {
    /// Open a connection with foreign-key enforcement on
    ///
    /// # Errors
    /// - `StoreError::Sqlite` if the database cannot be opened
    pub async fn open(
        target: DatabaseTarget,
        timezone: AmbientTimezone,
        encoding: TimestampEncoding,
    ) -> Result<Self, StoreError> {
        let open_target = target.clone();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, StoreError> {
            let conn = match &open_target {
                DatabaseTarget::Memory => Connection::open_in_memory()?,
                DatabaseTarget::File(path) => Connection::open(path)?,
            };
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(conn)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))??;

        tracing::debug!("Opened {} with {} timestamps", target, encoding);

        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            target,
            timezone,
            encoding,
        })
    }

    /// Open a private in-memory database
    ///
    /// # Errors
    /// - `StoreError::Sqlite` if SQLite cannot allocate the database
    pub async fn open_in_memory(
        timezone: AmbientTimezone,
        encoding: TimestampEncoding,
    ) -> Result<Self, StoreError> {
        Self::open(DatabaseTarget::Memory, timezone, encoding).await
    }

    /// Run `f` against the connection on the blocking pool
    ///
    /// # Errors
    /// - `StoreError::Closed` after [`close`](Self::close)
    /// - whatever `f` returns
    pub async fn interact<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            let conn = guard.as_mut().ok_or(StoreError::Closed)?;
            f(conn)
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))?
    }

    /// Release the connection. Idempotent.
    ///
    /// # Errors
    /// - `StoreError::Sqlite` if SQLite refuses to close (e.g. busy statements)
    pub async fn close(&self) -> Result<(), StoreError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let taken = conn.lock().take();
            match taken {
                Some(c) => c.close().map_err(|(_, e)| StoreError::Sqlite(e)),
                None => Ok(()),
            }
        })
        .await
        .map_err(|e| StoreError::Worker(e.to_string()))??;

        tracing::debug!("Closed {}", self.target);
        Ok(())
    }

    /// Whether [`close`](Self::close) has run
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }

    /// Database location
    #[inline]
    #[must_use]
    pub fn target(&self) -> &DatabaseTarget {
        &self.target
    }

    /// Ambient zone consulted by naive encodings
    #[inline]
    #[must_use]
    pub fn timezone(&self) -> &AmbientTimezone {
        &self.timezone
    }

    /// Encoding used for every instant column
    #[inline]
    #[must_use]
    pub fn encoding(&self) -> TimestampEncoding {
        self.encoding
    }

    /// Column text for `instant`, using the zone in effect right now
    ///
    /// # Errors
    /// - `StoreError::OutOfRange` for instants outside the calendar range
    pub fn encode_instant(&self, instant: Instant) -> Result<String, StoreError> {
        self.encoding.encode(instant, &self.timezone)
    }

    /// Instant for column text, using the zone in effect right now
    ///
    /// # Errors
    /// - `StoreError::MalformedTimestamp` if the text does not parse
    pub fn decode_instant(&self, value: &str) -> Result<Instant, StoreError> {
        self.encoding.decode(value, &self.timezone)
    }

    /// User tables, sorted by name
    ///
    /// # Errors
    /// - `StoreError::Sqlite` / `StoreError::Closed`
    pub async fn table_names(&self) -> Result<Vec<String>, StoreError> {
        self.interact(|conn| list_tables(conn)).await
    }

    /// Number of rows in `table`
    ///
    /// # Errors
    /// - `StoreError::Sqlite` if the table does not exist
    pub async fn row_count(&self, table: &str) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        self.interact(move |conn| Ok(conn.query_row(&sql, [], |row| row.get(0))?))
            .await
    }
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore")
            .field("target", &self.target)
            .field("timezone", &self.timezone)
            .field("encoding", &self.encoding)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Double-quote an identifier for interpolation into SQL
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn list_tables(conn: &Connection) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut names = Vec::new();
    for name in rows {
        names.push(name?);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteStore {
        SqliteStore::open_in_memory(AmbientTimezone::default(), TimestampEncoding::Aware)
            .await
            .unwrap()
    }

    #[test]
    fn parses_connection_strings() {
        assert_eq!(DatabaseTarget::parse(":memory:"), DatabaseTarget::Memory);
        assert_eq!(DatabaseTarget::parse("sqlite::memory:"), DatabaseTarget::Memory);
        assert_eq!(
            DatabaseTarget::parse("sqlite:///tmp/tsi.db"),
            DatabaseTarget::File(PathBuf::from("/tmp/tsi.db"))
        );
        assert_eq!(
            DatabaseTarget::parse("data/tsi.db"),
            DatabaseTarget::File(PathBuf::from("data/tsi.db"))
        );
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("user"), "\"user\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let store = memory_store().await;
        let enabled: i64 = store
            .interact(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0))?))
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_final() {
        let store = memory_store().await;
        let other = store.clone();

        store.close().await.unwrap();
        store.close().await.unwrap();

        assert!(other.is_closed());
        assert!(matches!(other.table_names().await, Err(StoreError::Closed)));
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let target = DatabaseTarget::File(dir.path().join("tsi.db"));

        let store = SqliteStore::open(target.clone(), AmbientTimezone::default(), TimestampEncoding::Aware)
            .await
            .unwrap();
        store
            .interact(|conn| Ok(conn.execute_batch("CREATE TABLE kept (id INTEGER)")?))
            .await
            .unwrap();
        store.close().await.unwrap();

        let reopened = SqliteStore::open(target, AmbientTimezone::default(), TimestampEncoding::Aware)
            .await
            .unwrap();
        assert_eq!(reopened.table_names().await.unwrap(), vec!["kept".to_string()]);
    }
}
