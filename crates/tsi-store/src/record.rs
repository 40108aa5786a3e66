//! Single-table record path
//!
//! A minimal table with an autoincrement id and one instant column. The
//! storage round-trip check owns it outright: recreated per run, read back
//! newest-first.

use crate::error::StoreError;
use crate::store::{quote_ident, SqliteStore};
use async_trait::async_trait;
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use std::fmt;
use tsi_instant::Instant;

/// Table used by the storage round-trip check
pub const DEMO_TABLE: &str = "demo_times";

/// Row identifier, increasing with insertion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row of [`DEMO_TABLE`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    pub created_at: Instant,
}

/// Record store consumed by the storage round-trip check
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Drop the table if it exists, then create it empty
    async fn recreate_table(&self) -> Result<(), StoreError>;

    /// Insert one row stamped with `created_at`
    async fn insert_record(&self, created_at: Instant) -> Result<RecordId, StoreError>;

    /// Most recently inserted row
    ///
    /// # Errors
    /// - `StoreError::EmptyTable` if there are no rows
    async fn fetch_latest(&self) -> Result<StoredRecord, StoreError>;
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn recreate_table(&self) -> Result<(), StoreError> {
        let table = quote_ident(DEMO_TABLE);
        let sql = format!(
            "DROP TABLE IF EXISTS {table};
             CREATE TABLE {table} (
               id INTEGER PRIMARY KEY AUTOINCREMENT,
               created_at TEXT NOT NULL
             );"
        );
        self.interact(move |conn| Ok(conn.execute_batch(&sql)?)).await?;
        tracing::debug!("Recreated table {}", DEMO_TABLE);
        Ok(())
    }

    async fn insert_record(&self, created_at: Instant) -> Result<RecordId, StoreError> {
        // Encoded now, under the zone in effect at write time
        let text = self.encode_instant(created_at)?;
        let sql = format!("INSERT INTO {} (created_at) VALUES (?1)", quote_ident(DEMO_TABLE));

        let id = self
            .interact(move |conn| {
                conn.execute(&sql, [&text])?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        tracing::debug!("Inserted record {} at {}", id, created_at);
        Ok(RecordId(id))
    }

    async fn fetch_latest(&self) -> Result<StoredRecord, StoreError> {
        let sql = format!(
            "SELECT id, created_at FROM {} ORDER BY id DESC LIMIT 1",
            quote_ident(DEMO_TABLE)
        );

        let row = self
            .interact(move |conn| {
                Ok(conn
                    .query_row(&sql, [], |row| {
                        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                    })
                    .optional()?)
            })
            .await?;

        let (id, text) = row.ok_or_else(|| StoreError::EmptyTable {
            table: DEMO_TABLE.to_string(),
        })?;

        // Decoded now, under the zone in effect at read time
        let created_at = self.decode_instant(&text)?;
        tracing::debug!("Fetched record {} stored as {:?}", id, text);

        Ok(StoredRecord {
            id: RecordId(id),
            created_at,
        })
    }
}
