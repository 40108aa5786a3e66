//! Environment reset
//!
//! Two strategies:
//! - `FullTruncate` empties every user table with foreign-key enforcement
//!   switched off for the duration, then switched back on no matter what.
//! - `RecreateTable` drops and recreates only [`DEMO_TABLE`].
//!
//! Both leave the database in the same state when run twice in a row.

use crate::error::StoreError;
use crate::record::{RecordStore, DEMO_TABLE};
use crate::store::{list_tables, quote_ident, SqliteStore};
use async_trait::async_trait;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which reset to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetStrategy {
    /// Empty every table in the schema
    FullTruncate,
    /// Drop and recreate the record table only
    RecreateTable,
}

impl fmt::Display for ResetStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullTruncate => f.write_str("full-truncate"),
            Self::RecreateTable => f.write_str("recreate-table"),
        }
    }
}

/// Outcome of a reset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetReport {
    pub strategy: ResetStrategy,
    /// Tables emptied or recreated
    pub tables: Vec<String>,
}

/// Administrative cleanup between scenarios
#[async_trait]
pub trait EnvironmentReset: Send + Sync {
    async fn reset(&self, strategy: ResetStrategy) -> Result<ResetReport, StoreError>;
}

#[async_trait]
impl EnvironmentReset for SqliteStore {
    async fn reset(&self, strategy: ResetStrategy) -> Result<ResetReport, StoreError> {
        let tables = match strategy {
            ResetStrategy::FullTruncate => self.interact(truncate_all).await?,
            ResetStrategy::RecreateTable => {
                self.recreate_table().await?;
                vec![DEMO_TABLE.to_string()]
            }
        };

        tracing::info!("Reset ({}) touched {} tables", strategy, tables.len());
        Ok(ResetReport { strategy, tables })
    }
}

fn truncate_all(conn: &mut Connection) -> Result<Vec<String>, StoreError> {
    let tables = list_tables(conn)?;

    // PRAGMA foreign_keys is ignored inside a transaction, so toggle outside it
    conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
    let emptied = delete_rows(conn, &tables);
    let restored = conn.execute_batch("PRAGMA foreign_keys = ON;");

    emptied?;
    restored?;
    Ok(tables)
}

fn delete_rows(conn: &mut Connection, tables: &[String]) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    for table in tables {
        tracing::debug!("Truncating table {}", table);
        tx.execute(&format!("DELETE FROM {}", quote_ident(table)), [])?;
    }
    tx.commit()?;
    Ok(())
}
