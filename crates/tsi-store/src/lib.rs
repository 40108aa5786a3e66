//! TSI Store - relational storage for round-trip checks
//!
//! Wraps a single SQLite connection and provides:
//! - Instant columns with a selectable [`TimestampEncoding`]
//! - The single-table record path ([`RecordStore`])
//! - Environment reset strategies ([`EnvironmentReset`])
//!
//! # Example
//!
//! ```rust,ignore
//! use tsi_instant::{AmbientTimezone, Instant};
//! use tsi_store::{RecordStore, SqliteStore, TimestampEncoding};
//!
//! # async fn example() -> Result<(), tsi_store::StoreError> {
//! let tz = AmbientTimezone::parse("Europe/London").unwrap();
//! let store = SqliteStore::open_in_memory(tz, TimestampEncoding::Aware).await?;
//!
//! store.recreate_table().await?;
//! store.insert_record(Instant::now()).await?;
//! let latest = store.fetch_latest().await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod encoding;
pub mod error;
pub mod record;
pub mod reset;
pub mod store;

pub use encoding::TimestampEncoding;
pub use error::{ParseEncodingError, StoreError};
pub use record::{RecordId, RecordStore, StoredRecord, DEMO_TABLE};
pub use reset::{EnvironmentReset, ResetReport, ResetStrategy};
pub use store::{quote_ident, DatabaseTarget, SqliteStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
