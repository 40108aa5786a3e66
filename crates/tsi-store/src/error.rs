//! Error types for the storage layer
//!
//! Every variant is fatal for the scenario that hit it. Nothing here is
//! retried by callers.

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Driver error (connection, schema, constraint)
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Fetch-latest on a table with no rows
    #[error("table {table} is empty")]
    EmptyTable { table: String },

    /// Stored text is not a timestamp in the expected encoding
    #[error("malformed timestamp {value:?}: {reason}")]
    MalformedTimestamp { value: String, reason: String },

    /// Instant cannot be represented as a calendar datetime
    #[error("instant {0}ms is out of range")]
    OutOfRange(i64),

    /// Connection already released
    #[error("connection closed")]
    Closed,

    /// Blocking worker panicked or was cancelled
    #[error("storage worker failed: {0}")]
    Worker(String),
}

/// Unrecognised timestamp encoding name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown timestamp encoding {0:?} (expected \"aware\" or \"naive\")")]
pub struct ParseEncodingError(pub String);
