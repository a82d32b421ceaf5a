//! Local triple store
//!
//! The mirror lands in a single SQLite file. One connection writes (owned by
//! the Writer task); any number of read-only connections may observe the
//! file concurrently.

use serde::{Deserialize, Serialize};

mod sqlite;

pub use sqlite::{LocalStore, StoreStats, DEFAULT_TERM_CACHE_CAPACITY};

/// Error type for local store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Could not prepare the store location
    #[error("cannot prepare store location: {0}")]
    Io(#[from] std::io::Error),

    /// A stored term could not be decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Patterns may contain variables, stored statements may not
    #[error("cannot store a statement containing variables: {0}")]
    NonGround(String),

    /// A thread panicked while holding the connection
    #[error("store connection lock poisoned")]
    Poisoned,
}

/// Result type for local store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Transaction isolation requested for a batch insert
///
/// SQLite has no per-transaction isolation levels, so each level maps to the
/// closest locking behavior:
///
/// | level              | SQLite                                       |
/// |--------------------|----------------------------------------------|
/// | `ReadUncommitted`  | `PRAGMA read_uncommitted = 1`, `BEGIN DEFERRED` |
/// | `ReadCommitted`    | `BEGIN IMMEDIATE`                            |
/// | `Serializable`     | `BEGIN EXCLUSIVE`                            |
///
/// With the WAL journal, readers are never blocked by the first two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    #[default]
    ReadUncommitted,
    ReadCommitted,
    Serializable,
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IsolationLevel::ReadUncommitted => "read_uncommitted",
            IsolationLevel::ReadCommitted => "read_committed",
            IsolationLevel::Serializable => "serializable",
        };
        f.write_str(s)
    }
}
