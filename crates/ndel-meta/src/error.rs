use std::path::PathBuf;
use std::time::Duration;

use redb::{
    CommitError, DatabaseError, StorageError as RedbStorageError, TableError, TransactionError,
};
use thiserror::Error;

/// Errors from metadata index operations.
#[derive(Debug, Error)]
pub enum MetaError {
    /// No record exists for the requested id.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The objects collection is missing. It is created on open, so this
    /// indicates a damaged or foreign database file.
    #[error("objects bucket not found")]
    BucketMissing,

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Another process held the database lock for the whole open timeout.
    #[error("database {} still locked after {waited:?}", .path.display())]
    Locked { path: PathBuf, waited: Duration },

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("table error: {0}")]
    Table(#[from] TableError),

    #[error("storage error: {0}")]
    Storage(#[from] RedbStorageError),

    #[error("commit error: {0}")]
    Commit(#[from] CommitError),
}

impl MetaError {
    /// Returns `true` for the not-found kind, which callers surface as a
    /// missing object rather than a storage failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for metadata index operations.
pub type MetaResult<T> = Result<T, MetaError>;
