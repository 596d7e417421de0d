use ndel_types::Oid;

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(Oid),

    /// The written bytes do not hash to the id they were stored under.
    /// Nothing was published.
    #[error("content hash mismatch for {oid}: computed {computed}")]
    HashMismatch { oid: Oid, computed: String },

    /// I/O error from the underlying storage backend, including failures
    /// of the incoming byte stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
