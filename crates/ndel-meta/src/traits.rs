use ndel_types::{ObjectMeta, Oid};

use crate::error::MetaResult;

/// Storage backend for per-object metadata records.
///
/// Implementations must be thread-safe (`Send + Sync`). Every operation runs
/// in its own transaction; none is held open between calls.
pub trait MetaIndex: Send + Sync {
    /// Read the record for `oid`.
    ///
    /// Fails with [`MetaError::NotFound`](crate::MetaError::NotFound) if no
    /// record exists.
    fn get(&self, oid: &Oid) -> MetaResult<ObjectMeta>;

    /// Store the record for `oid` unless one already exists.
    ///
    /// An existing record is left untouched and the call succeeds.
    fn put(&self, oid: &Oid, meta: &ObjectMeta) -> MetaResult<()>;

    /// All ids with a record, in key order, from one consistent snapshot.
    fn keys(&self) -> MetaResult<Vec<Oid>>;

    /// All records, in key order, from one consistent snapshot.
    fn objects(&self) -> MetaResult<Vec<ObjectMeta>>;
}
