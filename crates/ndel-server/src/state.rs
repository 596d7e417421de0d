use std::sync::Arc;

use ndel_meta::MetaIndex;
use ndel_store::BlobStore;
use ndel_types::{ObjectMeta, Oid};

use crate::error::{ServerError, ServerResult};

/// Shared handler state: the two stores, sequenced only by the handlers.
#[derive(Clone)]
pub struct AppState {
    pub blobs: Arc<dyn BlobStore>,
    pub index: Arc<dyn MetaIndex>,
}

impl AppState {
    pub fn new(blobs: Arc<dyn BlobStore>, index: Arc<dyn MetaIndex>) -> Self {
        Self { blobs, index }
    }

    /// Metadata record for `oid`, read on the blocking pool.
    pub async fn lookup_meta(&self, oid: Oid) -> ServerResult<ObjectMeta> {
        let index = Arc::clone(&self.index);
        blocking(move || index.get(&oid)).await
    }

    /// Record `meta` for `oid` unless a record already exists.
    pub async fn record_meta(&self, oid: Oid, meta: ObjectMeta) -> ServerResult<()> {
        let index = Arc::clone(&self.index);
        blocking(move || index.put(&oid, &meta)).await
    }

    pub async fn indexed_oids(&self) -> ServerResult<Vec<Oid>> {
        let index = Arc::clone(&self.index);
        blocking(move || index.keys()).await
    }
}

/// Run an index call on the blocking pool so no redb transaction is held
/// on an async worker.
async fn blocking<T, F>(f: F) -> ServerResult<T>
where
    F: FnOnce() -> ndel_meta::MetaResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(format!("index task failed: {e}")))?
        .map_err(ServerError::from)
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
