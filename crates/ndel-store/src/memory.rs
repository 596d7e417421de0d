use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use ndel_types::Oid;

use crate::error::{StoreError, StoreResult};
use crate::sniff::sniff_content_type;
use crate::traits::{byte_stream, BlobStore, ByteStream};

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Applies the same verification rules as
/// [`FsBlobStore`](crate::FsBlobStore): content is buffered, hashed, and only
/// inserted when the digest matches.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<Oid, Bytes>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    fn lookup(&self, oid: &Oid) -> Option<Bytes> {
        self.blobs.read().expect("lock poisoned").get(oid).cloned()
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn list(&self) -> StoreResult<Vec<Oid>> {
        let mut oids: Vec<Oid> = self.blobs.read().expect("lock poisoned").keys().cloned().collect();
        oids.sort();
        Ok(oids)
    }

    async fn exists(&self, oid: &Oid) -> StoreResult<bool> {
        Ok(self.blobs.read().expect("lock poisoned").contains_key(oid))
    }

    async fn get(&self, oid: &Oid, from_byte: u64) -> StoreResult<ByteStream<'static>> {
        let data = self.lookup(oid).ok_or_else(|| StoreError::NotFound(oid.clone()))?;
        let start = usize::try_from(from_byte).unwrap_or(usize::MAX).min(data.len());
        Ok(byte_stream(data.slice(start..)))
    }

    async fn put(&self, oid: &Oid, mut data: ByteStream<'_>) -> StoreResult<u64> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = data.next().await {
            buf.extend_from_slice(&chunk?);
        }
        let buf = buf.freeze();

        let computed = Oid::from_content(&buf);
        if computed != *oid {
            return Err(StoreError::HashMismatch {
                oid: oid.clone(),
                computed: computed.into(),
            });
        }

        let written = buf.len() as u64;
        self.blobs
            .write()
            .expect("lock poisoned")
            .entry(oid.clone())
            .or_insert(buf);
        Ok(written)
    }

    async fn detect_content_type(&self, oid: &Oid) -> String {
        let data = self.lookup(oid).unwrap_or_default();
        sniff_content_type(&data).to_string()
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}
