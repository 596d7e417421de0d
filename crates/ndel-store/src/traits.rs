use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, Stream};
use ndel_types::Oid;

use crate::error::StoreResult;

/// A boxed stream of byte chunks, used both for ingesting uploads and for
/// serving stored blobs.
pub type ByteStream<'a> = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + 'a>>;

/// Wrap an in-memory buffer as a single-chunk [`ByteStream`].
pub fn byte_stream(data: impl Into<Bytes>) -> ByteStream<'static> {
    let data = data.into();
    Box::pin(stream::once(async move { Ok(data) }))
}

/// Content-addressed blob store.
///
/// All implementations must satisfy these invariants:
/// - A blob is visible under its id only after its bytes were fully received
///   and their SHA-256 matched the id.
/// - A failed `put` publishes nothing and leaves no partial data reachable.
/// - A `put` for an id that is already present succeeds without changing the
///   stored bytes.
/// - Concurrent reads are always safe (blobs are immutable).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Enumerate the ids of all published blobs.
    async fn list(&self) -> StoreResult<Vec<Oid>>;

    /// Check whether a blob has been published under `oid`.
    async fn exists(&self, oid: &Oid) -> StoreResult<bool>;

    /// Open a published blob for streaming.
    ///
    /// A positive `from_byte` skips that many bytes from the start.
    /// Returns [`StoreError::NotFound`](crate::StoreError::NotFound) if the
    /// blob does not exist.
    async fn get(&self, oid: &Oid, from_byte: u64) -> StoreResult<ByteStream<'static>>;

    /// Consume `data` fully, verify it hashes to `oid`, and publish it.
    ///
    /// Returns the number of bytes received. Fails with
    /// [`StoreError::HashMismatch`](crate::StoreError::HashMismatch) when the
    /// digest disagrees with `oid`.
    async fn put(&self, oid: &Oid, data: ByteStream<'_>) -> StoreResult<u64>;

    /// Sniff the MIME type of a published blob from its first bytes.
    ///
    /// Never fails: any read problem yields `application/octet-stream`.
    async fn detect_content_type(&self, oid: &Oid) -> String;
}
