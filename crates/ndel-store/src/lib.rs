//! Content-addressed blob storage for ndel.
//!
//! Blobs are raw byte sequences stored under their [`Oid`], the SHA-256 of
//! their content. A blob is either absent or exactly the bytes that were
//! verified when it was written.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`FsBlobStore`] -- one file per object in a flat directory
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once published; there is no update or delete.
//! 2. Verify-then-publish: bytes are hashed while staged and only become
//!    visible under their id after the digest matches.
//! 3. Publishing an id that is already present is success, not an error.
//! 4. Failed writes leave nothing behind; callers never clean up.
//!
//! [`Oid`]: ndel_types::Oid

pub mod error;
pub mod fs;
pub mod memory;
pub mod sniff;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use sniff::{sniff_content_type, OCTET_STREAM, SNIFF_LEN};
pub use traits::{byte_stream, BlobStore, ByteStream};
