//! Metadata index for ndel objects.
//!
//! Holds one [`ObjectMeta`] record per object id in a single durable
//! collection. Records are written once and never replaced: a second `put`
//! for an id is an idempotent no-op.
//!
//! # Backends
//!
//! - [`RedbMetaIndex`] -- embedded, transactional, single-file database
//! - [`InMemoryMetaIndex`] -- `BTreeMap`-based index for tests
//!
//! [`ObjectMeta`]: ndel_types::ObjectMeta

pub mod error;
pub mod memory;
pub mod redb_index;
pub mod traits;

pub use error::{MetaError, MetaResult};
pub use memory::InMemoryMetaIndex;
pub use redb_index::{RedbMetaIndex, DEFAULT_OPEN_TIMEOUT};
pub use traits::MetaIndex;
