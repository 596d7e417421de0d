//! Foundation types for ndel, a content-addressed object server.
//!
//! Every other ndel crate depends on `ndel-types`.
//!
//! # Key Types
//!
//! - [`Oid`] -- Object id: the lowercase hex SHA-256 of the object's bytes
//! - [`ObjectMeta`] -- Per-object metadata record kept by the index

pub mod error;
pub mod meta;
pub mod oid;

pub use error::TypeError;
pub use meta::ObjectMeta;
pub use oid::{Oid, OID_HEX_LEN};
