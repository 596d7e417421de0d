use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::TypeError;

/// Length of an object id in hex characters (a SHA-256 digest).
pub const OID_HEX_LEN: usize = 64;

/// Content-addressed object identifier.
///
/// An `Oid` is the lowercase hex SHA-256 digest of an object's bytes. Only
/// well-formed digests can be constructed, so an `Oid` is always safe to use
/// as a flat file name or database key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Compute the `Oid` of a byte slice.
    pub fn from_content(data: &[u8]) -> Self {
        Self::from_digest(&Sha256::digest(data))
    }

    /// Build an `Oid` from a finished SHA-256 digest.
    pub fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    /// Parse and validate a hex object id.
    ///
    /// Uppercase hex is rejected rather than normalised: the id names a file
    /// and two spellings of one object must not coexist.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.len() != OID_HEX_LEN {
            return Err(TypeError::InvalidLength {
                expected: OID_HEX_LEN,
                actual: s.len(),
            });
        }
        if let Some((offset, ch)) = s
            .char_indices()
            .find(|(_, c)| !matches!(c, '0'..='9' | 'a'..='f'))
        {
            return Err(TypeError::InvalidChar { ch, offset });
        }
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short hex representation (first 8 characters), for logs.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }

    /// Returns `true` if `data` hashes to this id.
    pub fn matches(&self, data: &[u8]) -> bool {
        Self::from_content(data) == *self
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self.short())
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Oid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
