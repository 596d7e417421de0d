use std::collections::BTreeMap;
use std::sync::RwLock;

use ndel_types::{ObjectMeta, Oid};

use crate::error::{MetaError, MetaResult};
use crate::traits::MetaIndex;

/// In-memory metadata index backed by a `BTreeMap`.
///
/// Same contract as [`RedbMetaIndex`](crate::RedbMetaIndex), without
/// durability. Intended for tests.
#[derive(Debug, Default)]
pub struct InMemoryMetaIndex {
    records: RwLock<BTreeMap<Oid, ObjectMeta>>,
}

impl InMemoryMetaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetaIndex for InMemoryMetaIndex {
    fn get(&self, oid: &Oid) -> MetaResult<ObjectMeta> {
        self.records
            .read()
            .expect("lock poisoned")
            .get(oid)
            .cloned()
            .ok_or_else(|| MetaError::NotFound(oid.to_string()))
    }

    fn put(&self, oid: &Oid, meta: &ObjectMeta) -> MetaResult<()> {
        self.records
            .write()
            .expect("lock poisoned")
            .entry(oid.clone())
            .or_insert_with(|| meta.clone());
        Ok(())
    }

    fn keys(&self) -> MetaResult<Vec<Oid>> {
        Ok(self.records.read().expect("lock poisoned").keys().cloned().collect())
    }

    fn objects(&self) -> MetaResult<Vec<ObjectMeta>> {
        Ok(self.records.read().expect("lock poisoned").values().cloned().collect())
    }
}
