use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ndel_types::{ObjectMeta, Oid};
use redb::{Database, DatabaseError, ReadOnlyTable, ReadableTable, TableDefinition, TableError};
use tracing::{debug, info, warn};

use crate::error::{MetaError, MetaResult};
use crate::traits::MetaIndex;

/// The single durable collection: oid -> bincode-encoded [`ObjectMeta`].
const OBJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("objects");

/// How long [`RedbMetaIndex::open`] waits for another process to release
/// the database lock by default.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(1);

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Metadata index stored in a redb database file.
///
/// redb allows one writer and many concurrent readers; each call below runs
/// in its own transaction, so readers always see a committed snapshot.
pub struct RedbMetaIndex {
    db: Database,
    path: PathBuf,
}

impl RedbMetaIndex {
    /// Open (or create) the database at `path` and ensure the objects
    /// collection exists.
    ///
    /// If another process holds the file lock, retries until `timeout`
    /// elapses and then fails with [`MetaError::Locked`].
    pub fn open(path: impl AsRef<Path>, timeout: Duration) -> MetaResult<Self> {
        let path = path.as_ref();
        let started = Instant::now();
        let db = loop {
            match Database::create(path) {
                Ok(db) => break db,
                Err(DatabaseError::DatabaseAlreadyOpen) => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(MetaError::Locked {
                            path: path.to_path_buf(),
                            waited,
                        });
                    }
                    std::thread::sleep(LOCK_RETRY_INTERVAL.min(timeout - waited));
                }
                Err(e) => return Err(e.into()),
            }
        };

        let txn = db.begin_write()?;
        txn.open_table(OBJECTS)?;
        txn.commit()?;

        info!(path = %path.display(), "metadata index opened");
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> MetaResult<ReadOnlyTable<&'static str, &'static [u8]>> {
        let txn = self.db.begin_read()?;
        match txn.open_table(OBJECTS) {
            Ok(table) => Ok(table),
            Err(TableError::TableDoesNotExist(_)) => Err(MetaError::BucketMissing),
            Err(e) => Err(e.into()),
        }
    }
}

fn encode(meta: &ObjectMeta) -> MetaResult<Vec<u8>> {
    bincode::serialize(meta).map_err(|e| MetaError::Serialization(e.to_string()))
}

fn decode(bytes: &[u8]) -> MetaResult<ObjectMeta> {
    bincode::deserialize(bytes).map_err(|e| MetaError::Serialization(e.to_string()))
}

impl MetaIndex for RedbMetaIndex {
    fn get(&self, oid: &Oid) -> MetaResult<ObjectMeta> {
        let table = self.read_table()?;
        match table.get(oid.as_str())? {
            Some(value) => decode(value.value()),
            None => Err(MetaError::NotFound(oid.to_string())),
        }
    }

    fn put(&self, oid: &Oid, meta: &ObjectMeta) -> MetaResult<()> {
        let encoded = encode(meta)?;

        let txn = self.db.begin_write()?;
        let inserted = {
            let mut table = txn.open_table(OBJECTS)?;
            // The write lock makes this check-and-insert atomic.
            if table.get(oid.as_str())?.is_some() {
                false
            } else {
                table.insert(oid.as_str(), encoded.as_slice())?;
                true
            }
        };
        if inserted {
            txn.commit()?;
            debug!(oid = %oid, "metadata recorded");
        } else {
            txn.abort()?;
            debug!(oid = %oid, "metadata already present");
        }
        Ok(())
    }

    fn keys(&self) -> MetaResult<Vec<Oid>> {
        let table = self.read_table()?;
        let mut keys = Vec::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            match Oid::parse(key.value()) {
                Ok(oid) => keys.push(oid),
                Err(e) => warn!(key = key.value(), error = %e, "skipping malformed index key"),
            }
        }
        Ok(keys)
    }

    fn objects(&self) -> MetaResult<Vec<ObjectMeta>> {
        let table = self.read_table()?;
        let mut objects = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            objects.push(decode(value.value())?);
        }
        Ok(objects)
    }
}

impl std::fmt::Debug for RedbMetaIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbMetaIndex")
            .field("path", &self.path)
            .finish()
    }
}
