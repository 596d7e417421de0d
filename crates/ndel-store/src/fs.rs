use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, StreamExt};
use ndel_types::Oid;
use sha2::{Digest, Sha256};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::sniff::{sniff_content_type, OCTET_STREAM, SNIFF_LEN};
use crate::traits::{BlobStore, ByteStream};

/// Chunk size used when streaming blobs back out.
const READ_CHUNK: usize = 64 * 1024;

/// File-per-object blob store in a flat directory.
///
/// Each blob lives at `<root>/<oid>`. Uploads are staged in
/// `<root>/<oid>.<nonce>.tmp`, hashed while written, and renamed into place
/// only once the digest matches. A rename is a single filesystem operation,
/// so readers see either nothing or the complete blob.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, oid: &Oid) -> PathBuf {
        self.root.join(oid.as_str())
    }

    fn staging_path(&self, oid: &Oid) -> PathBuf {
        let nonce: u64 = rand::random();
        self.root.join(format!("{oid}.{nonce:016x}.tmp"))
    }

    async fn open_blob(&self, oid: &Oid) -> StoreResult<File> {
        match File::open(self.object_path(oid)).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound(oid.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `data` into the staging file, returning the byte count and the
    /// hex digest of everything written.
    async fn stage(file: &mut File, mut data: ByteStream<'_>) -> io::Result<(u64, String)> {
        let mut hasher = Sha256::new();
        let mut written = 0u64;
        while let Some(chunk) = data.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok((written, hex::encode(hasher.finalize())))
    }
}

/// Removes the staging file unless it was published.
struct StagingGuard {
    path: PathBuf,
    armed: bool,
}

impl StagingGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "failed to remove staging file");
                }
            }
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn list(&self) -> StoreResult<Vec<Oid>> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut oids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            // Staging files and strays never parse as an oid.
            if let Some(oid) = entry.file_name().to_str().and_then(|n| Oid::parse(n).ok()) {
                oids.push(oid);
            }
        }
        oids.sort();
        Ok(oids)
    }

    async fn exists(&self, oid: &Oid) -> StoreResult<bool> {
        Ok(fs::try_exists(self.object_path(oid)).await?)
    }

    async fn get(&self, oid: &Oid, from_byte: u64) -> StoreResult<ByteStream<'static>> {
        let mut file = self.open_blob(oid).await?;
        if from_byte > 0 {
            file.seek(SeekFrom::Start(from_byte)).await?;
        }
        let chunks = stream::try_unfold(file, |mut file| async move {
            let mut buf = BytesMut::with_capacity(READ_CHUNK);
            let n = file.read_buf(&mut buf).await?;
            Ok::<_, io::Error>((n > 0).then(|| (buf.freeze(), file)))
        });
        Ok(Box::pin(chunks))
    }

    async fn put(&self, oid: &Oid, data: ByteStream<'_>) -> StoreResult<u64> {
        let final_path = self.object_path(oid);
        let staging_path = self.staging_path(oid);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staging_path)
            .await?;
        let mut guard = StagingGuard::new(staging_path.clone());

        let (written, computed) = Self::stage(&mut file, data).await?;
        drop(file);
        debug!(oid = %oid, length = written, "blob staged");

        if computed != oid.as_str() {
            debug!(oid = %oid, computed = %computed, "content hash mismatch");
            return Err(StoreError::HashMismatch {
                oid: oid.clone(),
                computed,
            });
        }

        if let Err(e) = fs::rename(&staging_path, &final_path).await {
            // Another writer published the same content first.
            if !fs::try_exists(&final_path).await.unwrap_or(false) {
                return Err(e.into());
            }
            debug!(oid = %oid, "blob already published");
        } else {
            guard.disarm();
        }
        Ok(written)
    }

    async fn detect_content_type(&self, oid: &Oid) -> String {
        let Ok(file) = self.open_blob(oid).await else {
            return OCTET_STREAM.to_string();
        };
        let mut prefix = Vec::with_capacity(SNIFF_LEN);
        match file.take(SNIFF_LEN as u64).read_to_end(&mut prefix).await {
            Ok(_) => sniff_content_type(&prefix).to_string(),
            Err(_) => OCTET_STREAM.to_string(),
        }
    }
}

impl FsBlobStore {
    /// Read a whole blob into memory. Intended for tests and tooling.
    pub async fn read_all(&self, oid: &Oid) -> StoreResult<Bytes> {
        let mut chunks = self.get(oid, 0).await?;
        let mut out = BytesMut::new();
        while let Some(chunk) = chunks.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out.freeze())
    }
}
