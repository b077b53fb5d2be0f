use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tessera_types::Hash;
use tracing::{debug, warn};

use crate::chunk::Chunk;
use crate::error::{StoreError, StoreResult};
use crate::traits::ChunkStore;

/// Directory-backed chunk store.
///
/// Chunks live at `<root>/<first two hex chars>/<remaining hex>`, one file
/// per chunk. Writes go to a temporary file in the shard directory and are
/// renamed into place, so a crashed write never leaves a partial chunk under
/// its final name. Every read is verified against its address.
#[derive(Debug, Clone)]
pub struct FileChunkStore {
    root: PathBuf,
}

impl FileChunkStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn chunk_path(&self, hash: &Hash) -> PathBuf {
        let hex = hash.to_hex();
        let (shard, rest) = hex.split_at(2);
        self.root.join(shard).join(rest)
    }
}

#[async_trait]
impl ChunkStore for FileChunkStore {
    async fn get(&self, hash: &Hash) -> StoreResult<Option<Chunk>> {
        let path = self.chunk_path(hash);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let chunk = Chunk::from_parts(*hash, Bytes::from(data));
        if let Err(e) = chunk.verify() {
            warn!(chunk = %hash.short_hex(), path = %path.display(), error = %e, "corrupt chunk on disk");
            return Err(e);
        }
        Ok(Some(chunk))
    }

    async fn has(&self, hash: &Hash) -> StoreResult<bool> {
        Ok(tokio::fs::try_exists(self.chunk_path(hash)).await?)
    }

    async fn put(&self, chunk: Chunk) -> StoreResult<Hash> {
        chunk.verify()?;
        let hash = chunk.hash();
        let path = self.chunk_path(&hash);
        if tokio::fs::try_exists(&path).await? {
            return Ok(hash);
        }

        let data = chunk.data().clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &data))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))??;

        debug!(chunk = %hash.short_hex(), len = chunk.len(), "chunk written");
        Ok(hash)
    }
}

fn write_atomically(path: &Path, data: &[u8]) -> StoreResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "chunk path has no parent"))?;
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}
