//! CloudReader - synchronous `Read + Seek` over one stored object

use crate::buffer::{ChunkCache, ReadBuffer};
use crate::{CloudStore, Result};
use object_store::path::Path;
use object_store::DynObjectStore;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::trace;

/// A reader fetching an object in fixed-size ranged requests
///
/// Recently used chunks are kept in an LRU cache, so seeking back over data
/// that was just read does not hit the store again.
#[derive(Debug)]
pub struct CloudReader {
    store: Arc<DynObjectStore>,
    runtime: Arc<Runtime>,
    path: Path,
    /// Current position in the object
    position: u64,
    /// Total size of the object
    size: u64,
    chunk_size: u64,
    cache: ChunkCache,
}

impl CloudReader {
    /// Open `path` in `store`, using the store's transfer settings
    ///
    /// # Errors
    /// Returns an error if the object metadata cannot be retrieved
    pub fn new(store: &CloudStore, path: Path) -> Result<Self> {
        let meta = store.runtime().block_on(store.store().head(&path))?;
        let config = store.config();

        Ok(CloudReader {
            store: store.store().clone(),
            runtime: store.runtime().clone(),
            path,
            position: 0,
            size: meta.size as u64,
            chunk_size: config.read_buffer_size.max(1) as u64,
            cache: ChunkCache::new(config.read_cache_size),
        })
    }

    /// Total size of the object in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Current read position
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Cache (hits, misses) so far
    pub fn cache_stats(&self) -> (u64, u64) {
        self.cache.stats()
    }

    /// Download the chunk with the given index
    fn fetch_chunk(&self, index: u64) -> Result<ReadBuffer> {
        let start = index * self.chunk_size;
        let end = (start + self.chunk_size).min(self.size);
        trace!("Fetching {} bytes {}..{}", self.path, start, end);

        let data = self
            .runtime
            .block_on(self.store.get_range(&self.path, start as usize..end as usize))?;
        Ok(ReadBuffer::new(data, start))
    }
}

impl Read for CloudReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.position >= self.size || buf.is_empty() {
            return Ok(0);
        }

        let index = self.position / self.chunk_size;
        if !self.cache.touch(index) {
            let chunk = self.fetch_chunk(index)?;
            self.cache.insert(index, chunk);
        }

        let to_read = match self.cache.get(index).and_then(|c| c.get_from(self.position)) {
            Some(src) => {
                let n = buf.len().min(src.len());
                buf[..n].copy_from_slice(&src[..n]);
                n
            }
            None => 0,
        };

        self.position += to_read as u64;
        Ok(to_read)
    }
}

impl Seek for CloudReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::End(offset) => self.size as i128 + offset as i128,
            SeekFrom::Current(offset) => self.position as i128 + offset as i128,
        };

        if new_pos < 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Cannot seek before start of object",
            ));
        }
        if new_pos > self.size as i128 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Cannot seek beyond end of object",
            ));
        }

        self.position = new_pos as u64;
        Ok(self.position)
    }
}
