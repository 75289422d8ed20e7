//! Buffer management utilities

use bytes::{Bytes, BytesMut};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::ops::Range;

/// One downloaded chunk of an object
#[derive(Debug, Clone)]
pub(crate) struct ReadBuffer {
    data: Bytes,
    /// The range in the object this chunk covers
    range: Range<u64>,
}

impl ReadBuffer {
    pub fn new(data: Bytes, start: u64) -> Self {
        let end = start + data.len() as u64;
        Self {
            data,
            range: start..end,
        }
    }

    pub fn contains(&self, pos: u64) -> bool {
        self.range.contains(&pos)
    }

    /// Data from `pos` to the end of the chunk
    pub fn get_from(&self, pos: u64) -> Option<&[u8]> {
        if !self.contains(pos) {
            return None;
        }

        let offset = (pos - self.range.start) as usize;
        Some(&self.data[offset..])
    }
}

/// Least-recently-used set of chunks, keyed by chunk index
#[derive(Debug)]
pub(crate) struct ChunkCache {
    chunks: LruCache<u64, ReadBuffer>,
    hits: u64,
    misses: u64,
}

impl ChunkCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            chunks: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Mark a chunk as used, recording a hit or a miss
    pub fn touch(&mut self, index: u64) -> bool {
        let hit = self.chunks.get(&index).is_some();
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        hit
    }

    pub fn get(&mut self, index: u64) -> Option<&ReadBuffer> {
        self.chunks.get(&index)
    }

    pub fn insert(&mut self, index: u64, chunk: ReadBuffer) {
        self.chunks.put(index, chunk);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

/// Bytes accepted by a writer but not uploaded yet
#[derive(Debug, Default)]
pub(crate) struct WriteBuffer {
    buffer: BytesMut,
}

impl WriteBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn write(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Split off the first `len` bytes
    pub fn take_part(&mut self, len: usize) -> Bytes {
        let len = len.min(self.buffer.len());
        self.buffer.split_to(len).freeze()
    }

    /// Take the buffer contents, leaving it empty
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }
}
