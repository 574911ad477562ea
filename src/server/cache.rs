//! Keyed memoization of serialized chunk bytes.
//!
//! Generation is a pure function of the seed, so the cache only has to be
//! correct, not clever: one mutex over the map, builders run outside the
//! lock. Two threads racing the same miss both build; the first insert wins
//! and the loser's bytes are dropped, which is harmless because the outputs
//! are identical.

use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::chunk::ChunkCoord;

struct CacheInner {
    map: LruCache<ChunkCoord, Arc<Vec<u8>>>,
    total_bytes: usize,
    max_bytes: usize,
}

pub struct ChunkCache {
    inner: Mutex<CacheInner>,
}

impl ChunkCache {
    /// `max_bytes == 0` disables eviction entirely.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                map: LruCache::unbounded(),
                total_bytes: 0,
                max_bytes,
            }),
        }
    }

    /// Cached bytes for a coord, promoting it to most recently used
    pub fn get(&self, coord: ChunkCoord) -> Option<Arc<Vec<u8>>> {
        self.inner.lock().map.get(&coord).cloned()
    }

    /// Return the cached bytes or build, insert and return them. The
    /// builder runs with no lock held.
    pub fn get_or_build(
        &self,
        coord: ChunkCoord,
        build: impl FnOnce() -> Vec<u8>,
    ) -> Arc<Vec<u8>> {
        if let Some(bytes) = self.get(coord) {
            return bytes;
        }

        let built = Arc::new(build());

        let mut inner = self.inner.lock();
        if let Some(existing) = inner.map.get(&coord).cloned() {
            // Lost a first-miss race; keep the winner.
            return existing;
        }
        inner.total_bytes += built.len();
        inner.map.push(coord, Arc::clone(&built));
        if inner.max_bytes > 0 {
            while inner.total_bytes > inner.max_bytes && inner.map.len() > 1 {
                if let Some((_, evicted)) = inner.map.pop_lru() {
                    inner.total_bytes -= evicted.len();
                } else {
                    break;
                }
            }
        }
        built
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }
}
