use crate::core::geo::TileCoord;
use crate::prelude::HashSet;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

const DEFAULT_CAPACITY: usize = 512;

struct CacheState<T> {
    tiles: LruCache<TileCoord, Arc<T>>,
    /// Tiles requested but not yet delivered
    pending: HashSet<TileCoord>,
}

/// In-memory tile cache using LRU eviction.
///
/// Clones share the same storage, so a loader thread and the UI can hold
/// the cache at the same time.
pub struct TileCache<T = Vec<u8>> {
    state: Arc<Mutex<CacheState<T>>>,
}

impl<T> TileCache<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or(NonZeroUsize::MIN.saturating_add(DEFAULT_CAPACITY - 1));
        Self {
            state: Arc::new(Mutex::new(CacheState {
                tiles: LruCache::new(capacity),
                pending: HashSet::default(),
            })),
        }
    }

    pub fn get(&self, coord: &TileCoord) -> Option<Arc<T>> {
        self.state.lock().ok()?.tiles.get(coord).cloned()
    }

    /// Stores a delivered tile and clears its pending flag
    pub fn insert(&self, coord: TileCoord, tile: T) {
        if let Ok(mut state) = self.state.lock() {
            state.pending.remove(&coord);
            state.tiles.put(coord, Arc::new(tile));
        }
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.state
            .lock()
            .map(|state| state.tiles.contains(coord))
            .unwrap_or(false)
    }

    /// Marks `coord` as requested. Returns `false` when it is cached or
    /// already pending, so callers only request each tile once.
    pub fn begin_request(&self, coord: TileCoord) -> bool {
        match self.state.lock() {
            Ok(mut state) => !state.tiles.contains(&coord) && state.pending.insert(coord),
            Err(_) => false,
        }
    }

    /// Forgets a pending request that will never be delivered
    pub fn cancel_request(&self, coord: &TileCoord) {
        if let Ok(mut state) = self.state.lock() {
            state.pending.remove(coord);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().map(|state| state.pending.len()).unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.tiles.clear();
            state.pending.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|state| state.tiles.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.tiles.cap().get())
            .unwrap_or(0)
    }
}

impl<T> Clone for TileCache<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Default for TileCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_cache_basic_operations() {
        let cache: TileCache = TileCache::new(2);
        let coord1 = TileCoord::new(1, 2, 3);

        assert!(cache.is_empty());
        cache.insert(coord1, vec![1, 2, 3]);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&coord1));
        assert_eq!(*cache.get(&coord1).unwrap(), vec![1, 2, 3]);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_tile_cache_lru_eviction() {
        let cache: TileCache = TileCache::new(2);
        let coord1 = TileCoord::new(1, 1, 1);
        let coord2 = TileCoord::new(2, 2, 2);
        let coord3 = TileCoord::new(3, 3, 3);

        cache.insert(coord1, vec![1]);
        cache.insert(coord2, vec![2]);
        cache.insert(coord3, vec![3]);
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&coord1));
        assert!(cache.contains(&coord2));
        assert!(cache.contains(&coord3));
    }

    #[test]
    fn test_requests_are_deduplicated() {
        let cache: TileCache = TileCache::new(4);
        let coord = TileCoord::new(7, 12, 5);

        assert!(cache.begin_request(coord));
        assert!(!cache.begin_request(coord));
        assert_eq!(cache.pending_count(), 1);

        cache.insert(coord, vec![0]);
        assert_eq!(cache.pending_count(), 0);
        assert!(!cache.begin_request(coord));

        let other = TileCoord::new(8, 12, 5);
        assert!(cache.begin_request(other));
        cache.cancel_request(&other);
        assert!(cache.begin_request(other));
    }

    #[test]
    fn test_zero_capacity_falls_back_to_default() {
        let cache: TileCache = TileCache::new(0);
        assert_eq!(cache.capacity(), DEFAULT_CAPACITY);
    }
}
