//! Bounded LRU cache of decoded graphics sheets.
//!
//! Sheets are decoded by an external [`GraphicsSheetSource`] and shared out
//! as `Arc<IndexedBitmap>`. A single mutex guards the entry map; loads happen
//! under the lock so two threads never decode the same sheet twice.

use crate::{DungeonError, Result};
use rom_core::gfx::IndexedBitmap;
use rom_core::logging::{log, LogCategory, LogLevel};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Default number of sheets kept resident
pub const DEFAULT_CAPACITY: usize = 100;

/// Number of addressable graphics sheets
pub const SHEET_COUNT: usize = 223;

/// Supplier of decoded graphics sheets.
pub trait GraphicsSheetSource: Send + Sync {
    /// Decoded sheet for `index`, or `None` if the source has no such sheet.
    fn sheet(&self, index: usize) -> Option<IndexedBitmap>;
}

/// A source backed by a pre-decoded list of sheets.
impl GraphicsSheetSource for Vec<IndexedBitmap> {
    fn sheet(&self, index: usize) -> Option<IndexedBitmap> {
        self.get(index).cloned()
    }
}

struct CacheEntry {
    sheet: Arc<IndexedBitmap>,
    last_access: u64,
    access_count: u64,
}

struct Inner {
    entries: HashMap<usize, CacheEntry>,
    capacity: usize,
    /// Monotonic access counter, orders entries for eviction
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Inner {
    fn evict_to(&mut self, capacity: usize) {
        while self.entries.len() > capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(&index, _)| index);
            let Some(index) = oldest else { break };
            if let Some(entry) = self.entries.remove(&index) {
                self.evictions += 1;
                log(LogCategory::Cache, LogLevel::Debug, || {
                    format!(
                        "Evicted sheet {} (last access {}, {} accesses)",
                        index, entry.last_access, entry.access_count
                    )
                });
            }
        }
    }
}

/// Cache statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub len: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct GraphicsSheetCache {
    source: Arc<dyn GraphicsSheetSource>,
    inner: Mutex<Inner>,
}

impl GraphicsSheetCache {
    pub fn new(source: Arc<dyn GraphicsSheetSource>, capacity: usize) -> Self {
        Self {
            source,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                capacity,
                tick: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    pub fn with_default_capacity(source: Arc<dyn GraphicsSheetSource>) -> Self {
        Self::new(source, DEFAULT_CAPACITY)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch a sheet, loading it from the source on a miss.
    ///
    /// `InvalidArgument` for indices outside `0..223`, `NotFound` when the
    /// source has no sheet for the index.
    pub fn get(&self, index: usize) -> Result<Arc<IndexedBitmap>> {
        if index >= SHEET_COUNT {
            return Err(DungeonError::InvalidArgument(format!(
                "sheet index {} outside [0, {})",
                index, SHEET_COUNT
            )));
        }

        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;

        if let Some(entry) = inner.entries.get_mut(&index) {
            entry.last_access = tick;
            entry.access_count += 1;
            let sheet = Arc::clone(&entry.sheet);
            inner.hits += 1;
            return Ok(sheet);
        }

        inner.misses += 1;
        let sheet = self
            .source
            .sheet(index)
            .map(Arc::new)
            .ok_or_else(|| DungeonError::NotFound(format!("graphics sheet {}", index)))?;

        log(LogCategory::Cache, LogLevel::Trace, || {
            format!(
                "Loaded sheet {} ({}x{})",
                index,
                sheet.width(),
                sheet.height()
            )
        });

        inner.entries.insert(
            index,
            CacheEntry {
                sheet: Arc::clone(&sheet),
                last_access: tick,
                access_count: 1,
            },
        );
        let capacity = inner.capacity;
        inner.evict_to(capacity);
        Ok(sheet)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.lock().entries.contains_key(&index)
    }

    /// Sorted indices of the resident sheets.
    pub fn resident(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.lock().entries.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Change the capacity, evicting least recently used sheets to fit.
    pub fn set_capacity(&self, capacity: usize) {
        let mut inner = self.lock();
        inner.capacity = capacity;
        inner.evict_to(capacity);
    }

    /// Drop every cached sheet. Counters are kept.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            len: inner.entries.len(),
            capacity: inner.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sheets 0..limit exist; each is 8x8 filled with its index.
    struct CountingSource {
        limit: usize,
        loads: AtomicUsize,
    }

    impl CountingSource {
        fn new(limit: usize) -> Arc<Self> {
            Arc::new(Self {
                limit,
                loads: AtomicUsize::new(0),
            })
        }
    }

    impl GraphicsSheetSource for CountingSource {
        fn sheet(&self, index: usize) -> Option<IndexedBitmap> {
            if index >= self.limit {
                return None;
            }
            self.loads.fetch_add(1, Ordering::Relaxed);
            let mut bmp = IndexedBitmap::new(8, 8);
            bmp.fill(index as u8);
            Some(bmp)
        }
    }

    #[test]
    fn test_hit_and_miss_counters() {
        let source = CountingSource::new(10);
        let cache = GraphicsSheetCache::new(source.clone(), 4);

        let a = cache.get(3).unwrap();
        let b = cache.get(3).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.get(0, 0), Some(3));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.len, 1);
        assert_eq!(source.loads.load(Ordering::Relaxed), 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_index_validation() {
        let cache = GraphicsSheetCache::new(CountingSource::new(300), 4);
        assert!(matches!(cache.get(223), Err(DungeonError::InvalidArgument(_))));
        assert!(matches!(cache.get(300), Err(DungeonError::InvalidArgument(_))));
        assert!(cache.get(222).is_ok());
    }

    #[test]
    fn test_missing_sheet_not_found() {
        let cache = GraphicsSheetCache::new(CountingSource::new(2), 4);
        assert!(matches!(cache.get(5), Err(DungeonError::NotFound(_))));
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_lru_eviction_order() {
        let cache = GraphicsSheetCache::new(CountingSource::new(10), 3);
        cache.get(0).unwrap();
        cache.get(1).unwrap();
        cache.get(2).unwrap();
        // Touch 0 so 1 becomes the oldest
        cache.get(0).unwrap();
        cache.get(3).unwrap();

        assert_eq!(cache.resident(), vec![0, 2, 3]);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let cache = GraphicsSheetCache::new(CountingSource::new(50), 5);
        for i in [1usize, 7, 3, 1, 9, 22, 7, 40, 41, 42, 1, 3, 5, 8, 13, 21, 34] {
            cache.get(i).unwrap();
            assert!(cache.len() <= 5);
        }
        // Most recent access always survives
        assert!(cache.contains(34));
    }

    #[test]
    fn test_set_capacity_evicts_immediately() {
        let cache = GraphicsSheetCache::new(CountingSource::new(10), 8);
        for i in 0..6 {
            cache.get(i).unwrap();
        }
        cache.set_capacity(2);
        assert_eq!(cache.capacity(), 2);
        assert_eq!(cache.resident(), vec![4, 5]);
    }

    #[test]
    fn test_clear_keeps_counters() {
        let cache = GraphicsSheetCache::new(CountingSource::new(10), 8);
        cache.get(1).unwrap();
        cache.get(1).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn test_vec_source() {
        let sheets = vec![IndexedBitmap::new(128, 32)];
        let cache = GraphicsSheetCache::with_default_capacity(Arc::new(sheets));
        assert_eq!(cache.capacity(), DEFAULT_CAPACITY);
        assert_eq!(cache.get(0).unwrap().height(), 32);
        assert!(matches!(cache.get(1), Err(DungeonError::NotFound(_))));
    }
}
