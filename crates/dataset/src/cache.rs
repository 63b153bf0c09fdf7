//! Process-lifetime cache of decoded partitions.
//!
//! Partitions are large and expensive to fetch and decode, so each one is
//! loaded at most once per process. Entries are never evicted or replaced:
//! the set of partitions is small and fixed by configuration.
//!
//! Concurrent requests for the same uncached partition share one load. A
//! failed load leaves the entry empty, so the next request loads again.

use metrics::counter;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

use slice_common::SliceError;

use crate::source::DatasetSource;
use crate::types::Dataset;

type Slot = Arc<OnceCell<Arc<Dataset>>>;

/// Statistics for the dataset cache.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Loads actually issued to the source.
    pub loads: u64,
    pub load_failures: u64,
    /// Partitions currently held.
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Memoizes decoded partitions by source identifier.
pub struct DatasetCache {
    source: Arc<dyn DatasetSource>,
    slots: Mutex<HashMap<String, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
}

impl DatasetCache {
    pub fn new(source: Arc<dyn DatasetSource>) -> Self {
        Self {
            source,
            slots: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            load_failures: AtomicU64::new(0),
        }
    }

    /// Return the partition for `source_id`, loading it on first use.
    ///
    /// A second caller arriving while a load for the same id is in flight
    /// waits for that load instead of starting its own.
    #[instrument(skip(self))]
    pub async fn get_or_load(&self, source_id: &str) -> Result<Arc<Dataset>, SliceError> {
        let slot = self.slot(source_id);

        if let Some(dataset) = slot.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            counter!("dataset_cache_hits_total").increment(1);
            return Ok(Arc::clone(dataset));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("dataset_cache_misses_total").increment(1);

        let dataset = slot
            .get_or_try_init(|| async {
                self.loads.fetch_add(1, Ordering::Relaxed);
                counter!("dataset_loads_total").increment(1);
                debug!("Loading partition");

                match self.source.load(source_id).await {
                    Ok(dataset) => Ok(Arc::new(dataset)),
                    Err(e) => {
                        self.load_failures.fetch_add(1, Ordering::Relaxed);
                        counter!("dataset_load_failures_total").increment(1);
                        warn!(error = %e, "Partition load failed");
                        Err(e.into_slice_error(source_id))
                    }
                }
            })
            .await?;

        Ok(Arc::clone(dataset))
    }

    /// Return the partition only if it is already loaded.
    pub fn get_cached(&self, source_id: &str) -> Option<Arc<Dataset>> {
        let slots = self.slots.lock().expect("dataset cache lock poisoned");
        slots
            .get(source_id)
            .and_then(|slot| slot.get())
            .map(Arc::clone)
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.get_cached(source_id).is_some()
    }

    /// Number of loaded partitions.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().expect("dataset cache lock poisoned");
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    fn slot(&self, source_id: &str) -> Slot {
        let mut slots = self.slots.lock().expect("dataset cache lock poisoned");
        Arc::clone(slots.entry(source_id.to_string()).or_default())
    }
}
