use crate::config::AppConfig;
use crate::models::CacheStatsResponse;
use crate::ribo::{self, RiboError, RiboHandle};
use log::{debug, info};
use moka::sync::Cache;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const RESPONSE_CAPACITY: u64 = 128;
const RIBO_CAPACITY: u64 = 64;
const SEQUENCE_CAPACITY: u64 = 128;

/// Transcript sequences keyed by display name.
pub type SequenceMap = HashMap<String, String>;

type RiboKey = (String, String);
type SequenceKey = (i32, String, String);

/// In-process TTL memoization of rendered API responses, opened ribo files
/// and reference sequences. Two concurrent misses may both compute the
/// value; the later insert wins.
pub struct CacheService {
    responses: Cache<String, Arc<Vec<u8>>>,
    ribo_handles: Cache<RiboKey, Arc<RiboHandle>>,
    sequences: Cache<SequenceKey, Arc<SequenceMap>>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    // Bumped by every invalidation; renders started earlier are not cached
    generation: AtomicU64,
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("hit_count", &self.hit_count)
            .field("miss_count", &self.miss_count)
            .finish()
    }
}

impl CacheService {
    pub fn new(config: &AppConfig) -> Self {
        info!(
            "Cache TTLs: responses={}s, ribo={}s, sequences={}s",
            config.api_cache_ttl_secs, config.ribo_cache_ttl_secs, config.sequence_cache_ttl_secs
        );

        Self {
            responses: Cache::builder()
                .max_capacity(RESPONSE_CAPACITY)
                .time_to_live(Duration::from_secs(config.api_cache_ttl_secs))
                .build(),
            ribo_handles: Cache::builder()
                .max_capacity(RIBO_CAPACITY)
                .time_to_live(Duration::from_secs(config.ribo_cache_ttl_secs))
                .build(),
            sequences: Cache::builder()
                .max_capacity(SEQUENCE_CAPACITY)
                .time_to_live(Duration::from_secs(config.sequence_cache_ttl_secs))
                .build(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    fn record(&self, hit: bool) {
        let counter = if hit { &self.hit_count } else { &self.miss_count };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// A rendered response for a full request path, query included.
    pub fn get_response(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        let cached = self.responses.get(key);
        self.record(cached.is_some());
        cached
    }

    /// Current invalidation generation. Read it before computing a response
    /// and hand it to [`CacheService::insert_response`].
    pub fn response_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Caches a rendered response computed during `generation`. A response
    /// that raced with an invalidation is dropped.
    pub fn insert_response(&self, key: String, body: Arc<Vec<u8>>, generation: u64) {
        if self.response_generation() != generation {
            debug!("Not caching {key}: invalidated while rendering");
            return;
        }

        self.responses.insert(key.clone(), body);
        if self.response_generation() != generation {
            self.responses.invalidate(&key);
        }
    }

    /// Opens the ribo file at `path` through the cache.
    pub fn ribo_handle(
        &self,
        path: &str,
        transcript_regex: &str,
    ) -> Result<Arc<RiboHandle>, RiboError> {
        let key = (path.to_string(), transcript_regex.to_string());
        if let Some(handle) = self.ribo_handles.get(&key) {
            self.record(true);
            return Ok(handle);
        }

        self.record(false);
        let handle = Arc::new(RiboHandle::new(ribo::open(path)?, transcript_regex)?);
        self.ribo_handles.insert(key, Arc::clone(&handle));
        Ok(handle)
    }

    /// Sequences of a reference as seen through one ribo file's aliases,
    /// loaded with `load` on a miss.
    pub fn sequences<E>(
        &self,
        reference_id: i32,
        ribo_path: &str,
        transcript_regex: &str,
        load: impl FnOnce() -> Result<SequenceMap, E>,
    ) -> Result<Arc<SequenceMap>, E> {
        let key = (
            reference_id,
            ribo_path.to_string(),
            transcript_regex.to_string(),
        );
        if let Some(sequences) = self.sequences.get(&key) {
            self.record(true);
            return Ok(sequences);
        }

        self.record(false);
        let sequences = Arc::new(load()?);
        self.sequences.insert(key, Arc::clone(&sequences));
        Ok(sequences)
    }

    /// Drops all rendered responses. Called after every mutation.
    pub fn invalidate_responses(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.responses.invalidate_all();
        debug!("Response cache invalidated");
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.responses.invalidate_all();
        self.ribo_handles.invalidate_all();
        self.sequences.invalidate_all();
        self.hit_count.store(0, Ordering::Relaxed);
        self.miss_count.store(0, Ordering::Relaxed);
        info!("All caches cleared");
    }

    pub fn stats(&self) -> CacheStatsResponse {
        self.responses.run_pending_tasks();
        self.ribo_handles.run_pending_tasks();
        self.sequences.run_pending_tasks();

        let hit_count = self.hit_count.load(Ordering::Relaxed);
        let miss_count = self.miss_count.load(Ordering::Relaxed);
        let total = hit_count + miss_count;

        CacheStatsResponse {
            response_entries: self.responses.entry_count(),
            ribo_entries: self.ribo_handles.entry_count(),
            sequence_entries: self.sequences.entry_count(),
            hit_count,
            miss_count,
            hit_rate: if total > 0 {
                hit_count as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}
