//! Result cache: process-wide memoization of store reads and derived tables.
//!
//! Entries live until [`ResultCache::invalidate_all`]; there is no expiry and
//! no partial invalidation. Concurrent sessions share one cache, so a refresh
//! from any session is visible to all of them.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::pipeline::join::JoinSpec;
use crate::store::Collection;

/// Logical identity of a cached result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Collection(Collection),
    ConversationTable,
    FeedbackTable,
    Merged(JoinSpec),
}

type Entry = Arc<dyn Any + Send + Sync>;

/// Hit/miss counters since process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

/// Memoizes results keyed by [`CacheKey`].
#[derive(Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<CacheKey, Entry>>,
    /// Bumped by every invalidation; results computed under an older
    /// generation are returned to their caller but never stored.
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Return the cached value for `key`, or run `producer` and cache its
    /// result. Errors are returned as-is and never cached.
    ///
    /// Two sessions missing on the same key at once may both run the
    /// producer; reads are idempotent so the last writer wins.
    pub async fn get_or_compute<T, E, F, Fut>(&self, key: CacheKey, producer: F) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let cached = self.entries.read().await.get(&key).cloned();
        if let Some(entry) = cached {
            if let Ok(value) = entry.downcast::<T>() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = ?key, "Cache hit");
                return Ok(value);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = ?key, "Cache miss");
        let generation = self.generation.load(Ordering::SeqCst);
        let value = Arc::new(producer().await?);

        let mut entries = self.entries.write().await;
        if self.generation.load(Ordering::SeqCst) == generation {
            entries.insert(key, Arc::clone(&value) as Entry);
        } else {
            debug!(key = ?key, "Cache invalidated during computation, result not stored");
        }
        Ok(value)
    }

    /// Drop every entry.
    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        let dropped = entries.len();
        entries.clear();
        self.generation.fetch_add(1, Ordering::SeqCst);
        info!(dropped, "Result cache invalidated");
    }

    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.read().await.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.generation.load(Ordering::SeqCst),
        }
    }
}
