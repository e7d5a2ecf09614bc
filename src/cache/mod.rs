//! In-process TTL cache with single-flight loading
//!
//! The cache sits between the aggregation engine and the upstream client:
//! - Hit with remaining TTL: the cached value is returned, the loader is not called
//! - Miss or expiry: the loader runs once per key, concurrent callers for the same
//!   key await that one in-flight load
//! - Expiry is evaluated lazily on read; [`TtlCache::invalidate`] and
//!   [`TtlCache::clear`] drop entries on demand
//! - Loader failures are not cached. Whether an expired value may stand in for a
//!   failed reload is decided by [`StalePolicy`]
//!
//! The registry lock is held only while the key map is inspected or mutated,
//! never while a load is running.
//!
//! # Example
//!
//! ```rust,ignore
//! use freerooms::cache::{StalePolicy, TtlCache};
//! use std::time::Duration;
//!
//! let cache: TtlCache<String, Arc<Vec<ScheduleEntry>>, UpstreamError> =
//!     TtlCache::new(StalePolicy::Propagate);
//! let entries = cache
//!     .get(group.id.clone(), Duration::from_secs(120), move || async move {
//!         source.fetch_schedule(&group).await.map(Arc::new)
//!     })
//!     .await?;
//! ```

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// What a failed reload returns when an expired value is still held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Return the loader's error to the caller
    #[default]
    Propagate,
    /// Return the expired value instead of the error, when one exists
    ServeStale,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from a fresh entry
    pub hits: u64,
    /// Reads that started a new load
    pub misses: u64,
    /// Reads that awaited a load started by another caller
    pub joined: u64,
    /// Failed reloads answered with an expired value
    pub stale_served: u64,
    /// Keys currently holding a value (fresh or expired)
    pub entries: usize,
}

impl CacheStats {
    /// Fraction of reads that did not start a load
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.joined;
        if total == 0 {
            0.0
        } else {
            (self.hits + self.joined) as f64 / total as f64
        }
    }
}

type SharedLoad<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

struct Cached<V> {
    value: V,
    expires_at: Instant,
}

struct InFlight<V, E> {
    generation: u64,
    load: SharedLoad<V, E>,
}

struct Slot<V, E> {
    value: Option<Cached<V>>,
    in_flight: Option<InFlight<V, E>>,
}

impl<V, E> Slot<V, E> {
    fn empty() -> Self {
        Self {
            value: None,
            in_flight: None,
        }
    }
}

struct Inner<K, V, E> {
    slots: Mutex<HashMap<K, Slot<V, E>>>,
    policy: StalePolicy,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    joined: AtomicU64,
    stale_served: AtomicU64,
}

impl<K, V, E> Inner<K, V, E>
where
    K: Eq + Hash,
    V: Clone,
{
    fn lock(&self) -> MutexGuard<'_, HashMap<K, Slot<V, E>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the outcome of load `generation`; a newer load or an invalidation wins
    fn complete(&self, key: &K, generation: u64, result: &Result<V, E>, ttl: Duration) {
        let mut slots = self.lock();
        let Some(slot) = slots.get_mut(key) else {
            return;
        };
        if slot.in_flight.as_ref().map(|f| f.generation) != Some(generation) {
            return;
        }
        slot.in_flight = None;

        if let Ok(value) = result {
            slot.value = Some(Cached {
                value: value.clone(),
                expires_at: Instant::now() + ttl,
            });
        } else if slot.value.is_none() {
            slots.remove(key);
        }
    }

    fn stale_value(&self, key: &K) -> Option<V> {
        self.lock()
            .get(key)
            .and_then(|slot| slot.value.as_ref())
            .map(|cached| cached.value.clone())
    }
}

/// Thread-safe expiry-based cache that deduplicates concurrent loads per key
///
/// Cloning is cheap; clones share the same entries.
pub struct TtlCache<K, V, E> {
    inner: Arc<Inner<K, V, E>>,
}

impl<K, V, E> Clone for TtlCache<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, E> TtlCache<K, V, E>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + std::fmt::Display + Send + Sync + 'static,
{
    /// Create an empty cache with the given failure policy
    pub fn new(policy: StalePolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                policy,
                generation: AtomicU64::new(0),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                joined: AtomicU64::new(0),
                stale_served: AtomicU64::new(0),
            }),
        }
    }

    /// The failure policy this cache was built with
    pub fn policy(&self) -> StalePolicy {
        self.inner.policy
    }

    /// Get the value for `key`, loading it with `loader` on a miss or expiry
    ///
    /// `loader` is invoked at most once per miss even when many callers ask for
    /// the same key at the same time; it only has to build the future, the I/O
    /// happens when the future is polled. The load is driven by a spawned task,
    /// so it completes and fills the cache even if every caller stops waiting.
    pub async fn get<F, Fut>(&self, key: K, ttl: Duration, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let load = {
            let mut slots = self.inner.lock();
            let slot = slots.entry(key.clone()).or_insert_with(Slot::empty);

            if let Some(cached) = &slot.value {
                if Instant::now() < cached.expires_at {
                    self.inner.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(cached.value.clone());
                }
            }

            match &slot.in_flight {
                Some(in_flight) => {
                    self.inner.joined.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(key = ?key, "Joining in-flight load");
                    in_flight.load.clone()
                }
                None => {
                    self.inner.misses.fetch_add(1, Ordering::Relaxed);
                    let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
                    let inner = Arc::clone(&self.inner);
                    let completion_key = key.clone();
                    let fetch = loader();

                    let load = async move {
                        let result = fetch.await;
                        inner.complete(&completion_key, generation, &result, ttl);
                        result
                    }
                    .boxed()
                    .shared();

                    slot.in_flight = Some(InFlight {
                        generation,
                        load: load.clone(),
                    });
                    tokio::spawn(load.clone());
                    tracing::trace!(key = ?key, generation, "Started load");
                    load
                }
            }
        };

        match load.await {
            Ok(value) => Ok(value),
            Err(error) => {
                if self.inner.policy == StalePolicy::ServeStale {
                    if let Some(stale) = self.inner.stale_value(&key) {
                        self.inner.stale_served.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(key = ?key, error = %error, "Load failed, serving stale value");
                        return Ok(stale);
                    }
                }
                Err(error)
            }
        }
    }

    /// Drop the entry for `key`; an in-flight load for it will not be stored
    pub fn invalidate(&self, key: &K) {
        self.inner.lock().remove(key);
    }

    /// Drop every entry; in-flight loads will not be stored
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Number of keys holding a value, fresh or expired
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .values()
            .filter(|slot| slot.value.is_some())
            .count()
    }

    /// Returns true if no key holds a value
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            joined: self.inner.joined.load(Ordering::Relaxed),
            stale_served: self.inner.stale_served.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
