//! Keyed trailing-edge debounce
//!
//! Each key holds at most one pending value. Scheduling a key again replaces
//! the value and restarts its quiet period, so exactly one flush happens per
//! burst of writes. Flushes run on spawned tokio tasks and never block the
//! caller.
//!
//! Flushes of one key are serialized by a per-key async lock. [`Debouncer::flush_now`]
//! takes that lock too, so when it returns no flush of the key is in flight.

use dashmap::DashMap;
use futures::future::BoxFuture;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

type KeyLocks<K> = DashMap<K, Arc<Mutex<()>>>;

fn key_lock<K: Eq + Hash + Clone>(locks: &KeyLocks<K>, key: &K) -> Arc<Mutex<()>> {
    locks.entry(key.clone()).or_default().value().clone()
}

/// Callback invoked with the last value of a key once it goes quiet
pub type FlushFn<K, V> = Arc<dyn Fn(K, V) -> BoxFuture<'static, ()> + Send + Sync>;

struct Pending<V> {
    value: V,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl<V> Pending<V> {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Keyed debouncer with cancel-and-reschedule semantics
pub struct Debouncer<K, V> {
    quiet: Duration,
    flush: FlushFn<K, V>,
    pending: Arc<DashMap<K, Pending<V>>>,
    locks: Arc<KeyLocks<K>>,
    generation: AtomicU64,
}

impl<K, V> Debouncer<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Create debouncer with `quiet` period and `flush` callback
    #[must_use]
    pub fn new(quiet: Duration, flush: FlushFn<K, V>) -> Self {
        Self {
            quiet,
            flush,
            pending: Arc::new(DashMap::new()),
            locks: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Quiet period
    #[inline]
    #[must_use]
    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Replace the pending value for `key` and restart its quiet period
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, key: K, value: V) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(mut previous) = self.pending.insert(
            key.clone(),
            Pending {
                value,
                generation,
                timer: None,
            },
        ) {
            previous.cancel_timer();
        }

        let pending = Arc::clone(&self.pending);
        let locks = Arc::clone(&self.locks);
        let flush = Arc::clone(&self.flush);
        let quiet = self.quiet;
        let timer_key = key.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            let lock = key_lock(&locks, &timer_key);
            let _in_flight = lock.lock().await;
            let due = pending.remove_if(&timer_key, |_, p| p.generation == generation);
            if let Some((key, entry)) = due {
                flush(key, entry.value).await;
            }
        });

        // The timer may already have fired for a zero quiet period
        match self.pending.get_mut(&key) {
            Some(mut entry) if entry.generation == generation => entry.timer = Some(timer),
            _ => drop(timer),
        }
    }

    /// Flush `key` immediately if it has a pending value; true if flushed
    ///
    /// Waits for a flush of `key` already in flight, whether or not a value
    /// is pending.
    pub async fn flush_now(&self, key: &K) -> bool {
        let lock = key_lock(&self.locks, key);
        let _in_flight = lock.lock().await;
        let Some((key, mut entry)) = self.pending.remove(key) else {
            return false;
        };
        entry.cancel_timer();
        (self.flush)(key, entry.value).await;
        true
    }

    /// Flush every pending key and wait out in-flight ones; returns how many
    /// were flushed
    pub async fn flush_all(&self) -> usize {
        let keys: Vec<K> = self.locks.iter().map(|e| e.key().clone()).collect();
        let mut flushed = 0;
        for key in keys {
            if self.flush_now(&key).await {
                flushed += 1;
            }
        }
        flushed
    }

    /// Drop the pending value for `key` without flushing
    pub fn cancel(&self, key: &K) -> Option<V> {
        self.pending.remove(key).map(|(_, mut entry)| {
            entry.cancel_timer();
            entry.value
        })
    }

    /// Number of keys waiting for their quiet period to end
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// True if `key` has a pending value
    #[inline]
    #[must_use]
    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }
}

impl<K, V> std::fmt::Debug for Debouncer<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("quiet", &self.quiet)
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
