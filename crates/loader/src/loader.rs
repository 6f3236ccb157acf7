//! The loader engine: per-request cache plus window dispatch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, Weak};

use futures_util::future::join_all;
use tokio::sync::{mpsc, oneshot};

use crate::{BatchFn, Key, LoadError, LoadResult};

/// A batched, deduplicating, per-request cache over one [`BatchFn`].
///
/// Handles are cheap to clone and share one cache. A loader must be
/// created inside a tokio runtime; dropping every handle stops its
/// dispatcher task.
pub struct Loader<K: Key, V: Clone + Send + Sync + 'static> {
    shared: Arc<Shared<K, V>>,
}

impl<K: Key, V: Clone + Send + Sync + 'static> Clone for Loader<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<K: Key, V: Clone + Send + Sync + 'static> {
    name: &'static str,
    cache: Mutex<HashMap<String, Entry<V>>>,
    queue: mpsc::UnboundedSender<Job<K, V>>,
}

enum Entry<V> {
    /// Scheduled in the current window or in flight.
    Pending(Arc<Slot<V>>),
    /// Cached until the next `clear_all`.
    Resolved(LoadResult<V>),
}

struct Job<K, V> {
    key: K,
    canonical: String,
    slot: Arc<Slot<V>>,
}

/// Single-resolution cell fanned out to every waiter for one canonical key.
struct Slot<V> {
    state: Mutex<SlotState<V>>,
}

enum SlotState<V> {
    Waiting(Vec<oneshot::Sender<LoadResult<V>>>),
    Done(LoadResult<V>),
}

impl<V: Clone> Slot<V> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Waiting(Vec::new())),
        }
    }

    fn subscribe(&self) -> oneshot::Receiver<LoadResult<V>> {
        let (tx, rx) = oneshot::channel();
        let mut state = self.state.lock().unwrap();
        match &mut *state {
            SlotState::Waiting(waiters) => waiters.push(tx),
            SlotState::Done(result) => {
                let _ = tx.send(result.clone());
            }
        }
        rx
    }

    fn resolve(&self, result: LoadResult<V>) {
        let previous = {
            let mut state = self.state.lock().unwrap();
            std::mem::replace(&mut *state, SlotState::Done(result.clone()))
        };
        if let SlotState::Waiting(waiters) = previous {
            for waiter in waiters {
                let _ = waiter.send(result.clone());
            }
        }
    }
}

impl<K: Key, V: Clone + Send + Sync + 'static> Loader<K, V> {
    /// Creates a loader over `batch` and spawns its dispatcher.
    ///
    /// `name` labels the loader's metrics and log lines.
    pub fn new<B: BatchFn<K, V>>(name: &'static str, batch: B) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            name,
            cache: Mutex::new(HashMap::new()),
            queue: tx,
        });
        tokio::spawn(dispatch(name, rx, batch, Arc::downgrade(&shared)));
        Self { shared }
    }

    /// Registers interest in `key` and resolves to its Result.
    ///
    /// An equal key (by canonical string) that is already cached or already
    /// scheduled in the current window creates no new unit of work; the
    /// caller receives the same eventual Result.
    pub async fn load(&self, key: K) -> LoadResult<V> {
        metrics::counter!("loader_loads_total", "loader" => self.shared.name).increment(1);
        let canonical = key.canonical();
        let rx = {
            let mut cache = self.shared.cache.lock().unwrap();
            match cache.get(&canonical) {
                Some(Entry::Resolved(result)) => {
                    metrics::counter!("loader_cache_hits_total", "loader" => self.shared.name)
                        .increment(1);
                    return result.clone();
                }
                Some(Entry::Pending(slot)) => slot.subscribe(),
                None => {
                    let slot = Arc::new(Slot::new());
                    let rx = slot.subscribe();
                    cache.insert(canonical.clone(), Entry::Pending(Arc::clone(&slot)));
                    let job = Job {
                        key,
                        canonical: canonical.clone(),
                        slot,
                    };
                    if self.shared.queue.send(job).is_err() {
                        cache.remove(&canonical);
                        return Err(LoadError::Aborted);
                    }
                    rx
                }
            }
        };
        rx.await.unwrap_or(Err(LoadError::Aborted))
    }

    /// Vectorized [`Loader::load`]: output order matches input order
    /// exactly, including duplicate keys.
    pub async fn load_many(&self, keys: Vec<K>) -> Vec<LoadResult<V>> {
        join_all(keys.into_iter().map(|key| self.load(key))).await
    }

    /// Inserts a value as if it had been loaded, without invoking the
    /// batch function.
    ///
    /// Priming fills cache misses only: an existing resolved or pending
    /// entry for the canonical key is left untouched.
    pub fn prime(&self, key: &K, value: V) {
        let canonical = key.canonical();
        let mut cache = self.shared.cache.lock().unwrap();
        cache
            .entry(canonical)
            .or_insert_with(|| Entry::Resolved(Ok(value)));
    }

    /// Evicts every cache entry for this loader.
    ///
    /// Waiters on an in-flight batch still resolve, but the late result is
    /// not written back into the cleared cache.
    pub fn clear_all(&self) {
        self.shared.cache.lock().unwrap().clear();
    }

    /// Number of cached (pending or resolved) canonical keys.
    pub fn cached_len(&self) -> usize {
        self.shared.cache.lock().unwrap().len()
    }
}

async fn dispatch<K, V, B>(
    name: &'static str,
    mut queue: mpsc::UnboundedReceiver<Job<K, V>>,
    batch: B,
    shared: Weak<Shared<K, V>>,
) where
    K: Key,
    V: Clone + Send + Sync + 'static,
    B: BatchFn<K, V>,
{
    while let Some(first) = queue.recv().await {
        // Window: let every task currently issuing loads enqueue before
        // draining, then fetch the whole set at once. Loads arriving during
        // the batch call form the next window.
        tokio::task::yield_now().await;

        let mut jobs = vec![first];
        while let Ok(job) = queue.try_recv() {
            jobs.push(job);
        }

        // Coalesce by canonical string. Distinct jobs for one canonical key
        // only occur when clear_all evicted a pending entry mid-window; they
        // still share the single batch result.
        let mut order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, Vec<Job<K, V>>> = HashMap::new();
        for job in jobs {
            let bucket = grouped.entry(job.canonical.clone()).or_default();
            if bucket.is_empty() {
                order.push(job.canonical.clone());
            }
            bucket.push(job);
        }

        let keys: Vec<K> = order
            .iter()
            .map(|canonical| grouped[canonical][0].key.clone())
            .collect();

        metrics::counter!("loader_batches_total", "loader" => name).increment(1);
        tracing::debug!(loader = name, keys = keys.len(), "dispatching batch");

        let results: Vec<LoadResult<V>> = match batch.load(&keys).await {
            Ok(results) if results.len() == keys.len() => results,
            Ok(results) => {
                let err = LoadError::ResultCountMismatch {
                    want: keys.len(),
                    got: results.len(),
                };
                tracing::error!(loader = name, %err, "batch invariant violated");
                vec![Err(err); keys.len()]
            }
            Err(err) => vec![Err(err); keys.len()],
        };

        let shared = shared.upgrade();
        for (canonical, result) in order.into_iter().zip(results) {
            if let Some(shared) = shared.as_ref() {
                let mut cache = shared.cache.lock().unwrap();
                // Write back only if a slot from this window is still the
                // live entry; clear_all may have evicted it mid-flight.
                let live = match cache.get(&canonical) {
                    Some(Entry::Pending(slot)) => grouped[&canonical]
                        .iter()
                        .any(|job| Arc::ptr_eq(slot, &job.slot)),
                    _ => false,
                };
                if live {
                    cache.insert(canonical.clone(), Entry::Resolved(result.clone()));
                }
            }
            for job in &grouped[&canonical] {
                job.slot.resolve(result.clone());
            }
        }
    }
}

/// Late-bound handle to a loader constructed after its user.
///
/// Batch functions that prime sibling loaders hold a slot instead of the
/// loader itself, so mutually-priming pairs (product-by-id and
/// product-by-slug) can be wired once both exist.
pub struct LoaderSlot<K: Key, V: Clone + Send + Sync + 'static> {
    inner: Arc<OnceLock<Loader<K, V>>>,
}

impl<K: Key, V: Clone + Send + Sync + 'static> Clone for LoaderSlot<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: Key, V: Clone + Send + Sync + 'static> Default for LoaderSlot<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, V: Clone + Send + Sync + 'static> LoaderSlot<K, V> {
    /// Creates an unwired slot.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(OnceLock::new()),
        }
    }

    /// Wires the slot. Later calls are ignored.
    pub fn set(&self, loader: Loader<K, V>) {
        let _ = self.inner.set(loader);
    }

    /// Primes the wired loader; a no-op until [`LoaderSlot::set`] runs.
    pub fn prime(&self, key: &K, value: V) {
        if let Some(loader) = self.inner.get() {
            loader.prime(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::batch::BatchResult;

    struct Doubler {
        calls: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<Vec<i64>>>>,
    }

    #[async_trait]
    impl BatchFn<i64, i64> for Doubler {
        async fn load(&self, keys: &[i64]) -> BatchResult<i64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(keys.to_vec());
            Ok(keys.iter().map(|key| Ok(key * 2)).collect())
        }
    }

    fn doubler() -> (Loader<i64, i64>, Arc<AtomicUsize>, Arc<Mutex<Vec<Vec<i64>>>>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let loader = Loader::new(
            "doubler",
            Doubler {
                calls: Arc::clone(&calls),
                seen: Arc::clone(&seen),
            },
        );
        (loader, calls, seen)
    }

    struct Flaky;

    #[async_trait]
    impl BatchFn<i64, i64> for Flaky {
        async fn load(&self, keys: &[i64]) -> BatchResult<i64> {
            Ok(keys
                .iter()
                .map(|key| {
                    if key % 2 == 0 {
                        Ok(*key)
                    } else {
                        Err(LoadError::NotFound(key.to_string()))
                    }
                })
                .collect())
        }
    }

    struct Broken;

    #[async_trait]
    impl BatchFn<i64, i64> for Broken {
        async fn load(&self, _keys: &[i64]) -> BatchResult<i64> {
            Err(LoadError::Validation("database down".to_string()))
        }
    }

    struct ShortChanged;

    #[async_trait]
    impl BatchFn<i64, i64> for ShortChanged {
        async fn load(&self, _keys: &[i64]) -> BatchResult<i64> {
            Ok(vec![Ok(1)])
        }
    }

    #[tokio::test]
    async fn concurrent_equal_keys_share_one_batch_call() {
        let (loader, calls, seen) = doubler();

        let (a, b, c) = tokio::join!(loader.load(7), loader.load(7), loader.load(9));
        assert_eq!(a.unwrap(), 14);
        assert_eq!(b.unwrap(), 14);
        assert_eq!(c.unwrap(), 18);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], vec![7, 9]);
    }

    #[tokio::test]
    async fn load_many_preserves_order_including_duplicates() {
        let (loader, calls, seen) = doubler();

        let results = loader.load_many(vec![1, 2, 1]).await;
        let values: Vec<i64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![2, 4, 2]);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(seen.lock().unwrap()[0], vec![1, 2]);
    }

    #[tokio::test]
    async fn repeat_loads_hit_the_cache() {
        let (loader, calls, _) = doubler();

        assert_eq!(loader.load(5).await.unwrap(), 10);
        assert_eq!(loader.load(5).await.unwrap(), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn prime_fills_misses_without_a_fetch() {
        let (loader, calls, _) = doubler();

        loader.prime(&3, 999);
        assert_eq!(loader.load(3).await.unwrap(), 999);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn prime_never_overwrites_a_resolved_entry() {
        let (loader, _, _) = doubler();

        assert_eq!(loader.load(4).await.unwrap(), 8);
        loader.prime(&4, 999);
        assert_eq!(loader.load(4).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn clear_all_forces_a_refetch() {
        let (loader, calls, _) = doubler();

        assert_eq!(loader.load(6).await.unwrap(), 12);
        loader.clear_all();
        assert_eq!(loader.cached_len(), 0);
        assert_eq!(loader.load(6).await.unwrap(), 12);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn global_failure_broadcasts_to_every_key() {
        let loader = Loader::new("broken", Broken);

        let results = loader.load_many(vec![1, 2, 3]).await;
        assert_eq!(results.len(), 3);
        for result in results {
            assert!(matches!(result, Err(LoadError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn partial_failures_stay_per_key() {
        let loader = Loader::new("flaky", Flaky);

        let results = loader.load_many(vec![2, 3, 4]).await;
        assert_eq!(results[0].as_ref().unwrap(), &2);
        assert!(matches!(results[1], Err(LoadError::NotFound(_))));
        assert_eq!(results[2].as_ref().unwrap(), &4);
    }

    #[tokio::test]
    async fn short_batches_resolve_to_count_mismatch() {
        let loader = Loader::new("short", ShortChanged);

        let results = loader.load_many(vec![1, 2]).await;
        for result in results {
            assert!(matches!(
                result,
                Err(LoadError::ResultCountMismatch { want: 2, got: 1 })
            ));
        }
    }

    #[tokio::test]
    async fn loader_slot_primes_once_wired() {
        let (loader, calls, _) = doubler();
        let slot: LoaderSlot<i64, i64> = LoaderSlot::new();

        // Unwired: silently ignored.
        slot.prime(&1, 100);

        slot.set(loader.clone());
        slot.prime(&1, 100);
        assert_eq!(loader.load(1).await.unwrap(), 100);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
