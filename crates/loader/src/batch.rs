//! Batch functions: one bulk fetch for a whole window of keys.

use async_trait::async_trait;

use crate::{Key, LoadError, LoadResult};

/// The outcome of one batch call.
///
/// `Err` is the global-failure mode: the engine broadcasts the error to
/// every key in the window. `Ok` must contain exactly one result per
/// unique key, aligned with the input order; per-key `Err`s express
/// partial failures such as "not found" without touching sibling keys.
pub type BatchResult<V> = Result<Vec<LoadResult<V>>, LoadError>;

/// A function `(unique keys) -> (results aligned to unique keys)` that
/// performs exactly one bulk fetch for the whole set.
#[async_trait]
pub trait BatchFn<K: Key, V: Clone + Send + Sync + 'static>: Send + Sync + 'static {
    async fn load(&self, keys: &[K]) -> BatchResult<V>;
}
