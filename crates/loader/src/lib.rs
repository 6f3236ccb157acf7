//! Per-request batched-load cache.
//!
//! A [`Loader`] wraps one [`BatchFn`] with a request-scoped cache and a
//! dispatch window: every not-yet-cached key requested while the current
//! task set is still issuing loads is fetched in a single bulk call, and
//! the per-key results fan out to every waiter, duplicates included.
//!
//! Loaders are built fresh for each inbound operation and must never be
//! shared across requests; [`Loader::clear_all`] evicts the cache after
//! mutations so subsequent reads see fresh data.

pub mod batch;
pub mod error;
pub mod key;
pub mod loader;

pub use batch::{BatchFn, BatchResult};
pub use error::{LoadError, LoadResult};
pub use key::Key;
pub use loader::{Loader, LoaderSlot};
