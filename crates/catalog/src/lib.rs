//! Catalog batch functions, typed keys, and the per-request
//! [`LoaderRegistry`].
//!
//! Each batch function performs one bulk fetch for its dispatch window and,
//! where another loader will want the same rows later in the request,
//! primes it opportunistically (a product page seeds the by-id and by-slug
//! point lookups). The registry holds one strongly-typed loader per batch
//! function and is built fresh for every inbound operation.

pub mod cart;
pub mod keys;
pub mod product;
pub mod registry;
pub mod shipping;
pub mod taxes;
pub mod transaction;
pub mod user;
pub mod variant;

pub use cart::{INVALID_QUANTITY, MISMATCHED_VARIANTS, SubtotalBatch};
pub use keys::{
    AddressKey, CartEntry, CartKey, DEFAULT_PAGE_SIZE, EstimationKey, PaginationKey,
    SelectedOptionsKey,
};
pub use registry::LoaderRegistry;
pub use shipping::ShippingEstimate;
