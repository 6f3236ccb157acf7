//! Shared value types for the catalog/checkout core.

pub mod auth;
pub mod ids;
pub mod money;

pub use auth::{Claims, Role};
pub use ids::{AddressId, OptionId, OptionValueId, ProductId, TransactionId, UserId, VariantId};
pub use money::{Money, MoneyParseError};
