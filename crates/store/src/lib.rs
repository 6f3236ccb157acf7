//! Relational-store collaborator.
//!
//! Everything the core reads or writes goes through the [`Store`] trait:
//! bulk selects by id set or parent set, a page select, the saga's inserts,
//! and the soft/hard delete pair. [`InMemoryStore`] backs the test suites
//! (with failure injection); [`PostgresStore`] runs against a provisioned
//! schema.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod rows;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use rows::{
    Address, Product, ProductOption, ProductOptionValue, ProductVariant, Transaction,
    TransactionAddressInfo, TransactionLineItem, TransactionStatus, User, VariantOptionLink,
    STATUS_RECEIVED, STATUS_SHIPPED,
};
pub use store::Store;
