//! The bulk-read/write contract every batch function is expressed in.

use async_trait::async_trait;
use common::{AddressId, OptionId, OptionValueId, ProductId, TransactionId, UserId, VariantId};

use crate::Result;
use crate::rows::{
    Address, Product, ProductOption, ProductOptionValue, ProductVariant, Transaction,
    TransactionAddressInfo, TransactionLineItem, TransactionStatus, User, VariantOptionLink,
};

/// Core trait for relational-store implementations.
///
/// Reads are bulk by design: one call per id set or parent set, so a batch
/// function issues exactly one query per dispatch window. Unless a method
/// says otherwise, soft-deleted rows are filtered out.
#[async_trait]
pub trait Store: Send + Sync {
    // ---- bulk reads by id -------------------------------------------------

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    async fn products_by_slugs(&self, slugs: &[String]) -> Result<Vec<Product>>;

    /// One page of products, newest first.
    async fn product_page(&self, skip: i64, limit: i64, published_only: bool)
    -> Result<Vec<Product>>;

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>>;

    async fn variants_by_ids(&self, ids: &[VariantId]) -> Result<Vec<ProductVariant>>;

    /// Includes soft-deleted variants so settled transactions keep
    /// resolving their line items.
    async fn variants_by_ids_with_deleted(&self, ids: &[VariantId])
    -> Result<Vec<ProductVariant>>;

    async fn option_values_by_ids(&self, ids: &[OptionValueId])
    -> Result<Vec<ProductOptionValue>>;

    async fn addresses_by_ids(&self, ids: &[AddressId]) -> Result<Vec<Address>>;

    async fn transactions_by_ids(&self, ids: &[TransactionId]) -> Result<Vec<Transaction>>;

    // ---- bulk reads by parent ---------------------------------------------

    async fn options_for_products(&self, ids: &[ProductId]) -> Result<Vec<ProductOption>>;

    async fn option_values_for_options(&self, ids: &[OptionId])
    -> Result<Vec<ProductOptionValue>>;

    async fn variants_for_products(&self, ids: &[ProductId]) -> Result<Vec<ProductVariant>>;

    async fn variant_links_for_variants(&self, ids: &[VariantId])
    -> Result<Vec<VariantOptionLink>>;

    async fn variant_links_for_product(&self, id: ProductId) -> Result<Vec<VariantOptionLink>>;

    async fn addresses_for_users(&self, ids: &[UserId]) -> Result<Vec<Address>>;

    async fn transactions_for_users(&self, ids: &[UserId]) -> Result<Vec<Transaction>>;

    async fn line_items_for_transactions(
        &self,
        ids: &[TransactionId],
    ) -> Result<Vec<TransactionLineItem>>;

    async fn address_info_for_transactions(
        &self,
        ids: &[TransactionId],
    ) -> Result<Vec<TransactionAddressInfo>>;

    async fn statuses_for_transactions(
        &self,
        ids: &[TransactionId],
    ) -> Result<Vec<TransactionStatus>>;

    // ---- writes ------------------------------------------------------------

    /// Inserts return the stored row with its assigned id.
    async fn insert_address(&self, address: Address) -> Result<Address>;

    async fn insert_transaction(&self, transaction: Transaction) -> Result<Transaction>;

    async fn insert_status(&self, status: TransactionStatus) -> Result<TransactionStatus>;

    async fn insert_address_info(
        &self,
        info: TransactionAddressInfo,
    ) -> Result<TransactionAddressInfo>;

    async fn insert_line_item(&self, item: TransactionLineItem) -> Result<TransactionLineItem>;

    async fn update_transaction_gateway_id(
        &self,
        id: TransactionId,
        gateway_id: &str,
    ) -> Result<()>;

    async fn update_transaction_label_id(&self, id: TransactionId, label_id: &str) -> Result<()>;

    // ---- lifecycle deletes -------------------------------------------------

    /// Normal-lifecycle removal: the row is timestamped and filtered from
    /// catalog reads, but stays resolvable with the `_with_deleted` select.
    async fn soft_delete_variant(&self, id: VariantId) -> Result<()>;

    /// Compensation-only removal: the row is gone for every reader.
    async fn hard_delete_transaction(&self, id: TransactionId) -> Result<()>;

    async fn hard_delete_status(&self, id: i64) -> Result<()>;

    async fn hard_delete_address_info(&self, id: i64) -> Result<()>;

    async fn hard_delete_line_item(&self, id: i64) -> Result<()>;

    async fn hard_delete_address(&self, id: AddressId) -> Result<()>;
}
