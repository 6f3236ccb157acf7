//! In-memory store implementation for testing.

use std::sync::Arc;

use async_trait::async_trait;
use common::{AddressId, OptionId, OptionValueId, ProductId, TransactionId, UserId, VariantId};
use tokio::sync::RwLock;

use crate::rows::{
    Address, Product, ProductOption, ProductOptionValue, ProductVariant, Transaction,
    TransactionAddressInfo, TransactionLineItem, TransactionStatus, User, VariantOptionLink,
};
use crate::store::Store;
use crate::{Result, StoreError};

#[derive(Default)]
struct Tables {
    products: Vec<Product>,
    options: Vec<ProductOption>,
    option_values: Vec<ProductOptionValue>,
    variants: Vec<ProductVariant>,
    variant_links: Vec<VariantOptionLink>,
    addresses: Vec<Address>,
    users: Vec<User>,
    transactions: Vec<Transaction>,
    statuses: Vec<TransactionStatus>,
    address_infos: Vec<TransactionAddressInfo>,
    line_items: Vec<TransactionLineItem>,
    next_id: i64,

    // Failure injection.
    fail_reads: bool,
    fail_insert_transaction: bool,
    fail_insert_status: bool,
    fail_insert_address_info: bool,
    /// Fail every line-item insert after this many have succeeded.
    line_item_failure_after: Option<usize>,
    line_items_inserted: usize,

    // Observation counters for batching/priming assertions.
    product_read_calls: usize,
    variant_read_calls: usize,
    page_read_calls: usize,
}

impl Tables {
    fn assign_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(())
    }
}

/// In-memory store implementation with the same contract as
/// [`crate::PostgresStore`], plus failure injection and observation
/// counters for the test suites.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    // ---- seeding -----------------------------------------------------------

    pub async fn seed_product(&self, product: Product) -> Product {
        let mut state = self.state.write().await;
        let mut product = product;
        product.id = ProductId::new(state.assign_id());
        state.products.push(product.clone());
        product
    }

    pub async fn seed_option(&self, option: ProductOption) -> ProductOption {
        let mut state = self.state.write().await;
        let mut option = option;
        option.id = OptionId::new(state.assign_id());
        state.options.push(option.clone());
        option
    }

    pub async fn seed_option_value(&self, value: ProductOptionValue) -> ProductOptionValue {
        let mut state = self.state.write().await;
        let mut value = value;
        value.id = OptionValueId::new(state.assign_id());
        state.option_values.push(value.clone());
        value
    }

    pub async fn seed_variant(&self, variant: ProductVariant) -> ProductVariant {
        let mut state = self.state.write().await;
        let mut variant = variant;
        variant.id = VariantId::new(state.assign_id());
        state.variants.push(variant.clone());
        variant
    }

    pub async fn seed_variant_link(&self, link: VariantOptionLink) -> VariantOptionLink {
        let mut state = self.state.write().await;
        state.variant_links.push(link.clone());
        link
    }

    pub async fn seed_address(&self, address: Address) -> Address {
        let mut state = self.state.write().await;
        let mut address = address;
        address.id = AddressId::new(state.assign_id());
        state.addresses.push(address.clone());
        address
    }

    pub async fn seed_user(&self, user: User) -> User {
        let mut state = self.state.write().await;
        let mut user = user;
        user.id = UserId::new(state.assign_id());
        state.users.push(user.clone());
        user
    }

    // ---- failure injection -------------------------------------------------

    pub async fn set_fail_on_reads(&self, fail: bool) {
        self.state.write().await.fail_reads = fail;
    }

    pub async fn set_fail_on_insert_transaction(&self, fail: bool) {
        self.state.write().await.fail_insert_transaction = fail;
    }

    pub async fn set_fail_on_insert_status(&self, fail: bool) {
        self.state.write().await.fail_insert_status = fail;
    }

    pub async fn set_fail_on_insert_address_info(&self, fail: bool) {
        self.state.write().await.fail_insert_address_info = fail;
    }

    /// Makes every line-item insert after the first `successes` fail.
    pub async fn set_line_item_failure_after(&self, successes: usize) {
        let mut state = self.state.write().await;
        state.line_item_failure_after = Some(successes);
        state.line_items_inserted = 0;
    }

    // ---- observation -------------------------------------------------------

    pub async fn transaction_count(&self) -> usize {
        self.state.read().await.transactions.len()
    }

    pub async fn status_count(&self) -> usize {
        self.state.read().await.statuses.len()
    }

    pub async fn address_info_count(&self) -> usize {
        self.state.read().await.address_infos.len()
    }

    pub async fn line_item_count(&self) -> usize {
        self.state.read().await.line_items.len()
    }

    pub async fn address_count(&self) -> usize {
        self.state.read().await.addresses.len()
    }

    pub async fn product_read_calls(&self) -> usize {
        self.state.read().await.product_read_calls
    }

    pub async fn variant_read_calls(&self) -> usize {
        self.state.read().await.variant_read_calls
    }

    pub async fn page_read_calls(&self) -> usize {
        self.state.read().await.page_read_calls
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let mut state = self.state.write().await;
        state.check_reads()?;
        state.product_read_calls += 1;
        Ok(state
            .products
            .iter()
            .filter(|p| ids.contains(&p.id) && p.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn products_by_slugs(&self, slugs: &[String]) -> Result<Vec<Product>> {
        let mut state = self.state.write().await;
        state.check_reads()?;
        state.product_read_calls += 1;
        Ok(state
            .products
            .iter()
            .filter(|p| slugs.contains(&p.slug) && p.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn product_page(
        &self,
        skip: i64,
        limit: i64,
        published_only: bool,
    ) -> Result<Vec<Product>> {
        let mut state = self.state.write().await;
        state.check_reads()?;
        state.page_read_calls += 1;
        let mut page: Vec<Product> = state
            .products
            .iter()
            .filter(|p| p.deleted_at.is_none() && (!published_only || p.published))
            .cloned()
            .collect();
        page.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(page
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>> {
        let state = self.state.read().await;
        state.check_reads()?;
        Ok(state
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn variants_by_ids(&self, ids: &[VariantId]) -> Result<Vec<ProductVariant>> {
        let mut state = self.state.write().await;
        state.check_reads()?;
        state.variant_read_calls += 1;
        Ok(state
            .variants
            .iter()
            .filter(|v| ids.contains(&v.id) && v.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn variants_by_ids_with_deleted(
        &self,
        ids: &[VariantId],
    ) -> Result<Vec<ProductVariant>> {
        let mut state = self.state.write().await;
        state.check_reads()?;
        state.variant_read_calls += 1;
        Ok(state
            .variants
            .iter()
            .filter(|v| ids.contains(&v.id))
            .cloned()
            .collect())
    }

    async fn option_values_by_ids(
        &self,
        ids: &[OptionValueId],
    ) -> Result<Vec<ProductOptionValue>> {
        let state = self.state.read().await;
        state.check_reads()?;
        Ok(state
            .option_values
            .iter()
            .filter(|v| ids.contains(&v.id) && v.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn addresses_by_ids(&self, ids: &[AddressId]) -> Result<Vec<Address>> {
        let state = self.state.read().await;
        state.check_reads()?;
        Ok(state
            .addresses
            .iter()
            .filter(|a| ids.contains(&a.id) && a.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn transactions_by_ids(&self, ids: &[TransactionId]) -> Result<Vec<Transaction>> {
        let state = self.state.read().await;
        state.check_reads()?;
        Ok(state
            .transactions
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn options_for_products(&self, ids: &[ProductId]) -> Result<Vec<ProductOption>> {
        let state = self.state.read().await;
        state.check_reads()?;
        Ok(state
            .options
            .iter()
            .filter(|o| ids.contains(&o.product_id) && o.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn option_values_for_options(
        &self,
        ids: &[OptionId],
    ) -> Result<Vec<ProductOptionValue>> {
        let state = self.state.read().await;
        state.check_reads()?;
        Ok(state
            .option_values
            .iter()
            .filter(|v| ids.contains(&v.option_id) && v.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn variants_for_products(&self, ids: &[ProductId]) -> Result<Vec<ProductVariant>> {
        let state = self.state.read().await;
        state.check_reads()?;
        Ok(state
            .variants
            .iter()
            .filter(|v| ids.contains(&v.product_id) && v.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn variant_links_for_variants(
        &self,
        ids: &[VariantId],
    ) -> Result<Vec<VariantOptionLink>> {
        let state = self.state.read().await;
        state.check_reads()?;
        Ok(state
            .variant_links
            .iter()
            .filter(|l| ids.contains(&l.variant_id) && l.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn variant_links_for_product(&self, id: ProductId) -> Result<Vec<VariantOptionLink>> {
        let state = self.state.read().await;
        state.check_reads()?;
        Ok(state
            .variant_links
            .iter()
            .filter(|l| l.product_id == id && l.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn addresses_for_users(&self, ids: &[UserId]) -> Result<Vec<Address>> {
        let state = self.state.read().await;
        state.check_reads()?;
        Ok(state
            .addresses
            .iter()
            .filter(|a| {
                a.deleted_at.is_none()
                    && a.user_id.map(|user| ids.contains(&user)).unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn transactions_for_users(&self, ids: &[UserId]) -> Result<Vec<Transaction>> {
        let state = self.state.read().await;
        state.check_reads()?;
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.user_id.map(|user| ids.contains(&user)).unwrap_or(false))
            .cloned()
            .collect())
    }

    async fn line_items_for_transactions(
        &self,
        ids: &[TransactionId],
    ) -> Result<Vec<TransactionLineItem>> {
        let state = self.state.read().await;
        state.check_reads()?;
        Ok(state
            .line_items
            .iter()
            .filter(|i| ids.contains(&i.transaction_id))
            .cloned()
            .collect())
    }

    async fn address_info_for_transactions(
        &self,
        ids: &[TransactionId],
    ) -> Result<Vec<TransactionAddressInfo>> {
        let state = self.state.read().await;
        state.check_reads()?;
        Ok(state
            .address_infos
            .iter()
            .filter(|i| ids.contains(&i.transaction_id))
            .cloned()
            .collect())
    }

    async fn statuses_for_transactions(
        &self,
        ids: &[TransactionId],
    ) -> Result<Vec<TransactionStatus>> {
        let state = self.state.read().await;
        state.check_reads()?;
        let mut statuses: Vec<TransactionStatus> = state
            .statuses
            .iter()
            .filter(|s| ids.contains(&s.transaction_id))
            .cloned()
            .collect();
        statuses.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(statuses)
    }

    async fn insert_address(&self, address: Address) -> Result<Address> {
        let mut state = self.state.write().await;
        let mut address = address;
        address.id = AddressId::new(state.assign_id());
        state.addresses.push(address.clone());
        Ok(address)
    }

    async fn insert_transaction(&self, transaction: Transaction) -> Result<Transaction> {
        let mut state = self.state.write().await;
        if state.fail_insert_transaction {
            return Err(StoreError::Unavailable(
                "injected transaction insert failure".to_string(),
            ));
        }
        let mut transaction = transaction;
        transaction.id = TransactionId::new(state.assign_id());
        state.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn insert_status(&self, status: TransactionStatus) -> Result<TransactionStatus> {
        let mut state = self.state.write().await;
        if state.fail_insert_status {
            return Err(StoreError::Unavailable(
                "injected status insert failure".to_string(),
            ));
        }
        let mut status = status;
        status.id = state.assign_id();
        state.statuses.push(status.clone());
        Ok(status)
    }

    async fn insert_address_info(
        &self,
        info: TransactionAddressInfo,
    ) -> Result<TransactionAddressInfo> {
        let mut state = self.state.write().await;
        if state.fail_insert_address_info {
            return Err(StoreError::Unavailable(
                "injected address info insert failure".to_string(),
            ));
        }
        let mut info = info;
        info.id = state.assign_id();
        state.address_infos.push(info);
        Ok(info)
    }

    async fn insert_line_item(&self, item: TransactionLineItem) -> Result<TransactionLineItem> {
        let mut state = self.state.write().await;
        if let Some(after) = state.line_item_failure_after
            && state.line_items_inserted >= after
        {
            return Err(StoreError::Unavailable(
                "injected line item insert failure".to_string(),
            ));
        }
        state.line_items_inserted += 1;
        let mut item = item;
        item.id = state.assign_id();
        state.line_items.push(item);
        Ok(item)
    }

    async fn update_transaction_gateway_id(
        &self,
        id: TransactionId,
        gateway_id: &str,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        match state.transactions.iter_mut().find(|t| t.id == id) {
            Some(transaction) => {
                transaction.gateway_id = gateway_id.to_string();
                Ok(())
            }
            None => Err(StoreError::RowNotFound {
                entity: "transaction",
                id: id.as_i64(),
            }),
        }
    }

    async fn update_transaction_label_id(&self, id: TransactionId, label_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        match state.transactions.iter_mut().find(|t| t.id == id) {
            Some(transaction) => {
                transaction.label_id = label_id.to_string();
                Ok(())
            }
            None => Err(StoreError::RowNotFound {
                entity: "transaction",
                id: id.as_i64(),
            }),
        }
    }

    async fn soft_delete_variant(&self, id: VariantId) -> Result<()> {
        let mut state = self.state.write().await;
        match state.variants.iter_mut().find(|v| v.id == id) {
            Some(variant) => {
                variant.deleted_at = Some(chrono::Utc::now());
                Ok(())
            }
            None => Err(StoreError::RowNotFound {
                entity: "product_variant",
                id: id.as_i64(),
            }),
        }
    }

    async fn hard_delete_transaction(&self, id: TransactionId) -> Result<()> {
        let mut state = self.state.write().await;
        state.transactions.retain(|t| t.id != id);
        Ok(())
    }

    async fn hard_delete_status(&self, id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        state.statuses.retain(|s| s.id != id);
        Ok(())
    }

    async fn hard_delete_address_info(&self, id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        state.address_infos.retain(|i| i.id != id);
        Ok(())
    }

    async fn hard_delete_line_item(&self, id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        state.line_items.retain(|i| i.id != id);
        Ok(())
    }

    async fn hard_delete_address(&self, id: AddressId) -> Result<()> {
        let mut state = self.state.write().await;
        state.addresses.retain(|a| a.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::Money;

    use super::*;

    #[tokio::test]
    async fn soft_deleted_variants_are_filtered_from_normal_reads() {
        let store = InMemoryStore::new();
        let product = store.seed_product(Product::new("shirt", "Shirt")).await;
        let variant = store
            .seed_variant(ProductVariant::new(product.id, "Large", Money::from_cents(500)))
            .await;

        store.soft_delete_variant(variant.id).await.unwrap();

        let normal = store.variants_by_ids(&[variant.id]).await.unwrap();
        assert!(normal.is_empty());

        let with_deleted = store
            .variants_by_ids_with_deleted(&[variant.id])
            .await
            .unwrap();
        assert_eq!(with_deleted.len(), 1);
        assert!(with_deleted[0].deleted_at.is_some());
    }

    #[tokio::test]
    async fn product_page_is_newest_first_and_respects_publish_filter() {
        let store = InMemoryStore::new();
        let a = store
            .seed_product(Product::new("a", "A").published())
            .await;
        let _draft = store.seed_product(Product::new("b", "B")).await;
        let c = store
            .seed_product(Product::new("c", "C").published())
            .await;

        let page = store.product_page(0, 20, true).await.unwrap();
        let ids: Vec<ProductId> = page.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![c.id, a.id]);

        let all = store.product_page(0, 20, false).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn inserts_assign_sequential_ids() {
        let store = InMemoryStore::new();
        let t1 = store
            .insert_transaction(Transaction::new(
                Money::from_cents(100),
                Money::zero(),
                Money::zero(),
                Money::from_cents(100),
                "RATE-0001",
                None,
            ))
            .await
            .unwrap();
        let t2 = store
            .insert_transaction(Transaction::new(
                Money::from_cents(200),
                Money::zero(),
                Money::zero(),
                Money::from_cents(200),
                "RATE-0002",
                None,
            ))
            .await
            .unwrap();
        assert!(t2.id.as_i64() > t1.id.as_i64());
        assert_eq!(store.transaction_count().await, 2);
    }

    #[tokio::test]
    async fn line_item_failure_injection_counts_successes() {
        let store = InMemoryStore::new();
        store.set_line_item_failure_after(1).await;

        let first = TransactionLineItem::new(
            TransactionId::new(1),
            VariantId::new(1),
            Money::from_cents(100),
            1,
        );
        assert!(store.insert_line_item(first).await.is_ok());

        let second = TransactionLineItem::new(
            TransactionId::new(1),
            VariantId::new(2),
            Money::from_cents(100),
            1,
        );
        assert!(store.insert_line_item(second).await.is_err());
    }

    #[tokio::test]
    async fn hard_delete_removes_rows_for_every_reader() {
        let store = InMemoryStore::new();
        let transaction = store
            .insert_transaction(Transaction::new(
                Money::from_cents(100),
                Money::zero(),
                Money::zero(),
                Money::from_cents(100),
                "RATE-0001",
                None,
            ))
            .await
            .unwrap();

        store.hard_delete_transaction(transaction.id).await.unwrap();
        let found = store.transactions_by_ids(&[transaction.id]).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn injected_read_failure_surfaces_as_unavailable() {
        let store = InMemoryStore::new();
        store.set_fail_on_reads(true).await;
        let result = store.products_by_ids(&[ProductId::new(1)]).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
