//! PostgreSQL-backed store implementation.
//!
//! Expects a provisioned schema; table creation is handled by operations
//! tooling, not this crate.

use async_trait::async_trait;
use common::{
    AddressId, Money, OptionId, OptionValueId, ProductId, TransactionId, UserId, VariantId,
};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::rows::{
    Address, Product, ProductOption, ProductOptionValue, ProductVariant, Transaction,
    TransactionAddressInfo, TransactionLineItem, TransactionStatus, User, VariantOptionLink,
};
use crate::store::Store;
use crate::{Result, StoreError};

/// PostgreSQL store over a shared connection pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn row_to_product(row: PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        details: row.try_get("details")?,
        published: row.try_get("published")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn row_to_option(row: PgRow) -> Result<ProductOption> {
    Ok(ProductOption {
        id: OptionId::new(row.try_get("id")?),
        label: row.try_get("label")?,
        product_id: ProductId::new(row.try_get("product_id")?),
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn row_to_option_value(row: PgRow) -> Result<ProductOptionValue> {
    Ok(ProductOptionValue {
        id: OptionValueId::new(row.try_get("id")?),
        value: row.try_get("value")?,
        option_id: OptionId::new(row.try_get("product_option_id")?),
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn row_to_variant(row: PgRow) -> Result<ProductVariant> {
    Ok(ProductVariant {
        id: VariantId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        price: Money::from_cents(row.try_get("price")?),
        length: row.try_get("length")?,
        width: row.try_get("width")?,
        height: row.try_get("height")?,
        weight: row.try_get("weight")?,
        product_id: ProductId::new(row.try_get("product_id")?),
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn row_to_link(row: PgRow) -> Result<VariantOptionLink> {
    Ok(VariantOptionLink {
        variant_id: VariantId::new(row.try_get("product_variant_id")?),
        option_value_id: OptionValueId::new(row.try_get("product_option_value_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn row_to_address(row: PgRow) -> Result<Address> {
    Ok(Address {
        id: AddressId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        line1: row.try_get("line1")?,
        line2: row.try_get("line2")?,
        line3: row.try_get("line3")?,
        city: row.try_get("city")?,
        region: row.try_get("region")?,
        postal_code: row.try_get("postal_code")?,
        country: row.try_get("country")?,
        user_id: row.try_get::<Option<i64>, _>("user_id")?.map(UserId::new),
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn row_to_user(row: PgRow) -> Result<User> {
    Ok(User {
        id: UserId::new(row.try_get("id")?),
        email: row.try_get("email")?,
        role: row.try_get("role")?,
    })
}

fn row_to_transaction(row: PgRow) -> Result<Transaction> {
    Ok(Transaction {
        id: TransactionId::new(row.try_get("id")?),
        subtotal: Money::from_cents(row.try_get("subtotal")?),
        taxes: Money::from_cents(row.try_get("taxes")?),
        shipping: Money::from_cents(row.try_get("shipping")?),
        total: Money::from_cents(row.try_get("total")?),
        gateway_id: row.try_get("gateway_id")?,
        shipping_rate_id: row.try_get("shipping_rate_id")?,
        label_id: row.try_get("label_id")?,
        user_id: row.try_get::<Option<i64>, _>("user_id")?.map(UserId::new),
    })
}

fn row_to_status(row: PgRow) -> Result<TransactionStatus> {
    Ok(TransactionStatus {
        id: row.try_get("id")?,
        transaction_id: TransactionId::new(row.try_get("transaction_id")?),
        status: row.try_get("status")?,
        carrier: row.try_get("carrier")?,
        tracking_id: row.try_get("tracking_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_address_info(row: PgRow) -> Result<TransactionAddressInfo> {
    Ok(TransactionAddressInfo {
        id: row.try_get("id")?,
        transaction_id: TransactionId::new(row.try_get("transaction_id")?),
        billing_address_id: AddressId::new(row.try_get("billing_address_id")?),
        shipping_address_id: AddressId::new(row.try_get("shipping_address_id")?),
    })
}

fn row_to_line_item(row: PgRow) -> Result<TransactionLineItem> {
    Ok(TransactionLineItem {
        id: row.try_get("id")?,
        transaction_id: TransactionId::new(row.try_get("transaction_id")?),
        variant_id: VariantId::new(row.try_get("product_variant_id")?),
        price: Money::from_cents(row.try_get("price")?),
        quantity: row.try_get("quantity")?,
    })
}

fn raw_ids<T: Copy + Into<i64>>(ids: &[T]) -> Vec<i64> {
    ids.iter().map(|id| (*id).into()).collect()
}

#[async_trait]
impl Store for PostgresStore {
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT id, slug, name, description, details, published, deleted_at
             FROM products WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_product).collect()
    }

    async fn products_by_slugs(&self, slugs: &[String]) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT id, slug, name, description, details, published, deleted_at
             FROM products WHERE slug = ANY($1) AND deleted_at IS NULL",
        )
        .bind(slugs)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_product).collect()
    }

    async fn product_page(
        &self,
        skip: i64,
        limit: i64,
        published_only: bool,
    ) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT id, slug, name, description, details, published, deleted_at
             FROM products
             WHERE deleted_at IS NULL AND (published OR NOT $3)
             ORDER BY id DESC OFFSET $1 LIMIT $2",
        )
        .bind(skip)
        .bind(limit)
        .bind(published_only)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_product).collect()
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT id, email, role FROM users WHERE id = ANY($1)")
            .bind(raw_ids(ids))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_user).collect()
    }

    async fn variants_by_ids(&self, ids: &[VariantId]) -> Result<Vec<ProductVariant>> {
        let rows = sqlx::query(
            "SELECT id, name, price, length, width, height, weight, product_id, deleted_at
             FROM product_variants WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_variant).collect()
    }

    async fn variants_by_ids_with_deleted(
        &self,
        ids: &[VariantId],
    ) -> Result<Vec<ProductVariant>> {
        let rows = sqlx::query(
            "SELECT id, name, price, length, width, height, weight, product_id, deleted_at
             FROM product_variants WHERE id = ANY($1)",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_variant).collect()
    }

    async fn option_values_by_ids(
        &self,
        ids: &[OptionValueId],
    ) -> Result<Vec<ProductOptionValue>> {
        let rows = sqlx::query(
            "SELECT id, value, product_option_id, deleted_at
             FROM product_option_values WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_option_value).collect()
    }

    async fn addresses_by_ids(&self, ids: &[AddressId]) -> Result<Vec<Address>> {
        let rows = sqlx::query(
            "SELECT id, name, line1, line2, line3, city, region, postal_code, country,
                    user_id, deleted_at
             FROM addresses WHERE id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_address).collect()
    }

    async fn transactions_by_ids(&self, ids: &[TransactionId]) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            "SELECT id, subtotal, taxes, shipping, total, gateway_id, shipping_rate_id,
                    label_id, user_id
             FROM transactions WHERE id = ANY($1)",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_transaction).collect()
    }

    async fn options_for_products(&self, ids: &[ProductId]) -> Result<Vec<ProductOption>> {
        let rows = sqlx::query(
            "SELECT id, label, product_id, deleted_at
             FROM product_options WHERE product_id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_option).collect()
    }

    async fn option_values_for_options(
        &self,
        ids: &[OptionId],
    ) -> Result<Vec<ProductOptionValue>> {
        let rows = sqlx::query(
            "SELECT id, value, product_option_id, deleted_at
             FROM product_option_values
             WHERE product_option_id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_option_value).collect()
    }

    async fn variants_for_products(&self, ids: &[ProductId]) -> Result<Vec<ProductVariant>> {
        let rows = sqlx::query(
            "SELECT id, name, price, length, width, height, weight, product_id, deleted_at
             FROM product_variants WHERE product_id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_variant).collect()
    }

    async fn variant_links_for_variants(
        &self,
        ids: &[VariantId],
    ) -> Result<Vec<VariantOptionLink>> {
        let rows = sqlx::query(
            "SELECT product_variant_id, product_option_value_id, product_id, deleted_at
             FROM product_variant_options
             WHERE product_variant_id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_link).collect()
    }

    async fn variant_links_for_product(&self, id: ProductId) -> Result<Vec<VariantOptionLink>> {
        let rows = sqlx::query(
            "SELECT product_variant_id, product_option_value_id, product_id, deleted_at
             FROM product_variant_options
             WHERE product_id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_link).collect()
    }

    async fn addresses_for_users(&self, ids: &[UserId]) -> Result<Vec<Address>> {
        let rows = sqlx::query(
            "SELECT id, name, line1, line2, line3, city, region, postal_code, country,
                    user_id, deleted_at
             FROM addresses WHERE user_id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_address).collect()
    }

    async fn transactions_for_users(&self, ids: &[UserId]) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            "SELECT id, subtotal, taxes, shipping, total, gateway_id, shipping_rate_id,
                    label_id, user_id
             FROM transactions WHERE user_id = ANY($1) ORDER BY id DESC",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_transaction).collect()
    }

    async fn line_items_for_transactions(
        &self,
        ids: &[TransactionId],
    ) -> Result<Vec<TransactionLineItem>> {
        let rows = sqlx::query(
            "SELECT id, transaction_id, product_variant_id, price, quantity
             FROM transaction_line_items WHERE transaction_id = ANY($1)",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_line_item).collect()
    }

    async fn address_info_for_transactions(
        &self,
        ids: &[TransactionId],
    ) -> Result<Vec<TransactionAddressInfo>> {
        let rows = sqlx::query(
            "SELECT id, transaction_id, billing_address_id, shipping_address_id
             FROM transaction_address_infos WHERE transaction_id = ANY($1)",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_address_info).collect()
    }

    async fn statuses_for_transactions(
        &self,
        ids: &[TransactionId],
    ) -> Result<Vec<TransactionStatus>> {
        let rows = sqlx::query(
            "SELECT id, transaction_id, status, carrier, tracking_id, created_at
             FROM transaction_statuses
             WHERE transaction_id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(raw_ids(ids))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_status).collect()
    }

    async fn insert_address(&self, address: Address) -> Result<Address> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO addresses
                 (name, line1, line2, line3, city, region, postal_code, country, user_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id",
        )
        .bind(&address.name)
        .bind(&address.line1)
        .bind(&address.line2)
        .bind(&address.line3)
        .bind(&address.city)
        .bind(&address.region)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(address.user_id.map(i64::from))
        .fetch_one(&self.pool)
        .await?;
        let mut address = address;
        address.id = AddressId::new(id);
        Ok(address)
    }

    async fn insert_transaction(&self, transaction: Transaction) -> Result<Transaction> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO transactions
                 (subtotal, taxes, shipping, total, gateway_id, shipping_rate_id, label_id,
                  user_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(transaction.subtotal.cents())
        .bind(transaction.taxes.cents())
        .bind(transaction.shipping.cents())
        .bind(transaction.total.cents())
        .bind(&transaction.gateway_id)
        .bind(&transaction.shipping_rate_id)
        .bind(&transaction.label_id)
        .bind(transaction.user_id.map(i64::from))
        .fetch_one(&self.pool)
        .await?;
        let mut transaction = transaction;
        transaction.id = TransactionId::new(id);
        Ok(transaction)
    }

    async fn insert_status(&self, status: TransactionStatus) -> Result<TransactionStatus> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO transaction_statuses
                 (transaction_id, status, carrier, tracking_id, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(status.transaction_id.as_i64())
        .bind(&status.status)
        .bind(&status.carrier)
        .bind(&status.tracking_id)
        .bind(status.created_at)
        .fetch_one(&self.pool)
        .await?;
        let mut status = status;
        status.id = id;
        Ok(status)
    }

    async fn insert_address_info(
        &self,
        info: TransactionAddressInfo,
    ) -> Result<TransactionAddressInfo> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO transaction_address_infos
                 (transaction_id, billing_address_id, shipping_address_id)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(info.transaction_id.as_i64())
        .bind(info.billing_address_id.as_i64())
        .bind(info.shipping_address_id.as_i64())
        .fetch_one(&self.pool)
        .await?;
        let mut info = info;
        info.id = id;
        Ok(info)
    }

    async fn insert_line_item(&self, item: TransactionLineItem) -> Result<TransactionLineItem> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO transaction_line_items
                 (transaction_id, product_variant_id, price, quantity)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(item.transaction_id.as_i64())
        .bind(item.variant_id.as_i64())
        .bind(item.price.cents())
        .bind(item.quantity)
        .fetch_one(&self.pool)
        .await?;
        let mut item = item;
        item.id = id;
        Ok(item)
    }

    async fn update_transaction_gateway_id(
        &self,
        id: TransactionId,
        gateway_id: &str,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE transactions SET gateway_id = $2 WHERE id = $1")
            .bind(id.as_i64())
            .bind(gateway_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound {
                entity: "transaction",
                id: id.as_i64(),
            });
        }
        Ok(())
    }

    async fn update_transaction_label_id(&self, id: TransactionId, label_id: &str) -> Result<()> {
        let result = sqlx::query("UPDATE transactions SET label_id = $2 WHERE id = $1")
            .bind(id.as_i64())
            .bind(label_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound {
                entity: "transaction",
                id: id.as_i64(),
            });
        }
        Ok(())
    }

    async fn soft_delete_variant(&self, id: VariantId) -> Result<()> {
        let result = sqlx::query(
            "UPDATE product_variants SET deleted_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound {
                entity: "product_variant",
                id: id.as_i64(),
            });
        }
        Ok(())
    }

    async fn hard_delete_transaction(&self, id: TransactionId) -> Result<()> {
        sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn hard_delete_status(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM transaction_statuses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn hard_delete_address_info(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM transaction_address_infos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn hard_delete_line_item(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM transaction_line_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn hard_delete_address(&self, id: AddressId) -> Result<()> {
        sqlx::query("DELETE FROM addresses WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
