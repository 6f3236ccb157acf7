//! Batched cart subtotal computation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{Money, VariantId};
use loader::{BatchFn, BatchResult, LoadError, LoadResult};
use store::Store;

use crate::keys::CartKey;

/// Validation message for non-positive quantities.
pub const INVALID_QUANTITY: &str = "Quantity for each variant must be greater than 0.";

/// Validation message when a cart references a variant that is missing or
/// no longer purchasable.
pub const MISMATCHED_VARIANTS: &str =
    "Failed to calculate subtotal. One or more variants is not available for purchase.";

/// Computes `sum(price * quantity)` over the purchasable variants a cart
/// references. One bulk variant read per cart key.
pub struct SubtotalBatch {
    store: Arc<dyn Store>,
}

impl SubtotalBatch {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn subtotal(&self, cart: &CartKey) -> LoadResult<Money> {
        if cart.is_empty() {
            return Ok(Money::zero());
        }

        let mut quantities: HashMap<VariantId, i64> = HashMap::new();
        for entry in cart.entries() {
            if entry.quantity < 1 {
                return Err(LoadError::Validation(INVALID_QUANTITY.to_string()));
            }
            *quantities.entry(entry.variant_id).or_insert(0) += entry.quantity;
        }

        let ids: Vec<VariantId> = cart.variant_ids();
        let found = self
            .store
            .variants_by_ids(&ids)
            .await
            .map_err(|err| LoadError::backend("Failed to calculate subtotal.", err))?;

        // Soft-deleted and unknown variants are both absent here.
        if found.len() != ids.len() {
            return Err(LoadError::Validation(MISMATCHED_VARIANTS.to_string()));
        }

        let mut subtotal = Money::zero();
        for variant in found {
            match quantities.get(&variant.id) {
                Some(quantity) => subtotal += variant.price.multiply(*quantity),
                None => return Err(LoadError::Validation(MISMATCHED_VARIANTS.to_string())),
            }
        }
        Ok(subtotal)
    }
}

#[async_trait]
impl BatchFn<CartKey, Money> for SubtotalBatch {
    async fn load(&self, keys: &[CartKey]) -> BatchResult<Money> {
        let mut results = Vec::with_capacity(keys.len());
        for cart in keys {
            results.push(self.subtotal(cart).await);
        }
        Ok(results)
    }
}
