//! Product variant batch functions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::{OptionValueId, ProductId, VariantId};
use loader::{BatchFn, BatchResult, Key, LoadError, LoadResult, Loader};
use store::{ProductOptionValue, ProductVariant, Store};

use crate::keys::SelectedOptionsKey;

/// Point lookup by variant id.
///
/// Includes soft-deleted variants: settled transactions must keep
/// resolving line items whose variant has since left the catalog.
pub struct VariantByIdBatch {
    store: Arc<dyn Store>,
}

impl VariantByIdBatch {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn<VariantId, ProductVariant> for VariantByIdBatch {
    async fn load(&self, keys: &[VariantId]) -> BatchResult<ProductVariant> {
        let found = self
            .store
            .variants_by_ids_with_deleted(keys)
            .await
            .map_err(|err| LoadError::backend("Failed to load product variant.", err))?;

        let mut by_id = HashMap::with_capacity(found.len());
        for variant in found {
            by_id.insert(variant.id, variant);
        }

        Ok(keys
            .iter()
            .map(|id| {
                by_id
                    .get(id)
                    .cloned()
                    .ok_or_else(|| LoadError::NotFound(id.canonical()))
            })
            .collect())
    }
}

/// Purchasable variants for a set of products, grouped by product.
pub struct VariantsForProductBatch {
    store: Arc<dyn Store>,
}

impl VariantsForProductBatch {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn<ProductId, Vec<ProductVariant>> for VariantsForProductBatch {
    async fn load(&self, keys: &[ProductId]) -> BatchResult<Vec<ProductVariant>> {
        let found = self
            .store
            .variants_for_products(keys)
            .await
            .map_err(|err| LoadError::backend("Failed to load product variants.", err))?;

        let mut grouped: HashMap<ProductId, Vec<ProductVariant>> = HashMap::new();
        for variant in found {
            grouped.entry(variant.product_id).or_default().push(variant);
        }

        Ok(keys
            .iter()
            .map(|id| Ok(grouped.get(id).cloned().unwrap_or_default()))
            .collect())
    }
}

/// The option values linked to a set of variants, grouped by variant.
pub struct VariantOptionValuesBatch {
    store: Arc<dyn Store>,
}

impl VariantOptionValuesBatch {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn<VariantId, Vec<ProductOptionValue>> for VariantOptionValuesBatch {
    async fn load(&self, keys: &[VariantId]) -> BatchResult<Vec<ProductOptionValue>> {
        let links = self
            .store
            .variant_links_for_variants(keys)
            .await
            .map_err(|err| LoadError::backend("Failed to load product variant options.", err))?;

        let mut value_ids: Vec<OptionValueId> =
            links.iter().map(|link| link.option_value_id).collect();
        value_ids.sort();
        value_ids.dedup();

        let values = self
            .store
            .option_values_by_ids(&value_ids)
            .await
            .map_err(|err| LoadError::backend("Failed to load product variant options.", err))?;
        let by_value_id: HashMap<OptionValueId, ProductOptionValue> =
            values.into_iter().map(|value| (value.id, value)).collect();

        let mut grouped: HashMap<VariantId, Vec<ProductOptionValue>> = HashMap::new();
        for link in links {
            if let Some(value) = by_value_id.get(&link.option_value_id) {
                grouped
                    .entry(link.variant_id)
                    .or_default()
                    .push(value.clone());
            }
        }

        Ok(keys
            .iter()
            .map(|id| Ok(grouped.get(id).cloned().unwrap_or_default()))
            .collect())
    }
}

/// Exact-match variant lookup for an ordered set of chosen option values.
///
/// A variant matches when the count of its linked values inside the
/// requested set equals the requested set's size (or, for an empty
/// selection, when it has no linked values at all). Anything but exactly
/// one match resolves to a present-but-null result so callers can tell
/// "still choosing" from "invalid combination".
pub struct VariantBySelectedOptionsBatch {
    store: Arc<dyn Store>,
    variant_by_id: Loader<VariantId, ProductVariant>,
}

impl VariantBySelectedOptionsBatch {
    pub fn new(store: Arc<dyn Store>, variant_by_id: Loader<VariantId, ProductVariant>) -> Self {
        Self {
            store,
            variant_by_id,
        }
    }

    async fn lookup(&self, key: &SelectedOptionsKey) -> LoadResult<Option<ProductVariant>> {
        let variants = self
            .store
            .variants_for_products(&[key.product_id])
            .await
            .map_err(|err| {
                LoadError::backend("Failed to find product variant by selected options.", err)
            })?;
        let links = self
            .store
            .variant_links_for_product(key.product_id)
            .await
            .map_err(|err| {
                LoadError::backend("Failed to find product variant by selected options.", err)
            })?;

        let selected: HashSet<OptionValueId> = key.selected.iter().copied().collect();

        let mut matching: Vec<ProductVariant> = variants
            .into_iter()
            .filter(|variant| {
                let linked: HashSet<OptionValueId> = links
                    .iter()
                    .filter(|link| link.variant_id == variant.id)
                    .map(|link| link.option_value_id)
                    .collect();
                if selected.is_empty() {
                    linked.is_empty()
                } else {
                    linked.intersection(&selected).count() == selected.len()
                }
            })
            .collect();

        Ok(if matching.len() == 1 {
            matching.pop()
        } else {
            None
        })
    }
}

#[async_trait]
impl BatchFn<SelectedOptionsKey, Option<ProductVariant>> for VariantBySelectedOptionsBatch {
    async fn load(&self, keys: &[SelectedOptionsKey]) -> BatchResult<Option<ProductVariant>> {
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            let result = self.lookup(key).await;
            if let Ok(Some(variant)) = &result {
                self.variant_by_id.prime(&variant.id, variant.clone());
            }
            results.push(result);
        }
        Ok(results)
    }
}
