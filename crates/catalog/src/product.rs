//! Product batch functions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OptionId, ProductId};
use loader::{BatchFn, BatchResult, Key, LoadError, Loader, LoaderSlot};
use store::{Product, ProductOption, ProductOptionValue, Store};

use crate::keys::PaginationKey;

/// Loads pages of published products, priming the point lookups with every
/// row the page already fetched so later by-id/by-slug loads stay free.
pub struct ProductPageBatch {
    store: Arc<dyn Store>,
    by_id: Loader<ProductId, Product>,
    by_slug: Loader<String, Product>,
}

impl ProductPageBatch {
    pub fn new(
        store: Arc<dyn Store>,
        by_id: Loader<ProductId, Product>,
        by_slug: Loader<String, Product>,
    ) -> Self {
        Self {
            store,
            by_id,
            by_slug,
        }
    }
}

#[async_trait]
impl BatchFn<PaginationKey, Vec<Product>> for ProductPageBatch {
    async fn load(&self, keys: &[PaginationKey]) -> BatchResult<Vec<Product>> {
        let mut pages = Vec::with_capacity(keys.len());
        for page in keys {
            match self
                .store
                .product_page(page.skip(), page.limit(), true)
                .await
            {
                Ok(products) => {
                    for product in &products {
                        self.by_id.prime(&product.id, product.clone());
                        self.by_slug.prime(&product.slug, product.clone());
                    }
                    pages.push(Ok(products));
                }
                Err(err) => {
                    pages.push(Err(LoadError::backend("Failed to load product page.", err)));
                }
            }
        }
        Ok(pages)
    }
}

/// Point lookup by product id; primes the by-slug loader with each hit.
pub struct ProductByIdBatch {
    store: Arc<dyn Store>,
    by_slug: LoaderSlot<String, Product>,
}

impl ProductByIdBatch {
    pub fn new(store: Arc<dyn Store>, by_slug: LoaderSlot<String, Product>) -> Self {
        Self { store, by_slug }
    }
}

#[async_trait]
impl BatchFn<ProductId, Product> for ProductByIdBatch {
    async fn load(&self, keys: &[ProductId]) -> BatchResult<Product> {
        let found = self
            .store
            .products_by_ids(keys)
            .await
            .map_err(|err| LoadError::backend("Failed to load product.", err))?;

        let mut by_id = HashMap::with_capacity(found.len());
        for product in found {
            self.by_slug.prime(&product.slug, product.clone());
            by_id.insert(product.id, product);
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

/// Point lookup by product slug; primes the by-id loader with each hit.
pub struct ProductBySlugBatch {
    store: Arc<dyn Store>,
    by_id: LoaderSlot<ProductId, Product>,
}

impl ProductBySlugBatch {
    pub fn new(store: Arc<dyn Store>, by_id: LoaderSlot<ProductId, Product>) -> Self {
        Self { store, by_id }
    }
}

#[async_trait]
impl BatchFn<String, Product> for ProductBySlugBatch {
    async fn load(&self, keys: &[String]) -> BatchResult<Product> {
        let found = self
            .store
            .products_by_slugs(keys)
            .await
            .map_err(|err| LoadError::backend("Failed to load product.", err))?;

        let mut by_slug = HashMap::with_capacity(found.len());
        for product in found {
            self.by_id.prime(&product.id, product.clone());
            by_slug.insert(product.slug.clone(), product);
        }

        Ok(keys
            .iter()
            .map(|slug| {
                by_slug
                    .get(slug)
                    .cloned()
                    .ok_or_else(|| LoadError::NotFound(slug.clone()))
            })
            .collect())
    }
}

/// Options for a set of products, grouped by product. Products with no
/// options resolve to an empty list.
pub struct ProductOptionsBatch {
    store: Arc<dyn Store>,
}

impl ProductOptionsBatch {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn<ProductId, Vec<ProductOption>> for ProductOptionsBatch {
    async fn load(&self, keys: &[ProductId]) -> BatchResult<Vec<ProductOption>> {
        let found = self
            .store
            .options_for_products(keys)
            .await
            .map_err(|err| LoadError::backend("Failed to load product options.", err))?;

        let mut grouped: HashMap<ProductId, Vec<ProductOption>> = HashMap::new();
        for option in found {
            grouped.entry(option.product_id).or_default().push(option);
        }

        Ok(keys
            .iter()
            .map(|id| Ok(grouped.get(id).cloned().unwrap_or_default()))
            .collect())
    }
}

/// Values for a set of options, grouped by option.
pub struct OptionValuesBatch {
    store: Arc<dyn Store>,
}

impl OptionValuesBatch {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn<OptionId, Vec<ProductOptionValue>> for OptionValuesBatch {
    async fn load(&self, keys: &[OptionId]) -> BatchResult<Vec<ProductOptionValue>> {
        let found = self
            .store
            .option_values_for_options(keys)
            .await
            .map_err(|err| LoadError::backend("Failed to load product option values.", err))?;

        let mut grouped: HashMap<OptionId, Vec<ProductOptionValue>> = HashMap::new();
        for value in found {
            grouped.entry(value.option_id).or_default().push(value);
        }

        Ok(keys
            .iter()
            .map(|id| Ok(grouped.get(id).cloned().unwrap_or_default()))
            .collect())
    }
}
