//! Batched tax-rate lookup.

use std::sync::Arc;

use async_trait::async_trait;
use loader::{BatchFn, BatchResult, LoadError};
use services::{TaxRates, TaxService};

use crate::keys::AddressKey;

/// Resolves combined tax rates per address through the external tax
/// collaborator. Failures attach to the key that triggered them.
pub struct TaxesBatch {
    tax: Arc<dyn TaxService>,
}

impl TaxesBatch {
    pub fn new(tax: Arc<dyn TaxService>) -> Self {
        Self { tax }
    }
}

#[async_trait]
impl BatchFn<AddressKey, TaxRates> for TaxesBatch {
    async fn load(&self, keys: &[AddressKey]) -> BatchResult<TaxRates> {
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push(
                self.tax
                    .rates_for_address(&key.0)
                    .await
                    .map_err(|err| LoadError::backend("Could not get taxes for address.", err)),
            );
        }
        Ok(results)
    }
}
