//! Batched shipping estimation aggregation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{Money, VariantId};
use loader::{BatchFn, BatchResult, LoadError, LoadResult, Loader};
use serde::{Deserialize, Serialize};
use services::{ParcelSpec, ShippingService};
use store::{Address, ProductVariant};

use crate::keys::EstimationKey;

/// One carrier/service quote, price already converted to minor units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingEstimate {
    /// Opaque rate id; the checkout re-resolves it because quotes expire.
    pub id: String,
    pub price: Money,
    pub carrier: String,
    pub service: String,
    pub duration_terms: String,
}

/// Quotes a multi-parcel shipment for a destination and cart.
///
/// Variant dimensions come from the batched variant lookup; one parcel
/// object is registered per distinct variant and referenced once per unit
/// ordered. Returns every quoted option — selection belongs to the caller.
pub struct ShippingEstimationsBatch {
    shipping: Arc<dyn ShippingService>,
    variant_by_id: Loader<VariantId, ProductVariant>,
    origin: Address,
}

impl ShippingEstimationsBatch {
    pub fn new(
        shipping: Arc<dyn ShippingService>,
        variant_by_id: Loader<VariantId, ProductVariant>,
        origin: Address,
    ) -> Self {
        Self {
            shipping,
            variant_by_id,
            origin,
        }
    }

    async fn estimate(&self, key: &EstimationKey) -> LoadResult<Vec<ShippingEstimate>> {
        let from = self
            .shipping
            .create_address(&self.origin)
            .await
            .map_err(|err| LoadError::backend("Could not create shipping estimation.", err))?;
        let to = self
            .shipping
            .create_address(&key.address)
            .await
            .map_err(|err| LoadError::backend("Could not create shipping estimation.", err))?;

        let ids = key.cart.variant_ids();
        let loaded = self.variant_by_id.load_many(ids.clone()).await;
        let mut variants: HashMap<VariantId, ProductVariant> = HashMap::with_capacity(ids.len());
        for (id, result) in ids.iter().zip(loaded) {
            let variant = result
                .map_err(|err| LoadError::backend("Could not get variants for estimation.", err))?;
            variants.insert(*id, variant);
        }

        let mut parcel_ids: HashMap<VariantId, String> = HashMap::with_capacity(variants.len());
        for (id, variant) in &variants {
            let parcel = self
                .shipping
                .create_parcel(&ParcelSpec {
                    length: variant.length,
                    width: variant.width,
                    height: variant.height,
                    weight: variant.weight,
                })
                .await
                .map_err(|err| LoadError::backend("Could not create parcel.", err))?;
            parcel_ids.insert(*id, parcel);
        }

        let mut parcels = Vec::new();
        for entry in key.cart.entries() {
            if let Some(parcel) = parcel_ids.get(&entry.variant_id) {
                for _ in 0..entry.quantity {
                    parcels.push(parcel.clone());
                }
            }
        }

        tracing::debug!(parcels = parcels.len(), "requesting shipment quote");
        let shipment = self
            .shipping
            .create_shipment(&from, &to, &parcels)
            .await
            .map_err(|err| LoadError::backend("Could not create shipping estimation.", err))?;

        let mut estimates = Vec::with_capacity(shipment.rates.len());
        for rate in shipment.rates {
            let price = Money::from_decimal_str(&rate.amount)
                .map_err(|err| LoadError::backend("Could not convert estimation price.", err))?;
            estimates.push(ShippingEstimate {
                id: rate.id,
                price,
                carrier: rate.provider,
                service: rate.service_level,
                duration_terms: rate.duration_terms,
            });
        }
        Ok(estimates)
    }
}

#[async_trait]
impl BatchFn<EstimationKey, Vec<ShippingEstimate>> for ShippingEstimationsBatch {
    async fn load(&self, keys: &[EstimationKey]) -> BatchResult<Vec<ShippingEstimate>> {
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push(self.estimate(key).await);
        }
        Ok(results)
    }
}
