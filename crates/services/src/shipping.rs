//! Shipping service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use store::Address;

use crate::error::ServiceError;

/// A parcel to be quoted, in inches and ounces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParcelSpec {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
}

/// One carrier/service quote for a shipment.
///
/// `amount` is the carrier's decimal string (e.g. `"5.99"`); consumers
/// convert it to minor units exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingRate {
    pub id: String,
    pub amount: String,
    pub provider: String,
    pub service_level: String,
    pub duration_terms: String,
}

/// A created shipment with its quoted rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: String,
    pub rates: Vec<ShippingRate>,
}

/// A purchased shipping label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingLabel {
    pub id: String,
    pub tracking_id: String,
    pub label_url: String,
    pub status: String,
}

/// Trait for shipping operations.
#[async_trait]
pub trait ShippingService: Send + Sync {
    /// Registers an address, returning its remote object id.
    async fn create_address(&self, address: &Address) -> Result<String, ServiceError>;

    /// Registers a parcel, returning its remote object id.
    async fn create_parcel(&self, parcel: &ParcelSpec) -> Result<String, ServiceError>;

    /// Quotes a multi-parcel shipment between two registered addresses.
    async fn create_shipment(
        &self,
        from: &str,
        to: &str,
        parcels: &[String],
    ) -> Result<Shipment, ServiceError>;

    /// Re-resolves a previously quoted rate by id. Quotes expire, so
    /// callers must not trust a cached copy across requests.
    async fn retrieve_rate(&self, rate_id: &str) -> Result<ShippingRate, ServiceError>;

    /// Purchases a label for a quoted rate.
    async fn purchase_label(&self, rate_id: &str) -> Result<ShippingLabel, ServiceError>;
}

/// A configurable quote template for the in-memory service.
#[derive(Debug, Clone)]
pub struct QuoteTemplate {
    pub amount: String,
    pub provider: String,
    pub service_level: String,
    pub duration_terms: String,
}

#[derive(Debug)]
struct InMemoryShippingState {
    quotes: Vec<QuoteTemplate>,
    rates: HashMap<String, ShippingRate>,
    next_id: u32,
    parcel_count: usize,
    shipment_count: usize,
    label_count: usize,
    fail_on_create_shipment: bool,
    fail_on_retrieve_rate: bool,
    fail_on_purchase_label: bool,
}

impl Default for InMemoryShippingState {
    fn default() -> Self {
        Self {
            quotes: vec![
                QuoteTemplate {
                    amount: "5.99".to_string(),
                    provider: "USPS".to_string(),
                    service_level: "Priority".to_string(),
                    duration_terms: "2 days".to_string(),
                },
                QuoteTemplate {
                    amount: "7.49".to_string(),
                    provider: "UPS".to_string(),
                    service_level: "Ground".to_string(),
                    duration_terms: "5 days".to_string(),
                },
            ],
            rates: HashMap::new(),
            next_id: 0,
            parcel_count: 0,
            shipment_count: 0,
            label_count: 0,
            fail_on_create_shipment: false,
            fail_on_retrieve_rate: false,
            fail_on_purchase_label: false,
        }
    }
}

/// In-memory shipping service for testing.
///
/// Every shipment is quoted with the configured templates; quoted rates
/// stay retrievable by id for the rest of the service's lifetime.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShippingService {
    state: Arc<RwLock<InMemoryShippingState>>,
}

impl InMemoryShippingService {
    /// Creates a new in-memory shipping service with default quotes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the quote templates used for new shipments.
    pub fn set_quotes(&self, quotes: Vec<QuoteTemplate>) {
        self.state.write().unwrap().quotes = quotes;
    }

    /// Configures the service to fail on the next create_shipment call.
    pub fn set_fail_on_create_shipment(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create_shipment = fail;
    }

    /// Configures the service to fail on the next retrieve_rate call.
    pub fn set_fail_on_retrieve_rate(&self, fail: bool) {
        self.state.write().unwrap().fail_on_retrieve_rate = fail;
    }

    /// Configures the service to fail on the next purchase_label call.
    pub fn set_fail_on_purchase_label(&self, fail: bool) {
        self.state.write().unwrap().fail_on_purchase_label = fail;
    }

    /// Returns the number of parcels created.
    pub fn parcel_count(&self) -> usize {
        self.state.read().unwrap().parcel_count
    }

    /// Returns the number of shipments quoted.
    pub fn shipment_count(&self) -> usize {
        self.state.read().unwrap().shipment_count
    }

    /// Returns the number of labels purchased.
    pub fn label_count(&self) -> usize {
        self.state.read().unwrap().label_count
    }

    /// The first quoted rate id, if any shipment was created.
    pub fn first_rate_id(&self) -> Option<String> {
        let state = self.state.read().unwrap();
        let mut ids: Vec<&String> = state.rates.keys().collect();
        ids.sort();
        ids.first().map(|id| (*id).to_string())
    }
}

#[async_trait]
impl ShippingService for InMemoryShippingService {
    async fn create_address(&self, _address: &Address) -> Result<String, ServiceError> {
        let mut state = self.state.write().unwrap();
        state.next_id += 1;
        Ok(format!("ADDR-{:04}", state.next_id))
    }

    async fn create_parcel(&self, _parcel: &ParcelSpec) -> Result<String, ServiceError> {
        let mut state = self.state.write().unwrap();
        state.next_id += 1;
        state.parcel_count += 1;
        Ok(format!("PARCEL-{:04}", state.next_id))
    }

    async fn create_shipment(
        &self,
        _from: &str,
        _to: &str,
        _parcels: &[String],
    ) -> Result<Shipment, ServiceError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create_shipment {
            return Err(ServiceError::Shipping("Quoting unavailable".to_string()));
        }

        state.next_id += 1;
        let shipment_id = format!("SHIPMENT-{:04}", state.next_id);
        state.shipment_count += 1;

        let quotes = state.quotes.clone();
        let mut rates = Vec::with_capacity(quotes.len());
        for quote in quotes {
            state.next_id += 1;
            let rate = ShippingRate {
                id: format!("RATE-{:04}", state.next_id),
                amount: quote.amount,
                provider: quote.provider,
                service_level: quote.service_level,
                duration_terms: quote.duration_terms,
            };
            state.rates.insert(rate.id.clone(), rate.clone());
            rates.push(rate);
        }

        Ok(Shipment {
            id: shipment_id,
            rates,
        })
    }

    async fn retrieve_rate(&self, rate_id: &str) -> Result<ShippingRate, ServiceError> {
        let state = self.state.read().unwrap();

        if state.fail_on_retrieve_rate {
            return Err(ServiceError::Shipping("Rate lookup unavailable".to_string()));
        }

        state
            .rates
            .get(rate_id)
            .cloned()
            .ok_or_else(|| ServiceError::Shipping(format!("Unknown rate `{rate_id}`")))
    }

    async fn purchase_label(&self, rate_id: &str) -> Result<ShippingLabel, ServiceError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_purchase_label {
            return Err(ServiceError::Shipping("Label purchase failed".to_string()));
        }

        if !state.rates.contains_key(rate_id) {
            return Err(ServiceError::Shipping(format!("Unknown rate `{rate_id}`")));
        }

        state.next_id += 1;
        let serial = state.next_id;
        state.label_count += 1;

        Ok(ShippingLabel {
            id: format!("LABEL-{serial:04}"),
            tracking_id: format!("TRACK-{serial:04}"),
            label_url: format!("https://labels.example.com/LABEL-{serial:04}.pdf"),
            status: "SUCCESS".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address::new("Jane", "1 Main St", "Seattle", "WA", "98101", "US")
    }

    #[tokio::test]
    async fn test_quote_and_retrieve_rate() {
        let service = InMemoryShippingService::new();

        let from = service.create_address(&address()).await.unwrap();
        let to = service.create_address(&address()).await.unwrap();
        let parcel = service
            .create_parcel(&ParcelSpec {
                length: 10.0,
                width: 5.0,
                height: 2.0,
                weight: 12.0,
            })
            .await
            .unwrap();

        let shipment = service
            .create_shipment(&from, &to, &[parcel])
            .await
            .unwrap();
        assert_eq!(shipment.rates.len(), 2);
        assert_eq!(service.shipment_count(), 1);
        assert_eq!(service.parcel_count(), 1);

        let rate = service.retrieve_rate(&shipment.rates[0].id).await.unwrap();
        assert_eq!(rate, shipment.rates[0]);
    }

    #[tokio::test]
    async fn test_unknown_rate_errors() {
        let service = InMemoryShippingService::new();
        let result = service.retrieve_rate("RATE-9999").await;
        assert!(matches!(result, Err(ServiceError::Shipping(_))));
    }

    #[tokio::test]
    async fn test_purchase_label() {
        let service = InMemoryShippingService::new();
        let shipment = service.create_shipment("a", "b", &[]).await.unwrap();

        let label = service
            .purchase_label(&shipment.rates[0].id)
            .await
            .unwrap();
        assert!(label.id.starts_with("LABEL-"));
        assert!(label.tracking_id.starts_with("TRACK-"));
        assert_eq!(label.status, "SUCCESS");
        assert_eq!(service.label_count(), 1);
    }

    #[tokio::test]
    async fn test_fail_on_create_shipment() {
        let service = InMemoryShippingService::new();
        service.set_fail_on_create_shipment(true);

        let result = service.create_shipment("a", "b", &[]).await;
        assert!(result.is_err());
        assert_eq!(service.shipment_count(), 0);
    }
}
