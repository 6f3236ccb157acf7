//! Tax service trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use store::Address;

use crate::error::ServiceError;

/// One component of a combined tax rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRateLine {
    pub rate: f64,
    pub name: String,
    pub kind: String,
}

/// The tax rates applicable to one address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRates {
    /// The combined rate applied to a subtotal.
    pub total_rate: f64,
    pub rates: Vec<TaxRateLine>,
}

/// Trait for tax rate lookups.
#[async_trait]
pub trait TaxService: Send + Sync {
    /// Resolves the tax rates for a destination address.
    async fn rates_for_address(&self, address: &Address) -> Result<TaxRates, ServiceError>;
}

#[derive(Debug)]
struct InMemoryTaxState {
    total_rate: f64,
    fail_on_rates: bool,
    calls: usize,
}

impl Default for InMemoryTaxState {
    fn default() -> Self {
        Self {
            total_rate: 0.1,
            fail_on_rates: false,
            calls: 0,
        }
    }
}

/// In-memory tax service for testing. Quotes a flat combined rate
/// (default `0.1`) for every address.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaxService {
    state: Arc<RwLock<InMemoryTaxState>>,
}

impl InMemoryTaxService {
    /// Creates a new in-memory tax service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flat combined rate returned for every address.
    pub fn set_total_rate(&self, rate: f64) {
        self.state.write().unwrap().total_rate = rate;
    }

    /// Configures the service to fail on the next lookup.
    pub fn set_fail_on_rates(&self, fail: bool) {
        self.state.write().unwrap().fail_on_rates = fail;
    }

    /// Returns the number of lookups performed.
    pub fn call_count(&self) -> usize {
        self.state.read().unwrap().calls
    }
}

#[async_trait]
impl TaxService for InMemoryTaxService {
    async fn rates_for_address(&self, _address: &Address) -> Result<TaxRates, ServiceError> {
        let mut state = self.state.write().unwrap();
        state.calls += 1;

        if state.fail_on_rates {
            return Err(ServiceError::Tax("Rate lookup unavailable".to_string()));
        }

        Ok(TaxRates {
            total_rate: state.total_rate,
            rates: vec![TaxRateLine {
                rate: state.total_rate,
                name: "Combined".to_string(),
                kind: "Combined".to_string(),
            }],
        })
    }
}
