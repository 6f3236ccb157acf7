//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, TransactionId};
use serde::{Deserialize, Serialize};
use store::Address;

use crate::error::ServiceError;

/// One purchased line, as reported to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureLineItem {
    pub name: String,
    pub quantity: i64,
    pub unit_amount: Money,
    pub total_amount: Money,
}

/// A capture submission.
///
/// `order_id` is the local transaction row id and doubles as the
/// gateway-side idempotency key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub order_id: TransactionId,
    pub amount: Money,
    pub tax_amount: Money,
    pub line_items: Vec<CaptureLineItem>,
    pub shipping_address: Address,
    pub payment_nonce: String,
}

/// Result of a successful capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    /// The transaction id assigned by the gateway.
    pub gateway_transaction_id: String,
}

/// Trait for payment capture operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Submits a sale for settlement.
    async fn capture(&self, request: CaptureRequest) -> Result<Capture, ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    captures: HashMap<String, CaptureRequest>,
    next_id: u32,
    fail_on_capture: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline the next capture.
    pub fn set_fail_on_capture(&self, fail: bool) {
        self.state.write().unwrap().fail_on_capture = fail;
    }

    /// Returns the number of settled captures.
    pub fn capture_count(&self) -> usize {
        self.state.read().unwrap().captures.len()
    }

    /// Returns true if a capture exists with the given gateway id.
    pub fn has_capture(&self, gateway_id: &str) -> bool {
        self.state.read().unwrap().captures.contains_key(gateway_id)
    }

    /// The most recently settled capture, if any.
    pub fn last_capture(&self) -> Option<CaptureRequest> {
        let state = self.state.read().unwrap();
        let mut ids: Vec<&String> = state.captures.keys().collect();
        ids.sort();
        ids.last().and_then(|id| state.captures.get(*id)).cloned()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn capture(&self, request: CaptureRequest) -> Result<Capture, ServiceError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_capture {
            return Err(ServiceError::Payment("Payment declined".to_string()));
        }

        state.next_id += 1;
        let gateway_transaction_id = format!("PAY-{:04}", state.next_id);
        state
            .captures
            .insert(gateway_transaction_id.clone(), request);

        Ok(Capture {
            gateway_transaction_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CaptureRequest {
        CaptureRequest {
            order_id: TransactionId::new(1),
            amount: Money::from_cents(2799),
            tax_amount: Money::from_cents(200),
            line_items: vec![CaptureLineItem {
                name: "Widget".to_string(),
                quantity: 2,
                unit_amount: Money::from_cents(500),
                total_amount: Money::from_cents(1000),
            }],
            shipping_address: Address::new("Jane", "1 Main St", "Seattle", "WA", "98101", "US"),
            payment_nonce: "nonce-abc".to_string(),
        }
    }

    #[tokio::test]
    async fn test_capture_records_request() {
        let gateway = InMemoryPaymentGateway::new();

        let capture = gateway.capture(request()).await.unwrap();
        assert_eq!(capture.gateway_transaction_id, "PAY-0001");
        assert_eq!(gateway.capture_count(), 1);
        assert!(gateway.has_capture("PAY-0001"));

        let recorded = gateway.last_capture().unwrap();
        assert_eq!(recorded.amount, Money::from_cents(2799));
        assert_eq!(recorded.order_id, TransactionId::new(1));
    }

    #[tokio::test]
    async fn test_fail_on_capture() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_capture(true);

        let result = gateway.capture(request()).await;
        assert!(matches!(result, Err(ServiceError::Payment(_))));
        assert_eq!(gateway.capture_count(), 0);
    }

    #[tokio::test]
    async fn test_sequential_gateway_ids() {
        let gateway = InMemoryPaymentGateway::new();

        let first = gateway.capture(request()).await.unwrap();
        let second = gateway.capture(request()).await.unwrap();
        assert_eq!(first.gateway_transaction_id, "PAY-0001");
        assert_eq!(second.gateway_transaction_id, "PAY-0002");
    }
}
