//! Row types for the relational store.
//!
//! Lifecycle entities carry `deleted_at`: soft-deleted rows are filtered
//! from normal reads but stay resolvable through the `_with_deleted`
//! selects, so settled transactions keep rendering their line items.
//! Hard deletion exists only to undo an in-flight, never-committed saga
//! step.

use chrono::{DateTime, Utc};
use common::{AddressId, Money, OptionId, OptionValueId, ProductId, TransactionId, UserId, VariantId};
use serde::{Deserialize, Serialize};

/// Initial status of every transaction.
pub const STATUS_RECEIVED: &str = "RECEIVED";
/// Status recorded when a shipping label is purchased.
pub const STATUS_SHIPPED: &str = "SHIPPED";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub details: String,
    pub published: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    /// New unsaved row; the store assigns the id on insert.
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ProductId::new(0),
            slug: slug.into(),
            name: name.into(),
            description: String::new(),
            details: String::new(),
            published: false,
            deleted_at: None,
        }
    }

    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductOption {
    pub id: OptionId,
    pub label: String,
    pub product_id: ProductId,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ProductOption {
    pub fn new(product_id: ProductId, label: impl Into<String>) -> Self {
        Self {
            id: OptionId::new(0),
            label: label.into(),
            product_id,
            deleted_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductOptionValue {
    pub id: OptionValueId,
    pub value: String,
    pub option_id: OptionId,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ProductOptionValue {
    pub fn new(option_id: OptionId, value: impl Into<String>) -> Self {
        Self {
            id: OptionValueId::new(0),
            value: value.into(),
            option_id,
            deleted_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    /// Display name; falls back to the product name when empty.
    pub name: String,
    pub price: Money,
    /// Physical dimensions in inches and ounces, for parcel construction.
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
    pub product_id: ProductId,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ProductVariant {
    pub fn new(product_id: ProductId, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: VariantId::new(0),
            name: name.into(),
            price,
            length: 1.0,
            width: 1.0,
            height: 1.0,
            weight: 1.0,
            product_id,
            deleted_at: None,
        }
    }

    pub fn with_dimensions(mut self, length: f64, width: f64, height: f64, weight: f64) -> Self {
        self.length = length;
        self.width = width;
        self.height = height;
        self.weight = weight;
        self
    }
}

/// Link between a variant and one of its selected option values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantOptionLink {
    pub variant_id: VariantId,
    pub option_value_id: OptionValueId,
    pub product_id: ProductId,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl VariantOptionLink {
    pub fn new(variant_id: VariantId, option_value_id: OptionValueId, product_id: ProductId) -> Self {
        Self {
            variant_id,
            option_value_id,
            product_id,
            deleted_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub name: String,
    pub line1: String,
    pub line2: String,
    pub line3: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    pub user_id: Option<UserId>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Address {
    pub fn new(
        name: impl Into<String>,
        line1: impl Into<String>,
        city: impl Into<String>,
        region: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            id: AddressId::new(0),
            name: name.into(),
            line1: line1.into(),
            line2: String::new(),
            line3: String::new(),
            city: city.into(),
            region: region.into(),
            postal_code: postal_code.into(),
            country: country.into(),
            user_id: None,
            deleted_at: None,
        }
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub role: String,
}

impl User {
    pub fn new(email: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: UserId::new(0),
            email: email.into(),
            role: role.into(),
        }
    }
}

/// Transaction header: the money breakdown plus external references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub subtotal: Money,
    pub taxes: Money,
    pub shipping: Money,
    pub total: Money,
    /// Payment gateway transaction id, recorded after a successful capture.
    pub gateway_id: String,
    /// The shipping rate the buyer chose at checkout.
    pub shipping_rate_id: String,
    /// Purchased shipping label id, recorded when the order ships.
    pub label_id: String,
    pub user_id: Option<UserId>,
}

impl Transaction {
    pub fn new(
        subtotal: Money,
        taxes: Money,
        shipping: Money,
        total: Money,
        shipping_rate_id: impl Into<String>,
        user_id: Option<UserId>,
    ) -> Self {
        Self {
            id: TransactionId::new(0),
            subtotal,
            taxes,
            shipping,
            total,
            gateway_id: String::new(),
            shipping_rate_id: shipping_rate_id.into(),
            label_id: String::new(),
            user_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStatus {
    pub id: i64,
    pub transaction_id: TransactionId,
    pub status: String,
    pub carrier: String,
    pub tracking_id: String,
    pub created_at: DateTime<Utc>,
}

impl TransactionStatus {
    pub fn received(transaction_id: TransactionId) -> Self {
        Self {
            id: 0,
            transaction_id,
            status: STATUS_RECEIVED.to_string(),
            carrier: String::new(),
            tracking_id: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn shipped(transaction_id: TransactionId, carrier: &str, tracking_id: &str) -> Self {
        Self {
            id: 0,
            transaction_id,
            status: STATUS_SHIPPED.to_string(),
            carrier: carrier.to_string(),
            tracking_id: tracking_id.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Links a transaction to its billing and shipping addresses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransactionAddressInfo {
    pub id: i64,
    pub transaction_id: TransactionId,
    pub billing_address_id: AddressId,
    pub shipping_address_id: AddressId,
}

impl TransactionAddressInfo {
    pub fn new(
        transaction_id: TransactionId,
        billing_address_id: AddressId,
        shipping_address_id: AddressId,
    ) -> Self {
        Self {
            id: 0,
            transaction_id,
            billing_address_id,
            shipping_address_id,
        }
    }
}

/// One purchased cart line, priced at checkout time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransactionLineItem {
    pub id: i64,
    pub transaction_id: TransactionId,
    pub variant_id: VariantId,
    pub price: Money,
    pub quantity: i64,
}

impl TransactionLineItem {
    pub fn new(
        transaction_id: TransactionId,
        variant_id: VariantId,
        price: Money,
        quantity: i64,
    ) -> Self {
        Self {
            id: 0,
            transaction_id,
            variant_id,
            price,
            quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_builder_sets_dimensions() {
        let variant = ProductVariant::new(ProductId::new(1), "Large", Money::from_cents(500))
            .with_dimensions(10.0, 5.0, 2.0, 12.0);
        assert_eq!(variant.length, 10.0);
        assert_eq!(variant.weight, 12.0);
    }

    #[test]
    fn status_constructors() {
        let received = TransactionStatus::received(TransactionId::new(1));
        assert_eq!(received.status, STATUS_RECEIVED);
        assert!(received.carrier.is_empty());

        let shipped = TransactionStatus::shipped(TransactionId::new(1), "USPS", "TRACK-0001");
        assert_eq!(shipped.status, STATUS_SHIPPED);
        assert_eq!(shipped.carrier, "USPS");
        assert_eq!(shipped.tracking_id, "TRACK-0001");
    }

    #[test]
    fn rows_serialize_roundtrip() {
        let item = TransactionLineItem::new(
            TransactionId::new(3),
            VariantId::new(7),
            Money::from_cents(999),
            2,
        );
        let json = serde_json::to_string(&item).unwrap();
        let back: TransactionLineItem = serde_json::from_str(&json).unwrap();
        assert_eq!(item, back);
    }
}
