//! Lookup keys with canonical cache strings.

use common::{OptionValueId, ProductId, VariantId};
use loader::Key;
use serde::{Deserialize, Serialize};
use store::Address;

/// Page length used when a caller provides no usable limit.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// One cart line: a purchasable variant and how many of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub variant_id: VariantId,
    pub quantity: i64,
}

/// The contents of a cart, normalized for caching.
///
/// Entries are sorted ascending by variant id at construction, so two
/// carts with the same lines in different order canonicalize identically
/// and hit the same cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartKey {
    entries: Vec<CartEntry>,
}

impl CartKey {
    pub fn new(mut entries: Vec<CartEntry>) -> Self {
        entries.sort_by_key(|entry| entry.variant_id);
        Self { entries }
    }

    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct variant ids, in canonical order.
    pub fn variant_ids(&self) -> Vec<VariantId> {
        let mut ids: Vec<VariantId> = self.entries.iter().map(|entry| entry.variant_id).collect();
        ids.dedup();
        ids
    }
}

impl Key for CartKey {
    fn canonical(&self) -> String {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|entry| format!("{}|{}", entry.variant_id, entry.quantity))
            .collect();
        parts.join(",")
    }
}

/// A `skip|limit` page window.
///
/// A negative skip clamps to 0; a non-positive limit falls back to
/// [`DEFAULT_PAGE_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationKey {
    skip: i64,
    limit: i64,
}

impl PaginationKey {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip: skip.max(0),
            limit: if limit <= 0 { DEFAULT_PAGE_SIZE } else { limit },
        }
    }

    pub fn skip(&self) -> i64 {
        self.skip
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }
}

impl Key for PaginationKey {
    fn canonical(&self) -> String {
        format!("{}|{}", self.skip, self.limit)
    }
}

/// A product plus the option values a buyer has picked so far.
///
/// Option order is caller-supplied and preserved — it is part of the
/// lookup, not normalized away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOptionsKey {
    pub product_id: ProductId,
    pub selected: Vec<OptionValueId>,
}

impl SelectedOptionsKey {
    pub fn new(product_id: ProductId, selected: Vec<OptionValueId>) -> Self {
        Self {
            product_id,
            selected,
        }
    }
}

impl Key for SelectedOptionsKey {
    fn canonical(&self) -> String {
        let options: Vec<String> = self.selected.iter().map(|id| id.to_string()).collect();
        format!("{}|{}", self.product_id, options.join(","))
    }
}

/// An address rendered into a fixed field order, for tax-rate caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressKey(pub Address);

impl Key for AddressKey {
    fn canonical(&self) -> String {
        let address = &self.0;
        [
            address.line1.as_str(),
            address.line2.as_str(),
            address.line3.as_str(),
            address.city.as_str(),
            address.region.as_str(),
            address.postal_code.as_str(),
            address.country.as_str(),
        ]
        .join("|")
    }
}

/// Destination plus cart contents, for shipping estimation caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationKey {
    pub address: Address,
    pub cart: CartKey,
}

impl Key for EstimationKey {
    fn canonical(&self) -> String {
        format!(
            "{}***{}",
            AddressKey(self.address.clone()).canonical(),
            self.cart.canonical()
        )
    }
}
