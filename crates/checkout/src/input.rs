//! Checkout mutation input.

use catalog::CartKey;
use common::{AddressId, Money};
use store::Address;

/// Which address a buyer chose: one already saved to their account, or a
/// new one entered inline (optionally saved for next time).
#[derive(Debug, Clone)]
pub enum AddressSelection {
    Saved(AddressId),
    New { address: Address, save: bool },
}

/// Everything the client declares for a purchase.
///
/// `declared_total` is what the client showed the buyer; the saga recomputes
/// every component and refuses to charge anything else.
#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub payment_nonce: String,
    pub billing: AddressSelection,
    pub shipping: AddressSelection,
    pub declared_total: Money,
    pub shipping_rate_id: String,
    pub cart: CartKey,
}
