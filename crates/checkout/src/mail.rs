//! Confirmation mail bodies.
//!
//! Templating proper lives outside this workspace; these are the plain-text
//! fallbacks the saga sends best-effort.

use common::TransactionId;

pub(crate) fn purchase_body(base_url: &str, transaction_id: TransactionId) -> String {
    format!(
        "Thanks for your purchase!\n\n\
         Your order number is {transaction_id}.\n\
         View your receipt at {base_url}/receipt/{transaction_id}\n"
    )
}

pub(crate) fn shipped_body(base_url: &str, tracking_id: &str) -> String {
    format!(
        "Your order has shipped.\n\n\
         Tracking number: {tracking_id}\n\
         Track your package from {base_url}/orders\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodies_mention_the_key_facts() {
        let purchase = purchase_body("https://shop.example.com", TransactionId::new(42));
        assert!(purchase.contains("42"));
        assert!(purchase.contains("https://shop.example.com/receipt/42"));

        let shipped = shipped_body("https://shop.example.com", "TRACK-0001");
        assert!(shipped.contains("TRACK-0001"));
    }
}
