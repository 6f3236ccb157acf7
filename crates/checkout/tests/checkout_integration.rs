//! End-to-end checkout saga behavior over the in-memory collaborators.

use std::sync::Arc;

use catalog::{CartEntry, CartKey, LoaderRegistry};
use checkout::{AddressSelection, CheckoutCoordinator, CheckoutError, CheckoutInput, Config};
use common::{Claims, Money, Role, UserId, VariantId};
use services::{
    InMemoryMailer, InMemoryPaymentGateway, InMemoryShippingService, InMemoryTaxService,
};
use store::{Address, InMemoryStore, Product, ProductVariant, Store, User, STATUS_RECEIVED,
    STATUS_SHIPPED};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

struct Harness {
    store: InMemoryStore,
    tax: InMemoryTaxService,
    shipping: InMemoryShippingService,
    payment: InMemoryPaymentGateway,
    mailer: InMemoryMailer,
    coordinator: CheckoutCoordinator,
    config: Config,
    buyer: User,
    /// $5.00 variant.
    v1: VariantId,
    /// $10.00 variant.
    v2: VariantId,
    /// $2.50 variant.
    v3: VariantId,
}

impl Harness {
    async fn new() -> Self {
        init_tracing();
        let store = InMemoryStore::new();
        let tax = InMemoryTaxService::new();
        tax.set_total_rate(0.1);
        let shipping = InMemoryShippingService::new();
        let payment = InMemoryPaymentGateway::new();
        let mailer = InMemoryMailer::new();
        let config = Config::default();

        let buyer = store.seed_user(User::new("jane@example.com", "customer")).await;
        let product = store
            .seed_product(Product::new("widget", "Widget").published())
            .await;
        let v1 = store
            .seed_variant(ProductVariant::new(product.id, "", Money::from_cents(500)))
            .await
            .id;
        let v2 = store
            .seed_variant(ProductVariant::new(
                product.id,
                "Deluxe",
                Money::from_cents(1000),
            ))
            .await
            .id;
        let v3 = store
            .seed_variant(ProductVariant::new(product.id, "", Money::from_cents(250)))
            .await
            .id;

        let coordinator = CheckoutCoordinator::new(
            Arc::new(store.clone()),
            Arc::new(shipping.clone()),
            Arc::new(payment.clone()),
            Arc::new(mailer.clone()),
            config.clone(),
        );

        Self {
            store,
            tax,
            shipping,
            payment,
            mailer,
            coordinator,
            config,
            buyer,
            v1,
            v2,
            v3,
        }
    }

    fn registry(&self) -> LoaderRegistry {
        LoaderRegistry::new(
            Arc::new(self.store.clone()),
            Arc::new(self.tax.clone()),
            Arc::new(self.shipping.clone()),
            self.config.ship_from.clone(),
        )
    }

    fn claims(&self) -> Claims {
        Claims::new(self.buyer.id, "jane@example.com", Role::Customer)
    }

    fn destination(&self) -> Address {
        Address::new("Jane", "1 Main St", "Portland", "OR", "97201", "US")
    }

    fn cart(&self, entries: &[(VariantId, i64)]) -> CartKey {
        CartKey::new(
            entries
                .iter()
                .map(|(variant_id, quantity)| CartEntry {
                    variant_id: *variant_id,
                    quantity: *quantity,
                })
                .collect(),
        )
    }

    /// Quotes shipping for the cart and returns the first rate id ($5.99).
    async fn quoted_rate(&self, loaders: &LoaderRegistry, cart: &CartKey) -> String {
        let estimates = loaders
            .estimate_shipping(self.destination(), cart.clone())
            .await
            .unwrap();
        estimates[0].id.clone()
    }

    fn input(&self, cart: CartKey, rate_id: String, declared_total: Money) -> CheckoutInput {
        CheckoutInput {
            payment_nonce: "nonce-abc".to_string(),
            billing: AddressSelection::New {
                address: self.destination(),
                save: false,
            },
            shipping: AddressSelection::New {
                address: self.destination(),
                save: false,
            },
            declared_total,
            shipping_rate_id: rate_id,
            cart,
        }
    }

    async fn assert_no_attempt_rows(&self) {
        assert_eq!(self.store.transaction_count().await, 0);
        assert_eq!(self.store.status_count().await, 0);
        assert_eq!(self.store.address_info_count().await, 0);
        assert_eq!(self.store.line_item_count().await, 0);
    }
}

#[tokio::test]
async fn checkout_settles_with_the_expected_breakdown() {
    let harness = Harness::new().await;
    let loaders = harness.registry();
    let cart = harness.cart(&[(harness.v1, 2), (harness.v2, 1)]);
    let rate = harness.quoted_rate(&loaders, &cart).await;

    // subtotal 2000, taxes 200, shipping 599.
    let claims = harness.claims();
    let transaction = harness
        .coordinator
        .run_checkout(
            &loaders,
            Some(&claims),
            harness.input(cart, rate, Money::from_cents(2799)),
        )
        .await
        .unwrap();

    assert_eq!(transaction.subtotal, Money::from_cents(2000));
    assert_eq!(transaction.taxes, Money::from_cents(200));
    assert_eq!(transaction.shipping, Money::from_cents(599));
    assert_eq!(transaction.total, Money::from_cents(2799));
    assert_eq!(transaction.gateway_id, "PAY-0001");
    assert_eq!(transaction.user_id, Some(harness.buyer.id));

    // Local record set is complete.
    assert_eq!(harness.store.transaction_count().await, 1);
    assert_eq!(harness.store.status_count().await, 1);
    assert_eq!(harness.store.address_info_count().await, 1);
    assert_eq!(harness.store.line_item_count().await, 2);

    // Gateway id was persisted, and the capture carried the idempotent
    // order id plus the validated amounts.
    let stored = harness
        .store
        .transactions_by_ids(&[transaction.id])
        .await
        .unwrap();
    assert_eq!(stored[0].gateway_id, "PAY-0001");

    let capture = harness.payment.last_capture().unwrap();
    assert_eq!(capture.order_id, transaction.id);
    assert_eq!(capture.amount, Money::from_cents(2799));
    assert_eq!(capture.tax_amount, Money::from_cents(200));
    assert_eq!(capture.line_items.len(), 2);
    // The unnamed variant fell back to the product name.
    assert!(capture.line_items.iter().any(|item| item.name == "Widget"));
    assert!(capture.line_items.iter().any(|item| item.name == "Deluxe"));

    // Confirmation mail went to the authenticated buyer.
    assert_eq!(harness.mailer.sent_count(), 1);
    let mail = harness.mailer.last_mail().unwrap();
    assert_eq!(mail.to, "jane@example.com");
    assert_eq!(mail.subject, "Thanks for your purchase.");

    let statuses = harness
        .store
        .statuses_for_transactions(&[transaction.id])
        .await
        .unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].status, STATUS_RECEIVED);
}

#[tokio::test]
async fn anonymous_checkout_settles_without_mail() {
    let harness = Harness::new().await;
    let loaders = harness.registry();
    let cart = harness.cart(&[(harness.v1, 1)]);
    let rate = harness.quoted_rate(&loaders, &cart).await;

    // subtotal 500, taxes 50, shipping 599.
    let transaction = harness
        .coordinator
        .run_checkout(&loaders, None, harness.input(cart, rate, Money::from_cents(1149)))
        .await
        .unwrap();

    assert_eq!(transaction.user_id, None);
    assert_eq!(harness.mailer.sent_count(), 0);
    assert_eq!(harness.payment.capture_count(), 1);
}

#[tokio::test]
async fn declared_total_mismatch_aborts_with_no_writes() {
    let harness = Harness::new().await;
    let loaders = harness.registry();
    let cart = harness.cart(&[(harness.v1, 2), (harness.v2, 1)]);
    let rate = harness.quoted_rate(&loaders, &cart).await;

    let claims = harness.claims();
    let result = harness
        .coordinator
        .run_checkout(
            &loaders,
            Some(&claims),
            harness.input(cart, rate, Money::from_cents(2800)),
        )
        .await;

    match result {
        Err(CheckoutError::TotalMismatch {
            declared,
            calculated,
        }) => {
            assert_eq!(declared, Money::from_cents(2800));
            assert_eq!(calculated, Money::from_cents(2799));
        }
        other => panic!("expected TotalMismatch, got {other:?}"),
    }

    harness.assert_no_attempt_rows().await;
    assert_eq!(harness.payment.capture_count(), 0);
    assert_eq!(harness.mailer.sent_count(), 0);
}

#[tokio::test]
async fn line_item_failure_compensates_every_row() {
    let harness = Harness::new().await;
    let loaders = harness.registry();
    let cart = harness.cart(&[(harness.v1, 1), (harness.v2, 1), (harness.v3, 1)]);
    let rate = harness.quoted_rate(&loaders, &cart).await;

    // Second of three line items fails: subtotal 1750, taxes 175, ship 599.
    harness.store.set_line_item_failure_after(1).await;

    let claims = harness.claims();
    let result = harness
        .coordinator
        .run_checkout(
            &loaders,
            Some(&claims),
            harness.input(cart, rate, Money::from_cents(2524)),
        )
        .await;

    assert!(matches!(result, Err(CheckoutError::Persist(_))));
    harness.assert_no_attempt_rows().await;
    // The attempt's inline addresses were unwound too.
    assert_eq!(harness.store.address_count().await, 0);
    assert_eq!(harness.payment.capture_count(), 0);
}

#[tokio::test]
async fn payment_failure_unwinds_the_whole_attempt() {
    let harness = Harness::new().await;
    let loaders = harness.registry();
    let cart = harness.cart(&[(harness.v1, 2), (harness.v2, 1)]);
    let rate = harness.quoted_rate(&loaders, &cart).await;

    harness.payment.set_fail_on_capture(true);

    let claims = harness.claims();
    let result = harness
        .coordinator
        .run_checkout(
            &loaders,
            Some(&claims),
            harness.input(cart, rate, Money::from_cents(2799)),
        )
        .await;

    // The gateway error comes back unwrapped.
    assert!(matches!(result, Err(CheckoutError::Payment(_))));

    // Header, status, address link, line items and attempt addresses are
    // all gone, not just the header.
    harness.assert_no_attempt_rows().await;
    assert_eq!(harness.store.address_count().await, 0);
    assert_eq!(harness.mailer.sent_count(), 0);
}

#[tokio::test]
async fn status_insert_failure_compensates_the_header() {
    let harness = Harness::new().await;
    let loaders = harness.registry();
    let cart = harness.cart(&[(harness.v1, 1)]);
    let rate = harness.quoted_rate(&loaders, &cart).await;

    harness.store.set_fail_on_insert_status(true).await;

    let claims = harness.claims();
    let result = harness
        .coordinator
        .run_checkout(
            &loaders,
            Some(&claims),
            harness.input(cart, rate, Money::from_cents(1149)),
        )
        .await;

    assert!(matches!(result, Err(CheckoutError::Persist(_))));
    harness.assert_no_attempt_rows().await;
}

#[tokio::test]
async fn saving_an_address_requires_authentication() {
    let harness = Harness::new().await;
    let loaders = harness.registry();
    let cart = harness.cart(&[(harness.v1, 1)]);
    let rate = harness.quoted_rate(&loaders, &cart).await;

    let mut input = harness.input(cart, rate, Money::from_cents(1149));
    input.billing = AddressSelection::New {
        address: harness.destination(),
        save: true,
    };

    let result = harness.coordinator.run_checkout(&loaders, None, input).await;
    assert!(matches!(result, Err(CheckoutError::NotAuthenticated)));
    harness.assert_no_attempt_rows().await;
    assert_eq!(harness.store.address_count().await, 0);
}

#[tokio::test]
async fn saved_addresses_are_reused_and_survive_failures() {
    let harness = Harness::new().await;
    let saved = harness
        .store
        .seed_address(harness.destination().with_user(harness.buyer.id))
        .await;

    let loaders = harness.registry();
    let cart = harness.cart(&[(harness.v1, 1)]);
    let rate = harness.quoted_rate(&loaders, &cart).await;

    harness.payment.set_fail_on_capture(true);

    let claims = harness.claims();
    let mut input = harness.input(cart, rate, Money::from_cents(1149));
    input.billing = AddressSelection::Saved(saved.id);
    input.shipping = AddressSelection::Saved(saved.id);

    let result = harness
        .coordinator
        .run_checkout(&loaders, Some(&claims), input)
        .await;
    assert!(matches!(result, Err(CheckoutError::Payment(_))));

    // Compensation never touches the buyer's saved address book.
    assert_eq!(harness.store.address_count().await, 1);
}

#[tokio::test]
async fn unknown_saved_address_fails_before_pricing() {
    let harness = Harness::new().await;
    let loaders = harness.registry();
    let cart = harness.cart(&[(harness.v1, 1)]);
    let rate = harness.quoted_rate(&loaders, &cart).await;

    let claims = harness.claims();
    let mut input = harness.input(cart, rate, Money::from_cents(1149));
    input.billing = AddressSelection::Saved(common::AddressId::new(424242));

    let result = harness
        .coordinator
        .run_checkout(&loaders, Some(&claims), input)
        .await;
    assert!(matches!(result, Err(CheckoutError::AddressNotFound(_))));
    harness.assert_no_attempt_rows().await;
}

#[tokio::test]
async fn tax_failure_aborts_before_any_write() {
    let harness = Harness::new().await;
    let loaders = harness.registry();
    let cart = harness.cart(&[(harness.v1, 1)]);
    let rate = harness.quoted_rate(&loaders, &cart).await;

    harness.tax.set_fail_on_rates(true);

    let claims = harness.claims();
    let result = harness
        .coordinator
        .run_checkout(
            &loaders,
            Some(&claims),
            harness.input(cart, rate, Money::from_cents(1149)),
        )
        .await;

    assert!(matches!(result, Err(CheckoutError::Tax(_))));
    harness.assert_no_attempt_rows().await;
}

#[tokio::test]
async fn stale_rate_ids_are_rejected() {
    let harness = Harness::new().await;
    let loaders = harness.registry();
    let cart = harness.cart(&[(harness.v1, 1)]);

    let claims = harness.claims();
    let result = harness
        .coordinator
        .run_checkout(
            &loaders,
            Some(&claims),
            harness.input(cart, "RATE-9999".to_string(), Money::from_cents(1149)),
        )
        .await;

    assert!(matches!(result, Err(CheckoutError::RateUnavailable(_))));
    harness.assert_no_attempt_rows().await;
}

#[tokio::test]
async fn checkout_clears_the_registry_caches() {
    let harness = Harness::new().await;
    let loaders = harness.registry();
    let cart = harness.cart(&[(harness.v1, 2), (harness.v2, 1)]);
    // Quote through a throwaway registry so the estimation's variant loads
    // don't pre-warm the caches under test.
    let rate = harness.quoted_rate(&harness.registry(), &cart).await;

    // Warm the subtotal cache: one purchasable-variant read.
    loaders.subtotal.load(cart.clone()).await.unwrap();
    let warmed = harness.store.variant_read_calls().await;

    let claims = harness.claims();
    harness
        .coordinator
        .run_checkout(
            &loaders,
            Some(&claims),
            harness.input(cart.clone(), rate, Money::from_cents(2799)),
        )
        .await
        .unwrap();

    // The mutation evicted every cache: the same subtotal key fetches again.
    let after_checkout = harness.store.variant_read_calls().await;
    loaders.subtotal.load(cart).await.unwrap();
    assert_eq!(harness.store.variant_read_calls().await, after_checkout + 1);
    assert!(after_checkout > warmed);
}

#[tokio::test]
async fn label_purchase_requires_an_admin() {
    let harness = Harness::new().await;
    let loaders = harness.registry();

    let none = harness
        .coordinator
        .purchase_label(&loaders, None, common::TransactionId::new(1), "RATE-0001")
        .await;
    assert!(matches!(none, Err(CheckoutError::NotAuthenticated)));

    let customer = harness.claims();
    let denied = harness
        .coordinator
        .purchase_label(
            &loaders,
            Some(&customer),
            common::TransactionId::new(1),
            "RATE-0001",
        )
        .await;
    assert!(matches!(denied, Err(CheckoutError::NotAuthorized)));
}

#[tokio::test]
async fn label_purchase_records_shipping_state_and_mails_the_buyer() {
    let harness = Harness::new().await;
    let loaders = harness.registry();
    let cart = harness.cart(&[(harness.v1, 1)]);
    let rate = harness.quoted_rate(&loaders, &cart).await;

    let claims = harness.claims();
    let transaction = harness
        .coordinator
        .run_checkout(
            &loaders,
            Some(&claims),
            harness.input(cart, rate.clone(), Money::from_cents(1149)),
        )
        .await
        .unwrap();

    let admin = Claims::new(UserId::new(999), "admin@example.com", Role::Admin);
    let label = harness
        .coordinator
        .purchase_label(&harness.registry(), Some(&admin), transaction.id, &rate)
        .await
        .unwrap();

    assert!(label.id.starts_with("LABEL-"));
    assert_eq!(harness.shipping.label_count(), 1);

    let stored = harness
        .store
        .transactions_by_ids(&[transaction.id])
        .await
        .unwrap();
    assert_eq!(stored[0].label_id, label.id);

    let statuses = harness
        .store
        .statuses_for_transactions(&[transaction.id])
        .await
        .unwrap();
    assert_eq!(statuses.last().unwrap().status, STATUS_SHIPPED);
    assert_eq!(statuses.last().unwrap().carrier, "USPS");
    assert_eq!(statuses.last().unwrap().tracking_id, label.tracking_id);

    // Purchase mail plus shipped mail, both to the buyer.
    assert_eq!(harness.mailer.sent_count(), 2);
    assert_eq!(harness.mailer.last_mail().unwrap().to, "jane@example.com");
    assert_eq!(
        harness.mailer.last_mail().unwrap().subject,
        "Your order has shipped."
    );
}
