//! Checkout saga coordinator.

use std::collections::HashMap;
use std::sync::Arc;

use catalog::{AddressKey, CartKey, LoaderRegistry};
use common::{Claims, Money, UserId, VariantId};
use loader::{Key, LoadError};
use services::{Capture, CaptureLineItem, CaptureRequest, Mailer, PaymentGateway, ShippingService};
use store::{
    Address, ProductVariant, Store, Transaction, TransactionAddressInfo, TransactionLineItem,
    TransactionStatus,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::error::CheckoutError;
use crate::input::{AddressSelection, CheckoutInput};
use crate::mail;
use crate::state::CheckoutState;
use crate::undo::UndoLog;

/// Drives one purchase from pricing through payment capture.
///
/// Reads go through the request's [`LoaderRegistry`]; writes go to the
/// store and the payment gateway, with an undo log standing in for the
/// cross-system transaction neither provides.
pub struct CheckoutCoordinator {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) shipping: Arc<dyn ShippingService>,
    pub(crate) payment: Arc<dyn PaymentGateway>,
    pub(crate) mailer: Arc<dyn Mailer>,
    pub(crate) config: Config,
}

/// An address ready for the attempt: either already a stored row, or an
/// inline one that the persist phase inserts (and undoes) with the rest of
/// the attempt's rows.
struct ResolvedAddress {
    address: Address,
    pending_insert: bool,
}

/// One cart line priced and named for both the local rows and the capture
/// request.
#[derive(Debug, Clone)]
struct PricedLine {
    variant_id: VariantId,
    quantity: i64,
    price: Money,
    name: String,
}

impl CheckoutCoordinator {
    /// Creates a new coordinator over the store and external collaborators.
    pub fn new(
        store: Arc<dyn Store>,
        shipping: Arc<dyn ShippingService>,
        payment: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
        config: Config,
    ) -> Self {
        Self {
            store,
            shipping,
            payment,
            mailer,
            config,
        }
    }

    /// Runs the checkout saga.
    ///
    /// Either returns a settled transaction with a captured payment, or an
    /// error with no rows left behind from this attempt. The registry is
    /// cleared before returning: a mutation attempt invalidates previously
    /// cached reads.
    pub async fn run_checkout(
        &self,
        loaders: &LoaderRegistry,
        claims: Option<&Claims>,
        input: CheckoutInput,
    ) -> Result<Transaction, CheckoutError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = std::time::Instant::now();
        let attempt = Uuid::new_v4();
        let span = tracing::info_span!("checkout", %attempt);

        let result = self.checkout(loaders, claims, input).instrument(span).await;

        loaders.clear_all();
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(transaction) => {
                metrics::counter!("checkout_settled").increment(1);
                tracing::info!(transaction = %transaction.id, "checkout settled");
            }
            Err(err) => {
                metrics::counter!("checkout_failed").increment(1);
                tracing::warn!(error = %err, "checkout failed");
            }
        }
        result
    }

    async fn checkout(
        &self,
        loaders: &LoaderRegistry,
        claims: Option<&Claims>,
        input: CheckoutInput,
    ) -> Result<Transaction, CheckoutError> {
        let mut state = CheckoutState::Pricing;
        tracing::debug!(%state, "resolving prices");

        let billing = self.resolve_address(loaders, claims, &input.billing).await?;
        let shipping_to = self.resolve_address(loaders, claims, &input.shipping).await?;

        let subtotal = loaders.subtotal.load(input.cart.clone()).await?;
        let tax_rates = loaders
            .taxes
            .load(AddressKey(billing.address.clone()))
            .await
            .map_err(CheckoutError::Tax)?;
        let taxes = subtotal.apply_rate(tax_rates.total_rate);

        // Quoted rates expire; always re-resolve the chosen one.
        let rate = self
            .shipping
            .retrieve_rate(&input.shipping_rate_id)
            .await
            .map_err(CheckoutError::RateUnavailable)?;
        let shipping_cost = Money::from_decimal_str(&rate.amount)?;

        state = CheckoutState::Validating;
        let calculated = subtotal + taxes + shipping_cost;
        if calculated != input.declared_total {
            tracing::warn!(
                %state,
                declared = %input.declared_total,
                %calculated,
                "declared total does not match"
            );
            return Err(CheckoutError::TotalMismatch {
                declared: input.declared_total,
                calculated,
            });
        }

        let lines = self.price_line_items(loaders, &input.cart).await?;

        // From here the attempt must survive request cancellation: a future
        // dropped mid-persist would strand rows with nobody left to
        // compensate. The spawned task runs to an outcome either way.
        let phase = PersistAndCapture {
            store: Arc::clone(&self.store),
            payment: Arc::clone(&self.payment),
            billing,
            shipping_to,
            subtotal,
            taxes,
            shipping_cost,
            total: calculated,
            rate_id: rate.id,
            user_id: claims.map(|claims| claims.user_id),
            lines,
            payment_nonce: input.payment_nonce,
        };
        let (mut transaction, capture) = match tokio::spawn(phase.run()).await {
            Ok(outcome) => outcome?,
            Err(err) => {
                tracing::error!(error = %err, "persist/capture task failed");
                return Err(CheckoutError::Aborted);
            }
        };

        state = CheckoutState::Settled;
        tracing::debug!(%state, transaction = %transaction.id, "recording gateway id");
        transaction.gateway_id = capture.gateway_transaction_id.clone();
        if let Err(err) = self
            .store
            .update_transaction_gateway_id(transaction.id, &capture.gateway_transaction_id)
            .await
        {
            // The purchase already settled; a lost reference is an
            // operational problem, never a rollback.
            tracing::error!(
                error = %err,
                transaction = %transaction.id,
                "failed to record gateway transaction id"
            );
        }

        if let Some(claims) = claims {
            let body = mail::purchase_body(&self.config.base_url, transaction.id);
            if let Err(err) = self
                .mailer
                .send_mail(&claims.email, "Thanks for your purchase.", &body)
                .await
            {
                tracing::warn!(error = %err, "failed to send purchase email");
            }
        }

        Ok(transaction)
    }

    async fn resolve_address(
        &self,
        loaders: &LoaderRegistry,
        claims: Option<&Claims>,
        selection: &AddressSelection,
    ) -> Result<ResolvedAddress, CheckoutError> {
        match selection {
            AddressSelection::Saved(id) => {
                let address = loaders.address_by_id.load(*id).await.map_err(|err| match err {
                    LoadError::NotFound(_) => CheckoutError::AddressNotFound(*id),
                    other => CheckoutError::Load(other),
                })?;
                Ok(ResolvedAddress {
                    address,
                    pending_insert: false,
                })
            }
            AddressSelection::New { address, save } => {
                if !*save {
                    return Ok(ResolvedAddress {
                        address: address.clone(),
                        pending_insert: true,
                    });
                }
                // Saving to the account is its own durable write and is
                // kept even if the purchase later fails.
                let claims = claims.ok_or(CheckoutError::NotAuthenticated)?;
                let saved = self
                    .store
                    .insert_address(address.clone().with_user(claims.user_id))
                    .await
                    .map_err(CheckoutError::Persist)?;
                Ok(ResolvedAddress {
                    address: saved,
                    pending_insert: false,
                })
            }
        }
    }

    /// Prices every cart line from the batched variant lookup the subtotal
    /// already validated, resolving display names before any write happens.
    async fn price_line_items(
        &self,
        loaders: &LoaderRegistry,
        cart: &CartKey,
    ) -> Result<Vec<PricedLine>, CheckoutError> {
        let ids = cart.variant_ids();
        let loaded = loaders.variant_by_id.load_many(ids.clone()).await;
        let mut variants: HashMap<VariantId, ProductVariant> = HashMap::with_capacity(ids.len());
        for (id, result) in ids.iter().zip(loaded) {
            variants.insert(*id, result?);
        }

        let mut lines = Vec::with_capacity(cart.entries().len());
        for entry in cart.entries() {
            let Some(variant) = variants.get(&entry.variant_id) else {
                return Err(CheckoutError::Load(LoadError::NotFound(
                    entry.variant_id.canonical(),
                )));
            };
            let name = if variant.name.is_empty() {
                loaders.product_by_id.load(variant.product_id).await?.name
            } else {
                variant.name.clone()
            };
            lines.push(PricedLine {
                variant_id: entry.variant_id,
                quantity: entry.quantity,
                price: variant.price,
                name,
            });
        }
        Ok(lines)
    }
}

/// The non-cancellable tail of the saga: local inserts, then capture.
struct PersistAndCapture {
    store: Arc<dyn Store>,
    payment: Arc<dyn PaymentGateway>,
    billing: ResolvedAddress,
    shipping_to: ResolvedAddress,
    subtotal: Money,
    taxes: Money,
    shipping_cost: Money,
    total: Money,
    rate_id: String,
    user_id: Option<UserId>,
    lines: Vec<PricedLine>,
    payment_nonce: String,
}

impl PersistAndCapture {
    async fn run(mut self) -> Result<(Transaction, Capture), CheckoutError> {
        let mut state = CheckoutState::Persisting;
        tracing::debug!(%state, "persisting attempt rows");
        let mut undo = UndoLog::new(Arc::clone(&self.store));

        let transaction = match self
            .store
            .insert_transaction(Transaction::new(
                self.subtotal,
                self.taxes,
                self.shipping_cost,
                self.total,
                self.rate_id.clone(),
                self.user_id,
            ))
            .await
        {
            Ok(transaction) => transaction,
            // Nothing inserted yet; nothing to unwind.
            Err(err) => return Err(CheckoutError::Persist(err)),
        };
        undo.transaction(transaction.id);

        match self
            .store
            .insert_status(TransactionStatus::received(transaction.id))
            .await
        {
            Ok(status) => undo.status(status.id),
            Err(err) => return Self::compensate(undo, CheckoutError::Persist(err)).await,
        }

        // Inline, unsaved addresses belong to the attempt: inserted here so
        // the link row references real rows, undone with everything else.
        if self.billing.pending_insert {
            match self.store.insert_address(self.billing.address.clone()).await {
                Ok(address) => {
                    undo.address(address.id);
                    self.billing.address = address;
                }
                Err(err) => return Self::compensate(undo, CheckoutError::Persist(err)).await,
            }
        }
        if self.shipping_to.pending_insert {
            match self
                .store
                .insert_address(self.shipping_to.address.clone())
                .await
            {
                Ok(address) => {
                    undo.address(address.id);
                    self.shipping_to.address = address;
                }
                Err(err) => return Self::compensate(undo, CheckoutError::Persist(err)).await,
            }
        }

        match self
            .store
            .insert_address_info(TransactionAddressInfo::new(
                transaction.id,
                self.billing.address.id,
                self.shipping_to.address.id,
            ))
            .await
        {
            Ok(info) => undo.address_info(info.id),
            Err(err) => return Self::compensate(undo, CheckoutError::Persist(err)).await,
        }

        for line in &self.lines {
            match self
                .store
                .insert_line_item(TransactionLineItem::new(
                    transaction.id,
                    line.variant_id,
                    line.price,
                    line.quantity,
                ))
                .await
            {
                Ok(item) => undo.line_item(item.id),
                Err(err) => return Self::compensate(undo, CheckoutError::Persist(err)).await,
            }
        }

        state = CheckoutState::Capturing;
        tracing::debug!(%state, transaction = %transaction.id, "submitting payment");

        let request = CaptureRequest {
            order_id: transaction.id,
            amount: self.total,
            tax_amount: self.taxes,
            line_items: self
                .lines
                .iter()
                .map(|line| CaptureLineItem {
                    name: line.name.clone(),
                    quantity: line.quantity,
                    unit_amount: line.price,
                    total_amount: line.price.multiply(line.quantity),
                })
                .collect(),
            shipping_address: self.shipping_to.address.clone(),
            payment_nonce: self.payment_nonce.clone(),
        };

        match self.payment.capture(request).await {
            Ok(capture) => Ok((transaction, capture)),
            // Compensation unwinds every row of the attempt, not only the
            // header.
            Err(err) => Self::compensate(undo, CheckoutError::Payment(err)).await,
        }
    }

    async fn compensate(
        undo: UndoLog,
        error: CheckoutError,
    ) -> Result<(Transaction, Capture), CheckoutError> {
        let state = CheckoutState::Compensating;
        tracing::warn!(%state, error = %error, "checkout step failed");
        undo.unwind().await;
        metrics::counter!("checkout_compensations_total").increment(1);
        Err(error)
    }
}
