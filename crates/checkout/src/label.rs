//! Shipping label purchase for a settled transaction.

use catalog::LoaderRegistry;
use common::{Claims, TransactionId};
use services::{ServiceError, ShippingLabel};
use store::TransactionStatus;

use crate::coordinator::CheckoutCoordinator;
use crate::error::CheckoutError;
use crate::mail;

impl CheckoutCoordinator {
    /// Purchases a shipping label for a transaction's chosen rate.
    ///
    /// Admin-only; authorization is checked before any read. Once the
    /// label purchase itself succeeds, recording the label id, the
    /// `SHIPPED` status, and the buyer notification are all best-effort —
    /// the label is already bought and is returned regardless.
    pub async fn purchase_label(
        &self,
        loaders: &LoaderRegistry,
        claims: Option<&Claims>,
        transaction_id: TransactionId,
        rate_id: &str,
    ) -> Result<ShippingLabel, CheckoutError> {
        let claims = claims.ok_or(CheckoutError::NotAuthenticated)?;
        if !claims.is_admin() {
            return Err(CheckoutError::NotAuthorized);
        }

        let transaction = loaders.transaction_by_id.load(transaction_id).await?;

        let rate = self
            .shipping
            .retrieve_rate(rate_id)
            .await
            .map_err(CheckoutError::RateUnavailable)?;
        let label = self
            .shipping
            .purchase_label(&rate.id)
            .await
            .map_err(CheckoutError::Label)?;
        if label.status == "ERROR" {
            return Err(CheckoutError::Label(ServiceError::Shipping(
                "Label purchase reported an error.".to_string(),
            )));
        }

        if let Err(err) = self
            .store
            .update_transaction_label_id(transaction.id, &label.id)
            .await
        {
            tracing::error!(error = %err, transaction = %transaction.id, "failed to record label id");
        }
        if let Err(err) = self
            .store
            .insert_status(TransactionStatus::shipped(
                transaction.id,
                &rate.provider,
                &label.tracking_id,
            ))
            .await
        {
            tracing::error!(error = %err, transaction = %transaction.id, "failed to record shipped status");
        }

        if let Some(user_id) = transaction.user_id {
            match loaders.user_by_id.load(user_id).await {
                Ok(user) => {
                    let body = mail::shipped_body(&self.config.base_url, &label.tracking_id);
                    if let Err(err) = self
                        .mailer
                        .send_mail(&user.email, "Your order has shipped.", &body)
                        .await
                    {
                        tracing::warn!(error = %err, "failed to send shipped email");
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to find buyer for shipped email");
                }
            }
        }

        loaders.clear_all();
        Ok(label)
    }
}
