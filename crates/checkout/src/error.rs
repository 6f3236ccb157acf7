//! Checkout error types.

use common::{AddressId, Money, MoneyParseError};
use loader::LoadError;
use services::ServiceError;
use store::StoreError;
use thiserror::Error;

/// Errors that can abort a checkout or label purchase.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The caller must be signed in for the requested operation.
    #[error("Not authenticated.")]
    NotAuthenticated,

    /// The caller is signed in but lacks the required role.
    #[error("Not authorized.")]
    NotAuthorized,

    /// A saved address id did not resolve.
    #[error("Could not find address `{0}`.")]
    AddressNotFound(AddressId),

    /// Declared and computed totals disagree; nothing was written.
    #[error("The provided total does not match the calculated one.")]
    TotalMismatch { declared: Money, calculated: Money },

    /// The chosen shipping rate could not be re-resolved.
    #[error("Could not retrieve shipping rate.")]
    RateUnavailable(#[source] ServiceError),

    /// The rate's decimal amount did not parse.
    #[error("Could not convert shipping price.")]
    RateAmount(#[from] MoneyParseError),

    /// Tax rates could not be resolved for the billing address.
    #[error("Could not load tax information.")]
    Tax(#[source] LoadError),

    /// A local insert failed; the attempt was compensated.
    #[error("Could not create transaction.")]
    Persist(#[source] StoreError),

    /// The gateway declined or errored. Propagated unwrapped, after
    /// compensation.
    #[error(transparent)]
    Payment(ServiceError),

    /// Label purchase failed.
    #[error("Could not purchase shipping label.")]
    Label(#[source] ServiceError),

    /// A batched read failed; carries the per-key loader error.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The persist/capture task was torn down before reporting an outcome.
    #[error("Checkout aborted before completion.")]
    Aborted,
}
