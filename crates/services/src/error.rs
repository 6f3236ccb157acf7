//! Service error types.

use thiserror::Error;

/// Errors raised by external collaborators.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// Tax rate lookup failed.
    #[error("Tax service error: {0}")]
    Tax(String),

    /// A shipping operation failed.
    #[error("Shipping service error: {0}")]
    Shipping(String),

    /// The payment gateway declined or errored.
    #[error("Payment gateway error: {0}")]
    Payment(String),

    /// Mail delivery failed (callers treat this as best-effort).
    #[error("Mail service error: {0}")]
    Mail(String),
}
