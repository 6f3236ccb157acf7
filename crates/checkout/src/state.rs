//! Checkout saga state machine.

/// The state of a checkout attempt in its lifecycle.
///
/// State transitions:
/// ```text
/// Pricing ──► Validating ──► Persisting ──► Capturing ──► Settled
///                 │               └──────┬──────┘
///                 ▼                      ▼
///               Failed ◄────────── Compensating
/// ```
///
/// `Failed` is reached directly from an early validation error (no writes
/// yet, nothing to compensate) or after compensation completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckoutState {
    /// Resolving subtotal, taxes and the quoted shipping rate.
    #[default]
    Pricing,

    /// Checking the client-declared total against the computed one.
    Validating,

    /// Inserting the attempt's local rows.
    Persisting,

    /// Submitting the payment for settlement.
    Capturing,

    /// Purchase committed (terminal state).
    Settled,

    /// A write step failed and the attempt's rows are being removed.
    Compensating,

    /// Attempt over, nothing persisted (terminal state).
    Failed,
}

impl CheckoutState {
    /// Returns true if writes exist that a failure must undo.
    pub fn can_compensate(&self) -> bool {
        matches!(self, CheckoutState::Persisting | CheckoutState::Capturing)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Settled | CheckoutState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Pricing => "Pricing",
            CheckoutState::Validating => "Validating",
            CheckoutState::Persisting => "Persisting",
            CheckoutState::Capturing => "Capturing",
            CheckoutState::Settled => "Settled",
            CheckoutState::Compensating => "Compensating",
            CheckoutState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_pricing() {
        assert_eq!(CheckoutState::default(), CheckoutState::Pricing);
    }

    #[test]
    fn test_can_compensate() {
        assert!(!CheckoutState::Pricing.can_compensate());
        assert!(!CheckoutState::Validating.can_compensate());
        assert!(CheckoutState::Persisting.can_compensate());
        assert!(CheckoutState::Capturing.can_compensate());
        assert!(!CheckoutState::Settled.can_compensate());
        assert!(!CheckoutState::Failed.can_compensate());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!CheckoutState::Pricing.is_terminal());
        assert!(!CheckoutState::Compensating.is_terminal());
        assert!(CheckoutState::Settled.is_terminal());
        assert!(CheckoutState::Failed.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(CheckoutState::Pricing.to_string(), "Pricing");
        assert_eq!(CheckoutState::Compensating.to_string(), "Compensating");
    }
}
