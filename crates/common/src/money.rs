//! Money in integer minor-currency units.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A decimal quote that could not be parsed into minor units.
#[derive(Debug, Clone, Error)]
#[error("could not parse money amount `{0}`")]
pub struct MoneyParseError(pub String);

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Parses a decimal major-unit quote (e.g. `"5.99"`) into minor units.
    ///
    /// External collaborators quote prices as decimal strings; the value is
    /// parsed and rounded exactly once with `round(value * 100)`, half away
    /// from zero.
    pub fn from_decimal_str(quote: &str) -> Result<Self, MoneyParseError> {
        let value: f64 = quote
            .trim()
            .parse()
            .map_err(|_| MoneyParseError(quote.to_string()))?;
        Ok(Self::from_cents((value * 100.0).round() as i64))
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the major-unit portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: i64) -> Money {
        Money {
            cents: self.cents * quantity,
        }
    }

    /// Applies a fractional rate (e.g. a combined tax rate), rounding half
    /// away from zero, once.
    pub fn apply_rate(&self, rate: f64) -> Money {
        Money {
            cents: (self.cents as f64 * rate).round() as i64,
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.cents -= rhs.cents;
    }
}
