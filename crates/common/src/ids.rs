//! Typed row identifiers.
//!
//! Wrapping the store's i64 ids prevents mixing identifier kinds and gives
//! each kind its canonical loader-key form.

use loader::Key;
use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl Key for $name {
            fn canonical(&self) -> String {
                self.0.to_string()
            }
        }
    };
}

id_type! {
    /// Identifier of a product row.
    ProductId
}

id_type! {
    /// Identifier of a product variant row.
    VariantId
}

id_type! {
    /// Identifier of a product option row (e.g. "Size").
    OptionId
}

id_type! {
    /// Identifier of a product option value row (e.g. "Large").
    OptionValueId
}

id_type! {
    /// Identifier of an address row.
    AddressId
}

id_type! {
    /// Identifier of a user account row.
    UserId
}

id_type! {
    /// Identifier of a transaction header row.
    TransactionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_i64() {
        let id = VariantId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(VariantId::from(42), id);
    }

    #[test]
    fn ids_canonicalize_as_decimal_strings() {
        assert_eq!(ProductId::new(7).canonical(), "7");
        assert_eq!(TransactionId::new(1234).canonical(), "1234");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&UserId::new(9)).unwrap();
        assert_eq!(json, "9");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, UserId::new(9));
    }
}
