//! Request authentication claims.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Caller role carried by a verified access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Admin,
}

/// Verified claims of an authenticated caller.
///
/// Token parsing and verification happen upstream; the core only consumes
/// the result. Anonymous callers are represented as `Option<Claims>::None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}

impl Claims {
    pub fn new(user_id: UserId, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_check() {
        let customer = Claims::new(UserId::new(1), "a@example.com", Role::Customer);
        let admin = Claims::new(UserId::new(2), "b@example.com", Role::Admin);
        assert!(!customer.is_admin());
        assert!(admin.is_admin());
    }
}
