//! The verified caller identity handed in by the identity layer.
//!
//! The engine trusts this principal without re-verifying signatures; all
//! authorization checks compare its `address` and `role` against the
//! entity being operated on.

use serde::{Deserialize, Serialize};

use crate::Address;

/// The caller's role as asserted by the identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// End customer holding and redeeming coupons.
    Customer,
    /// Merchant backing coupons with escrowed points.
    Supplier,
    /// Holder of minting rights.
    Issuer,
    /// Operator with override powers (e.g. freezing caps).
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "CUSTOMER"),
            Self::Supplier => write!(f, "SUPPLIER"),
            Self::Issuer => write!(f, "ISSUER"),
            Self::Admin => write!(f, "ADMIN"),
        }
    }
}

/// A verified caller: identity-layer user id, ledger address, and role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Identity-layer user id (opaque to the engine).
    pub user_id: String,
    /// The caller's ledger address.
    pub address: Address,
    /// Asserted role.
    pub role: Role,
}

impl Principal {
    #[must_use]
    pub fn new(user_id: impl Into<String>, address: Address, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            address,
            role,
        }
    }

    /// Whether this principal carries operator override powers.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_detection() {
        let admin = Principal::new("u-1", Address::new("0xadmin"), Role::Admin);
        assert!(admin.is_admin());
        let customer = Principal::new("u-2", Address::new("0xcust"), Role::Customer);
        assert!(!customer.is_admin());
    }

    #[test]
    fn role_display() {
        assert_eq!(format!("{}", Role::Supplier), "SUPPLIER");
        assert_eq!(format!("{}", Role::Admin), "ADMIN");
    }

    #[test]
    fn serde_roundtrip() {
        let p = Principal::new("u-3", Address::new("0xissuer"), Role::Issuer);
        let json = serde_json::to_string(&p).unwrap();
        let back: Principal = serde_json::from_str(&json).unwrap();
        assert_eq!(p.address, back.address);
        assert_eq!(p.role, back.role);
    }
}
