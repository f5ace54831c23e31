//! Account types for the PointMint ledger model.
//!
//! Every address has a [`PointAccount`] with lifetime earn/spend totals;
//! every supplier additionally has an [`EscrowAccount`] backing the
//! outstanding redeemable value of its coupons.

use serde::{Deserialize, Serialize};

use crate::{Address, Points};

/// A point balance for a single address.
///
/// Invariant: `balance = total_earned − total_spent`. The ledger maintains
/// this on every mutation; [`Self::invariant_holds`] is the audit check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PointAccount {
    /// The account key.
    pub address: Address,
    /// Spendable balance.
    pub balance: Points,
    /// Lifetime credits.
    pub total_earned: Points,
    /// Lifetime debits.
    pub total_spent: Points,
}

impl PointAccount {
    /// Create a zero-balance account.
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            balance: Points::ZERO,
            total_earned: Points::ZERO,
            total_spent: Points::ZERO,
        }
    }

    /// Whether the arithmetic invariant holds.
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        self.total_earned
            .checked_sub(self.total_spent)
            .is_ok_and(|net| net == self.balance)
    }

    /// Whether this account has never moved value.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.balance.is_zero() && self.total_earned.is_zero() && self.total_spent.is_zero()
    }
}

/// Pooled custody balance for one supplier.
///
/// Invariant: `balance = total_deposited − total_released`, and the balance
/// is never negative — an underflowing release signals ledger corruption
/// and is rejected as a fatal integrity error upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EscrowAccount {
    /// The supplier this custody pool belongs to.
    pub supplier: Address,
    /// Points currently held in custody.
    pub balance: Points,
    /// Lifetime deposits.
    pub total_deposited: Points,
    /// Lifetime releases.
    pub total_released: Points,
}

impl EscrowAccount {
    /// Create an empty escrow account.
    #[must_use]
    pub fn new(supplier: Address) -> Self {
        Self {
            supplier,
            balance: Points::ZERO,
            total_deposited: Points::ZERO,
            total_released: Points::ZERO,
        }
    }

    /// Whether the arithmetic invariant holds.
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        self.total_deposited
            .checked_sub(self.total_released)
            .is_ok_and(|net| net == self.balance)
    }
}
