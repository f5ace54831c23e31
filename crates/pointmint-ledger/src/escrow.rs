//! The escrow vault — per-supplier pooled custody.
//!
//! Issuers pay face value into a supplier's escrow when minting; the
//! balance backs all unredeemed coupon value for that supplier. Releases
//! that would drive a balance negative are **fatal**: a negative escrow
//! balance means the ledger is corrupt, so the vault raises
//! `EscrowUnderflow` and never silently floors at zero.

use std::collections::HashMap;

use pointmint_types::{Address, EscrowAccount, PointmintError, Points, Result};

use crate::accounts::PointLedger;

/// Custody balances, one pool per supplier.
pub struct EscrowVault {
    /// Per-supplier escrow accounts.
    accounts: HashMap<Address, EscrowAccount>,
}

impl EscrowVault {
    /// Create an empty vault.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
        }
    }

    /// Deposit `amount` into the supplier's pool, creating it if absent.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if a running total would overflow; the
    /// account is left unchanged.
    pub fn deposit(&mut self, supplier: &Address, amount: Points) -> Result<()> {
        let account = self
            .accounts
            .entry(supplier.clone())
            .or_insert_with(|| EscrowAccount::new(supplier.clone()));

        let balance = account.balance.checked_add(amount)?;
        let total_deposited = account.total_deposited.checked_add(amount)?;
        account.balance = balance;
        account.total_deposited = total_deposited;
        tracing::debug!(supplier = %supplier.short(), %amount, new_balance = %account.balance, "escrow deposit");
        Ok(())
    }

    /// Release `amount` from the supplier's pool.
    ///
    /// # Errors
    /// - `EscrowNotFound` if the supplier has no pool
    /// - `EscrowUnderflow` (fatal) if the release exceeds the balance
    pub fn release(&mut self, supplier: &Address, amount: Points) -> Result<()> {
        let account = self
            .accounts
            .get_mut(supplier)
            .ok_or_else(|| PointmintError::EscrowNotFound(supplier.clone()))?;

        if account.balance < amount {
            let err = PointmintError::EscrowUnderflow {
                supplier: supplier.clone(),
                needed: amount,
                available: account.balance,
            };
            tracing::error!(supplier = %supplier.short(), %amount, available = %account.balance, "escrow underflow");
            return Err(err);
        }

        account.balance = account.balance.checked_sub(amount)?;
        account.total_released = account.total_released.checked_add(amount)?;
        tracing::debug!(supplier = %supplier.short(), %amount, new_balance = %account.balance, "escrow release");
        Ok(())
    }

    /// Skim a fee out of escrow into the supplier's spendable balance.
    /// Used at issuance and on every settled trade.
    ///
    /// # Errors
    /// Propagates release failures; the ledger credit happens only after
    /// the release succeeded.
    pub fn skim_fee(&mut self, supplier: &Address, fee: Points, ledger: &mut PointLedger) -> Result<()> {
        if fee.is_zero() {
            return Ok(());
        }
        self.release(supplier, fee)?;
        ledger.credit(supplier, fee)
    }

    /// The custody balance for `supplier` (zero if no pool exists).
    #[must_use]
    pub fn balance(&self, supplier: &Address) -> Points {
        self.accounts
            .get(supplier)
            .map_or(Points::ZERO, |a| a.balance)
    }

    /// A snapshot of the supplier's escrow account (zeroed if absent).
    #[must_use]
    pub fn account(&self, supplier: &Address) -> EscrowAccount {
        self.accounts
            .get(supplier)
            .cloned()
            .unwrap_or_else(|| EscrowAccount::new(supplier.clone()))
    }

    /// Sum of all custody balances.
    #[must_use]
    pub fn total_balance(&self) -> Points {
        self.accounts.values().map(|a| a.balance).sum()
    }

    /// Iterate all escrow accounts (for audit checks).
    pub fn accounts(&self) -> impl Iterator<Item = &EscrowAccount> {
        self.accounts.values()
    }
}

impl Default for EscrowVault {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_creates_pool() {
        let mut vault = EscrowVault::new();
        let supplier = Address::new("0xsupplier");
        vault.deposit(&supplier, Points::new(1000)).unwrap();

        let account = vault.account(&supplier);
        assert_eq!(account.balance, Points::new(1000));
        assert_eq!(account.total_deposited, Points::new(1000));
        assert!(account.invariant_holds());
    }

    #[test]
    fn release_reduces_balance() {
        let mut vault = EscrowVault::new();
        let supplier = Address::new("0xsupplier");
        vault.deposit(&supplier, Points::new(1000)).unwrap();
        vault.release(&supplier, Points::new(30)).unwrap();

        let account = vault.account(&supplier);
        assert_eq!(account.balance, Points::new(970));
        assert_eq!(account.total_released, Points::new(30));
        assert!(account.invariant_holds());
    }

    #[test]
    fn release_underflow_is_fatal() {
        let mut vault = EscrowVault::new();
        let supplier = Address::new("0xsupplier");
        vault.deposit(&supplier, Points::new(100)).unwrap();

        let err = vault.release(&supplier, Points::new(101)).unwrap_err();
        assert!(matches!(err, PointmintError::EscrowUnderflow { .. }));
        assert!(err.is_fatal());
        // Balance unchanged — never floored.
        assert_eq!(vault.balance(&supplier), Points::new(100));
    }

    #[test]
    fn release_without_pool_is_not_found() {
        let mut vault = EscrowVault::new();
        let err = vault
            .release(&Address::new("0xnobody"), Points::new(1))
            .unwrap_err();
        assert!(matches!(err, PointmintError::EscrowNotFound(_)));
    }

    #[test]
    fn skim_fee_moves_escrow_to_ledger() {
        let mut vault = EscrowVault::new();
        let mut ledger = PointLedger::new();
        let supplier = Address::new("0xsupplier");
        vault.deposit(&supplier, Points::new(1000)).unwrap();

        vault.skim_fee(&supplier, Points::new(30), &mut ledger).unwrap();
        assert_eq!(vault.balance(&supplier), Points::new(970));
        assert_eq!(ledger.balance(&supplier), Points::new(30));
    }

    #[test]
    fn skim_zero_fee_is_noop() {
        let mut vault = EscrowVault::new();
        let mut ledger = PointLedger::new();
        let supplier = Address::new("0xsupplier");
        // No pool exists; a zero skim must not error.
        vault.skim_fee(&supplier, Points::ZERO, &mut ledger).unwrap();
        assert_eq!(ledger.balance(&supplier), Points::ZERO);
    }

    #[test]
    fn total_balance_sums_pools() {
        let mut vault = EscrowVault::new();
        vault.deposit(&Address::new("0xa"), Points::new(10)).unwrap();
        vault.deposit(&Address::new("0xb"), Points::new(20)).unwrap();
        assert_eq!(vault.total_balance(), Points::new(30));
    }
}
