//! The point ledger — per-address balance store.
//!
//! All money movement in the system passes through here. Mutations are
//! atomic: either the full credit/debit applies or the account is
//! unchanged. Holding the ledger behind `&mut` serializes every mutation,
//! so two operations can never interleave on the same account.

use std::collections::HashMap;

use pointmint_types::{Address, PointAccount, PointmintError, Points, Result};

/// The source of truth for spendable point balances.
pub struct PointLedger {
    /// Per-address accounts.
    accounts: HashMap<Address, PointAccount>,
}

impl PointLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
        }
    }

    /// Return the account for `address`, creating a zero-balance one on
    /// first touch.
    pub fn get_or_create(&mut self, address: &Address) -> &PointAccount {
        self.accounts
            .entry(address.clone())
            .or_insert_with(|| PointAccount::new(address.clone()))
    }

    /// Credit `amount` to `address`, creating the account if absent.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if either running total would overflow;
    /// the account is left unchanged in that case.
    pub fn credit(&mut self, address: &Address, amount: Points) -> Result<()> {
        let account = self
            .accounts
            .entry(address.clone())
            .or_insert_with(|| PointAccount::new(address.clone()));

        let balance = account.balance.checked_add(amount)?;
        let total_earned = account.total_earned.checked_add(amount)?;
        account.balance = balance;
        account.total_earned = total_earned;
        tracing::debug!(address = %address.short(), %amount, new_balance = %account.balance, "ledger credit");
        Ok(())
    }

    /// Debit `amount` from `address`.
    ///
    /// # Errors
    /// Returns `InsufficientFunds` if the balance is short (including the
    /// account-never-touched case); the account is left unchanged.
    pub fn debit(&mut self, address: &Address, amount: Points) -> Result<()> {
        let account =
            self.accounts
                .get_mut(address)
                .ok_or_else(|| PointmintError::InsufficientFunds {
                    address: address.clone(),
                    needed: amount,
                    available: Points::ZERO,
                })?;

        if account.balance < amount {
            return Err(PointmintError::InsufficientFunds {
                address: address.clone(),
                needed: amount,
                available: account.balance,
            });
        }

        account.balance = account.balance.checked_sub(amount)?;
        account.total_spent = account.total_spent.checked_add(amount)?;
        tracing::debug!(address = %address.short(), %amount, new_balance = %account.balance, "ledger debit");
        Ok(())
    }

    /// The spendable balance of `address` (zero if never touched).
    #[must_use]
    pub fn balance(&self, address: &Address) -> Points {
        self.accounts
            .get(address)
            .map_or(Points::ZERO, |a| a.balance)
    }

    /// A snapshot of the account for `address` (zeroed if never touched).
    #[must_use]
    pub fn account(&self, address: &Address) -> PointAccount {
        self.accounts
            .get(address)
            .cloned()
            .unwrap_or_else(|| PointAccount::new(address.clone()))
    }

    /// Sum of all spendable balances.
    #[must_use]
    pub fn total_balance(&self) -> Points {
        self.accounts.values().map(|a| a.balance).sum()
    }

    /// Iterate all accounts (for audit checks).
    pub fn accounts(&self) -> impl Iterator<Item = &PointAccount> {
        self.accounts.values()
    }
}

impl Default for PointLedger {
    fn default() -> Self {
        Self::new()
    }
}
