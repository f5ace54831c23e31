//! Point-supply conservation checker.
//!
//! Mathematical invariant enforced after every settlement cycle:
//! ```text
//! Σ(point-account balances) + Σ(escrow balances) == Σ(recorded issuance)
//! ```
//! Engine operations only move value between accounts and escrow; points
//! enter the system solely through host-recorded top-ups. If this
//! invariant ever breaks, something has gone catastrophically wrong and
//! the checker returns a fatal error.
//!
//! The per-account arithmetic invariants (`balance = earned − spent`,
//! `balance = deposited − released`) are audited separately.

use pointmint_types::{PointmintError, Points, Result};

use crate::{EscrowVault, PointLedger};

/// Tracks total issued supply and validates conservation.
pub struct PointSupply {
    /// Total points issued into the system since genesis.
    issued: Points,
}

impl PointSupply {
    /// Create a tracker with zero recorded issuance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            issued: Points::ZERO,
        }
    }

    /// Record an external top-up (host credited an account from outside).
    ///
    /// # Errors
    /// Returns `AmountOverflow` if the running total would overflow.
    pub fn record_issuance(&mut self, amount: Points) -> Result<()> {
        self.issued = self.issued.checked_add(amount)?;
        Ok(())
    }

    /// Total recorded issuance.
    #[must_use]
    pub fn expected_supply(&self) -> Points {
        self.issued
    }

    /// Verify that ledger + escrow holdings equal recorded issuance.
    ///
    /// # Errors
    /// Returns `ConservationViolation` (fatal) on mismatch.
    pub fn verify(&self, ledger: &PointLedger, vault: &EscrowVault) -> Result<()> {
        let ledger_total = ledger.total_balance();
        let escrow_total = vault.total_balance();
        let actual = ledger_total.checked_add(escrow_total)?;
        if actual != self.issued {
            return Err(PointmintError::ConservationViolation {
                reason: format!(
                    "actual supply {actual} != issued {} (ledger={ledger_total}, escrow={escrow_total})",
                    self.issued,
                ),
            });
        }
        Ok(())
    }
}

impl Default for PointSupply {
    fn default() -> Self {
        Self::new()
    }
}

/// Audit every point account's arithmetic invariant.
///
/// # Errors
/// Returns `LedgerCorruption` (fatal) naming the first bad account.
pub fn verify_accounts(ledger: &PointLedger) -> Result<()> {
    for account in ledger.accounts() {
        if !account.invariant_holds() {
            return Err(PointmintError::LedgerCorruption {
                reason: format!(
                    "account {} balance {} != earned {} - spent {}",
                    account.address, account.balance, account.total_earned, account.total_spent,
                ),
            });
        }
    }
    Ok(())
}

/// Audit every escrow account's arithmetic invariant.
///
/// # Errors
/// Returns `LedgerCorruption` (fatal) naming the first bad pool.
pub fn verify_escrows(vault: &EscrowVault) -> Result<()> {
    for account in vault.accounts() {
        if !account.invariant_holds() {
            return Err(PointmintError::LedgerCorruption {
                reason: format!(
                    "escrow {} balance {} != deposited {} - released {}",
                    account.supplier, account.balance, account.total_deposited,
                    account.total_released,
                ),
            });
        }
    }
    Ok(())
}
