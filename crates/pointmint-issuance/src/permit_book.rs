//! The permit book — supplier-listed minting-rights delegations.
//!
//! Suppliers list permits; issuers buy them. Purchase is a two-legged
//! atomic transfer (buyer debit, supplier credit) with every business
//! rule checked before the first mutation, so a rejected purchase has
//! zero side effects.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pointmint_ledger::PointLedger;
use pointmint_types::{Address, Permit, PermitId, PermitStatus, PermitTerms, PointmintError, Result};

/// All permits, listed through this book.
pub struct PermitBook {
    /// Every permit ever listed (entities are never deleted).
    permits: HashMap<PermitId, Permit>,
}

impl PermitBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self {
            permits: HashMap::new(),
        }
    }

    /// List a new permit under the supplier's terms.
    ///
    /// # Errors
    /// Returns `InvalidTerms` / `AmountOverflow` from term validation.
    pub fn list(
        &mut self,
        supplier: &Address,
        terms: PermitTerms,
        now: DateTime<Utc>,
    ) -> Result<PermitId> {
        let permit = Permit::list(supplier.clone(), terms, now)?;
        let id = permit.id;
        tracing::info!(
            permit = %id,
            supplier = %supplier.short(),
            limit = permit.limit,
            face_value = %permit.face_value,
            price = %permit.price,
            "permit listed"
        );
        self.permits.insert(id, permit);
        Ok(id)
    }

    /// Look up a permit by id.
    ///
    /// # Errors
    /// Returns `PermitNotFound` if the id is unknown.
    pub fn get(&self, id: PermitId) -> Result<&Permit> {
        self.permits
            .get(&id)
            .ok_or(PointmintError::PermitNotFound(id))
    }

    /// Mutable lookup by id.
    ///
    /// # Errors
    /// Returns `PermitNotFound` if the id is unknown.
    pub fn get_mut(&mut self, id: PermitId) -> Result<&mut Permit> {
        self.permits
            .get_mut(&id)
            .ok_or(PointmintError::PermitNotFound(id))
    }

    /// Purchase a listed permit: debit the buyer the asking price, credit
    /// the supplier, transition to SOLD.
    ///
    /// # Errors
    /// - `PermitNotFound` / `WrongPermitStatus` / `PermitExpired`
    /// - `SelfPurchase` if the buyer is the listing supplier
    /// - `InsufficientFunds` if the buyer cannot cover the price
    pub fn buy(
        &mut self,
        buyer: &Address,
        permit_id: PermitId,
        ledger: &mut PointLedger,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let permit = self
            .permits
            .get(&permit_id)
            .ok_or(PointmintError::PermitNotFound(permit_id))?;

        // All checks precede any mutation.
        if permit.status != PermitStatus::Listed {
            return Err(PointmintError::WrongPermitStatus {
                expected: PermitStatus::Listed,
                actual: permit.status,
            });
        }
        if permit.is_expired(now) {
            return Err(PointmintError::PermitExpired(permit_id));
        }
        if buyer == &permit.supplier {
            return Err(PointmintError::SelfPurchase);
        }
        let price = permit.price;
        let supplier = permit.supplier.clone();
        if ledger.balance(buyer) < price {
            return Err(PointmintError::InsufficientFunds {
                address: buyer.clone(),
                needed: price,
                available: ledger.balance(buyer),
            });
        }

        if !price.is_zero() {
            ledger.debit(buyer, price)?;
            ledger.credit(&supplier, price)?;
        }
        let permit = self
            .permits
            .get_mut(&permit_id)
            .ok_or(PointmintError::PermitNotFound(permit_id))?;
        permit.mark_sold(buyer.clone(), now)?;

        tracing::info!(
            permit = %permit_id,
            buyer = %buyer.short(),
            %price,
            "permit sold"
        );
        Ok(())
    }

    /// Withdraw a LISTED permit. Only the listing supplier may cancel.
    ///
    /// # Errors
    /// - `PermitNotFound` / `NotPermitSupplier`
    /// - `WrongPermitStatus` unless the permit is still LISTED
    pub fn cancel(&mut self, supplier: &Address, permit_id: PermitId) -> Result<()> {
        let permit = self
            .permits
            .get_mut(&permit_id)
            .ok_or(PointmintError::PermitNotFound(permit_id))?;

        if &permit.supplier != supplier {
            return Err(PointmintError::NotPermitSupplier);
        }
        permit.mark_cancelled()?;
        tracing::info!(permit = %permit_id, "permit cancelled");
        Ok(())
    }

    /// Ids of non-terminal permits whose expiry has passed (sweep input).
    #[must_use]
    pub fn expired_live_ids(&self, now: DateTime<Utc>) -> Vec<PermitId> {
        let mut ids: Vec<PermitId> = self
            .permits
            .values()
            .filter(|p| !p.status.is_terminal() && p.is_expired(now))
            .map(|p| p.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Expire every lapsed LISTED/SOLD permit. No money moves; permits
    /// carry no escrow. Returns the number of permits expired.
    pub fn expire_due(&mut self, now: DateTime<Utc>) -> usize {
        let ids = self.expired_live_ids(now);
        let mut expired = 0;
        for id in ids {
            if let Some(permit) = self.permits.get_mut(&id) {
                if permit.mark_expired().is_ok() {
                    tracing::info!(permit = %id, "permit expired");
                    expired += 1;
                }
            }
        }
        expired
    }

    /// Number of permits tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.permits.len()
    }

    /// Whether the book is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.permits.is_empty()
    }
}

impl Default for PermitBook {
    fn default() -> Self {
        Self::new()
    }
}
