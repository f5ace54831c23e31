//! The cap registry — redeemed permits and their minting quotas.
//!
//! Redemption is guarded twice, structurally: the permit's nonce blocks
//! request replay, and the `by_permit` unique index blocks a second cap
//! for the same permit. Both checks run before any state changes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pointmint_types::{
    Address, Cap, CapId, CapStatus, PermitId, PermitStatus, PointmintError, Principal, Result,
};

use crate::permit_book::PermitBook;

/// All caps, indexed by id and by source permit.
pub struct CapRegistry {
    /// Every cap ever created.
    caps: HashMap<CapId, Cap>,
    /// Source permit → cap. One cap per permit, ever.
    by_permit: HashMap<PermitId, CapId>,
}

impl CapRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            caps: HashMap::new(),
            by_permit: HashMap::new(),
        }
    }

    /// Exchange a SOLD permit for an ACTIVE cap.
    ///
    /// # Errors
    /// - `PermitNotFound` / `WrongPermitStatus` / `PermitExpired`
    /// - `NotPermitBuyer` if the caller is not the recorded buyer
    /// - `NonceReused` if `nonce` was already consumed for this permit
    /// - `CapAlreadyIssued` if a cap already exists for this permit
    pub fn redeem(
        &mut self,
        book: &mut PermitBook,
        buyer: &Address,
        permit_id: PermitId,
        nonce: u64,
        now: DateTime<Utc>,
    ) -> Result<CapId> {
        let permit = book.get(permit_id)?;

        // All checks precede any mutation.
        if permit.status != PermitStatus::Sold {
            return Err(PointmintError::WrongPermitStatus {
                expected: PermitStatus::Sold,
                actual: permit.status,
            });
        }
        if permit.buyer.as_ref() != Some(buyer) {
            return Err(PointmintError::NotPermitBuyer);
        }
        if permit.is_expired(now) {
            return Err(PointmintError::PermitExpired(permit_id));
        }
        if permit.used_nonce == Some(nonce) {
            return Err(PointmintError::NonceReused { nonce });
        }
        if self.by_permit.contains_key(&permit_id) {
            return Err(PointmintError::CapAlreadyIssued(permit_id));
        }

        let cap = Cap::from_permit(permit, buyer.clone(), now);
        let cap_id = cap.id;

        book.get_mut(permit_id)?.mark_redeemed(nonce, now)?;
        self.by_permit.insert(permit_id, cap_id);
        self.caps.insert(cap_id, cap);

        tracing::info!(
            permit = %permit_id,
            cap = %cap_id,
            owner = %buyer.short(),
            "permit redeemed for cap"
        );
        Ok(cap_id)
    }

    /// Administratively lock a cap. Allowed for the cap's supplier, its
    /// owner, or an admin. One-way — there is no unfreeze.
    ///
    /// # Errors
    /// - `CapNotFound`
    /// - `FreezeDenied` if the actor is none of supplier / owner / admin
    /// - `CapNotActive` if the cap is already terminal (expired/exhausted)
    pub fn freeze(&mut self, cap_id: CapId, actor: &Principal) -> Result<()> {
        let cap = self
            .caps
            .get_mut(&cap_id)
            .ok_or(PointmintError::CapNotFound(cap_id))?;

        let allowed =
            actor.is_admin() || actor.address == cap.supplier || actor.address == cap.owner;
        if !allowed {
            return Err(PointmintError::FreezeDenied(cap_id));
        }
        if !matches!(cap.status, CapStatus::Active | CapStatus::Frozen) {
            return Err(PointmintError::CapNotActive { actual: cap.status });
        }

        cap.freeze();
        tracing::warn!(cap = %cap_id, actor = %actor.address.short(), "cap frozen");
        Ok(())
    }

    /// Look up a cap by id.
    ///
    /// # Errors
    /// Returns `CapNotFound` if the id is unknown.
    pub fn get(&self, id: CapId) -> Result<&Cap> {
        self.caps.get(&id).ok_or(PointmintError::CapNotFound(id))
    }

    /// Mutable lookup by id.
    ///
    /// # Errors
    /// Returns `CapNotFound` if the id is unknown.
    pub fn get_mut(&mut self, id: CapId) -> Result<&mut Cap> {
        self.caps
            .get_mut(&id)
            .ok_or(PointmintError::CapNotFound(id))
    }

    /// The cap redeemed from `permit_id`, if any.
    #[must_use]
    pub fn cap_for_permit(&self, permit_id: PermitId) -> Option<CapId> {
        self.by_permit.get(&permit_id).copied()
    }

    /// Ids of ACTIVE caps whose expiry has passed (sweep input).
    #[must_use]
    pub fn expired_active_ids(&self, now: DateTime<Utc>) -> Vec<CapId> {
        let mut ids: Vec<CapId> = self
            .caps
            .values()
            .filter(|c| c.status == CapStatus::Active && c.is_expired(now))
            .map(|c| c.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Expire every lapsed ACTIVE cap. Unspent quota simply lapses; the
    /// money already paid in stays with the minted coupons. Returns the
    /// number of caps expired.
    pub fn expire_due(&mut self, now: DateTime<Utc>) -> usize {
        let ids = self.expired_active_ids(now);
        for id in &ids {
            if let Some(cap) = self.caps.get_mut(id) {
                cap.mark_expired();
                tracing::info!(cap = %id, "cap expired");
            }
        }
        ids.len()
    }

    /// Number of caps tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.caps.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }
}

impl Default for CapRegistry {
    fn default() -> Self {
        Self::new()
    }
}
