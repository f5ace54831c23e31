//! # Cap — owned, quota-tracked minting rights
//!
//! A `Cap` is the one-to-one product of redeeming a sold [`crate::Permit`].
//! It is **not** tradeable; it belongs to the issuer that redeemed the
//! permit and meters how many coupons that issuer may still mint.
//!
//! Invariant: `remaining = original_limit − issued_count`, and `remaining`
//! never goes below zero. The cap becomes EXHAUSTED the moment `remaining`
//! hits zero; FROZEN blocks minting regardless of remaining quota and has
//! no thaw transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, CapId, Permit, PermitId, PointmintError, Points, Result};

/// The lifecycle state of a cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapStatus {
    /// Minting allowed (subject to quota and expiry).
    Active,
    /// Administratively locked. No thaw path exists.
    Frozen,
    /// Expiry passed. **Terminal.**
    Expired,
    /// Quota fully consumed. **Terminal.**
    Exhausted,
}

impl std::fmt::Display for CapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Frozen => write!(f, "FROZEN"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Exhausted => write!(f, "EXHAUSTED"),
        }
    }
}

/// Owned minting rights with a consumable quota.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cap {
    /// Globally unique cap identifier.
    pub id: CapId,
    /// The permit this cap was redeemed from (unique per permit).
    pub permit_id: PermitId,
    /// The issuer that owns these minting rights.
    pub owner: Address,
    /// The supplier whose escrow backs coupons minted under this cap.
    pub supplier: Address,
    /// Merchant-defined scope, inherited from the permit.
    pub scope: String,
    /// Coupons still mintable.
    pub remaining: u32,
    /// The permit's limit at redemption time.
    pub original_limit: u32,
    /// Face value per coupon, inherited from the permit.
    pub face_value: Points,
    /// When the delegation lapses, inherited from the permit.
    pub expires_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub status: CapStatus,
    /// Administrative lock flag (redundant with status for fast checks).
    pub frozen: bool,
    /// Coupons minted so far.
    pub issued_count: u32,
    /// Total face value paid in across all mints.
    pub total_value_issued: Points,
    /// When the cap was created (permit redemption time).
    pub created_at: DateTime<Utc>,
}

impl Cap {
    /// Instantiate the cap for a permit being redeemed by `owner`.
    #[must_use]
    pub fn from_permit(permit: &Permit, owner: Address, now: DateTime<Utc>) -> Self {
        Self {
            id: CapId::new(),
            permit_id: permit.id,
            owner,
            supplier: permit.supplier.clone(),
            scope: permit.scope.clone(),
            remaining: permit.limit,
            original_limit: permit.limit,
            face_value: permit.face_value,
            expires_at: permit.expires_at,
            status: CapStatus::Active,
            frozen: false,
            issued_count: 0,
            total_value_issued: Points::ZERO,
            created_at: now,
        }
    }

    /// Returns `true` if the cap's expiry has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the quota invariant holds.
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        self.original_limit
            .checked_sub(self.issued_count)
            .is_some_and(|r| r == self.remaining)
    }

    /// Gate a prospective mint of `count` coupons.
    ///
    /// # Errors
    /// - `CapFrozen` if administratively locked
    /// - `CapExpired` if the expiry passed
    /// - `CapNotActive` for EXHAUSTED (or any non-ACTIVE status)
    /// - `QuotaExceeded` if `count > remaining`
    pub fn check_mintable(&self, count: u32, now: DateTime<Utc>) -> Result<()> {
        if self.frozen {
            return Err(PointmintError::CapFrozen(self.id));
        }
        if self.is_expired(now) {
            return Err(PointmintError::CapExpired(self.id));
        }
        if self.status != CapStatus::Active {
            return Err(PointmintError::CapNotActive {
                actual: self.status,
            });
        }
        if count > self.remaining {
            return Err(PointmintError::QuotaExceeded {
                requested: count,
                remaining: self.remaining,
            });
        }
        Ok(())
    }

    /// Consume quota after a successful mint of `count` coupons costing
    /// `total_cost` in face value. Sets EXHAUSTED at zero remaining.
    ///
    /// Callers must have passed [`Self::check_mintable`] first; quota
    /// underflow here means that contract was broken.
    pub fn record_mint(&mut self, count: u32, total_cost: Points) -> Result<()> {
        self.remaining = self
            .remaining
            .checked_sub(count)
            .ok_or(PointmintError::QuotaExceeded {
                requested: count,
                remaining: self.remaining,
            })?;
        self.issued_count += count;
        self.total_value_issued = self.total_value_issued.checked_add(total_cost)?;
        if self.remaining == 0 {
            self.status = CapStatus::Exhausted;
        }
        Ok(())
    }

    /// Administratively lock the cap. One-way.
    pub fn freeze(&mut self) {
        self.frozen = true;
        self.status = CapStatus::Frozen;
    }

    /// Expiry sweep transition. Leaves EXHAUSTED caps untouched.
    pub fn mark_expired(&mut self) {
        if self.status != CapStatus::Exhausted {
            self.status = CapStatus::Expired;
        }
    }
}
