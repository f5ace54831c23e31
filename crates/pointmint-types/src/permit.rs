//! # Permit — the tradeable minting-rights listing
//!
//! A supplier lists a `Permit` delegating the right to mint up to `limit`
//! coupons at a fixed `face_value`. A buyer purchases the permit, then
//! exchanges it exactly once for a [`crate::Cap`].
//!
//! ## State Machine
//!
//! ```text
//!   ┌────────┐  buy    ┌──────┐  redeem   ┌──────────┐
//!   │ LISTED ├────────▶│ SOLD ├──────────▶│ REDEEMED │
//!   └─┬────┬─┘         └──┬───┘           └──────────┘
//!     │    │ cancel       │ expiry sweep
//!     │    ▼              ▼
//!     │ ┌───────────┐  ┌─────────┐
//!     └▶│ CANCELLED │  │ EXPIRED │   (LISTED also expires)
//!       └───────────┘  └─────────┘
//! ```
//!
//! REDEEMED, EXPIRED, and CANCELLED are terminal: a permit in any of those
//! states is immutable forever after.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, PermitId, PointmintError, Points, Result};

/// The lifecycle state of a permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermitStatus {
    /// Open on the marketplace, purchasable.
    Listed,
    /// Purchased; only the recorded buyer may redeem it.
    Sold,
    /// Exchanged for a cap. **Terminal.**
    Redeemed,
    /// Expiry passed before redemption. **Terminal.**
    Expired,
    /// Withdrawn by the supplier. **Terminal.**
    Cancelled,
}

impl PermitStatus {
    /// Can this permit transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Listed, Self::Sold | Self::Cancelled | Self::Expired)
                | (Self::Sold, Self::Redeemed | Self::Expired)
        )
    }

    /// Whether this state admits no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Redeemed | Self::Expired | Self::Cancelled)
    }
}

impl std::fmt::Display for PermitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Listed => write!(f, "LISTED"),
            Self::Sold => write!(f, "SOLD"),
            Self::Redeemed => write!(f, "REDEEMED"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// The commercial terms of a permit listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermitTerms {
    /// What the minted coupons are good for (merchant-defined category).
    pub scope: String,
    /// Maximum number of coupons the eventual cap may mint.
    pub limit: u32,
    /// Face value of each coupon, in points.
    pub face_value: Points,
    /// Asking price for the permit itself, in points.
    pub price: Points,
    /// When the delegation lapses.
    pub expires_at: DateTime<Utc>,
}

/// A supplier-listed delegation of minting rights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permit {
    /// Globally unique permit identifier.
    pub id: PermitId,
    /// The supplier delegating its minting rights.
    pub supplier: Address,
    /// The buyer, recorded at purchase. `None` while LISTED.
    pub buyer: Option<Address>,
    /// Merchant-defined scope of the minted coupons.
    pub scope: String,
    /// Maximum coupon count mintable under the eventual cap.
    pub limit: u32,
    /// Face value per coupon.
    pub face_value: Points,
    /// `limit × face_value`, precomputed at listing.
    pub total_value: Points,
    /// Asking price of the permit.
    pub price: Points,
    /// When the delegation lapses.
    pub expires_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub status: PermitStatus,
    /// The redemption nonce consumed by this permit, once redeemed.
    pub used_nonce: Option<u64>,
    /// When the permit was listed.
    pub listed_at: DateTime<Utc>,
    /// When the permit was sold.
    pub sold_at: Option<DateTime<Utc>>,
    /// When the permit was redeemed for a cap.
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl Permit {
    /// Create a LISTED permit from validated terms.
    ///
    /// # Errors
    /// - `InvalidTerms` if `limit` or `face_value` is zero, or expiry is
    ///   not after `now`
    /// - `AmountOverflow` if `limit × face_value` overflows
    pub fn list(supplier: Address, terms: PermitTerms, now: DateTime<Utc>) -> Result<Self> {
        if terms.limit == 0 {
            return Err(PointmintError::InvalidTerms {
                reason: "limit must be positive".into(),
            });
        }
        if terms.face_value.is_zero() {
            return Err(PointmintError::InvalidTerms {
                reason: "face value must be positive".into(),
            });
        }
        if terms.expires_at <= now {
            return Err(PointmintError::InvalidTerms {
                reason: format!("expiry {} is not in the future", terms.expires_at),
            });
        }
        let total_value = terms.face_value.checked_mul(terms.limit)?;
        Ok(Self {
            id: PermitId::new(),
            supplier,
            buyer: None,
            scope: terms.scope,
            limit: terms.limit,
            face_value: terms.face_value,
            total_value,
            price: terms.price,
            expires_at: terms.expires_at,
            status: PermitStatus::Listed,
            used_nonce: None,
            listed_at: now,
            sold_at: None,
            redeemed_at: None,
        })
    }

    /// Returns `true` if the permit's expiry has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    fn require_transition(&self, target: PermitStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(PointmintError::WrongPermitStatus {
                expected: match target {
                    PermitStatus::Sold | PermitStatus::Cancelled => PermitStatus::Listed,
                    _ => PermitStatus::Sold,
                },
                actual: self.status,
            });
        }
        Ok(())
    }

    /// Transition LISTED → SOLD, recording the buyer.
    pub fn mark_sold(&mut self, buyer: Address, now: DateTime<Utc>) -> Result<()> {
        self.require_transition(PermitStatus::Sold)?;
        self.buyer = Some(buyer);
        self.sold_at = Some(now);
        self.status = PermitStatus::Sold;
        Ok(())
    }

    /// Transition SOLD → REDEEMED, consuming the nonce. **Irreversible.**
    pub fn mark_redeemed(&mut self, nonce: u64, now: DateTime<Utc>) -> Result<()> {
        self.require_transition(PermitStatus::Redeemed)?;
        self.used_nonce = Some(nonce);
        self.redeemed_at = Some(now);
        self.status = PermitStatus::Redeemed;
        Ok(())
    }

    /// Transition LISTED → CANCELLED. **Irreversible.**
    pub fn mark_cancelled(&mut self) -> Result<()> {
        self.require_transition(PermitStatus::Cancelled)?;
        self.status = PermitStatus::Cancelled;
        Ok(())
    }

    /// Transition LISTED | SOLD → EXPIRED. **Irreversible.**
    pub fn mark_expired(&mut self) -> Result<()> {
        self.require_transition(PermitStatus::Expired)?;
        self.status = PermitStatus::Expired;
        Ok(())
    }
}

/// Dummy permit for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Permit {
    /// Create a LISTED permit with plausible defaults.
    pub fn dummy(supplier: Address, limit: u32, face_value: Points, price: Points) -> Self {
        let now = Utc::now();
        Self::list(
            supplier,
            PermitTerms {
                scope: "coffee".to_string(),
                limit,
                face_value,
                price,
                expires_at: now + chrono::Duration::days(30),
            },
            now,
        )
        .expect("dummy terms are valid")
    }
}
