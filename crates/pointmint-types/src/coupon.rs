//! # CouponObject — the individually owned unit of value
//!
//! Minted under a [`crate::Cap`], backed by supplier escrow, traded
//! peer-to-peer, and redeemed exactly once at the supplier.
//!
//! ## State Machine
//!
//! ```text
//!              list                trade settles (new owner)
//!   ┌─────────┐────▶┌─────────┐──────────────────────────┐
//!   │ CREATED │     │ TRADING │                          │
//!   └─┬───┬───┘◀────┴────┬────┘◀─────────────────────────┘
//!     │   │ token verified │ expiry sweep
//!     │   ▼                ▼
//!     │ ┌──────────┐   ┌─────────┐
//!     │ │ REDEEMED │   │ EXPIRED │   (CREATED also expires)
//!     │ └──────────┘   └─────────┘
//! ```
//!
//! REDEEMED and EXPIRED are terminal. TRADING is authoritative local
//! state: external reconciliation must never overwrite it, because doing
//! so would silently cancel an in-flight sale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, CapId, ObjectId, PointmintError, Points, RedemptionToken, Result};

/// The lifecycle state of a coupon object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CouponState {
    /// Held by its owner; listable and redeemable.
    Created,
    /// Listed on the marketplace; a sale is in flight.
    Trading,
    /// Value paid out to the supplier. **Terminal.**
    Redeemed,
    /// Value reclaimed to the issuer by the sweeper. **Terminal.**
    Expired,
}

impl CouponState {
    /// Can this object transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Trading | Self::Redeemed | Self::Expired)
                | (Self::Trading, Self::Created | Self::Expired)
        )
    }

    /// Whether this state admits no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Redeemed | Self::Expired)
    }
}

impl std::fmt::Display for CouponState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Trading => write!(f, "TRADING"),
            Self::Redeemed => write!(f, "REDEEMED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// An individually owned, tradeable, one-time-redeemable unit of value.
///
/// Invariant: `0 ≤ remaining ≤ face_value`. `remaining` is the redeemable
/// value net of fees already skimmed into the supplier's point account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponObject {
    /// Globally unique object identifier.
    pub id: ObjectId,
    /// Current owner (changes on every settled trade).
    pub owner: Address,
    /// The supplier whose escrow backs this object.
    pub supplier: Address,
    /// The issuer that minted this object (refund target on expiry).
    pub issuer: Address,
    /// The cap this object was minted under.
    pub cap_id: CapId,
    /// Face value at mint.
    pub face_value: Points,
    /// Redeemable value still backed by escrow.
    pub remaining: Points,
    /// Number of settled ownership transfers.
    pub trade_count: u32,
    /// Current lifecycle state.
    pub state: CouponState,
    /// When the object was minted.
    pub issued_at: DateTime<Utc>,
    /// When the object lapses (inherited from the cap).
    pub expires_at: DateTime<Utc>,
    /// The current one-time redemption token, if any.
    pub jti: Option<RedemptionToken>,
    /// Nominal validity bound of `jti`.
    pub token_expires_at: Option<DateTime<Utc>>,
    /// When the object was redeemed. Set exactly once.
    pub used_at: Option<DateTime<Utc>>,
}

impl CouponObject {
    /// Returns `true` if the object's expiry has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the value invariant holds.
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        self.remaining <= self.face_value
    }

    fn require_transition(&self, target: CouponState) -> Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(PointmintError::WrongObjectState {
                expected: CouponState::Created,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Transition CREATED → TRADING (owner listed the object for sale).
    pub fn mark_trading(&mut self) -> Result<()> {
        self.require_transition(CouponState::Trading)?;
        self.state = CouponState::Trading;
        Ok(())
    }

    /// Settle a trade: TRADING → CREATED under the new owner, with the
    /// trade fee deducted from the redeemable value.
    pub fn mark_traded(&mut self, new_owner: Address, fee: Points) -> Result<()> {
        if self.state != CouponState::Trading {
            return Err(PointmintError::WrongObjectState {
                expected: CouponState::Trading,
                actual: self.state,
            });
        }
        self.remaining = self.remaining.checked_sub(fee)?;
        self.owner = new_owner;
        self.trade_count += 1;
        self.state = CouponState::Created;
        Ok(())
    }

    /// Final payout: CREATED → REDEEMED. **Irreversible.** Zeroes the
    /// redeemable value and stamps `used_at`.
    pub fn mark_redeemed(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.require_transition(CouponState::Redeemed)?;
        self.remaining = Points::ZERO;
        self.used_at = Some(now);
        self.state = CouponState::Redeemed;
        Ok(())
    }

    /// Expiry reclamation: CREATED | TRADING → EXPIRED. **Irreversible.**
    pub fn mark_expired(&mut self) -> Result<()> {
        self.require_transition(CouponState::Expired)?;
        self.remaining = Points::ZERO;
        self.state = CouponState::Expired;
        Ok(())
    }
}

/// Dummy object for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl CouponObject {
    /// Create a CREATED object with plausible defaults.
    pub fn dummy(owner: Address, supplier: Address, issuer: Address, value: Points) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            owner,
            supplier,
            issuer,
            cap_id: CapId::new(),
            face_value: value,
            remaining: value,
            trade_count: 0,
            state: CouponState::Created,
            issued_at: now,
            expires_at: now + chrono::Duration::days(30),
            jti: None,
            token_expires_at: None,
            used_at: None,
        }
    }
}
