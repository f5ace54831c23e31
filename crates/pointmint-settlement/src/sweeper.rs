//! The expiration sweeper — reclaims unredeemed value.
//!
//! Scans live coupon objects past their expiry and, per object, refunds
//! the remaining value to the **minting issuer** out of escrow, then
//! marks the object EXPIRED. Each object is its own atomic unit: a
//! failure on one (an escrow pool that cannot back the refund is the
//! realistic case) is logged and the batch continues, so one corrupt
//! pool cannot block reclamation for everyone else.

use chrono::{DateTime, Utc};
use pointmint_ledger::{CouponStore, EscrowVault, PointLedger};
use pointmint_types::{ObjectId, Points, Result};

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Objects successfully expired and refunded.
    pub swept: Vec<ObjectId>,
    /// Total points refunded to issuers (equals the escrow decrease).
    pub refunded_total: Points,
    /// Objects whose refund failed; they stay live for the next pass.
    pub failures: u32,
}

impl SweepReport {
    /// Whether the pass did anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.swept.is_empty() && self.failures == 0
    }
}

/// Reclaims expired coupon value back to issuers.
pub struct ExpirationSweeper;

impl ExpirationSweeper {
    /// Create a sweeper.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Sweep every live object past its expiry as of `now`.
    pub fn sweep(
        &self,
        store: &mut CouponStore,
        vault: &mut EscrowVault,
        ledger: &mut PointLedger,
        now: DateTime<Utc>,
    ) -> SweepReport {
        let due = store.expired_live_ids(now);
        let mut report = SweepReport::default();

        for object_id in due {
            match Self::sweep_one(store, vault, ledger, object_id) {
                Ok(refunded) => {
                    report.swept.push(object_id);
                    report.refunded_total = report
                        .refunded_total
                        .checked_add(refunded)
                        .unwrap_or(report.refunded_total);
                }
                Err(err) => {
                    report.failures += 1;
                    tracing::warn!(object = %object_id, %err, "sweep refund failed; object left for next pass");
                }
            }
        }

        if !report.is_empty() {
            tracing::info!(
                swept = report.swept.len(),
                refunded = %report.refunded_total,
                failures = report.failures,
                "expiry sweep complete"
            );
        }
        report
    }

    /// Refund and expire a single object. Atomic: the escrow release is
    /// the only fallible step and runs before any mutation of the object.
    fn sweep_one(
        store: &mut CouponStore,
        vault: &mut EscrowVault,
        ledger: &mut PointLedger,
        object_id: ObjectId,
    ) -> Result<Points> {
        let object = store.get(object_id)?;
        let refund = object.remaining;
        let issuer = object.issuer.clone();
        let supplier = object.supplier.clone();

        vault.release(&supplier, refund)?;
        ledger.credit(&issuer, refund)?;
        store.get_mut(object_id)?.mark_expired()?;
        Ok(refund)
    }
}

impl Default for ExpirationSweeper {
    fn default() -> Self {
        Self::new()
    }
}
