//! The chain-mirror boundary.
//!
//! An external synchronizer mirrors coupon state onto a distributed
//! ledger. It is strictly a best-effort side channel: the point ledger is
//! authoritative, a mirror failure never rolls back a committed
//! mutation, and inbound reconciliation may only move an object between
//! CREATED and REDEEMED. TRADING is authoritative local state — an
//! in-flight sale must never be cancelled from here — and ledger
//! balances are never touched from this path.

use chrono::{DateTime, Utc};
use pointmint_ledger::CouponStore;
use pointmint_types::{CouponObject, CouponState, ObjectId, Result};

/// Outbound mirror: publishes object snapshots to the external chain.
///
/// Implementations are expected to fail freely (network, chain
/// congestion); callers go through [`publish_best_effort`], which logs
/// and swallows the error.
pub trait ChainMirror {
    /// Push one object snapshot to the external ledger.
    fn publish(&self, snapshot: &CouponObject) -> Result<()>;
}

/// Publish a snapshot, logging failure instead of propagating it. The
/// local mutation this snapshot reflects has already committed; nothing
/// here may undo it.
pub fn publish_best_effort(mirror: &dyn ChainMirror, snapshot: &CouponObject) {
    if let Err(err) = mirror.publish(snapshot) {
        tracing::warn!(object = %snapshot.id, %err, "chain mirror publish failed; continuing");
    }
}

/// A state fact observed on the external chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedState {
    /// The chain shows the object as live.
    Created,
    /// The chain shows the object as redeemed.
    Redeemed,
}

/// Apply an observed on-chain fact to the local store.
///
/// Permitted moves are CREATED ↔ REDEEMED only, and only the state flag
/// moves — escrow and point balances stay untouched (money movement is
/// the engine's job, observed facts merely relabel). Returns `true` if
/// the local state changed.
///
/// TRADING and EXPIRED objects are left as they are, with a warning: the
/// former would cancel an in-flight sale, the latter is locally terminal.
///
/// # Errors
/// Returns `ObjectNotFound` if the id is unknown.
pub fn reconcile(
    store: &mut CouponStore,
    object_id: ObjectId,
    observed: ObservedState,
    now: DateTime<Utc>,
) -> Result<bool> {
    let object = store.get_mut(object_id)?;

    match (object.state, observed) {
        // Already in agreement.
        (CouponState::Created, ObservedState::Created)
        | (CouponState::Redeemed, ObservedState::Redeemed) => Ok(false),

        (CouponState::Created, ObservedState::Redeemed) => {
            object.state = CouponState::Redeemed;
            if object.used_at.is_none() {
                object.used_at = Some(now);
            }
            tracing::info!(object = %object_id, "reconciled CREATED → REDEEMED from chain");
            Ok(true)
        }

        (CouponState::Redeemed, ObservedState::Created) => {
            // The chain walked back a redemption; relabel only.
            object.state = CouponState::Created;
            tracing::info!(object = %object_id, "reconciled REDEEMED → CREATED from chain");
            Ok(true)
        }

        (CouponState::Trading, _) => {
            tracing::warn!(
                object = %object_id,
                ?observed,
                "refusing to reconcile TRADING object; sale in flight"
            );
            Ok(false)
        }

        (CouponState::Expired, _) => {
            tracing::warn!(
                object = %object_id,
                ?observed,
                "refusing to reconcile EXPIRED object; locally terminal"
            );
            Ok(false)
        }
    }
}

/// A mirror that drops every snapshot. For hosts running without a chain.
#[derive(Debug, Default)]
pub struct NullMirror;

impl ChainMirror for NullMirror {
    fn publish(&self, _snapshot: &CouponObject) -> Result<()> {
        Ok(())
    }
}

/// Test mirrors. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing {
    use std::cell::RefCell;

    use pointmint_types::{CouponObject, ObjectId, PointmintError, Result};

    use super::ChainMirror;

    /// Records every published snapshot id.
    #[derive(Debug, Default)]
    pub struct RecordingMirror {
        published: RefCell<Vec<ObjectId>>,
    }

    impl RecordingMirror {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn published(&self) -> Vec<ObjectId> {
            self.published.borrow().clone()
        }
    }

    impl ChainMirror for RecordingMirror {
        fn publish(&self, snapshot: &CouponObject) -> Result<()> {
            self.published.borrow_mut().push(snapshot.id);
            Ok(())
        }
    }

    /// Fails every publish, for exercising the best-effort path.
    #[derive(Debug, Default)]
    pub struct FailingMirror;

    impl ChainMirror for FailingMirror {
        fn publish(&self, _snapshot: &CouponObject) -> Result<()> {
            Err(PointmintError::Internal("chain unreachable".into()))
        }
    }
}
