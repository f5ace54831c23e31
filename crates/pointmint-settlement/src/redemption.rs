//! The redemption engine — one-time tokens and final payout.
//!
//! The owner of a CREATED object asks for a redemption token; the
//! supplier presents that token to collect the object's remaining value
//! out of escrow. Single-use is the hard guarantee: the token index, the
//! CREATED-only state gate, and the write-once `used_at` stamp each block
//! a second payout independently. The stored wall-clock TTL is nominal
//! and not checked at verification time.

use chrono::{DateTime, Duration, Utc};
use pointmint_ledger::{CouponStore, EscrowVault, PointLedger};
use pointmint_types::{
    constants, Address, CouponState, ObjectId, PointmintError, Points, RedemptionToken, Result,
};
use rand::RngCore;

/// Issues one-time tokens and settles redemptions.
pub struct RedemptionEngine {
    /// Nominal token validity window.
    token_ttl: Duration,
}

impl RedemptionEngine {
    /// Create an engine with the given nominal token TTL in seconds.
    #[must_use]
    pub fn new(token_ttl_secs: i64) -> Self {
        Self {
            token_ttl: Duration::seconds(token_ttl_secs),
        }
    }

    /// Engine with the default 5-minute token window.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(constants::REDEMPTION_TOKEN_TTL_SECS)
    }

    /// Issue a fresh one-time token for the owner's CREATED object,
    /// overwriting any prior token (one valid token per object at a time).
    ///
    /// # Errors
    /// - `ObjectNotFound` / `ObjectExpired`
    /// - `NotObjectOwner` if the caller does not own the object
    /// - `WrongObjectState` unless the object is CREATED
    pub fn generate_token(
        &self,
        store: &mut CouponStore,
        owner: &Address,
        object_id: ObjectId,
        now: DateTime<Utc>,
    ) -> Result<RedemptionToken> {
        let object = store.get(object_id)?;

        if &object.owner != owner {
            return Err(PointmintError::NotObjectOwner);
        }
        if object.state != CouponState::Created {
            return Err(PointmintError::WrongObjectState {
                expected: CouponState::Created,
                actual: object.state,
            });
        }
        if object.is_expired(now) {
            return Err(PointmintError::ObjectExpired(object_id));
        }

        let mut bytes = [0u8; constants::REDEMPTION_TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = RedemptionToken::from_bytes(&bytes);

        store.set_token(object_id, token.clone(), now + self.token_ttl)?;
        tracing::debug!(object = %object_id, token = %token, "redemption token issued");
        Ok(token)
    }

    /// Verify a presented token and pay the object's remaining value out
    /// of escrow to the supplier. Terminal: the object ends REDEEMED with
    /// `remaining = 0` and `used_at` stamped.
    ///
    /// # Errors
    /// - `TokenNotFound` if no object carries the token
    /// - `WrongSupplier` unless the caller is the object's supplier
    /// - `TokenAlreadyUsed` if `used_at` is already set
    /// - `WrongObjectState` if the object is TRADING or terminal
    /// - `ObjectExpired` if the object lapsed before verification
    /// - `EscrowUnderflow` (fatal) if escrow cannot back the payout
    pub fn verify_and_redeem(
        &self,
        store: &mut CouponStore,
        vault: &mut EscrowVault,
        ledger: &mut PointLedger,
        supplier: &Address,
        token: &RedemptionToken,
        now: DateTime<Utc>,
    ) -> Result<Points> {
        let object = store.find_by_token(token)?;
        let object_id = object.id;

        // All checks precede any mutation.
        if &object.supplier != supplier {
            return Err(PointmintError::WrongSupplier);
        }
        if object.used_at.is_some() {
            return Err(PointmintError::TokenAlreadyUsed);
        }
        if object.state != CouponState::Created {
            return Err(PointmintError::WrongObjectState {
                expected: CouponState::Created,
                actual: object.state,
            });
        }
        if object.is_expired(now) {
            return Err(PointmintError::ObjectExpired(object_id));
        }

        let payout = object.remaining;

        // Settlement: escrow → supplier balance, then the terminal
        // transition. An error here is an integrity violation.
        vault.release(supplier, payout)?;
        ledger.credit(supplier, payout)?;
        store.get_mut(object_id)?.mark_redeemed(now)?;

        tracing::info!(
            object = %object_id,
            supplier = %supplier.short(),
            %payout,
            "coupon redeemed"
        );
        Ok(payout)
    }
}

impl Default for RedemptionEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointmint_types::CouponObject;

    struct Fixture {
        store: CouponStore,
        ledger: PointLedger,
        vault: EscrowVault,
        engine: RedemptionEngine,
        supplier: Address,
        owner: Address,
        object_id: ObjectId,
    }

    /// A minted 1000-face object backed by 970 points of escrow.
    fn setup() -> Fixture {
        let mut store = CouponStore::new();
        let mut vault = EscrowVault::new();
        let supplier = Address::new("0xsupplier");
        let owner = Address::new("0xowner");

        let mut object = CouponObject::dummy(
            owner.clone(),
            supplier.clone(),
            Address::new("0xissuer"),
            Points::new(1000),
        );
        object.remaining = Points::new(970);
        let object_id = object.id;
        store.insert(object);
        vault.deposit(&supplier, Points::new(970)).unwrap();

        Fixture {
            store,
            ledger: PointLedger::new(),
            vault,
            engine: RedemptionEngine::with_defaults(),
            supplier,
            owner,
            object_id,
        }
    }

    fn token(f: &mut Fixture) -> RedemptionToken {
        let owner = f.owner.clone();
        f.engine
            .generate_token(&mut f.store, &owner, f.object_id, Utc::now())
            .unwrap()
    }

    #[test]
    fn generate_token_sets_jti_and_ttl() {
        let mut f = setup();
        let now = Utc::now();
        let owner = f.owner.clone();
        let tok = f
            .engine
            .generate_token(&mut f.store, &owner, f.object_id, now)
            .unwrap();

        let object = f.store.get(f.object_id).unwrap();
        assert_eq!(object.jti, Some(tok.clone()));
        assert_eq!(
            object.token_expires_at,
            Some(now + Duration::seconds(300)),
            "nominal 5-minute window stored"
        );
        assert_eq!(f.store.find_by_token(&tok).unwrap().id, f.object_id);
    }

    #[test]
    fn regenerate_invalidates_prior_token() {
        let mut f = setup();
        let first = token(&mut f);
        let second = token(&mut f);
        assert_ne!(first, second);

        let supplier = f.supplier.clone();
        let err = f
            .engine
            .verify_and_redeem(
                &mut f.store,
                &mut f.vault,
                &mut f.ledger,
                &supplier,
                &first,
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, PointmintError::TokenNotFound));
    }

    #[test]
    fn only_owner_gets_a_token() {
        let mut f = setup();
        let stranger = Address::new("0xstranger");
        let err = f
            .engine
            .generate_token(&mut f.store, &stranger, f.object_id, Utc::now())
            .unwrap_err();
        assert!(matches!(err, PointmintError::NotObjectOwner));
    }

    #[test]
    fn redeem_pays_remaining_and_terminates() {
        let mut f = setup();
        let tok = token(&mut f);
        let supplier = f.supplier.clone();
        let now = Utc::now();

        let payout = f
            .engine
            .verify_and_redeem(
                &mut f.store,
                &mut f.vault,
                &mut f.ledger,
                &supplier,
                &tok,
                now,
            )
            .unwrap();

        assert_eq!(payout, Points::new(970));
        assert_eq!(f.vault.balance(&f.supplier), Points::ZERO);
        assert_eq!(f.ledger.balance(&f.supplier), Points::new(970));

        let object = f.store.get(f.object_id).unwrap();
        assert_eq!(object.state, CouponState::Redeemed);
        assert_eq!(object.remaining, Points::ZERO);
        assert_eq!(object.used_at, Some(now));
    }

    #[test]
    fn double_redeem_blocked() {
        let mut f = setup();
        let tok = token(&mut f);
        let supplier = f.supplier.clone();

        f.engine
            .verify_and_redeem(
                &mut f.store,
                &mut f.vault,
                &mut f.ledger,
                &supplier,
                &tok,
                Utc::now(),
            )
            .unwrap();

        let err = f
            .engine
            .verify_and_redeem(
                &mut f.store,
                &mut f.vault,
                &mut f.ledger,
                &supplier,
                &tok,
                Utc::now(),
            )
            .unwrap_err();
        // The consumed token still resolves, but the used_at stamp blocks it.
        assert!(matches!(err, PointmintError::TokenAlreadyUsed));
        assert_eq!(f.ledger.balance(&f.supplier), Points::new(970), "paid once");
    }

    #[test]
    fn wrong_supplier_rejected() {
        let mut f = setup();
        let tok = token(&mut f);
        let impostor = Address::new("0ximpostor");

        let err = f
            .engine
            .verify_and_redeem(
                &mut f.store,
                &mut f.vault,
                &mut f.ledger,
                &impostor,
                &tok,
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, PointmintError::WrongSupplier));
        assert_eq!(f.vault.balance(&f.supplier), Points::new(970), "untouched");
    }

    #[test]
    fn trading_object_cannot_redeem() {
        let mut f = setup();
        let tok = token(&mut f);
        f.store.get_mut(f.object_id).unwrap().mark_trading().unwrap();

        let supplier = f.supplier.clone();
        let err = f
            .engine
            .verify_and_redeem(
                &mut f.store,
                &mut f.vault,
                &mut f.ledger,
                &supplier,
                &tok,
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, PointmintError::WrongObjectState { .. }));
    }

    #[test]
    fn expired_object_cannot_redeem() {
        let mut f = setup();
        let tok = token(&mut f);
        f.store.get_mut(f.object_id).unwrap().expires_at =
            Utc::now() - chrono::Duration::hours(1);

        let supplier = f.supplier.clone();
        let err = f
            .engine
            .verify_and_redeem(
                &mut f.store,
                &mut f.vault,
                &mut f.ledger,
                &supplier,
                &tok,
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, PointmintError::ObjectExpired(_)));
    }

    #[test]
    fn stale_ttl_is_not_enforced() {
        // The stored window is nominal; verification checks single-use and
        // object expiry, not the token's wall-clock TTL.
        let mut f = setup();
        let tok = token(&mut f);
        let supplier = f.supplier.clone();
        let an_hour_on = Utc::now() + Duration::hours(1);

        let payout = f
            .engine
            .verify_and_redeem(
                &mut f.store,
                &mut f.vault,
                &mut f.ledger,
                &supplier,
                &tok,
                an_hour_on,
            )
            .unwrap();
        assert_eq!(payout, Points::new(970));
    }

    #[test]
    fn unknown_token_not_found() {
        let mut f = setup();
        let supplier = f.supplier.clone();
        let bogus = RedemptionToken::from_bytes(&[9u8; 32]);
        let err = f
            .engine
            .verify_and_redeem(
                &mut f.store,
                &mut f.vault,
                &mut f.ledger,
                &supplier,
                &bogus,
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, PointmintError::TokenNotFound));
    }
}
