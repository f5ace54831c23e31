//! Coupon minting against a cap.
//!
//! One mint call is one settlement: the issuer pays `face_value × count`
//! into the supplier's escrow, the 3% supplier fee is skimmed straight
//! back out into the supplier's spendable balance, and `count` coupon
//! objects are created carrying the net redeemable value. Every business
//! rule is checked before the first mutation.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use pointmint_ledger::{CouponStore, EscrowVault, PointLedger};
use pointmint_types::{
    Address, CapId, CouponObject, CouponState, ObjectId, PointmintError, Points, Result,
};

use crate::cap_registry::CapRegistry;

/// Mints coupon objects, at most once per idempotency key.
pub struct Minter {
    /// Idempotency keys already consumed by successful mints.
    used_keys: HashSet<String>,
    /// Per-call coupon ceiling.
    max_mint_count: u32,
}

impl Minter {
    /// Create a minter with the given per-call ceiling.
    #[must_use]
    pub fn new(max_mint_count: u32) -> Self {
        Self {
            used_keys: HashSet::new(),
            max_mint_count,
        }
    }

    /// Whether a mint with this key already settled.
    #[must_use]
    pub fn is_used(&self, idempotency_key: &str) -> bool {
        self.used_keys.contains(idempotency_key)
    }

    /// Mint `count` coupons for `recipient` under the issuer's cap.
    ///
    /// Settlement steps, applied only after every check passes:
    /// 1. debit issuer `face_value × count`
    /// 2. deposit the full amount into the supplier's escrow
    /// 3. skim `total × 3 / 100` from escrow into the supplier's balance
    /// 4. create `count` objects with `remaining = face_value − fee/count`
    /// 5. consume cap quota (EXHAUSTED at zero remaining)
    ///
    /// # Errors
    /// - `DuplicateTransaction` if the key was already used
    /// - `ZeroMintCount` / `MintBatchTooLarge` on a bad count
    /// - `CapNotFound` / `NotCapOwner`
    /// - `CapFrozen` / `CapExpired` / `CapNotActive` / `QuotaExceeded`
    /// - `InsufficientFunds` if the issuer cannot cover the cost
    #[allow(clippy::too_many_arguments)]
    pub fn mint_with_cap(
        &mut self,
        caps: &mut CapRegistry,
        ledger: &mut PointLedger,
        vault: &mut EscrowVault,
        store: &mut CouponStore,
        issuer: &Address,
        cap_id: CapId,
        recipient: &Address,
        count: u32,
        idempotency_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ObjectId>> {
        // All checks precede any mutation.
        if self.used_keys.contains(idempotency_key) {
            return Err(PointmintError::DuplicateTransaction {
                key: idempotency_key.to_string(),
            });
        }
        if count == 0 {
            return Err(PointmintError::ZeroMintCount);
        }
        if count > self.max_mint_count {
            return Err(PointmintError::MintBatchTooLarge {
                requested: count,
                max: self.max_mint_count,
            });
        }

        let cap = caps.get(cap_id)?;
        if &cap.owner != issuer {
            return Err(PointmintError::NotCapOwner);
        }
        cap.check_mintable(count, now)?;

        let supplier = cap.supplier.clone();
        let face_value = cap.face_value;
        let expires_at = cap.expires_at;

        let total_cost = face_value.checked_mul(count)?;
        let fee = total_cost.supplier_fee();
        let unit_remaining = face_value.checked_sub(fee.per_unit(count))?;

        let available = ledger.balance(issuer);
        if available < total_cost {
            return Err(PointmintError::InsufficientFunds {
                address: issuer.clone(),
                needed: total_cost,
                available,
            });
        }

        // Settlement. Nothing below can fail on a business rule; an error
        // here is an integrity violation and propagates as fatal.
        self.used_keys.insert(idempotency_key.to_string());
        ledger.debit(issuer, total_cost)?;
        vault.deposit(&supplier, total_cost)?;
        vault.skim_fee(&supplier, fee, ledger)?;

        let mut ids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let object = CouponObject {
                id: ObjectId::new(),
                owner: recipient.clone(),
                supplier: supplier.clone(),
                issuer: issuer.clone(),
                cap_id,
                face_value,
                remaining: unit_remaining,
                trade_count: 0,
                state: CouponState::Created,
                issued_at: now,
                expires_at,
                jti: None,
                token_expires_at: None,
                used_at: None,
            };
            ids.push(object.id);
            store.insert(object);
        }

        caps.get_mut(cap_id)?.record_mint(count, total_cost)?;

        tracing::info!(
            cap = %cap_id,
            issuer = %issuer.short(),
            recipient = %recipient.short(),
            count,
            %total_cost,
            %fee,
            "coupons minted"
        );
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permit_book::PermitBook;
    use pointmint_types::{CapStatus, PermitTerms, Principal, Role};

    struct Fixture {
        caps: CapRegistry,
        ledger: PointLedger,
        vault: EscrowVault,
        store: CouponStore,
        minter: Minter,
        supplier: Address,
        issuer: Address,
        cap_id: CapId,
    }

    fn setup(limit: u32, face_value: u128) -> Fixture {
        let mut book = PermitBook::new();
        let mut caps = CapRegistry::new();
        let mut ledger = PointLedger::new();
        let supplier = Address::new("0xsupplier");
        let issuer = Address::new("0xissuer");

        ledger.credit(&issuer, Points::new(100_000)).unwrap();
        let permit_id = book
            .list(
                &supplier,
                PermitTerms {
                    scope: "coffee".into(),
                    limit,
                    face_value: Points::new(face_value),
                    price: Points::new(500),
                    expires_at: Utc::now() + chrono::Duration::days(30),
                },
                Utc::now(),
            )
            .unwrap();
        book.buy(&issuer, permit_id, &mut ledger, Utc::now()).unwrap();
        let cap_id = caps
            .redeem(&mut book, &issuer, permit_id, 1, Utc::now())
            .unwrap();

        Fixture {
            caps,
            ledger,
            vault: EscrowVault::new(),
            store: CouponStore::new(),
            minter: Minter::new(1_000),
            supplier,
            issuer,
            cap_id,
        }
    }

    fn mint(f: &mut Fixture, count: u32, key: &str) -> Result<Vec<ObjectId>> {
        let issuer = f.issuer.clone();
        let recipient = issuer.clone();
        f.minter.mint_with_cap(
            &mut f.caps,
            &mut f.ledger,
            &mut f.vault,
            &mut f.store,
            &issuer,
            f.cap_id,
            &recipient,
            count,
            key,
            Utc::now(),
        )
    }

    #[test]
    fn single_mint_worked_example() {
        // Issuer balance 10,000 mints 1 object at face 1000:
        // issuer → 9,000; escrow 970 after the 30-point fee skim.
        let mut f = setup(10, 1000);
        // Fixture credits 100,000 then pays 500 for the permit.
        let start = f.ledger.balance(&f.issuer);

        let ids = mint(&mut f, 1, "mint-1").unwrap();
        assert_eq!(ids.len(), 1);

        assert_eq!(
            f.ledger.balance(&f.issuer),
            start.checked_sub(Points::new(1000)).unwrap()
        );
        assert_eq!(f.vault.balance(&f.supplier), Points::new(970));
        // Permit price 500 + fee 30.
        assert_eq!(f.ledger.balance(&f.supplier), Points::new(530));

        let object = f.store.get(ids[0]).unwrap();
        assert_eq!(object.face_value, Points::new(1000));
        assert_eq!(object.remaining, Points::new(970));
        assert_eq!(object.state, CouponState::Created);
        assert_eq!(object.owner, f.issuer);
        assert_eq!(object.issuer, f.issuer);
        assert_eq!(object.supplier, f.supplier);

        let cap = f.caps.get(f.cap_id).unwrap();
        assert_eq!(cap.remaining, 9);
        assert_eq!(cap.issued_count, 1);
        assert_eq!(cap.total_value_issued, Points::new(1000));
        assert!(cap.invariant_holds());
    }

    #[test]
    fn batch_mint_spreads_fee() {
        let mut f = setup(10, 1000);
        let ids = mint(&mut f, 5, "mint-batch").unwrap();
        assert_eq!(ids.len(), 5);

        // total 5000, fee 150, per-unit deduction 30.
        assert_eq!(f.vault.balance(&f.supplier), Points::new(4850));
        for id in ids {
            assert_eq!(f.store.get(id).unwrap().remaining, Points::new(970));
        }
        let cap = f.caps.get(f.cap_id).unwrap();
        assert_eq!(cap.remaining, 5);
        assert_eq!(cap.issued_count, 5);
    }

    #[test]
    fn duplicate_key_rejected_without_mutation() {
        let mut f = setup(10, 1000);
        mint(&mut f, 1, "mint-once").unwrap();

        let escrow_before = f.vault.balance(&f.supplier);
        let issuer_before = f.ledger.balance(&f.issuer);

        let err = mint(&mut f, 1, "mint-once").unwrap_err();
        assert!(matches!(err, PointmintError::DuplicateTransaction { .. }));
        assert_eq!(f.vault.balance(&f.supplier), escrow_before);
        assert_eq!(f.ledger.balance(&f.issuer), issuer_before);
        assert_eq!(f.store.len(), 1);
    }

    #[test]
    fn exhausts_cap_at_limit() {
        let mut f = setup(3, 1000);
        mint(&mut f, 3, "mint-all").unwrap();

        let cap = f.caps.get(f.cap_id).unwrap();
        assert_eq!(cap.remaining, 0);
        assert_eq!(cap.status, CapStatus::Exhausted);

        let err = mint(&mut f, 1, "mint-more").unwrap_err();
        assert!(matches!(err, PointmintError::CapNotActive { .. }));
    }

    #[test]
    fn quota_exceeded_rejected() {
        let mut f = setup(3, 1000);
        let err = mint(&mut f, 4, "mint-over").unwrap_err();
        assert!(matches!(
            err,
            PointmintError::QuotaExceeded {
                requested: 4,
                remaining: 3
            }
        ));
        assert!(f.store.is_empty());
    }

    #[test]
    fn frozen_cap_blocks_mint() {
        let mut f = setup(10, 1000);
        let admin = Principal::new("u-1", Address::new("0xadmin"), Role::Admin);
        f.caps.freeze(f.cap_id, &admin).unwrap();

        let err = mint(&mut f, 1, "mint-frozen").unwrap_err();
        assert!(matches!(err, PointmintError::CapFrozen(_)));
    }

    #[test]
    fn only_cap_owner_may_mint() {
        let mut f = setup(10, 1000);
        let stranger = Address::new("0xstranger");
        let recipient = stranger.clone();
        let err = f
            .minter
            .mint_with_cap(
                &mut f.caps,
                &mut f.ledger,
                &mut f.vault,
                &mut f.store,
                &stranger,
                f.cap_id,
                &recipient,
                1,
                "mint-theft",
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, PointmintError::NotCapOwner));
    }

    #[test]
    fn insufficient_issuer_funds_rejected_clean() {
        let mut f = setup(10, 1000);
        // Drain the issuer down to less than one face value.
        let balance = f.ledger.balance(&f.issuer);
        f.ledger
            .debit(&f.issuer, balance.checked_sub(Points::new(500)).unwrap())
            .unwrap();

        let err = mint(&mut f, 1, "mint-poor").unwrap_err();
        assert!(matches!(err, PointmintError::InsufficientFunds { .. }));
        assert!(f.store.is_empty());
        assert_eq!(f.vault.balance(&f.supplier), Points::ZERO);
        // The key was not consumed; a funded retry succeeds.
        f.ledger.credit(&f.issuer, Points::new(10_000)).unwrap();
        mint(&mut f, 1, "mint-poor").unwrap();
    }

    #[test]
    fn zero_and_oversized_counts_rejected() {
        let mut f = setup(10, 1000);
        assert!(matches!(
            mint(&mut f, 0, "mint-zero").unwrap_err(),
            PointmintError::ZeroMintCount
        ));

        f.minter = Minter::new(2);
        assert!(matches!(
            mint(&mut f, 3, "mint-big").unwrap_err(),
            PointmintError::MintBatchTooLarge { requested: 3, max: 2 }
        ));
    }

    #[test]
    fn mint_to_third_party_recipient() {
        let mut f = setup(10, 1000);
        let customer = Address::new("0xcustomer");
        let issuer = f.issuer.clone();
        let ids = f
            .minter
            .mint_with_cap(
                &mut f.caps,
                &mut f.ledger,
                &mut f.vault,
                &mut f.store,
                &issuer,
                f.cap_id,
                &customer,
                1,
                "mint-gift",
                Utc::now(),
            )
            .unwrap();

        let object = f.store.get(ids[0]).unwrap();
        assert_eq!(object.owner, customer);
        assert_eq!(object.issuer, f.issuer, "refund target stays the issuer");
    }

    #[test]
    fn objects_inherit_cap_expiry() {
        let mut f = setup(10, 1000);
        let ids = mint(&mut f, 1, "mint-exp").unwrap();
        let cap = f.caps.get(f.cap_id).unwrap();
        assert_eq!(f.store.get(ids[0]).unwrap().expires_at, cap.expires_at);
    }
}
