//! The marketplace trading engine.
//!
//! Owners list CREATED objects for sale (→ TRADING); buyers settle the
//! trade in one step: buyer pays face value to the seller, the 3% fee
//! moves from escrow to the supplier, ownership transfers, and the object
//! returns to CREATED under the new owner. Every business rule is checked
//! before the first mutation, so a rejected buy has zero side effects.
//!
//! Note the charge is the object's **face value**, not its current
//! `remaining` — the fee history a coupon carries does not discount it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pointmint_ledger::{CouponStore, EscrowVault, PointLedger};
use pointmint_types::{
    Address, CouponState, ObjectId, PointmintError, Points, Result, TradeId, TradeRecord,
};

use crate::trade_log::TradeLog;

/// An open sale listing.
#[derive(Debug, Clone)]
pub struct Listing {
    /// The object for sale.
    pub object_id: ObjectId,
    /// The owner that listed it.
    pub seller: Address,
    /// Asked price. Recorded into the audit row; the settlement charges
    /// the object's face value.
    pub price: Points,
    /// When the listing was opened.
    pub listed_at: DateTime<Utc>,
}

/// Lists objects and settles ownership-transfer trades.
pub struct MarketEngine {
    /// Open listings by object.
    listings: HashMap<ObjectId, Listing>,
    /// The append-only audit log (uniqueness = idempotency).
    log: TradeLog,
}

impl MarketEngine {
    /// Create an engine with an empty book and log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listings: HashMap::new(),
            log: TradeLog::new(),
        }
    }

    /// List a CREATED object for sale, transitioning it to TRADING.
    ///
    /// # Errors
    /// - `ObjectNotFound` / `ObjectExpired`
    /// - `NotObjectOwner` if the caller does not own the object
    /// - `WrongObjectState` unless the object is CREATED
    pub fn list_for_sale(
        &mut self,
        store: &mut CouponStore,
        seller: &Address,
        object_id: ObjectId,
        price: Points,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let object = store.get(object_id)?;

        if &object.owner != seller {
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

        store.get_mut(object_id)?.mark_trading()?;
        self.listings.insert(
            object_id,
            Listing {
                object_id,
                seller: seller.clone(),
                price,
                listed_at: now,
            },
        );
        tracing::info!(object = %object_id, seller = %seller.short(), %price, "object listed");
        Ok(())
    }

    /// Settle a purchase of a TRADING object.
    ///
    /// One settlement performs: buyer debit (face value), seller credit,
    /// fee skim escrow → supplier, ownership transfer, `remaining -= fee`,
    /// `trade_count += 1`, state back to CREATED, audit row appended.
    ///
    /// # Errors
    /// - `DuplicateTransaction` if the idempotency key was already used —
    ///   checked first, before anything else
    /// - `ObjectNotFound` / `WrongObjectState` / `ObjectExpired`
    /// - `SelfTradeBlocked` if the buyer already owns the object
    /// - `InsufficientFunds` if the buyer cannot cover face value
    /// - `AmountOverflow` if the object's residual value cannot bear the fee
    /// - `EscrowUnderflow` (fatal) if escrow cannot back the fee
    pub fn buy(
        &mut self,
        store: &mut CouponStore,
        ledger: &mut PointLedger,
        vault: &mut EscrowVault,
        buyer: &Address,
        object_id: ObjectId,
        idempotency_key: &str,
        now: DateTime<Utc>,
    ) -> Result<TradeRecord> {
        // At-most-once: a replayed key fails before any mutation.
        if self.log.contains_key(idempotency_key) {
            return Err(PointmintError::DuplicateTransaction {
                key: idempotency_key.to_string(),
            });
        }

        let object = store.get(object_id)?;
        if object.state != CouponState::Trading {
            return Err(PointmintError::WrongObjectState {
                expected: CouponState::Trading,
                actual: object.state,
            });
        }
        if &object.owner == buyer {
            return Err(PointmintError::SelfTradeBlocked);
        }
        if object.is_expired(now) {
            return Err(PointmintError::ObjectExpired(object_id));
        }

        let seller = object.owner.clone();
        let supplier = object.supplier.clone();
        let face_value = object.face_value;
        let fee = face_value.supplier_fee();
        // A heavily retraded object may no longer bear the fee; reject
        // here, while nothing has moved yet.
        object.remaining.checked_sub(fee)?;

        let available = ledger.balance(buyer);
        if available < face_value {
            return Err(PointmintError::InsufficientFunds {
                address: buyer.clone(),
                needed: face_value,
                available,
            });
        }

        let listing = self
            .listings
            .get(&object_id)
            .ok_or_else(|| {
                PointmintError::Internal(format!("TRADING object {object_id} has no listing row"))
            })?
            .clone();

        // Settlement. Nothing below can fail on a business rule; an error
        // here is an integrity violation and propagates as fatal.
        ledger.debit(buyer, face_value)?;
        ledger.credit(&seller, face_value)?;
        vault.skim_fee(&supplier, fee, ledger)?;

        let object = store.get_mut(object_id)?;
        object.mark_traded(buyer.clone(), fee)?;
        let remaining_after_trade = object.remaining;

        self.listings.remove(&object_id);

        let record = TradeRecord {
            idempotency_key: idempotency_key.to_string(),
            trade_id: TradeId::from_key(idempotency_key),
            object_id,
            seller: seller.clone(),
            buyer: buyer.clone(),
            price: listing.price,
            supplier_fee: fee,
            remaining_after_trade,
            processed_at: now,
        };
        self.log.append(record.clone())?;

        tracing::info!(
            object = %object_id,
            seller = %seller.short(),
            buyer = %buyer.short(),
            %face_value,
            %fee,
            "trade settled"
        );
        Ok(record)
    }

    /// The open listing for an object, if any.
    #[must_use]
    pub fn listing(&self, object_id: ObjectId) -> Option<&Listing> {
        self.listings.get(&object_id)
    }

    /// Number of open listings.
    #[must_use]
    pub fn open_listings(&self) -> usize {
        self.listings.len()
    }

    /// The audit log.
    #[must_use]
    pub fn log(&self) -> &TradeLog {
        &self.log
    }

    /// Drop the listing row for an object the sweeper expired while it was
    /// TRADING. The object itself is already terminal.
    pub fn purge_listing(&mut self, object_id: ObjectId) {
        self.listings.remove(&object_id);
    }
}

impl Default for MarketEngine {
    fn default() -> Self {
        Self::new()
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
        market: MarketEngine,
        supplier: Address,
        seller: Address,
        buyer: Address,
        object_id: ObjectId,
    }

    /// One freshly minted 1000-face object: escrow already holds 970
    /// (face minus the 30-point issuance fee), matching mint output.
    fn setup() -> Fixture {
        let mut store = CouponStore::new();
        let mut ledger = PointLedger::new();
        let mut vault = EscrowVault::new();
        let supplier = Address::new("0xsupplier");
        let seller = Address::new("0xseller");
        let buyer = Address::new("0xbuyer");

        let mut object = CouponObject::dummy(
            seller.clone(),
            supplier.clone(),
            Address::new("0xissuer"),
            Points::new(1000),
        );
        object.remaining = Points::new(970);
        let object_id = object.id;
        store.insert(object);
        vault.deposit(&supplier, Points::new(970)).unwrap();
        ledger.credit(&buyer, Points::new(5000)).unwrap();

        Fixture {
            store,
            ledger,
            vault,
            market: MarketEngine::new(),
            supplier,
            seller,
            buyer,
            object_id,
        }
    }

    fn list(f: &mut Fixture, price: u128) {
        let seller = f.seller.clone();
        f.market
            .list_for_sale(
                &mut f.store,
                &seller,
                f.object_id,
                Points::new(price),
                Utc::now(),
            )
            .unwrap();
    }

    fn buy(f: &mut Fixture, key: &str) -> Result<TradeRecord> {
        let buyer = f.buyer.clone();
        f.market.buy(
            &mut f.store,
            &mut f.ledger,
            &mut f.vault,
            &buyer,
            f.object_id,
            key,
            Utc::now(),
        )
    }

    #[test]
    fn list_transitions_to_trading() {
        let mut f = setup();
        list(&mut f, 900);

        assert_eq!(
            f.store.get(f.object_id).unwrap().state,
            CouponState::Trading
        );
        let listing = f.market.listing(f.object_id).unwrap();
        assert_eq!(listing.price, Points::new(900));
        assert_eq!(listing.seller, f.seller);
    }

    #[test]
    fn only_owner_may_list() {
        let mut f = setup();
        let stranger = Address::new("0xstranger");
        let err = f
            .market
            .list_for_sale(
                &mut f.store,
                &stranger,
                f.object_id,
                Points::new(900),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, PointmintError::NotObjectOwner));
    }

    #[test]
    fn expired_object_cannot_be_listed() {
        let mut f = setup();
        f.store.get_mut(f.object_id).unwrap().expires_at =
            Utc::now() - chrono::Duration::hours(1);
        let seller = f.seller.clone();
        let err = f
            .market
            .list_for_sale(
                &mut f.store,
                &seller,
                f.object_id,
                Points::new(900),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, PointmintError::ObjectExpired(_)));
    }

    #[test]
    fn trade_conservation_worked_example() {
        // Buyer pays face 1000; seller +1000; supplier +30; escrow −30;
        // remaining 970 → 940; trade_count 0 → 1.
        let mut f = setup();
        list(&mut f, 900);

        let record = buy(&mut f, "trade-1").unwrap();

        assert_eq!(f.ledger.balance(&f.buyer), Points::new(4000));
        assert_eq!(f.ledger.balance(&f.seller), Points::new(1000));
        assert_eq!(f.ledger.balance(&f.supplier), Points::new(30));
        assert_eq!(f.vault.balance(&f.supplier), Points::new(940));

        let object = f.store.get(f.object_id).unwrap();
        assert_eq!(object.state, CouponState::Created);
        assert_eq!(object.owner, f.buyer);
        assert_eq!(object.remaining, Points::new(940));
        assert_eq!(object.trade_count, 1);

        assert_eq!(record.price, Points::new(900), "asked price recorded");
        assert_eq!(record.supplier_fee, Points::new(30));
        assert_eq!(record.remaining_after_trade, Points::new(940));
        assert_eq!(record.trade_id, TradeId::from_key("trade-1"));
        assert!(f.market.listing(f.object_id).is_none(), "listing consumed");
    }

    #[test]
    fn duplicate_key_changes_nothing() {
        let mut f = setup();
        list(&mut f, 900);
        buy(&mut f, "trade-1").unwrap();

        let buyer_before = f.ledger.balance(&f.buyer);
        let seller_before = f.ledger.balance(&f.seller);
        let escrow_before = f.vault.balance(&f.supplier);

        let err = buy(&mut f, "trade-1").unwrap_err();
        assert!(matches!(err, PointmintError::DuplicateTransaction { .. }));

        assert_eq!(f.ledger.balance(&f.buyer), buyer_before);
        assert_eq!(f.ledger.balance(&f.seller), seller_before);
        assert_eq!(f.vault.balance(&f.supplier), escrow_before);
        assert_eq!(f.market.log().len(), 1, "exactly one audit row");
        assert_eq!(f.store.get(f.object_id).unwrap().trade_count, 1);
    }

    #[test]
    fn buy_unlisted_object_fails() {
        let mut f = setup();
        let err = buy(&mut f, "trade-1").unwrap_err();
        assert!(matches!(
            err,
            PointmintError::WrongObjectState {
                expected: CouponState::Trading,
                ..
            }
        ));
    }

    #[test]
    fn owner_cannot_buy_own_listing() {
        let mut f = setup();
        list(&mut f, 900);
        let seller = f.seller.clone();
        let err = f
            .market
            .buy(
                &mut f.store,
                &mut f.ledger,
                &mut f.vault,
                &seller,
                f.object_id,
                "trade-self",
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, PointmintError::SelfTradeBlocked));
    }

    #[test]
    fn poor_buyer_rejected_without_side_effects() {
        let mut f = setup();
        list(&mut f, 900);
        // Buyer charged face value (1000), not the asked price: 999 is short.
        let balance = f.ledger.balance(&f.buyer);
        f.ledger
            .debit(&f.buyer, balance.checked_sub(Points::new(999)).unwrap())
            .unwrap();

        let err = buy(&mut f, "trade-poor").unwrap_err();
        assert!(matches!(err, PointmintError::InsufficientFunds { .. }));
        assert_eq!(
            f.store.get(f.object_id).unwrap().state,
            CouponState::Trading,
            "listing still open"
        );
        assert!(f.market.log().is_empty());
    }

    #[test]
    fn charge_is_face_value_not_remaining() {
        let mut f = setup();
        list(&mut f, 1);

        buy(&mut f, "trade-1").unwrap();
        // 5000 − 1000 (face), not − 1 (asked) and not − 970 (remaining).
        assert_eq!(f.ledger.balance(&f.buyer), Points::new(4000));
    }

    #[test]
    fn expired_while_listed_cannot_settle() {
        let mut f = setup();
        list(&mut f, 900);
        f.store.get_mut(f.object_id).unwrap().expires_at =
            Utc::now() - chrono::Duration::hours(1);

        let err = buy(&mut f, "trade-late").unwrap_err();
        assert!(matches!(err, PointmintError::ObjectExpired(_)));
    }

    #[test]
    fn purge_clears_listing_after_external_expiry() {
        let mut f = setup();
        list(&mut f, 900);

        // The sweeper expires the object out from under the listing.
        f.store.get_mut(f.object_id).unwrap().mark_expired().unwrap();
        assert!(f.market.listing(f.object_id).is_some());

        f.market.purge_listing(f.object_id);
        assert!(f.market.listing(f.object_id).is_none());
        assert_eq!(f.market.open_listings(), 0);
    }

    #[test]
    fn fee_exceeding_residual_value_rejected_clean() {
        let mut f = setup();
        // Worn down by prior fees: less residual value than one 30-point fee.
        f.store.get_mut(f.object_id).unwrap().remaining = Points::new(10);
        list(&mut f, 900);

        let buyer_before = f.ledger.balance(&f.buyer);
        let err = buy(&mut f, "trade-worn").unwrap_err();
        assert!(matches!(err, PointmintError::AmountOverflow));
        assert_eq!(f.ledger.balance(&f.buyer), buyer_before, "nothing moved");
        assert_eq!(
            f.store.get(f.object_id).unwrap().remaining,
            Points::new(10)
        );
    }

    #[test]
    fn resale_accumulates_fees_and_history() {
        let mut f = setup();
        list(&mut f, 900);
        buy(&mut f, "trade-1").unwrap();

        // New owner relists; a second buyer takes it.
        let second_buyer = Address::new("0xbuyer2");
        f.ledger.credit(&second_buyer, Points::new(2000)).unwrap();
        let first_buyer = f.buyer.clone();
        f.market
            .list_for_sale(
                &mut f.store,
                &first_buyer,
                f.object_id,
                Points::new(950),
                Utc::now(),
            )
            .unwrap();
        f.market
            .buy(
                &mut f.store,
                &mut f.ledger,
                &mut f.vault,
                &second_buyer,
                f.object_id,
                "trade-2",
                Utc::now(),
            )
            .unwrap();

        let object = f.store.get(f.object_id).unwrap();
        assert_eq!(object.owner, second_buyer);
        assert_eq!(object.remaining, Points::new(910), "two 30-point fees");
        assert_eq!(object.trade_count, 2);
        assert_eq!(f.vault.balance(&f.supplier), Points::new(910));
        assert_eq!(f.ledger.balance(&f.supplier), Points::new(60));

        let history = f.market.log().by_object(f.object_id);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].idempotency_key, "trade-1");
        assert_eq!(history[1].idempotency_key, "trade-2");
    }
}
