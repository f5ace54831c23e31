//! Trade audit rows.
//!
//! Every settled ownership transfer appends exactly one [`TradeRecord`].
//! The row is write-once; the unique `idempotency_key` is the structural
//! at-most-once guarantee for retried buy requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, ObjectId, Points, TradeId};

/// An append-only record of one settled trade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TradeRecord {
    /// Client-supplied key; unique across all trade rows.
    pub idempotency_key: String,
    /// Deterministically derived from the idempotency key.
    pub trade_id: TradeId,
    /// The object that changed hands.
    pub object_id: ObjectId,
    /// Owner before settlement.
    pub seller: Address,
    /// Owner after settlement.
    pub buyer: Address,
    /// The seller's asked listing price. Recorded for audit; the amount
    /// actually charged is the object's face value.
    pub price: Points,
    /// Fee skimmed from escrow to the supplier on this trade.
    pub supplier_fee: Points,
    /// The object's redeemable value after the fee deduction.
    pub remaining_after_trade: Points,
    /// Settlement timestamp.
    pub processed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_id_tracks_key() {
        let record = TradeRecord {
            idempotency_key: "client-key-1".into(),
            trade_id: TradeId::from_key("client-key-1"),
            object_id: ObjectId::new(),
            seller: Address::new("0xseller"),
            buyer: Address::new("0xbuyer"),
            price: Points::new(900),
            supplier_fee: Points::new(30),
            remaining_after_trade: Points::new(940),
            processed_at: Utc::now(),
        };
        assert_eq!(record.trade_id, TradeId::from_key(&record.idempotency_key));
    }

    #[test]
    fn serde_roundtrip() {
        let record = TradeRecord {
            idempotency_key: "client-key-2".into(),
            trade_id: TradeId::from_key("client-key-2"),
            object_id: ObjectId::new(),
            seller: Address::new("0xseller"),
            buyer: Address::new("0xbuyer"),
            price: Points::new(900),
            supplier_fee: Points::new(30),
            remaining_after_trade: Points::new(940),
            processed_at: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: TradeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
