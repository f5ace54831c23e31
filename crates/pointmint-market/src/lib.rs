//! # pointmint-market
//!
//! **Marketplace trading engine**: sale listings, idempotent trade
//! settlement, and the append-only audit log.
//!
//! ## Settlement
//!
//! One `buy` performs, atomically (all checks precede any mutation):
//!
//! ```text
//! buyer  ──face value──▶ seller
//! escrow ──3% fee──────▶ supplier
//! object: owner → buyer, remaining −= fee, trade_count += 1,
//!         TRADING → CREATED
//! log:    one TradeRecord row (unique idempotency key)
//! ```
//!
//! A retried request with the same idempotency key fails with
//! `DuplicateTransaction` before any mutation — the audit row's unique
//! key is the at-most-once guarantee.

pub mod engine;
pub mod trade_log;

pub use engine::{Listing, MarketEngine};
pub use trade_log::TradeLog;
