//! # pointmint-ledger
//!
//! **System of record** for the PointMint engine: spendable point
//! balances, supplier escrow custody, the coupon-object registry, and the
//! conservation checks that audit all three.
//!
//! ## Architecture
//!
//! 1. **PointLedger**: per-address accounts; all money movement passes
//!    through `credit` / `debit`
//! 2. **EscrowVault**: per-supplier custody pools backing unredeemed
//!    coupon value; underflow is a fatal integrity error
//! 3. **CouponStore**: every minted object plus the unique redemption
//!    token index
//! 4. **PointSupply**: conservation invariant — ledger + escrow equals
//!    recorded issuance
//!
//! Higher crates (issuance, market, settlement) orchestrate multi-account
//! movement by taking these stores as explicit `&mut` parameters; nothing
//! here initiates cross-account movement on its own.

pub mod accounts;
pub mod conservation;
pub mod escrow;
pub mod objects;

pub use accounts::PointLedger;
pub use conservation::{verify_accounts, verify_escrows, PointSupply};
pub use escrow::EscrowVault;
pub use objects::CouponStore;
