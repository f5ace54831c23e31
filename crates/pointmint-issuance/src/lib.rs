//! # pointmint-issuance
//!
//! **Issuance rights hierarchy**: tradeable permits, owned caps, and the
//! mint settlement that turns escrowed points into coupon objects.
//!
//! ## Flow
//!
//! ```text
//! PermitBook.list() → PermitBook.buy() → CapRegistry.redeem()
//!     → Minter.mint_with_cap() → CouponObjects (CREATED)
//! ```
//!
//! - **PermitBook**: suppliers list delegations; issuers buy them
//!   (buyer debit + supplier credit in one step)
//! - **CapRegistry**: one cap per permit, guarded by nonce and unique
//!   index; holds the freeze switch
//! - **Minter**: idempotent batch mint — issuer pays face value into
//!   escrow, the 3% supplier fee skims straight back out, objects carry
//!   the net redeemable value
//!
//! Money only moves through the stores passed in from
//! `pointmint-ledger`; this crate holds no balances of its own.

pub mod cap_registry;
pub mod minting;
pub mod permit_book;

pub use cap_registry::CapRegistry;
pub use minting::Minter;
pub use permit_book::PermitBook;
