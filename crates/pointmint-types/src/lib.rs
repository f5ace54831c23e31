//! # pointmint-types
//!
//! Shared types, errors, and configuration for the **PointMint** coupon
//! economy engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`PermitId`], [`CapId`], [`ObjectId`], [`TradeId`], [`RedemptionToken`]
//! - **Money**: [`Points`] (checked u128, base-10-string serde)
//! - **Accounts**: [`PointAccount`], [`EscrowAccount`]
//! - **Issuance rights**: [`Permit`], [`PermitStatus`], [`PermitTerms`], [`Cap`], [`CapStatus`]
//! - **Coupon model**: [`CouponObject`], [`CouponState`]
//! - **Audit trail**: [`TradeRecord`]
//! - **Identity boundary**: [`Principal`], [`Role`]
//! - **Configuration**: [`EngineConfig`]
//! - **Errors**: [`PointmintError`] with `PM_ERR_` prefix codes and [`ErrorKind`]
//! - **Constants**: system-wide limits and defaults

pub mod account;
pub mod cap;
pub mod config;
pub mod constants;
pub mod coupon;
pub mod error;
pub mod ids;
pub mod money;
pub mod permit;
pub mod principal;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use pointmint_types::{Points, Permit, Cap, CouponObject, ...};

pub use account::*;
pub use cap::*;
pub use config::*;
pub use coupon::*;
pub use error::*;
pub use ids::*;
pub use money::*;
pub use permit::*;
pub use principal::*;
pub use trade::*;

// Constants are accessed via `pointmint_types::constants::FOO`
// (not re-exported to avoid name collisions).
