//! System-wide constants for the PointMint engine.

/// Supplier fee percentage skimmed from escrow at issuance and per trade.
pub const SUPPLIER_FEE_PERCENT: u128 = 3;

/// Nominal validity window of a redemption token, in seconds.
pub const REDEMPTION_TOKEN_TTL_SECS: i64 = 300;

/// Random bytes in a redemption token before hex encoding.
pub const REDEMPTION_TOKEN_BYTES: usize = 32;

/// Maximum coupons mintable in a single `mint_with_cap` call.
pub const MAX_MINT_COUNT: u32 = 1_000;

/// Default interval between expiry sweeps, in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "PointMint";
