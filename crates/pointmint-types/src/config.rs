//! Configuration for the PointMint engine.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Tunable engine parameters. Constructed by the host and injected; the
/// engine holds no global configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Nominal redemption-token validity window, in seconds.
    pub token_ttl_secs: i64,
    /// Interval between expiry sweeps, in seconds.
    pub sweep_interval_secs: u64,
    /// Maximum coupons mintable per call.
    pub max_mint_count: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: constants::REDEMPTION_TOKEN_TTL_SECS,
            sweep_interval_secs: constants::DEFAULT_SWEEP_INTERVAL_SECS,
            max_mint_count: constants::MAX_MINT_COUNT,
        }
    }
}
