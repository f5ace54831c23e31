//! Error types for the PointMint engine.
//!
//! All errors use the `PM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Validation errors
//! - 2xx: Point ledger errors
//! - 3xx: Escrow errors
//! - 4xx: Permit errors
//! - 5xx: Cap errors
//! - 6xx: Coupon object errors
//! - 7xx: Market / trade errors
//! - 8xx: Redemption errors
//! - 9xx: Integrity / internal errors
//!
//! [`PointmintError::kind`] collapses the enum onto the transport-facing
//! taxonomy (validation / not-found / authorization / business-rule /
//! integrity); the HTTP layer maps those to 400/404/403/400/500.

use thiserror::Error;

use crate::{Address, CapId, CapStatus, CouponState, ObjectId, PermitId, PermitStatus, Points};

/// Central error enum for all PointMint operations.
#[derive(Debug, Error)]
pub enum PointmintError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// A monetary amount failed to parse or is out of range.
    #[error("PM_ERR_100: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Permit terms failed validation (zero limit, zero face value, past expiry).
    #[error("PM_ERR_101: Invalid permit terms: {reason}")]
    InvalidTerms { reason: String },

    /// A mint was requested for zero coupons.
    #[error("PM_ERR_102: Mint count must be positive")]
    ZeroMintCount,

    /// Monetary arithmetic would overflow or go negative.
    #[error("PM_ERR_103: Amount arithmetic overflow")]
    AmountOverflow,

    /// A mint batch exceeds the per-call ceiling.
    #[error("PM_ERR_104: Mint batch too large: requested {requested}, max {max}")]
    MintBatchTooLarge { requested: u32, max: u32 },

    // =================================================================
    // Point Ledger Errors (2xx)
    // =================================================================
    /// Not enough balance to perform the debit.
    #[error("PM_ERR_200: Insufficient funds for {address}: need {needed}, have {available}")]
    InsufficientFunds {
        address: Address,
        needed: Points,
        available: Points,
    },

    // =================================================================
    // Escrow Errors (3xx)
    // =================================================================
    /// No escrow account exists for this supplier.
    #[error("PM_ERR_300: Escrow account not found for supplier {0}")]
    EscrowNotFound(Address),

    // =================================================================
    // Permit Errors (4xx)
    // =================================================================
    /// The requested permit does not exist.
    #[error("PM_ERR_400: Permit not found: {0}")]
    PermitNotFound(PermitId),

    /// The permit is not in the state the operation requires.
    #[error("PM_ERR_401: Permit is {actual}, expected {expected}")]
    WrongPermitStatus {
        expected: PermitStatus,
        actual: PermitStatus,
    },

    /// The permit's expiry has passed.
    #[error("PM_ERR_402: Permit expired: {0}")]
    PermitExpired(PermitId),

    /// The caller is not the buyer recorded on the sold permit.
    #[error("PM_ERR_403: Caller is not the permit buyer")]
    NotPermitBuyer,

    /// The redemption nonce was already used for this permit.
    #[error("PM_ERR_404: Permit nonce already used: {nonce}")]
    NonceReused { nonce: u64 },

    /// A supplier may not buy its own permit.
    #[error("PM_ERR_405: Supplier cannot buy its own permit")]
    SelfPurchase,

    /// A cap has already been issued for this permit.
    #[error("PM_ERR_406: Cap already issued for permit {0}")]
    CapAlreadyIssued(PermitId),

    /// Only the listing supplier may cancel a permit.
    #[error("PM_ERR_407: Caller is not the permit supplier")]
    NotPermitSupplier,

    // =================================================================
    // Cap Errors (5xx)
    // =================================================================
    /// The requested cap does not exist.
    #[error("PM_ERR_500: Cap not found: {0}")]
    CapNotFound(CapId),

    /// The cap is not ACTIVE.
    #[error("PM_ERR_501: Cap is {actual}, expected ACTIVE")]
    CapNotActive { actual: CapStatus },

    /// The cap has been frozen; minting is blocked.
    #[error("PM_ERR_502: Cap frozen: {0}")]
    CapFrozen(CapId),

    /// The cap's expiry has passed.
    #[error("PM_ERR_503: Cap expired: {0}")]
    CapExpired(CapId),

    /// The mint would exceed the cap's remaining quota.
    #[error("PM_ERR_504: Cap quota exceeded: requested {requested}, remaining {remaining}")]
    QuotaExceeded { requested: u32, remaining: u32 },

    /// The caller is not the cap owner.
    #[error("PM_ERR_505: Caller is not the cap owner")]
    NotCapOwner,

    /// The actor may not freeze this cap (not supplier, owner, or admin).
    #[error("PM_ERR_506: Freeze denied for cap {0}")]
    FreezeDenied(CapId),

    // =================================================================
    // Coupon Object Errors (6xx)
    // =================================================================
    /// The requested coupon object does not exist.
    #[error("PM_ERR_600: Coupon object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// The object is not in the state the operation requires.
    #[error("PM_ERR_601: Object is {actual}, expected {expected}")]
    WrongObjectState {
        expected: CouponState,
        actual: CouponState,
    },

    /// The object's expiry has passed.
    #[error("PM_ERR_602: Object expired: {0}")]
    ObjectExpired(ObjectId),

    /// The caller is not the object's current owner.
    #[error("PM_ERR_603: Caller is not the object owner")]
    NotObjectOwner,

    // =================================================================
    // Market / Trade Errors (7xx)
    // =================================================================
    /// A trade with this idempotency key was already processed.
    #[error("PM_ERR_700: Duplicate transaction: idempotency key {key:?} already used")]
    DuplicateTransaction { key: String },

    /// The buyer already owns the object.
    #[error("PM_ERR_701: Self-trade blocked: buyer already owns the object")]
    SelfTradeBlocked,

    // =================================================================
    // Redemption Errors (8xx)
    // =================================================================
    /// No object carries this redemption token.
    #[error("PM_ERR_800: Redemption token not found")]
    TokenNotFound,

    /// The object was already redeemed with a token.
    #[error("PM_ERR_801: Redemption token already used")]
    TokenAlreadyUsed,

    /// The caller is not the supplier behind the coupon.
    #[error("PM_ERR_802: Caller is not the coupon's supplier")]
    WrongSupplier,

    // =================================================================
    // Integrity / Internal (9xx)
    // =================================================================
    /// An escrow release would drive the balance negative — ledger corruption.
    #[error(
        "PM_ERR_900: Escrow underflow for supplier {supplier}: need {needed}, have {available}"
    )]
    EscrowUnderflow {
        supplier: Address,
        needed: Points,
        available: Points,
    },

    /// A stored account violates its arithmetic invariant.
    #[error("PM_ERR_901: Ledger corruption: {reason}")]
    LedgerCorruption { reason: String },

    /// Total point supply does not match recorded issuance.
    #[error("PM_ERR_902: Conservation violation: {reason}")]
    ConservationViolation { reason: String },

    /// Unrecoverable internal error.
    #[error("PM_ERR_903: Internal error: {0}")]
    Internal(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, PointmintError>;

/// Transport-facing error classes. Mapping: Validation/BusinessRule → 400,
/// NotFound → 404, Authorization → 403, Integrity → 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Authorization,
    BusinessRule,
    Integrity,
}

impl PointmintError {
    /// Classify this error for the transport layer.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount { .. }
            | Self::InvalidTerms { .. }
            | Self::ZeroMintCount
            | Self::AmountOverflow
            | Self::MintBatchTooLarge { .. } => ErrorKind::Validation,

            Self::EscrowNotFound(_)
            | Self::PermitNotFound(_)
            | Self::CapNotFound(_)
            | Self::ObjectNotFound(_)
            | Self::TokenNotFound => ErrorKind::NotFound,

            Self::NotPermitBuyer
            | Self::NotPermitSupplier
            | Self::NotCapOwner
            | Self::FreezeDenied(_)
            | Self::NotObjectOwner
            | Self::WrongSupplier => ErrorKind::Authorization,

            Self::InsufficientFunds { .. }
            | Self::WrongPermitStatus { .. }
            | Self::PermitExpired(_)
            | Self::NonceReused { .. }
            | Self::SelfPurchase
            | Self::CapAlreadyIssued(_)
            | Self::CapNotActive { .. }
            | Self::CapFrozen(_)
            | Self::CapExpired(_)
            | Self::QuotaExceeded { .. }
            | Self::WrongObjectState { .. }
            | Self::ObjectExpired(_)
            | Self::DuplicateTransaction { .. }
            | Self::SelfTradeBlocked
            | Self::TokenAlreadyUsed => ErrorKind::BusinessRule,

            Self::EscrowUnderflow { .. }
            | Self::LedgerCorruption { .. }
            | Self::ConservationViolation { .. }
            | Self::Internal(_) => ErrorKind::Integrity,
        }
    }

    /// Whether this error signals state corruption that must alert operators.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Integrity
    }
}
