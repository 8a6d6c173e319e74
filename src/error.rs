//! Error types for the ibtc ledger.
//!
//! Every failure mode of the ledger and its connectors is a distinct variant
//! so integrators and tests can assert on cause. All errors are synchronous
//! and non-recoverable within the failing call: operations validate and quote
//! before mutating, so a returned error means balances are unchanged.

use thiserror::Error;

use crate::utils::ids::Address;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the ibtc ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Caller is not the ledger or connector administrator
    #[error("Not owner: {caller} may not call this operation")]
    NotOwner {
        /// The rejected caller
        caller: Address,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Registry Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Peak identity is already registered
    #[error("Duplicate peak: {0} is already whitelisted")]
    DuplicatePeak(Address),

    /// Identity is not a valid connector
    #[error("Invalid connector: {reason}")]
    InvalidConnector {
        /// Why the identity was rejected
        reason: String,
    },

    /// Mint attempted through a peak that is not Active
    #[error("Peak inactive: {0}")]
    PeakInactive(Address),

    /// Operation attempted through an Extinct or unregistered peak
    #[error("Peak extinct: {0}")]
    PeakExtinct(Address),

    // ═══════════════════════════════════════════════════════════════════
    // Fee Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Fee collection called with nothing pending
    #[error("No fee to collect")]
    NoFeeToCollect,

    // ═══════════════════════════════════════════════════════════════════
    // Valuation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Realized output below the caller's slippage bound
    #[error("Slippage exceeded: out {out} below minimum {min_out}")]
    SlippageExceeded {
        /// Realized output amount
        out: u128,
        /// Caller-supplied minimum
        min_out: u128,
    },

    /// A deposit valued so low it would mint zero shares
    #[error("Deposit would mint zero shares")]
    ZeroShares,

    /// Amount is zero
    #[error("Amount cannot be zero")]
    ZeroAmount,

    /// Oracle reported a rate below the last observed one while the
    /// connector's policy rejects decreases
    #[error("Price decreased: pool {pool_id} rate {rate} below last seen {last_seen}")]
    PriceDecreased {
        /// Pool whose composite rate decreased
        pool_id: u32,
        /// Freshly read rate
        rate: u128,
        /// Rate recorded on last use
        last_seen: u128,
    },

    /// External oracle call failed
    #[error("Oracle failure for {target}: {reason}")]
    Oracle {
        /// Swap or vault identity that failed
        target: Address,
        /// Failure detail from the host
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Balance Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Token balance insufficient for a pull or burn
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Required amount
        required: u128,
        /// Available amount
        available: u128,
    },

    /// Pool id not present in the connector's whitelist
    #[error("Unknown pool: {0}")]
    UnknownPool(u32),

    // ═══════════════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Overflow in calculation
    #[error("Arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    /// Underflow in calculation; on ledger asset accounting this is a fatal
    /// invariant violation and the call fails closed
    #[error("Arithmetic underflow in {operation}")]
    Underflow {
        /// Operation that underflowed
        operation: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Serialization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl Error {
    /// Returns true if the caller can succeed by resubmitting with corrected
    /// parameters
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::SlippageExceeded { .. }
                | Error::InsufficientBalance { .. }
                | Error::NoFeeToCollect
                | Error::ZeroAmount
                | Error::ZeroShares
                | Error::PriceDecreased { .. }
        )
    }

    /// Returns true if this error indicates a broken ledger invariant
    pub fn is_critical(&self) -> bool {
        matches!(self, Error::Overflow { .. } | Error::Underflow { .. })
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Authorization errors: 1xxx
            Error::NotOwner { .. } => 1001,

            // Registry errors: 2xxx
            Error::DuplicatePeak(_) => 2001,
            Error::InvalidConnector { .. } => 2002,
            Error::PeakInactive(_) => 2003,
            Error::PeakExtinct(_) => 2004,

            // Fee errors: 3xxx
            Error::NoFeeToCollect => 3001,

            // Valuation errors: 4xxx
            Error::SlippageExceeded { .. } => 4001,
            Error::ZeroShares => 4002,
            Error::ZeroAmount => 4003,
            Error::PriceDecreased { .. } => 4004,
            Error::Oracle { .. } => 4005,

            // Balance errors: 5xxx
            Error::InsufficientBalance { .. } => 5001,
            Error::UnknownPool(_) => 5002,

            // Validation errors: 6xxx
            Error::InvalidParameter { .. } => 6001,
            Error::Overflow { .. } => 6002,
            Error::Underflow { .. } => 6003,

            // Serialization errors: 7xxx
            Error::Serialization(_) => 7001,
            Error::Deserialization(_) => 7002,
        }
    }
}
