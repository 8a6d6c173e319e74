//! Ledger fee configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::constants::BPS_DIVISOR;
use crate::utils::ids::Address;

/// Fee configuration of the shared ledger.
///
/// Fees are taken in shares at mint and redeem time and accumulate in the
/// ledger until swept to `fee_sink` by the administrator. Connectors that
/// retain fees locally run against a zero-fee ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Mint fee in basis points, out of [`BPS_DIVISOR`]
    pub mint_fee_bps: u128,
    /// Redeem fee in basis points, out of [`BPS_DIVISOR`]
    pub redeem_fee_bps: u128,
    /// Destination of collected fees
    pub fee_sink: Address,
}

impl FeeConfig {
    /// Zero-fee configuration with no sink; the state of a freshly
    /// initialized ledger
    pub fn unset() -> Self {
        Self {
            mint_fee_bps: 0,
            redeem_fee_bps: 0,
            fee_sink: Address::ZERO,
        }
    }

    /// Validate bounds
    pub fn validate(&self) -> Result<()> {
        if self.mint_fee_bps > BPS_DIVISOR {
            return Err(Error::InvalidParameter {
                name: "mint_fee_bps".into(),
                reason: format!("{} exceeds {}", self.mint_fee_bps, BPS_DIVISOR),
            });
        }
        if self.redeem_fee_bps > BPS_DIVISOR {
            return Err(Error::InvalidParameter {
                name: "redeem_fee_bps".into(),
                reason: format!("{} exceeds {}", self.redeem_fee_bps, BPS_DIVISOR),
            });
        }
        if (self.mint_fee_bps > 0 || self.redeem_fee_bps > 0) && self.fee_sink.is_zero() {
            return Err(Error::InvalidParameter {
                name: "fee_sink".into(),
                reason: "zero sink with nonzero fees".into(),
            });
        }
        Ok(())
    }
}
