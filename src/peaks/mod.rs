//! Collateral connectors ("peaks").
//!
//! A peak adapts one external yield source to the shared ledger: it holds a
//! whitelist of acceptable asset groups, converts deposits to BTC-denominated
//! value through the source's price oracles, and asks [`Core`] to issue or
//! burn shares. The set of connector kinds is closed and known in advance —
//! one implementation per collateral family, dispatched through the registry
//! rather than open-ended dynamic dispatch.
//!
//! Every mutating path quotes through the same pure valuation routine exposed
//! by its `calc_*` counterpart and validates before touching state, so a
//! failed call leaves all balances unchanged.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::host::CollateralHost;
use crate::utils::ids::Address;

pub mod curve;
pub mod sett;
pub mod wrapped;

pub use curve::CurvePeak;
pub use sett::SettPeak;
pub use wrapped::WrappedBtcPeak;

// ═══════════════════════════════════════════════════════════════════════════════
// PEAK TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only quote for a connector redemption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemEstimate {
    /// Collateral amount paid out, in the pool's own token units
    pub out: u128,
    /// Fee shares withheld
    pub fee: crate::core::token::Shares,
    /// BTC-denominated value released from the ledger
    pub value: u128,
}

/// Collateral family of a connector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeakKind {
    /// Vault-wrapped stable-swap LP collateral
    Sett,
    /// Naked stable-swap LP with an idle reserve and vault overflow
    Curve,
    /// A single yield-bearing wrapped BTC token
    WrappedBtc,
}

/// Common contract of every connector
pub trait Peak {
    /// Connector identity in the ledger's registry
    fn id(&self) -> Address;

    /// Collateral family
    fn kind(&self) -> PeakKind;

    /// BTC-denominated value of all collateral the connector holds, at
    /// current oracle readings
    fn portfolio_value(&self, host: &dyn CollateralHost) -> Result<u128>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// POOL WHITELIST
// ═══════════════════════════════════════════════════════════════════════════════

/// A whitelisted group of external identities usable by a Curve-style peak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    /// The stable-swap LP token
    pub lp_token: Address,
    /// The stable-swap pool exposing `virtual_price`
    pub swap: Address,
    /// The vault wrapper over the LP token
    pub sett: Address,
}

impl PoolEntry {
    fn validate(&self) -> Result<()> {
        if self.lp_token.is_zero() || self.swap.is_zero() || self.sett.is_zero() {
            return Err(Error::InvalidParameter {
                name: "pool".into(),
                reason: "zero identity".into(),
            });
        }
        Ok(())
    }
}

/// Replace a pool whitelist, preserving index stability.
///
/// Pool ids are list indices and outlive re-whitelisting: the new list may
/// extend or overwrite entries but never shrink, and no entry may carry a
/// zero identity. Used by every Curve-style connector.
pub(crate) fn replace_pools(current: &mut Vec<PoolEntry>, next: Vec<PoolEntry>) -> Result<()> {
    if next.len() < current.len() {
        return Err(Error::InvalidParameter {
            name: "pools".into(),
            reason: format!(
                "list of {} would orphan pool ids up to {}",
                next.len(),
                current.len() - 1
            ),
        });
    }
    for entry in &next {
        entry.validate()?;
    }
    *current = next;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE POLICY
// ═══════════════════════════════════════════════════════════════════════════════

/// How a connector treats oracle rates that move backwards.
///
/// Oracle rates are assumed monotonically non-decreasing under normal
/// operation; whether that is defended here or left to the oracle's own
/// guarantees is a per-connector choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OraclePolicy {
    /// Accept whatever the oracle reports
    #[default]
    Trust,
    /// Fail any operation whose composite rate is below the last one used
    RejectDecrease,
}

/// Last-seen composite rates per pool, consulted when the policy rejects
/// decreases
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct RateWatermarks {
    last_seen: std::collections::HashMap<u32, u128>,
}

impl RateWatermarks {
    /// Check `rate` against the watermark for `pool_id` and advance it
    pub(crate) fn observe(&mut self, policy: OraclePolicy, pool_id: u32, rate: u128) -> Result<()> {
        if policy == OraclePolicy::Trust {
            return Ok(());
        }
        if let Some(&last_seen) = self.last_seen.get(&pool_id) {
            if rate < last_seen {
                return Err(Error::PriceDecreased {
                    pool_id,
                    rate,
                    last_seen,
                });
            }
        }
        self.last_seen.insert(pool_id, rate);
        Ok(())
    }
}
