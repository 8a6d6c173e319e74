//! Wrapped-BTC vault connector.
//!
//! Takes shares of an 8-decimal wrapped-BTC vault (WBTC-style decimals, with
//! a 1e8-scaled price-per-full-share) and bridges them into the 18-decimal
//! share ledger. Unlike the LP connectors there is no valuation haircut, so
//! with ledger fees at zero a deposit and redemption of the same amount
//! round-trips exactly. Fees are forwarded to the ledger's accumulator.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::ledger::{Core, MintQuote};
use crate::core::registry::PeakStatus;
use crate::core::token::Shares;
use crate::error::{Error, Result};
use crate::host::CollateralHost;
use crate::peaks::{OraclePolicy, Peak, PeakKind, RateWatermarks, RedeemEstimate};
use crate::utils::constants::{WAD, WRAPPED_BTC_UNIT};
use crate::utils::ids::Address;
use crate::utils::math::mul_div;

/// Watermark slot for the single vault rate this connector tracks
const VAULT_RATE_SLOT: u32 = 0;

/// Connector for a single 8-decimal wrapped-BTC vault token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrappedBtcPeak {
    id: Address,
    admin: Address,
    vault_token: Address,
    oracle_policy: OraclePolicy,
    watermarks: RateWatermarks,
}

impl WrappedBtcPeak {
    /// Create a connector over the vault token at `vault_token`
    pub fn new(id: Address, admin: Address, vault_token: Address) -> Result<Self> {
        if vault_token.is_zero() {
            return Err(Error::InvalidConnector {
                reason: "vault token address is zero".into(),
            });
        }
        Ok(Self {
            id,
            admin,
            vault_token,
            oracle_policy: OraclePolicy::Trust,
            watermarks: RateWatermarks::default(),
        })
    }

    /// Vault token this connector accepts
    pub fn vault_token(&self) -> Address {
        self.vault_token
    }

    /// Set how backwards-moving vault rates are treated
    pub fn set_oracle_policy(&mut self, caller: Address, policy: OraclePolicy) -> Result<()> {
        if caller != self.admin {
            return Err(Error::NotOwner { caller });
        }
        self.oracle_policy = policy;
        Ok(())
    }

    /// 18-decimal BTC value of `amount` vault tokens at an 8-decimal-scaled
    /// price-per-full-share
    fn token_to_btc(&self, price_per_full_share: u128, amount: u128) -> Result<u128> {
        let underlying = mul_div(amount, price_per_full_share, WRAPPED_BTC_UNIT)?;
        mul_div(underlying, WAD, WRAPPED_BTC_UNIT)
    }

    /// Vault tokens released by an 18-decimal BTC value
    fn btc_to_token(&self, price_per_full_share: u128, value: u128) -> Result<u128> {
        let underlying = mul_div(value, WRAPPED_BTC_UNIT, WAD)?;
        mul_div(underlying, WRAPPED_BTC_UNIT, price_per_full_share)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUOTES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Quote a deposit without mutating state
    pub fn calc_mint(
        &self,
        core: &Core,
        host: &dyn CollateralHost,
        amount: u128,
    ) -> Result<MintQuote> {
        let rate = host.price_per_full_share(self.vault_token)?;
        core.quote_mint(self.token_to_btc(rate, amount)?)
    }

    /// Quote a redemption without mutating state
    pub fn calc_redeem(
        &self,
        core: &Core,
        host: &dyn CollateralHost,
        shares: Shares,
    ) -> Result<RedeemEstimate> {
        let rate = host.price_per_full_share(self.vault_token)?;
        self.estimate_redeem(core, rate, shares)
    }

    fn estimate_redeem(&self, core: &Core, rate: u128, shares: Shares) -> Result<RedeemEstimate> {
        let quote = core.quote_redeem(shares)?;
        Ok(RedeemEstimate {
            out: self.btc_to_token(rate, quote.value)?,
            fee: quote.fee,
            value: quote.value,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Pull `amount` vault tokens from `caller` and mint the corresponding
    /// ledger shares to them
    pub fn mint(
        &mut self,
        core: &mut Core,
        host: &mut dyn CollateralHost,
        caller: Address,
        amount: u128,
    ) -> Result<Shares> {
        if core.peak_status(&self.id) != PeakStatus::Active {
            return Err(Error::PeakInactive(self.id));
        }
        let rate = host.price_per_full_share(self.vault_token)?;
        self.watermarks.observe(self.oracle_policy, VAULT_RATE_SLOT, rate)?;

        let value = self.token_to_btc(rate, amount)?;
        // quote first so a rejected deposit pulls nothing
        core.quote_mint(value)?;

        host.transfer(self.vault_token, caller, self.id, amount)?;
        let minted = core.mint(self.id, value, caller)?;

        debug!(peak = %self.id, %caller, amount, %minted, "wrapped deposit minted");
        Ok(minted)
    }

    /// Burn `shares` from `caller` and pay out vault tokens held by the peak
    pub fn redeem(
        &mut self,
        core: &mut Core,
        host: &mut dyn CollateralHost,
        caller: Address,
        shares: Shares,
        min_out: u128,
    ) -> Result<u128> {
        if core.peak_status(&self.id) == PeakStatus::Extinct {
            return Err(Error::PeakExtinct(self.id));
        }
        let rate = host.price_per_full_share(self.vault_token)?;
        self.watermarks.observe(self.oracle_policy, VAULT_RATE_SLOT, rate)?;

        let estimate = self.estimate_redeem(core, rate, shares)?;
        if estimate.out < min_out {
            return Err(Error::SlippageExceeded {
                out: estimate.out,
                min_out,
            });
        }
        let held = host.balance_of(self.vault_token, self.id);
        if held < estimate.out {
            return Err(Error::InsufficientBalance {
                required: estimate.out,
                available: held,
            });
        }

        core.redeem(self.id, shares, caller)?;
        host.transfer(self.vault_token, self.id, caller, estimate.out)?;

        debug!(peak = %self.id, %caller, %shares, out = estimate.out, "wrapped redemption paid");
        Ok(estimate.out)
    }
}

impl Peak for WrappedBtcPeak {
    fn id(&self) -> Address {
        self.id
    }

    fn kind(&self) -> PeakKind {
        PeakKind::WrappedBtc
    }

    fn portfolio_value(&self, host: &dyn CollateralHost) -> Result<u128> {
        let rate = host.price_per_full_share(self.vault_token)?;
        self.token_to_btc(rate, host.balance_of(self.vault_token, self.id))
    }
}
