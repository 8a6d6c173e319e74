//! Vault-wrapped stable-swap LP connector.
//!
//! Deposits arrive as vault shares over a Curve-style LP token. A deposit is
//! valued through the composite rate (vault price-per-full-share × swap
//! virtual price) and settled against the ledger, which applies the mint and
//! redeem fees. The connector holds the vault shares unchanged; redemptions
//! pay out vault shares at the same composite rate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::ledger::{Core, MintQuote};
use crate::core::registry::PeakStatus;
use crate::core::token::Shares;
use crate::error::{Error, Result};
use crate::host::CollateralHost;
use crate::peaks::{replace_pools, OraclePolicy, Peak, PeakKind, PoolEntry, RateWatermarks, RedeemEstimate};
use crate::utils::ids::Address;
use crate::utils::math::{amount_at_rate, compose_rates, safe_add, value_at_rate};

/// Connector for vault-wrapped stable-swap LP collateral
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettPeak {
    id: Address,
    admin: Address,
    pools: Vec<PoolEntry>,
    oracle_policy: OraclePolicy,
    watermarks: RateWatermarks,
}

impl SettPeak {
    /// Create a connector administered by `admin`
    pub fn new(id: Address, admin: Address) -> Self {
        Self {
            id,
            admin,
            pools: Vec::new(),
            oracle_policy: OraclePolicy::Trust,
            watermarks: RateWatermarks::default(),
        }
    }

    /// Whitelisted pools in id order
    pub fn pools(&self) -> &[PoolEntry] {
        &self.pools
    }

    /// Number of whitelisted pools
    pub fn num_pools(&self) -> u32 {
        self.pools.len() as u32
    }

    fn require_admin(&self, caller: Address) -> Result<()> {
        if caller != self.admin {
            return Err(Error::NotOwner { caller });
        }
        Ok(())
    }

    fn pool(&self, pool_id: u32) -> Result<&PoolEntry> {
        self.pools
            .get(pool_id as usize)
            .ok_or(Error::UnknownPool(pool_id))
    }

    /// Replace the pool whitelist; ids stay stable and the list never shrinks
    pub fn modify_whitelisted_pools(&mut self, caller: Address, pools: Vec<PoolEntry>) -> Result<()> {
        self.require_admin(caller)?;
        replace_pools(&mut self.pools, pools)
    }

    /// Append a single pool, returning its id
    pub fn whitelist_pool(&mut self, caller: Address, pool: PoolEntry) -> Result<u32> {
        self.require_admin(caller)?;
        let mut next = self.pools.clone();
        next.push(pool);
        replace_pools(&mut self.pools, next)?;
        Ok(self.pools.len() as u32 - 1)
    }

    /// Set how backwards-moving oracle rates are treated
    pub fn set_oracle_policy(&mut self, caller: Address, policy: OraclePolicy) -> Result<()> {
        self.require_admin(caller)?;
        self.oracle_policy = policy;
        Ok(())
    }

    /// Vault-share to BTC composite rate for a pool (WAD-scaled)
    fn composite_rate(&self, host: &dyn CollateralHost, pool: &PoolEntry) -> Result<u128> {
        compose_rates(
            host.price_per_full_share(pool.sett)?,
            host.virtual_price(pool.swap)?,
        )
    }

    /// BTC value of `amount` vault shares, with the one-unit haircut.
    ///
    /// The haircut trades a negligible rounding loss (kept by the system)
    /// for ruling out value extraction at the unit boundary. Dust whose
    /// value rounds to zero is a caller error, not an accounting fault.
    fn sett_to_btc(&self, rate: u128, amount: u128) -> Result<u128> {
        let value = value_at_rate(amount, rate)?;
        if value == 0 {
            return Err(Error::ZeroAmount);
        }
        Ok(value - 1)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUOTES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Quote a deposit without mutating state.
    ///
    /// Bit-for-bit consistent with [`SettPeak::mint`] for the same inputs and
    /// oracle readings: both run through the same valuation path.
    pub fn calc_mint(
        &self,
        core: &Core,
        host: &dyn CollateralHost,
        pool_id: u32,
        amount: u128,
    ) -> Result<MintQuote> {
        let pool = self.pool(pool_id)?;
        let rate = self.composite_rate(host, pool)?;
        core.quote_mint(self.sett_to_btc(rate, amount)?)
    }

    /// Quote a redemption without mutating state
    pub fn calc_redeem(
        &self,
        core: &Core,
        host: &dyn CollateralHost,
        pool_id: u32,
        shares: Shares,
    ) -> Result<RedeemEstimate> {
        let pool = self.pool(pool_id)?;
        let rate = self.composite_rate(host, pool)?;
        self.estimate_redeem(core, rate, shares)
    }

    fn estimate_redeem(&self, core: &Core, rate: u128, shares: Shares) -> Result<RedeemEstimate> {
        let quote = core.quote_redeem(shares)?;
        Ok(RedeemEstimate {
            out: amount_at_rate(quote.value, rate)?,
            fee: quote.fee,
            value: quote.value,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Pull `amount` vault shares from `caller` and mint shares against their
    /// BTC value
    pub fn mint(
        &mut self,
        core: &mut Core,
        host: &mut dyn CollateralHost,
        caller: Address,
        pool_id: u32,
        amount: u128,
    ) -> Result<Shares> {
        let pool = *self.pool(pool_id)?;
        if core.peak_status(&self.id) != PeakStatus::Active {
            return Err(Error::PeakInactive(self.id));
        }
        let rate = self.composite_rate(host, &pool)?;
        self.watermarks.observe(self.oracle_policy, pool_id, rate)?;

        // quote first so a rejected deposit pulls nothing
        let btc = self.sett_to_btc(rate, amount)?;
        core.quote_mint(btc)?;

        host.transfer(pool.sett, caller, self.id, amount)?;
        let minted = core.mint(self.id, btc, caller)?;

        debug!(peak = %self.id, %caller, pool_id, amount, %minted, "sett deposit minted");
        Ok(minted)
    }

    /// Redeem `shares` for vault shares from pool `pool_id`
    pub fn redeem(
        &mut self,
        core: &mut Core,
        host: &mut dyn CollateralHost,
        caller: Address,
        pool_id: u32,
        shares: Shares,
        min_out: u128,
    ) -> Result<u128> {
        let pool = *self.pool(pool_id)?;
        if core.peak_status(&self.id) == PeakStatus::Extinct {
            return Err(Error::PeakExtinct(self.id));
        }
        let rate = self.composite_rate(host, &pool)?;
        self.watermarks.observe(self.oracle_policy, pool_id, rate)?;

        let estimate = self.estimate_redeem(core, rate, shares)?;
        if estimate.out < min_out {
            return Err(Error::SlippageExceeded {
                out: estimate.out,
                min_out,
            });
        }
        let held = host.balance_of(pool.sett, self.id);
        if held < estimate.out {
            return Err(Error::InsufficientBalance {
                required: estimate.out,
                available: held,
            });
        }

        core.redeem(self.id, shares, caller)?;
        host.transfer(pool.sett, self.id, caller, estimate.out)?;

        debug!(peak = %self.id, %caller, pool_id, %shares, out = estimate.out, "sett redemption paid");
        Ok(estimate.out)
    }
}

impl Peak for SettPeak {
    fn id(&self) -> Address {
        self.id
    }

    fn kind(&self) -> PeakKind {
        PeakKind::Sett
    }

    fn portfolio_value(&self, host: &dyn CollateralHost) -> Result<u128> {
        let mut total = 0u128;
        for pool in &self.pools {
            let rate = self.composite_rate(host, pool)?;
            let held = host.balance_of(pool.sett, self.id);
            total = safe_add(total, value_at_rate(held, rate)?)?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{InMemoryHost, VAULT_SCALE_WAD};
    use crate::utils::constants::WAD;
    use crate::utils::math::fee_bps;

    fn admin() -> Address {
        Address::from_label("admin")
    }

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn pool_entry() -> PoolEntry {
        PoolEntry {
            lp_token: Address::from_label("crv-lp"),
            swap: Address::from_label("crv-swap"),
            sett: Address::from_label("sett"),
        }
    }

    fn setup() -> (Core, SettPeak, InMemoryHost) {
        let mut core = Core::new(admin());
        let mut peak = SettPeak::new(Address::from_label("sett-peak"), admin());
        peak.modify_whitelisted_pools(admin(), vec![pool_entry()]).unwrap();
        core.whitelist_peak(admin(), &peak).unwrap();
        core.set_config(admin(), 10, 10, Address::from_label("sink")).unwrap();

        let mut host = InMemoryHost::new();
        let pool = pool_entry();
        host.set_virtual_price(pool.swap, WAD);
        host.register_vault(pool.sett, pool.lp_token, WAD, VAULT_SCALE_WAD);
        (core, peak, host)
    }

    #[test]
    fn test_mint_with_unit_rates() {
        let (mut core, mut peak, mut host) = setup();
        let amount = 10 * WAD;
        host.fund(pool_entry().sett, alice(), amount);

        let minted = peak.mint(&mut core, &mut host, alice(), 0, amount).unwrap();

        // one-unit haircut, then the 10 bps ledger fee
        let btc = amount - 1;
        let fee = fee_bps(btc, 10).unwrap();
        assert_eq!(minted, Shares::from_raw(btc - fee));
        assert_eq!(core.token().balance_of(&alice()), minted);
        assert_eq!(core.accumulated_fee(), Shares::from_raw(fee));
        assert_eq!(host.balance_of(pool_entry().sett, alice()), 0);
        assert_eq!(host.balance_of(pool_entry().sett, peak.id()), amount);
    }

    #[test]
    fn test_calc_mint_matches_mint() {
        let (mut core, mut peak, mut host) = setup();
        let amount = 3 * WAD + 12345;
        host.fund(pool_entry().sett, alice(), amount);

        let quote = peak.calc_mint(&core, &host, 0, amount).unwrap();
        let minted = peak.mint(&mut core, &mut host, alice(), 0, amount).unwrap();
        assert_eq!(minted, quote.net);
    }

    #[test]
    fn test_redeem_returns_net_of_fee() {
        let (mut core, mut peak, mut host) = setup();
        host.fund(pool_entry().sett, alice(), 10 * WAD);
        peak.mint(&mut core, &mut host, alice(), 0, 10 * WAD).unwrap();

        let balance = core.token().balance_of(&alice());
        let redeem = Shares::from_raw(balance.raw() * 7 / 10);
        let fee_before = core.accumulated_fee();

        let out = peak.redeem(&mut core, &mut host, alice(), 0, redeem, 0).unwrap();

        let fee = fee_bps(redeem.raw(), 10).unwrap();
        // unit rates: value out equals shares net of fee
        assert_eq!(out, redeem.raw() - fee);
        assert_eq!(host.balance_of(pool_entry().sett, alice()), out);
        assert_eq!(
            core.accumulated_fee(),
            Shares::from_raw(fee_before.raw() + fee)
        );
        assert_eq!(
            core.token().balance_of(&alice()),
            Shares::from_raw(balance.raw() - redeem.raw())
        );
    }

    #[test]
    fn test_redeem_slippage_guard() {
        let (mut core, mut peak, mut host) = setup();
        host.fund(pool_entry().sett, alice(), 10 * WAD);
        peak.mint(&mut core, &mut host, alice(), 0, 10 * WAD).unwrap();

        let balance = core.token().balance_of(&alice());
        let result = peak.redeem(&mut core, &mut host, alice(), 0, balance, 11 * WAD);
        assert!(matches!(result, Err(Error::SlippageExceeded { .. })));
        // nothing moved
        assert_eq!(core.token().balance_of(&alice()), balance);
    }

    #[test]
    fn test_appreciating_rates_raise_value() {
        let (mut core, mut peak, mut host) = setup();
        let pool = pool_entry();
        host.fund(pool.sett, alice(), 10 * WAD);
        peak.mint(&mut core, &mut host, alice(), 0, 10 * WAD).unwrap();

        // vault appreciates 10%: portfolio grows, recorded assets lag
        host.set_price_per_full_share(pool.sett, WAD + WAD / 10);
        let value = peak.portfolio_value(&host).unwrap();
        assert_eq!(value, 11 * WAD);
        assert!(value >= core.total_system_assets());
    }

    #[test]
    fn test_dust_deposit_rejected_as_recoverable() {
        let (mut core, mut peak, mut host) = setup();
        let pool = pool_entry();
        // rate so low the deposit values to zero
        host.set_virtual_price(pool.swap, 1);
        host.fund(pool.sett, alice(), 100);

        let err = peak.mint(&mut core, &mut host, alice(), 0, 100).unwrap_err();
        assert_eq!(err, Error::ZeroAmount);
        assert!(err.is_recoverable());
        // nothing pulled, nothing minted
        assert_eq!(host.balance_of(pool.sett, alice()), 100);
        assert!(core.token().total_supply().is_zero());
    }

    #[test]
    fn test_unknown_pool() {
        let (mut core, mut peak, mut host) = setup();
        let result = peak.mint(&mut core, &mut host, alice(), 9, WAD);
        assert_eq!(result, Err(Error::UnknownPool(9)));
    }

    #[test]
    fn test_oracle_decrease_policy() {
        let (mut core, mut peak, mut host) = setup();
        peak.set_oracle_policy(admin(), OraclePolicy::RejectDecrease).unwrap();
        let pool = pool_entry();
        host.fund(pool.sett, alice(), 10 * WAD);
        peak.mint(&mut core, &mut host, alice(), 0, 5 * WAD).unwrap();

        host.set_virtual_price(pool.swap, WAD - 1);
        let result = peak.mint(&mut core, &mut host, alice(), 0, 5 * WAD);
        assert!(matches!(result, Err(Error::PriceDecreased { .. })));
    }
}
