//! Naked stable-swap LP connector with an idle reserve.
//!
//! Deposits arrive as the LP token itself. The connector keeps a configured
//! fraction idle for cheap exits and parks the rest in the pool's vault
//! wrapper; redemptions pay from the idle reserve and deterministically pull
//! any shortfall back out of the vault.
//!
//! This connector retains its fees locally: the ledger mints gross shares to
//! the peak, which forwards the net amount to the depositor and keeps the
//! difference in its own share balance until [`CurvePeak::collect_admin_fee`]
//! sweeps it. Deployments using it run the ledger's own fees at zero — the
//! two fee models are not interchangeable.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::ledger::{Core, MintQuote};
use crate::core::registry::PeakStatus;
use crate::core::token::Shares;
use crate::error::{Error, Result};
use crate::host::CollateralHost;
use crate::peaks::{replace_pools, OraclePolicy, Peak, PeakKind, PoolEntry, RateWatermarks, RedeemEstimate};
use crate::utils::constants::{BPS_DIVISOR, WAD};
use crate::utils::ids::Address;
use crate::utils::math::{
    amount_at_rate, apply_fee_factor, compose_rates, mul_div, mul_div_up, safe_add, value_at_rate,
};

/// Fraction of deposited LP kept idle, out of [`BPS_DIVISOR`]
const RESERVE_BPS: u128 = 1_000;

/// Connector for naked stable-swap LP collateral with local fee retention
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurvePeak {
    id: Address,
    admin: Address,
    fee_sink: Address,
    pools: Vec<PoolEntry>,
    mint_fee_bps: u128,
    redeem_fee_bps: u128,
    oracle_policy: OraclePolicy,
    watermarks: RateWatermarks,
}

impl CurvePeak {
    /// Create a connector with local fees in basis points
    pub fn new(
        id: Address,
        admin: Address,
        fee_sink: Address,
        mint_fee_bps: u128,
        redeem_fee_bps: u128,
    ) -> Result<Self> {
        if mint_fee_bps > BPS_DIVISOR || redeem_fee_bps > BPS_DIVISOR {
            return Err(Error::InvalidParameter {
                name: "fee_bps".into(),
                reason: format!("exceeds {}", BPS_DIVISOR),
            });
        }
        Ok(Self {
            id,
            admin,
            fee_sink,
            pools: Vec::new(),
            mint_fee_bps,
            redeem_fee_bps,
            oracle_policy: OraclePolicy::Trust,
            watermarks: RateWatermarks::default(),
        })
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

    /// Set how backwards-moving oracle rates are treated
    pub fn set_oracle_policy(&mut self, caller: Address, policy: OraclePolicy) -> Result<()> {
        self.require_admin(caller)?;
        self.oracle_policy = policy;
        Ok(())
    }

    /// BTC value of `lp_amount`, with the one-unit haircut; dust whose value
    /// rounds to zero is a caller error
    fn lp_to_btc(&self, virtual_price: u128, lp_amount: u128) -> Result<u128> {
        let value = value_at_rate(lp_amount, virtual_price)?;
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
    /// `fee` covers everything withheld from the depositor: the ledger's cut
    /// (zero in the intended deployment) plus the local fee.
    pub fn calc_mint(
        &self,
        core: &Core,
        host: &dyn CollateralHost,
        pool_id: u32,
        lp_amount: u128,
    ) -> Result<MintQuote> {
        let pool = self.pool(pool_id)?;
        let virtual_price = host.virtual_price(pool.swap)?;
        self.estimate_mint(core, virtual_price, lp_amount)
    }

    fn estimate_mint(&self, core: &Core, virtual_price: u128, lp_amount: u128) -> Result<MintQuote> {
        let quote = core.quote_mint(self.lp_to_btc(virtual_price, lp_amount)?)?;
        let net = apply_fee_factor(quote.net.raw(), self.mint_fee_bps)?;
        if net == 0 {
            return Err(Error::ZeroShares);
        }
        Ok(MintQuote {
            gross: quote.gross,
            fee: Shares::from_raw(quote.gross.raw() - net),
            net: Shares::from_raw(net),
        })
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
        let virtual_price = host.virtual_price(pool.swap)?;
        self.estimate_redeem(core, virtual_price, shares)
    }

    fn estimate_redeem(&self, core: &Core, virtual_price: u128, shares: Shares) -> Result<RedeemEstimate> {
        let net = Shares::from_raw(apply_fee_factor(shares.raw(), self.redeem_fee_bps)?);
        let quote = core.quote_redeem(net)?;
        Ok(RedeemEstimate {
            out: amount_at_rate(quote.value, virtual_price)?,
            fee: Shares::from_raw(shares.raw() - quote.net.raw()),
            value: quote.value,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Pull `lp_amount` of the pool's LP token from `caller`, split it across
    /// the idle reserve and the vault, and forward the net minted shares
    pub fn mint(
        &mut self,
        core: &mut Core,
        host: &mut dyn CollateralHost,
        caller: Address,
        pool_id: u32,
        lp_amount: u128,
    ) -> Result<Shares> {
        let pool = *self.pool(pool_id)?;
        if core.peak_status(&self.id) != PeakStatus::Active {
            return Err(Error::PeakInactive(self.id));
        }
        let virtual_price = host.virtual_price(pool.swap)?;
        self.watermarks.observe(self.oracle_policy, pool_id, virtual_price)?;

        // quote first so a rejected deposit pulls nothing
        let quote = self.estimate_mint(core, virtual_price, lp_amount)?;

        host.transfer(pool.lp_token, caller, self.id, lp_amount)?;
        let to_vault = mul_div(lp_amount, BPS_DIVISOR - RESERVE_BPS, BPS_DIVISOR)?;
        if to_vault > 0 {
            host.vault_deposit(pool.sett, self.id, to_vault)?;
        }

        // ledger mints gross-of-local-fee to the peak; the depositor gets net
        core.mint(self.id, self.lp_to_btc(virtual_price, lp_amount)?, self.id)?;
        core.transfer_shares(self.id, caller, quote.net)?;

        debug!(peak = %self.id, %caller, pool_id, lp_amount, minted = %quote.net, "curve deposit minted");
        Ok(quote.net)
    }

    /// Redeem `shares` for the pool's LP token, sourcing any reserve
    /// shortfall from the vault
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
        let virtual_price = host.virtual_price(pool.swap)?;
        self.watermarks.observe(self.oracle_policy, pool_id, virtual_price)?;

        let estimate = self.estimate_redeem(core, virtual_price, shares)?;
        if estimate.out < min_out {
            return Err(Error::SlippageExceeded {
                out: estimate.out,
                min_out,
            });
        }

        // shortfall beyond the idle reserve comes out of the vault, rounded
        // up so the payout is always covered
        let idle = host.balance_of(pool.lp_token, self.id);
        let mut from_vault = 0u128;
        if idle < estimate.out {
            let shortfall = estimate.out - idle;
            let price_per_full_share = host.price_per_full_share(pool.sett)?;
            from_vault = mul_div_up(shortfall, WAD, price_per_full_share)?;
            let held = host.balance_of(pool.sett, self.id);
            if held < from_vault {
                return Err(Error::InsufficientBalance {
                    required: from_vault,
                    available: held,
                });
            }
        }

        let balance = core.token().balance_of(&caller);
        if balance < shares {
            return Err(Error::InsufficientBalance {
                required: shares.raw(),
                available: balance.raw(),
            });
        }

        // pull gross shares, redeem net through the ledger, keep the fee
        core.transfer_shares(caller, self.id, shares)?;
        let net = Shares::from_raw(apply_fee_factor(shares.raw(), self.redeem_fee_bps)?);
        core.redeem(self.id, net, self.id)?;

        if from_vault > 0 {
            host.vault_withdraw(pool.sett, self.id, from_vault)?;
        }
        host.transfer(pool.lp_token, self.id, caller, estimate.out)?;

        debug!(peak = %self.id, %caller, pool_id, %shares, out = estimate.out, "curve redemption paid");
        Ok(estimate.out)
    }

    /// Sweep the locally retained fee shares to the fee sink
    pub fn collect_admin_fee(&self, core: &mut Core, caller: Address) -> Result<Shares> {
        self.require_admin(caller)?;
        let balance = core.token().balance_of(&self.id);
        if balance.is_zero() {
            return Err(Error::NoFeeToCollect);
        }
        if self.fee_sink.is_zero() {
            return Err(Error::InvalidParameter {
                name: "fee_sink".into(),
                reason: "unset".into(),
            });
        }
        core.transfer_shares(self.id, self.fee_sink, balance)?;

        debug!(peak = %self.id, sink = %self.fee_sink, shares = %balance, "admin fee collected");
        Ok(balance)
    }
}

impl Peak for CurvePeak {
    fn id(&self) -> Address {
        self.id
    }

    fn kind(&self) -> PeakKind {
        PeakKind::Curve
    }

    fn portfolio_value(&self, host: &dyn CollateralHost) -> Result<u128> {
        let mut total = 0u128;
        for pool in &self.pools {
            let virtual_price = host.virtual_price(pool.swap)?;
            let idle = host.balance_of(pool.lp_token, self.id);
            total = safe_add(total, value_at_rate(idle, virtual_price)?)?;

            let vault_rate = compose_rates(host.price_per_full_share(pool.sett)?, virtual_price)?;
            let in_vault = host.balance_of(pool.sett, self.id);
            total = safe_add(total, value_at_rate(in_vault, vault_rate)?)?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{InMemoryHost, VAULT_SCALE_WAD};
    use crate::utils::math::fee_bps;

    fn admin() -> Address {
        Address::from_label("admin")
    }

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn sink() -> Address {
        Address::from_label("peak-sink")
    }

    fn pool_entry() -> PoolEntry {
        PoolEntry {
            lp_token: Address::from_label("ren-lp"),
            swap: Address::from_label("ren-swap"),
            sett: Address::from_label("ren-sett"),
        }
    }

    /// Ledger fees stay zero: this connector retains fees locally.
    fn setup() -> (Core, CurvePeak, InMemoryHost) {
        let mut core = Core::new(admin());
        let mut peak =
            CurvePeak::new(Address::from_label("curve-peak"), admin(), sink(), 10, 10).unwrap();
        peak.modify_whitelisted_pools(admin(), vec![pool_entry()]).unwrap();
        core.whitelist_peak(admin(), &peak).unwrap();

        let mut host = InMemoryHost::new();
        let pool = pool_entry();
        host.set_virtual_price(pool.swap, WAD);
        host.register_vault(pool.sett, pool.lp_token, WAD, VAULT_SCALE_WAD);
        (core, peak, host)
    }

    #[test]
    fn test_mint_splits_reserve_and_retains_fee() {
        let (mut core, mut peak, mut host) = setup();
        let amount = 10 * WAD;
        host.fund(pool_entry().lp_token, alice(), amount);

        let minted = peak.mint(&mut core, &mut host, alice(), 0, amount).unwrap();

        let gross = amount - 1; // haircut, unit virtual price, bootstrap 1:1
        let expected = apply_fee_factor(gross, 10).unwrap();
        assert_eq!(minted, Shares::from_raw(expected));
        assert_eq!(core.token().balance_of(&alice()), minted);
        // local fee sits on the peak's own share balance
        assert_eq!(
            core.token().balance_of(&peak.id()),
            Shares::from_raw(gross - expected)
        );
        // 10% of the LP stays idle, 90% goes to the vault
        assert_eq!(host.balance_of(pool_entry().lp_token, peak.id()), amount / 10);
        assert_eq!(host.balance_of(pool_entry().sett, peak.id()), amount * 9 / 10);
        // ledger itself accrued nothing
        assert_eq!(core.accumulated_fee(), Shares::ZERO);
    }

    #[test]
    fn test_calc_mint_matches_mint() {
        let (mut core, mut peak, mut host) = setup();
        let amount = 7 * WAD + 4242;
        host.fund(pool_entry().lp_token, alice(), amount);

        let quote = peak.calc_mint(&core, &host, 0, amount).unwrap();
        let minted = peak.mint(&mut core, &mut host, alice(), 0, amount).unwrap();
        assert_eq!(minted, quote.net);
    }

    #[test]
    fn test_redeem_sources_shortfall_from_vault() {
        let (mut core, mut peak, mut host) = setup();
        let amount = 10 * WAD;
        host.fund(pool_entry().lp_token, alice(), amount);
        peak.mint(&mut core, &mut host, alice(), 0, amount).unwrap();

        let balance = core.token().balance_of(&alice());
        let redeem = Shares::from_raw(balance.raw() * 9 / 10);
        let estimate = peak.calc_redeem(&core, &host, 0, redeem).unwrap();
        // payout exceeds the 10% idle reserve
        assert!(estimate.out > amount / 10);

        let out = peak.redeem(&mut core, &mut host, alice(), 0, redeem, 0).unwrap();
        assert_eq!(out, estimate.out);
        assert_eq!(out, apply_fee_factor(redeem.raw(), 10).unwrap());
        assert_eq!(host.balance_of(pool_entry().lp_token, alice()), out);
    }

    #[test]
    fn test_redeem_fee_stays_with_peak() {
        let (mut core, mut peak, mut host) = setup();
        host.fund(pool_entry().lp_token, alice(), 10 * WAD);
        peak.mint(&mut core, &mut host, alice(), 0, 10 * WAD).unwrap();
        let fee_before = core.token().balance_of(&peak.id());

        let redeem = Shares::from_raw(core.token().balance_of(&alice()).raw() / 2);
        peak.redeem(&mut core, &mut host, alice(), 0, redeem, 0).unwrap();

        let fee = redeem.raw() - apply_fee_factor(redeem.raw(), 10).unwrap();
        assert_eq!(
            core.token().balance_of(&peak.id()),
            Shares::from_raw(fee_before.raw() + fee)
        );
    }

    #[test]
    fn test_collect_admin_fee() {
        let (mut core, mut peak, mut host) = setup();
        host.fund(pool_entry().lp_token, alice(), 10 * WAD);
        peak.mint(&mut core, &mut host, alice(), 0, 10 * WAD).unwrap();

        let pending = core.token().balance_of(&peak.id());
        assert!(!pending.is_zero());

        let collected = peak.collect_admin_fee(&mut core, admin()).unwrap();
        assert_eq!(collected, pending);
        assert_eq!(core.token().balance_of(&sink()), pending);
        assert_eq!(
            peak.collect_admin_fee(&mut core, admin()),
            Err(Error::NoFeeToCollect)
        );
    }

    #[test]
    fn test_dust_deposit_rejected_as_recoverable() {
        let (mut core, mut peak, mut host) = setup();
        let pool = pool_entry();
        host.set_virtual_price(pool.swap, 1);
        host.fund(pool.lp_token, alice(), 100);

        let err = peak.mint(&mut core, &mut host, alice(), 0, 100).unwrap_err();
        assert_eq!(err, Error::ZeroAmount);
        assert!(err.is_recoverable());
        assert_eq!(host.balance_of(pool.lp_token, alice()), 100);
        assert!(core.token().total_supply().is_zero());
    }

    #[test]
    fn test_mint_fee_rounding_never_overpays() {
        let (mut core, mut peak, mut host) = setup();
        // awkward amount so every division truncates
        let amount = 3 * WAD + 999_999_999;
        host.fund(pool_entry().lp_token, alice(), amount);

        let minted = peak.mint(&mut core, &mut host, alice(), 0, amount).unwrap();
        let gross = amount - 1;
        assert!(minted.raw() + fee_bps(gross, 10).unwrap() <= gross);
    }
}
