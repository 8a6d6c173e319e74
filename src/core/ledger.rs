//! The shared ledger.
//!
//! `Core` tracks total system value, the share token supply, the connector
//! registry and the fee configuration, and is the only mutator of the share
//! token. Connectors deposit BTC-denominated value through [`Core::mint`] and
//! release it through [`Core::redeem`]; both paths price shares off the same
//! pure quote functions they expose for read-only use.
//!
//! # Fee accounting
//!
//! Fees are taken in shares and parked in `accumulated_fee` without being
//! minted. The pending shares count toward the effective supply, so the share
//! price already reflects them; [`Core::collect_fee`] mints exactly the
//! pending amount to the fee sink and zeroes the accumulator.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::FeeConfig;
use crate::core::registry::{PeakRegistry, PeakStatus};
use crate::core::token::{ShareToken, Shares};
use crate::error::{Error, Result};
use crate::events::{
    ConfigChangedEvent, FeeCollectedEvent, LedgerEvent, PeakStatusChangedEvent,
    PeakWhitelistedEvent, SharesMintedEvent, SharesRedeemedEvent,
};
use crate::host::CollateralHost;
use crate::peaks::Peak;
use crate::utils::constants::{BOOTSTRAP_PRICE, WAD};
use crate::utils::ids::Address;
use crate::utils::math::{fee_bps, mul_div, safe_add, safe_sub};

// ═══════════════════════════════════════════════════════════════════════════════
// QUOTES
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of pricing a deposit, before any state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintQuote {
    /// Shares the deposited value is worth at the current price
    pub gross: Shares,
    /// Fee shares withheld by the ledger
    pub fee: Shares,
    /// Shares the depositor receives
    pub net: Shares,
}

/// Result of pricing a redemption, before any state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemQuote {
    /// Fee shares withheld by the ledger
    pub fee: Shares,
    /// Shares actually converted to value
    pub net: Shares,
    /// BTC-denominated value released
    pub value: u128,
}

/// Solvency audit: derived connector value against recorded assets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolvencyReport {
    /// Sum of Active and Dormant connectors' reported portfolio value
    pub derived: u128,
    /// Assets recorded incrementally by the ledger
    pub recorded: u128,
}

impl SolvencyReport {
    /// True if derived value covers recorded assets within `slack` units of
    /// rounding loss
    pub fn is_solvent(&self, slack: u128) -> bool {
        self.derived.saturating_add(slack) >= self.recorded
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CORE LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum events retained in the in-memory log
const MAX_EVENTS: usize = 1000;

/// The shared multi-collateral ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Core {
    admin: Address,
    config: FeeConfig,
    registry: PeakRegistry,
    token: ShareToken,
    /// BTC-denominated system value (WAD-scaled), tracked incrementally
    total_system_assets: u128,
    /// Fee shares pending collection, not yet minted
    accumulated_fee: Shares,
    events: Vec<LedgerEvent>,
}

impl Core {
    /// Create a ledger administered by `admin`, with zero fees configured
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            config: FeeConfig::unset(),
            registry: PeakRegistry::new(),
            token: ShareToken::new(),
            total_system_assets: 0,
            accumulated_fee: Shares::ZERO,
            events: Vec::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Ledger administrator
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Current fee configuration
    pub fn config(&self) -> &FeeConfig {
        &self.config
    }

    /// Share token balance sheet
    pub fn token(&self) -> &ShareToken {
        &self.token
    }

    /// Recorded BTC-denominated system value
    pub fn total_system_assets(&self) -> u128 {
        self.total_system_assets
    }

    /// Fee shares pending collection
    pub fn accumulated_fee(&self) -> Shares {
        self.accumulated_fee
    }

    /// Status of a connector identity (unregistered reads `Extinct`)
    pub fn peak_status(&self, peak: &Address) -> PeakStatus {
        self.registry.status(peak)
    }

    /// Registered connector identities in whitelisting order
    pub fn peak_addresses(&self) -> &[Address] {
        self.registry.addresses()
    }

    /// Events recorded since the last [`Core::take_events`]
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Drain the event log
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Supply counting both minted shares and pending fee shares
    fn effective_supply(&self) -> u128 {
        self.token.total_supply().raw() + self.accumulated_fee.raw()
    }

    /// BTC-denominated value of one share (WAD-scaled).
    ///
    /// Returns the bootstrap constant while no shares exist.
    pub fn price_per_full_share(&self) -> Result<u128> {
        let supply = self.effective_supply();
        if supply == 0 {
            return Ok(BOOTSTRAP_PRICE);
        }
        mul_div(self.total_system_assets, WAD, supply)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PURE VALUATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Price a deposit of `value` BTC at the current share price.
    ///
    /// This is the single valuation routine: [`Core::mint`] settles exactly
    /// what this quotes, so read-only callers see bit-identical numbers.
    pub fn quote_mint(&self, value: u128) -> Result<MintQuote> {
        if value == 0 {
            return Err(Error::ZeroAmount);
        }
        let supply = self.effective_supply();
        let gross = if supply == 0 {
            value
        } else {
            mul_div(value, supply, self.total_system_assets)?
        };
        let fee = fee_bps(gross, self.config.mint_fee_bps)?;
        let net = safe_sub(gross, fee)?;
        if net == 0 {
            return Err(Error::ZeroShares);
        }
        Ok(MintQuote {
            gross: Shares::from_raw(gross),
            fee: Shares::from_raw(fee),
            net: Shares::from_raw(net),
        })
    }

    /// Price a redemption of `shares` at the current share price
    pub fn quote_redeem(&self, shares: Shares) -> Result<RedeemQuote> {
        if shares.is_zero() {
            return Err(Error::ZeroAmount);
        }
        let fee = fee_bps(shares.raw(), self.config.redeem_fee_bps)?;
        let net = safe_sub(shares.raw(), fee)?;
        let value = mul_div(net, self.price_per_full_share()?, WAD)?;
        Ok(RedeemQuote {
            fee: Shares::from_raw(fee),
            net: Shares::from_raw(net),
            value,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PEAK SURFACE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Issue shares against `value` BTC of freshly deposited collateral.
    ///
    /// Callable only by an `Active` connector. Net shares go to `account`,
    /// the fee is parked in the accumulator, and recorded assets grow by the
    /// full `value`. Never decreases the share price beyond floor-division
    /// truncation.
    pub fn mint(&mut self, peak: Address, value: u128, account: Address) -> Result<Shares> {
        if self.registry.status(&peak) != PeakStatus::Active {
            return Err(Error::PeakInactive(peak));
        }
        let quote = self.quote_mint(value)?;
        let new_assets = safe_add(self.total_system_assets, value)?;

        self.token.mint(account, quote.net)?;
        self.accumulated_fee = self
            .accumulated_fee
            .checked_add(quote.fee)
            .ok_or(Error::Overflow {
                operation: "accumulated fee".into(),
            })?;
        self.total_system_assets = new_assets;

        debug!(%peak, %account, value, shares = %quote.net, fee = %quote.fee, "minted shares");
        self.record(LedgerEvent::SharesMinted(SharesMintedEvent {
            peak,
            account,
            value,
            shares: quote.net,
            fee: quote.fee,
        }));
        Ok(quote.net)
    }

    /// Burn `shares` from `account` and release their BTC-denominated value.
    ///
    /// Callable by any non-`Extinct` connector (redemption stays open while a
    /// connector is `Dormant`). Recorded assets shrink by the released value;
    /// an underflow there means the ledger is insolvent and the call fails
    /// closed.
    pub fn redeem(&mut self, peak: Address, shares: Shares, account: Address) -> Result<u128> {
        if self.registry.status(&peak) == PeakStatus::Extinct {
            return Err(Error::PeakExtinct(peak));
        }
        let quote = self.quote_redeem(shares)?;

        let balance = self.token.balance_of(&account);
        if balance < shares {
            return Err(Error::InsufficientBalance {
                required: shares.raw(),
                available: balance.raw(),
            });
        }
        let new_assets = safe_sub(self.total_system_assets, quote.value)?;

        self.token.burn(account, shares)?;
        self.accumulated_fee = self
            .accumulated_fee
            .checked_add(quote.fee)
            .ok_or(Error::Overflow {
                operation: "accumulated fee".into(),
            })?;
        self.total_system_assets = new_assets;

        debug!(%peak, %account, shares = %shares, value = quote.value, fee = %quote.fee, "redeemed shares");
        self.record(LedgerEvent::SharesRedeemed(SharesRedeemedEvent {
            peak,
            account,
            shares,
            value: quote.value,
            fee: quote.fee,
        }));
        Ok(quote.value)
    }

    /// Move already-minted shares between holders (connector fee retention
    /// and payout paths)
    pub fn transfer_shares(&mut self, from: Address, to: Address, amount: Shares) -> Result<()> {
        self.token.transfer(from, to, amount)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ADMIN SURFACE
    // ═══════════════════════════════════════════════════════════════════════════

    fn require_admin(&self, caller: Address) -> Result<()> {
        if caller != self.admin {
            return Err(Error::NotOwner { caller });
        }
        Ok(())
    }

    /// Register a connector and activate it
    pub fn whitelist_peak(&mut self, caller: Address, peak: &dyn Peak) -> Result<()> {
        self.require_admin(caller)?;
        let id = peak.id();
        if id.is_zero() {
            return Err(Error::InvalidConnector {
                reason: "zero address".into(),
            });
        }
        self.registry.register(id)?;

        debug!(peak = %id, kind = ?peak.kind(), "peak whitelisted");
        self.record(LedgerEvent::PeakWhitelisted(PeakWhitelistedEvent { peak: id }));
        Ok(())
    }

    /// Overwrite a registered connector's status
    pub fn set_peak_status(
        &mut self,
        caller: Address,
        peak: Address,
        status: PeakStatus,
    ) -> Result<()> {
        self.require_admin(caller)?;
        self.registry.set_status(peak, status)?;

        debug!(%peak, ?status, "peak status changed");
        self.record(LedgerEvent::PeakStatusChanged(PeakStatusChangedEvent {
            peak,
            status,
        }));
        Ok(())
    }

    /// Replace the fee configuration
    pub fn set_config(
        &mut self,
        caller: Address,
        mint_fee_bps: u128,
        redeem_fee_bps: u128,
        fee_sink: Address,
    ) -> Result<()> {
        self.require_admin(caller)?;
        let config = FeeConfig {
            mint_fee_bps,
            redeem_fee_bps,
            fee_sink,
        };
        config.validate()?;
        self.config = config;

        self.record(LedgerEvent::ConfigChanged(ConfigChangedEvent {
            mint_fee_bps,
            redeem_fee_bps,
            fee_sink,
        }));
        Ok(())
    }

    /// Mint the pending fee shares to the fee sink and zero the accumulator.
    ///
    /// The only path by which the sink's balance grows from ledger fees.
    pub fn collect_fee(&mut self, caller: Address) -> Result<Shares> {
        self.require_admin(caller)?;
        if self.accumulated_fee.is_zero() {
            return Err(Error::NoFeeToCollect);
        }
        if self.config.fee_sink.is_zero() {
            return Err(Error::InvalidParameter {
                name: "fee_sink".into(),
                reason: "unset".into(),
            });
        }
        let collected = self.accumulated_fee;
        self.token.mint(self.config.fee_sink, collected)?;
        self.accumulated_fee = Shares::ZERO;

        debug!(sink = %self.config.fee_sink, shares = %collected, "fee collected");
        self.record(LedgerEvent::FeeCollected(FeeCollectedEvent {
            fee_sink: self.config.fee_sink,
            shares: collected,
        }));
        Ok(collected)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // AUDIT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Compare the derived value of all Active and Dormant connectors against
    /// the incrementally recorded assets
    pub fn check_solvency(
        &self,
        peaks: &[&dyn Peak],
        host: &dyn CollateralHost,
    ) -> Result<SolvencyReport> {
        let mut derived = 0u128;
        for peak in peaks {
            if self.registry.status(&peak.id()) != PeakStatus::Extinct {
                derived = safe_add(derived, peak.portfolio_value(host)?)?;
            }
        }
        Ok(SolvencyReport {
            derived,
            recorded: self.total_system_assets,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PERSISTENCE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Serialize the ledger state
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Restore a ledger from a snapshot
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }

    fn record(&mut self, event: LedgerEvent) {
        self.events.push(event);
        if self.events.len() > MAX_EVENTS {
            let excess = self.events.len() - MAX_EVENTS;
            self.events.drain(0..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peaks::PeakKind;
    use crate::utils::constants::BPS_DIVISOR;

    struct TestPeak(Address);

    impl Peak for TestPeak {
        fn id(&self) -> Address {
            self.0
        }

        fn kind(&self) -> PeakKind {
            PeakKind::Sett
        }

        fn portfolio_value(&self, _host: &dyn CollateralHost) -> Result<u128> {
            Ok(0)
        }
    }

    fn admin() -> Address {
        Address::from_label("admin")
    }

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn sink() -> Address {
        Address::from_label("sink")
    }

    fn core_with_peak() -> (Core, Address) {
        let mut core = Core::new(admin());
        let peak = TestPeak(Address::from_label("peak"));
        core.whitelist_peak(admin(), &peak).unwrap();
        (core, peak.id())
    }

    #[test]
    fn test_whitelist_requires_admin() {
        let mut core = Core::new(admin());
        let peak = TestPeak(Address::from_label("peak"));
        let result = core.whitelist_peak(alice(), &peak);
        assert!(matches!(result, Err(Error::NotOwner { .. })));
    }

    #[test]
    fn test_whitelist_rejects_zero_address() {
        let mut core = Core::new(admin());
        let peak = TestPeak(Address::ZERO);
        let result = core.whitelist_peak(admin(), &peak);
        assert!(matches!(result, Err(Error::InvalidConnector { .. })));
    }

    #[test]
    fn test_duplicate_whitelist_rejected() {
        let (mut core, id) = core_with_peak();
        let peak = TestPeak(id);
        assert_eq!(core.whitelist_peak(admin(), &peak), Err(Error::DuplicatePeak(id)));
    }

    #[test]
    fn test_bootstrap_mint_is_one_to_one() {
        let (mut core, peak) = core_with_peak();
        assert_eq!(core.price_per_full_share().unwrap(), BOOTSTRAP_PRICE);

        let minted = core.mint(peak, 10 * WAD, alice()).unwrap();
        assert_eq!(minted, Shares::from_units(10));
        assert_eq!(core.total_system_assets(), 10 * WAD);
        assert_eq!(core.price_per_full_share().unwrap(), WAD);
    }

    #[test]
    fn test_mint_requires_active() {
        let (mut core, peak) = core_with_peak();
        core.set_peak_status(admin(), peak, PeakStatus::Dormant).unwrap();

        let result = core.mint(peak, WAD, alice());
        assert_eq!(result, Err(Error::PeakInactive(peak)));
    }

    #[test]
    fn test_mint_from_unregistered_peak() {
        let mut core = Core::new(admin());
        let rogue = Address::from_label("rogue");
        assert_eq!(core.mint(rogue, WAD, alice()), Err(Error::PeakInactive(rogue)));
    }

    #[test]
    fn test_redeem_allowed_while_dormant() {
        let (mut core, peak) = core_with_peak();
        core.mint(peak, 10 * WAD, alice()).unwrap();
        core.set_peak_status(admin(), peak, PeakStatus::Dormant).unwrap();

        let value = core.redeem(peak, Shares::from_units(4), alice()).unwrap();
        assert_eq!(value, 4 * WAD);
    }

    #[test]
    fn test_redeem_blocked_when_extinct() {
        let (mut core, peak) = core_with_peak();
        core.mint(peak, 10 * WAD, alice()).unwrap();
        core.set_peak_status(admin(), peak, PeakStatus::Extinct).unwrap();

        let result = core.redeem(peak, Shares::from_units(1), alice());
        assert_eq!(result, Err(Error::PeakExtinct(peak)));
        // balance untouched by the failed call
        assert_eq!(core.token().balance_of(&alice()), Shares::from_units(10));
    }

    #[test]
    fn test_fee_accumulation_and_collection() {
        let (mut core, peak) = core_with_peak();
        core.set_config(admin(), 10, 10, sink()).unwrap();

        // mint: 10 WAD value at bootstrap, 10 bps fee in shares
        core.mint(peak, 10 * WAD, alice()).unwrap();
        let mint_fee = fee_bps(10 * WAD, 10).unwrap();
        assert_eq!(core.accumulated_fee(), Shares::from_raw(mint_fee));
        assert_eq!(
            core.token().balance_of(&alice()),
            Shares::from_raw(10 * WAD - mint_fee)
        );

        // redeem 70% of the balance
        let redeemed = Shares::from_raw(core.token().balance_of(&alice()).raw() * 7 / 10);
        let redeem_fee = fee_bps(redeemed.raw(), 10).unwrap();
        core.redeem(peak, redeemed, alice()).unwrap();
        assert_eq!(
            core.accumulated_fee(),
            Shares::from_raw(mint_fee + redeem_fee)
        );

        // collect sweeps everything to the sink
        let collected = core.collect_fee(admin()).unwrap();
        assert_eq!(collected, Shares::from_raw(mint_fee + redeem_fee));
        assert_eq!(core.token().balance_of(&sink()), collected);
        assert_eq!(core.accumulated_fee(), Shares::ZERO);
    }

    #[test]
    fn test_collect_fee_with_nothing_pending() {
        let (mut core, _) = core_with_peak();
        core.set_config(admin(), 10, 10, sink()).unwrap();
        assert_eq!(core.collect_fee(admin()), Err(Error::NoFeeToCollect));
    }

    #[test]
    fn test_price_never_decreased_by_mint_or_redeem() {
        let (mut core, peak) = core_with_peak();
        core.set_config(admin(), 25, 25, sink()).unwrap();

        core.mint(peak, 10 * WAD, alice()).unwrap();
        let p0 = core.price_per_full_share().unwrap();

        core.mint(peak, 3 * WAD + 12345, alice()).unwrap();
        let p1 = core.price_per_full_share().unwrap();
        assert!(p1 >= p0);

        core.redeem(peak, Shares::from_raw(WAD + 999), alice()).unwrap();
        let p2 = core.price_per_full_share().unwrap();
        assert!(p2 >= p1);
    }

    #[test]
    fn test_quote_mint_matches_mint() {
        let (mut core, peak) = core_with_peak();
        core.set_config(admin(), 10, 10, sink()).unwrap();
        core.mint(peak, 7 * WAD, alice()).unwrap();

        let value = 3 * WAD + 77777;
        let quote = core.quote_mint(value).unwrap();
        let minted = core.mint(peak, value, alice()).unwrap();
        assert_eq!(minted, quote.net);
    }

    #[test]
    fn test_set_config_bounds() {
        let (mut core, _) = core_with_peak();
        assert!(core
            .set_config(admin(), BPS_DIVISOR + 1, 0, sink())
            .is_err());
        assert!(core.set_config(alice(), 0, 0, sink()).is_err());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let (mut core, peak) = core_with_peak();
        core.set_config(admin(), 10, 10, sink()).unwrap();
        core.mint(peak, 10 * WAD, alice()).unwrap();

        let bytes = core.to_bytes().unwrap();
        let restored = Core::from_bytes(&bytes).unwrap();
        assert_eq!(restored.total_system_assets(), core.total_system_assets());
        assert_eq!(restored.accumulated_fee(), core.accumulated_fee());
        assert_eq!(restored.token().balance_of(&alice()), core.token().balance_of(&alice()));
    }
}
