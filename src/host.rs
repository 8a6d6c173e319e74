//! Host-side view of the external world a connector operates against.
//!
//! Collateral tokens, stable-swap pools and vault wrappers are external
//! collaborators: the ledger consumes their balances and price oracles but
//! never implements them. [`CollateralHost`] is the seam; [`InMemoryHost`] is
//! a deterministic in-memory implementation used by tests and simulations.
//!
//! Oracle reads must be fresh at the time of use — implementations must not
//! cache rates across calls.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::utils::constants::WAD;
use crate::utils::ids::Address;
use crate::utils::math::{mul_div, safe_add};

// ═══════════════════════════════════════════════════════════════════════════════
// HOST TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// External token, swap and vault surface consumed by connectors
pub trait CollateralHost {
    /// Stable-swap pool's internal LP-to-underlying exchange rate
    /// (WAD-scaled, assumed monotonically non-decreasing)
    fn virtual_price(&self, swap: Address) -> Result<u128>;

    /// Vault wrapper's share-to-deposit exchange rate, in the vault's own
    /// price scale (WAD for 18-decimal vaults, 1e8 for WBTC-style wrappers)
    fn price_per_full_share(&self, vault: Address) -> Result<u128>;

    /// Balance of `owner` in the fungible token at `token`
    fn balance_of(&self, token: Address, owner: Address) -> u128;

    /// Move `amount` of `token` from `from` to `to`
    fn transfer(&mut self, token: Address, from: Address, to: Address, amount: u128) -> Result<()>;

    /// Deposit `lp_amount` of the vault's underlying from `owner`, crediting
    /// vault shares; returns the shares minted
    fn vault_deposit(&mut self, vault: Address, owner: Address, lp_amount: u128) -> Result<u128>;

    /// Burn `shares` of the vault from `owner`, releasing underlying;
    /// returns the LP amount paid out
    fn vault_withdraw(&mut self, vault: Address, owner: Address, shares: u128) -> Result<u128>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY HOST
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VaultEntry {
    /// Underlying token the vault wraps
    lp_token: Address,
    /// Share-to-underlying rate in the vault's price scale
    price_per_full_share: u128,
    /// Price scale of the vault (WAD for sett-style vaults)
    scale: u128,
}

/// Deterministic in-memory world: token ledgers, swap rates, vault wrappers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryHost {
    balances: HashMap<(Address, Address), u128>,
    virtual_prices: HashMap<Address, u128>,
    vaults: HashMap<Address, VaultEntry>,
}

impl InMemoryHost {
    /// Create an empty world
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of `token` to `owner` out of thin air (test fixture)
    pub fn fund(&mut self, token: Address, owner: Address, amount: u128) {
        let entry = self.balances.entry((token, owner)).or_insert(0);
        *entry += amount;
    }

    /// Register or update a stable-swap pool's virtual price (WAD-scaled)
    pub fn set_virtual_price(&mut self, swap: Address, price: u128) {
        self.virtual_prices.insert(swap, price);
    }

    /// Register a vault wrapper over `lp_token` with a price in `scale`
    pub fn register_vault(&mut self, vault: Address, lp_token: Address, price: u128, scale: u128) {
        self.vaults.insert(
            vault,
            VaultEntry {
                lp_token,
                price_per_full_share: price,
                scale,
            },
        );
    }

    /// Update a registered vault's price-per-full-share
    pub fn set_price_per_full_share(&mut self, vault: Address, price: u128) {
        if let Some(entry) = self.vaults.get_mut(&vault) {
            entry.price_per_full_share = price;
        }
    }

    fn debit(&mut self, token: Address, owner: Address, amount: u128) -> Result<()> {
        let balance = self.balance_of(token, owner);
        if balance < amount {
            return Err(Error::InsufficientBalance {
                required: amount,
                available: balance,
            });
        }
        self.balances.insert((token, owner), balance - amount);
        Ok(())
    }

    fn credit(&mut self, token: Address, owner: Address, amount: u128) -> Result<()> {
        let balance = self.balance_of(token, owner);
        self.balances.insert((token, owner), safe_add(balance, amount)?);
        Ok(())
    }
}

impl CollateralHost for InMemoryHost {
    fn virtual_price(&self, swap: Address) -> Result<u128> {
        self.virtual_prices.get(&swap).copied().ok_or(Error::Oracle {
            target: swap,
            reason: "unknown swap".into(),
        })
    }

    fn price_per_full_share(&self, vault: Address) -> Result<u128> {
        self.vaults
            .get(&vault)
            .map(|v| v.price_per_full_share)
            .ok_or(Error::Oracle {
                target: vault,
                reason: "unknown vault".into(),
            })
    }

    fn balance_of(&self, token: Address, owner: Address) -> u128 {
        self.balances.get(&(token, owner)).copied().unwrap_or(0)
    }

    fn transfer(&mut self, token: Address, from: Address, to: Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.debit(token, from, amount)?;
        self.credit(token, to, amount)
    }

    fn vault_deposit(&mut self, vault: Address, owner: Address, lp_amount: u128) -> Result<u128> {
        let entry = self.vaults.get(&vault).cloned().ok_or(Error::Oracle {
            target: vault,
            reason: "unknown vault".into(),
        })?;
        let shares = mul_div(lp_amount, entry.scale, entry.price_per_full_share)?;

        self.debit(entry.lp_token, owner, lp_amount)?;
        self.credit(entry.lp_token, vault, lp_amount)?;
        self.credit(vault, owner, shares)?;
        Ok(shares)
    }

    fn vault_withdraw(&mut self, vault: Address, owner: Address, shares: u128) -> Result<u128> {
        let entry = self.vaults.get(&vault).cloned().ok_or(Error::Oracle {
            target: vault,
            reason: "unknown vault".into(),
        })?;
        let lp_amount = mul_div(shares, entry.price_per_full_share, entry.scale)?;

        self.debit(vault, owner, shares)?;
        self.debit(entry.lp_token, vault, lp_amount)?;
        self.credit(entry.lp_token, owner, lp_amount)?;
        Ok(lp_amount)
    }
}

/// Convenience: WAD price scale for sett-style vaults
pub const VAULT_SCALE_WAD: u128 = WAD;
