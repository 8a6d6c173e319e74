//! Share token ledger.
//!
//! The share token is the single fungible unit representing a pro-rata claim
//! on the system's collateral. Only [`Core`](crate::core::ledger::Core) mints
//! and burns it; transfers move existing claims between holders.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::utils::constants::{SHARE_DECIMALS, WAD};
use crate::utils::ids::Address;

// ═══════════════════════════════════════════════════════════════════════════════
// SHARES AMOUNT
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed share amount (WAD-scaled, prevents mixing shares with
/// BTC-denominated values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Shares(u128);

impl Shares {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Create from a raw WAD-scaled value
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Create from whole share units (scales up by WAD)
    pub const fn from_units(units: u128) -> Self {
        Self(units * WAD)
    }

    /// Raw WAD-scaled value
    pub fn raw(&self) -> u128 {
        self.0
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Saturating subtraction
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl std::fmt::Display for Shares {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:018}", self.0 / WAD, self.0 % WAD)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARE TOKEN
// ═══════════════════════════════════════════════════════════════════════════════

/// Balance sheet of the fungible share token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareToken {
    /// Token symbol
    pub symbol: String,
    /// Decimal places
    pub decimals: u8,
    /// Total supply (WAD-scaled)
    total_supply: Shares,
    /// Balances by holder
    balances: HashMap<Address, Shares>,
}

impl Default for ShareToken {
    fn default() -> Self {
        Self::new()
    }
}

impl ShareToken {
    /// Create an empty share token ledger
    pub fn new() -> Self {
        Self {
            symbol: "ibBTC".to_string(),
            decimals: SHARE_DECIMALS,
            total_supply: Shares::ZERO,
            balances: HashMap::new(),
        }
    }

    /// Get total supply
    pub fn total_supply(&self) -> Shares {
        self.total_supply
    }

    /// Get balance of a holder
    pub fn balance_of(&self, owner: &Address) -> Shares {
        self.balances.get(owner).copied().unwrap_or(Shares::ZERO)
    }

    /// Get number of holders with a nonzero balance
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Mint new shares to a holder (Core only)
    pub(crate) fn mint(&mut self, to: Address, amount: Shares) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }

        let new_supply = self.total_supply.checked_add(amount).ok_or(Error::Overflow {
            operation: "mint total supply".into(),
        })?;
        let new_balance = self.balance_of(&to).checked_add(amount).ok_or(Error::Overflow {
            operation: "mint balance".into(),
        })?;

        self.balances.insert(to, new_balance);
        self.total_supply = new_supply;
        Ok(())
    }

    /// Burn shares from a holder (Core only)
    pub(crate) fn burn(&mut self, from: Address, amount: Shares) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }

        let current = self.balance_of(&from);
        if current < amount {
            return Err(Error::InsufficientBalance {
                required: amount.raw(),
                available: current.raw(),
            });
        }

        let remaining = current.saturating_sub(amount);
        if remaining.is_zero() {
            self.balances.remove(&from);
        } else {
            self.balances.insert(from, remaining);
        }
        self.total_supply = self.total_supply.saturating_sub(amount);
        Ok(())
    }

    /// Transfer shares between holders
    pub fn transfer(&mut self, from: Address, to: Address, amount: Shares) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        if from == to {
            return Ok(());
        }

        let from_balance = self.balance_of(&from);
        if from_balance < amount {
            return Err(Error::InsufficientBalance {
                required: amount.raw(),
                available: from_balance.raw(),
            });
        }

        let remaining = from_balance.saturating_sub(amount);
        if remaining.is_zero() {
            self.balances.remove(&from);
        } else {
            self.balances.insert(from, remaining);
        }

        let to_balance = self.balance_of(&to).checked_add(amount).ok_or(Error::Overflow {
            operation: "transfer balance".into(),
        })?;
        self.balances.insert(to, to_balance);
        Ok(())
    }

    /// Verify supply invariant (total_supply == sum of all balances)
    pub fn verify_supply_invariant(&self) -> bool {
        let sum: u128 = self.balances.values().map(|b| b.raw()).sum();
        sum == self.total_supply.raw()
    }

    /// Compute a deterministic hash of the balance sheet
    pub fn state_hash(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};

        let mut data = Vec::new();
        data.extend_from_slice(&self.total_supply.raw().to_be_bytes());

        // Sort balances for deterministic hashing
        let mut sorted: Vec<_> = self.balances.iter().collect();
        sorted.sort_by_key(|(addr, _)| *addr);
        for (addr, balance) in sorted {
            data.extend_from_slice(addr.as_bytes());
            data.extend_from_slice(&balance.raw().to_be_bytes());
        }

        Sha256::digest(&data).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    #[test]
    fn test_mint() {
        let mut token = ShareToken::new();
        token.mint(alice(), Shares::from_units(1000)).unwrap();

        assert_eq!(token.balance_of(&alice()), Shares::from_units(1000));
        assert_eq!(token.total_supply(), Shares::from_units(1000));
    }

    #[test]
    fn test_burn() {
        let mut token = ShareToken::new();
        token.mint(alice(), Shares::from_units(1000)).unwrap();
        token.burn(alice(), Shares::from_units(400)).unwrap();

        assert_eq!(token.balance_of(&alice()), Shares::from_units(600));
        assert_eq!(token.total_supply(), Shares::from_units(600));
    }

    #[test]
    fn test_burn_insufficient_balance() {
        let mut token = ShareToken::new();
        token.mint(alice(), Shares::from_units(100)).unwrap();

        let result = token.burn(alice(), Shares::from_units(200));
        assert!(matches!(result, Err(Error::InsufficientBalance { .. })));
    }

    #[test]
    fn test_transfer() {
        let mut token = ShareToken::new();
        token.mint(alice(), Shares::from_units(1000)).unwrap();
        token.transfer(alice(), bob(), Shares::from_units(300)).unwrap();

        assert_eq!(token.balance_of(&alice()), Shares::from_units(700));
        assert_eq!(token.balance_of(&bob()), Shares::from_units(300));
        assert_eq!(token.total_supply(), Shares::from_units(1000));
    }

    #[test]
    fn test_supply_invariant() {
        let mut token = ShareToken::new();
        token.mint(alice(), Shares::from_units(1000)).unwrap();
        token.mint(bob(), Shares::from_units(500)).unwrap();
        token.transfer(alice(), bob(), Shares::from_units(200)).unwrap();
        token.burn(bob(), Shares::from_units(100)).unwrap();

        assert!(token.verify_supply_invariant());
    }

    #[test]
    fn test_zero_balance_holder_removed() {
        let mut token = ShareToken::new();
        token.mint(alice(), Shares::from_units(100)).unwrap();
        assert_eq!(token.holder_count(), 1);

        token.burn(alice(), Shares::from_units(100)).unwrap();
        assert_eq!(token.holder_count(), 0);
    }

    #[test]
    fn test_state_hash_deterministic() {
        let mut a = ShareToken::new();
        let mut b = ShareToken::new();
        a.mint(alice(), Shares::from_units(100)).unwrap();
        b.mint(alice(), Shares::from_units(100)).unwrap();

        assert_eq!(a.state_hash(), b.state_hash());
    }
}
