//! Ledger events for state change notifications.
//!
//! The ledger records an event for every significant state change so clients
//! can track activity without replaying call arguments. The in-memory log is
//! bounded; embedders needing full history should drain it per call.

use serde::{Deserialize, Serialize};

use crate::core::registry::PeakStatus;
use crate::core::token::Shares;
use crate::utils::ids::Address;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All ledger event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A connector was whitelisted
    PeakWhitelisted(PeakWhitelistedEvent),
    /// A connector's status was overwritten
    PeakStatusChanged(PeakStatusChangedEvent),
    /// Shares were minted through a connector
    SharesMinted(SharesMintedEvent),
    /// Shares were redeemed through a connector
    SharesRedeemed(SharesRedeemedEvent),
    /// Pending fees were swept to the sink
    FeeCollected(FeeCollectedEvent),
    /// Fee configuration changed
    ConfigChanged(ConfigChangedEvent),
}

/// A connector was whitelisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakWhitelistedEvent {
    /// Connector identity
    pub peak: Address,
}

/// A connector's status was overwritten
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakStatusChangedEvent {
    /// Connector identity
    pub peak: Address,
    /// New status
    pub status: PeakStatus,
}

/// Shares were minted through a connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharesMintedEvent {
    /// Connector that deposited the collateral
    pub peak: Address,
    /// Recipient of the net shares
    pub account: Address,
    /// BTC-denominated value added to the system
    pub value: u128,
    /// Net shares minted to the recipient
    pub shares: Shares,
    /// Fee shares withheld
    pub fee: Shares,
}

/// Shares were redeemed through a connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharesRedeemedEvent {
    /// Connector servicing the redemption
    pub peak: Address,
    /// Holder whose shares were burned
    pub account: Address,
    /// Shares burned (gross, fee included)
    pub shares: Shares,
    /// BTC-denominated value released
    pub value: u128,
    /// Fee shares withheld
    pub fee: Shares,
}

/// Pending fees were swept to the sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCollectedEvent {
    /// Destination of the minted fee shares
    pub fee_sink: Address,
    /// Shares minted
    pub shares: Shares,
}

/// Fee configuration changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChangedEvent {
    /// New mint fee (bps)
    pub mint_fee_bps: u128,
    /// New redeem fee (bps)
    pub redeem_fee_bps: u128,
    /// New fee sink
    pub fee_sink: Address,
}
