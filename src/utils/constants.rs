//! Protocol constants and magic numbers.
//!
//! All protocol-wide constants are defined here for easy auditing and modification.

// ═══════════════════════════════════════════════════════════════════════════════
// SCALING CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-point scale for BTC-denominated values and share balances (18 decimals)
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Share token decimals
pub const SHARE_DECIMALS: u8 = 18;

/// Decimals of 8-decimal wrapped BTC tokens (WBTC-style)
pub const WRAPPED_BTC_DECIMALS: u8 = 8;

/// Base unit of an 8-decimal wrapped BTC token
pub const WRAPPED_BTC_UNIT: u128 = 100_000_000;

// ═══════════════════════════════════════════════════════════════════════════════
// FEE CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Basis points divisor (10000 = 100%)
pub const BPS_DIVISOR: u128 = 10_000;

/// Default mint fee - 0.1% (10 basis points)
pub const DEFAULT_MINT_FEE_BPS: u128 = 10;

/// Default redeem fee - 0.1% (10 basis points)
pub const DEFAULT_REDEEM_FEE_BPS: u128 = 10;

// ═══════════════════════════════════════════════════════════════════════════════
// PRICING CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Share price before any shares exist (1.0, WAD-scaled)
pub const BOOTSTRAP_PRICE: u128 = WAD;

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTITY CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Byte length of an address identity
pub const ADDRESS_LENGTH: usize = 20;
