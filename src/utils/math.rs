//! Checked integer arithmetic for WAD-scaled value math.
//!
//! All ledger math runs on u128 with explicit overflow and division-by-zero
//! errors. Division always truncates toward zero; the one place the protocol
//! rounds up (vault shortfall sourcing) uses [`mul_div_up`] explicitly.

use crate::error::{Error, Result};
use crate::utils::constants::{BPS_DIVISOR, WAD};

// ═══════════════════════════════════════════════════════════════════════════════
// SAFE ARITHMETIC OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(Error::Overflow {
        operation: format!("{} + {}", a, b),
    })
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b).ok_or(Error::Underflow {
        operation: format!("{} - {}", a, b),
    })
}

/// Safe multiplication then division, truncating toward zero.
///
/// The intermediate product is checked; WAD-scaled operands up to roughly
/// 3e20 (300 BTC of value against a WAD rate) stay well inside u128.
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }
    let product = a.checked_mul(b).ok_or(Error::Overflow {
        operation: format!("{} * {}", a, b),
    })?;
    Ok(product / c)
}

/// Safe multiplication then division, rounding up
pub fn mul_div_up(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }
    let product = a.checked_mul(b).ok_or(Error::Overflow {
        operation: format!("{} * {}", a, b),
    })?;
    Ok(product / c + u128::from(product % c != 0))
}

// ═══════════════════════════════════════════════════════════════════════════════
// FEE MATH
// ═══════════════════════════════════════════════════════════════════════════════

/// Fee taken on `amount` at `fee_bps` basis points, truncated
pub fn fee_bps(amount: u128, fee_bps: u128) -> Result<u128> {
    mul_div(amount, fee_bps, BPS_DIVISOR)
}

/// `amount` scaled by the inverse fee factor `(BPS_DIVISOR - fee_bps)`.
///
/// Mathematically `amount - fee_bps(amount)` up to one unit of truncation;
/// connectors that retain fees locally quote with this factor.
pub fn apply_fee_factor(amount: u128, fee: u128) -> Result<u128> {
    if fee > BPS_DIVISOR {
        return Err(Error::InvalidParameter {
            name: "fee_bps".into(),
            reason: format!("{} exceeds {}", fee, BPS_DIVISOR),
        });
    }
    mul_div(amount, BPS_DIVISOR - fee, BPS_DIVISOR)
}

// ═══════════════════════════════════════════════════════════════════════════════
// RATE CONVERSIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Convert a token amount to value through a WAD-scaled rate, truncating
pub fn value_at_rate(amount: u128, rate: u128) -> Result<u128> {
    mul_div(amount, rate, WAD)
}

/// Convert a value back to a token amount through a WAD-scaled rate, truncating
pub fn amount_at_rate(value: u128, rate: u128) -> Result<u128> {
    mul_div(value, WAD, rate)
}

/// Compose two WAD-scaled rates into one (e.g. vault share -> LP -> BTC)
pub fn compose_rates(outer: u128, inner: u128) -> Result<u128> {
    mul_div(outer, inner, WAD)
}
