//! # ibBTC Ledger
//!
//! A multi-collateral, Bitcoin-denominated share ledger. Depositors bring
//! yield-bearing BTC collateral through connectors ("peaks"); the ledger
//! values every deposit in BTC and issues a single fungible share token,
//! ibBTC, whose price per full share grows as the collateral earns yield.
//!
//! ## Architecture
//!
//! - **Core**: share token, connector registry, fee configuration and the
//!   mint/redeem ledger itself
//! - **Peaks**: one connector per collateral family (vaulted LP, naked LP
//!   with an idle reserve, wrapped BTC vault tokens)
//! - **Host**: the seam to the external world of token balances, swap
//!   oracles and vault wrappers
//!
//! ## Example
//!
//! ```rust,ignore
//! use ibtc::prelude::*;
//!
//! let mut core = Core::new(admin);
//! let mut peak = SettPeak::new(peak_id, admin);
//! core.whitelist_peak(admin, &peak)?;
//!
//! // Deposit vaulted LP collateral, receive ibBTC shares
//! let minted = peak.mint(&mut core, &mut host, depositor, pool_id, amount)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod core;
pub mod error;
pub mod events;
pub mod host;
pub mod peaks;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        Core, FeeConfig, MintQuote, PeakRegistry, PeakStatus, RedeemQuote, ShareToken, Shares,
        SolvencyReport,
    };
    pub use crate::error::{Error, Result};
    pub use crate::host::{CollateralHost, InMemoryHost};
    pub use crate::peaks::{
        CurvePeak, OraclePolicy, Peak, PeakKind, PoolEntry, RedeemEstimate, SettPeak,
        WrappedBtcPeak,
    };
    pub use crate::utils::ids::Address;
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Ticker of the share token
pub const TOKEN_SYMBOL: &str = "ibBTC";
