//! The shared ledger and its building blocks.
//!
//! - Fee configuration
//! - The `Core` ledger (share pricing, mint/redeem, fee collection)
//! - Connector registry and lifecycle status
//! - The fungible share token

pub mod config;
pub mod ledger;
pub mod registry;
pub mod token;

pub use config::FeeConfig;
pub use ledger::{Core, MintQuote, RedeemQuote, SolvencyReport};
pub use registry::{PeakRegistry, PeakStatus};
pub use token::{ShareToken, Shares};
