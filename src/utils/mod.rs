//! Shared utilities: constants, checked math, identities.

pub mod constants;
pub mod ids;
pub mod math;

pub use ids::Address;
