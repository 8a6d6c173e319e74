//! Peak registry and lifecycle status.
//!
//! Registered connectors live in an append-only arena: the insertion-ordered
//! address list never shrinks or relocates entries, so a peak's list index
//! stays stable for its lifetime. Only status changes after registration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::utils::ids::Address;

// ═══════════════════════════════════════════════════════════════════════════════
// PEAK STATUS
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle status of a registered connector.
///
/// Unregistered identities read as `Extinct`. `Active` and `Dormant` may
/// alternate freely; `Extinct` is an emergency stop — the admin call can
/// technically leave it, but nothing in the normal lifecycle does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PeakStatus {
    /// Terminal safety stop; also the sentinel for unregistered identities
    Extinct = 0,
    /// Fully operational: minting and redeeming allowed
    Active = 1,
    /// Winding down: redeeming allowed, minting blocked
    Dormant = 2,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PEAK REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Append-only registry of connector identities and their status
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeakRegistry {
    status: HashMap<Address, PeakStatus>,
    /// Insertion order; indices are stable external identifiers
    addresses: Vec<Address>,
}

impl PeakRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Status of an identity; unregistered reads as `Extinct`
    pub fn status(&self, peak: &Address) -> PeakStatus {
        self.status.get(peak).copied().unwrap_or(PeakStatus::Extinct)
    }

    /// True if the identity has been registered
    pub fn is_registered(&self, peak: &Address) -> bool {
        self.status.contains_key(peak)
    }

    /// Registered identities in insertion order
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Register a new identity as `Active`.
    ///
    /// Fails with `DuplicatePeak` if already present; the address list is
    /// append-only so an identity never appears twice.
    pub(crate) fn register(&mut self, peak: Address) -> Result<()> {
        if self.status.contains_key(&peak) {
            return Err(Error::DuplicatePeak(peak));
        }
        self.status.insert(peak, PeakStatus::Active);
        self.addresses.push(peak);
        Ok(())
    }

    /// Overwrite the status of a registered identity.
    ///
    /// No transition table is enforced beyond the three-value enum; callers
    /// must themselves enforce sane transitions. Unregistered identities are
    /// rejected so the status map and address list stay consistent.
    pub(crate) fn set_status(&mut self, peak: Address, status: PeakStatus) -> Result<()> {
        if !self.status.contains_key(&peak) {
            return Err(Error::PeakExtinct(peak));
        }
        self.status.insert(peak, status);
        Ok(())
    }
}
