//! # Simulation Bridge
//!
//! The embedded simulation module runs client-side physics and prediction.
//! This layer only ever talks to it through three calls:
//!
//! ```text
//! Entity                      Simulation
//!   │── add(addr, bag) ──────────►│   once, on initialize
//!   │── set_data(addr, bag) ─────►│   zero or more, on new versions
//!   │── delete(addr) ────────────►│   once, on delete
//! ```
//!
//! Per address the order is always add, then set_data, then delete, and
//! `add` is never repeated without a `delete` in between. An entity deleted
//! before it was ever initialized still sends `delete`, so implementations
//! must accept it for an address they never saw.

use parking_lot::Mutex;
use skirmish_shared::{EntityAddress, PropertyBag};
use std::sync::Arc;

use crate::error::{BridgeError, BridgeResult};

/// Interface to the embedded simulation module.
pub trait SimulationBridge {
    /// Registers a new entity with its full property snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] if the simulation refuses the entity.
    fn add(&mut self, address: EntityAddress, data: PropertyBag) -> BridgeResult<()>;

    /// Replaces an entity's state with a newer full snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] if the simulation refuses the update.
    fn set_data(&mut self, address: EntityAddress, data: PropertyBag) -> BridgeResult<()>;

    /// Forgets an entity.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] if the simulation refuses the removal.
    fn delete(&mut self, address: EntityAddress) -> BridgeResult<()>;
}

/// Bridge handle shared by every entity.
pub type SharedBridge = Arc<Mutex<dyn SimulationBridge>>;

/// Wraps a bridge into a [`SharedBridge`], returning the typed handle too.
pub fn share<B: SimulationBridge + 'static>(bridge: B) -> (Arc<Mutex<B>>, SharedBridge) {
    let typed = Arc::new(Mutex::new(bridge));
    let shared: SharedBridge = typed.clone();
    (typed, shared)
}

// ============================================================================
// MOCK IMPLEMENTATION (For Testing)
// ============================================================================

/// One recorded bridge call.
#[derive(Clone, Debug, PartialEq)]
pub enum BridgeCall {
    /// `add`
    Add(EntityAddress, PropertyBag),
    /// `set_data`
    SetData(EntityAddress, PropertyBag),
    /// `delete`
    Delete(EntityAddress),
}

impl BridgeCall {
    /// Address the call targeted.
    #[must_use]
    pub fn address(&self) -> EntityAddress {
        match self {
            Self::Add(a, _) | Self::SetData(a, _) | Self::Delete(a) => *a,
        }
    }
}

/// Bridge that records every call instead of simulating.
#[derive(Debug, Default)]
pub struct RecordingBridge {
    calls: Vec<BridgeCall>,
    fail_next: Option<BridgeError>,
}

impl RecordingBridge {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> &[BridgeCall] {
        &self.calls
    }

    /// Calls that targeted `address`.
    #[must_use]
    pub fn calls_for(&self, address: EntityAddress) -> Vec<&BridgeCall> {
        self.calls.iter().filter(|c| c.address() == address).collect()
    }

    /// Number of `add` calls.
    #[must_use]
    pub fn add_count(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, BridgeCall::Add(..))).count()
    }

    /// Number of `set_data` calls.
    #[must_use]
    pub fn set_data_count(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, BridgeCall::SetData(..))).count()
    }

    /// Number of `delete` calls.
    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, BridgeCall::Delete(..))).count()
    }

    /// Makes the next call fail with `error` without being recorded.
    pub fn fail_next(&mut self, error: BridgeError) {
        self.fail_next = Some(error);
    }

    fn record(&mut self, call: BridgeCall) -> BridgeResult<()> {
        if let Some(err) = self.fail_next.take() {
            return Err(err);
        }
        self.calls.push(call);
        Ok(())
    }
}

impl SimulationBridge for RecordingBridge {
    fn add(&mut self, address: EntityAddress, data: PropertyBag) -> BridgeResult<()> {
        self.record(BridgeCall::Add(address, data))
    }

    fn set_data(&mut self, address: EntityAddress, data: PropertyBag) -> BridgeResult<()> {
        self.record(BridgeCall::SetData(address, data))
    }

    fn delete(&mut self, address: EntityAddress) -> BridgeResult<()> {
        self.record(BridgeCall::Delete(address))
    }
}
