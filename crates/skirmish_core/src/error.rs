//! # Sync Error Types
//!
//! Everything that can go wrong in the entity layer and is worth handing
//! back to the caller. Protocol misuse (a second `initialize`) and missing
//! data are not errors: they are logged or resolved with a fallback value.

use skirmish_shared::EntityAddress;
use thiserror::Error;

/// Failures reported by a simulation bridge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The simulation refused the call.
    #[error("simulation rejected {address}: {reason}")]
    Rejected {
        /// Entity the call was about.
        address: EntityAddress,
        /// What the simulation said.
        reason: String,
    },

    /// The simulation has no entity at this address.
    #[error("simulation has no entity {0}")]
    Unknown(EntityAddress),

    /// The simulation module is not loaded.
    #[error("simulation module unavailable")]
    Unavailable,
}

/// Failures loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config parsed but holds unusable values.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Any error surfaced by this crate.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Simulation bridge failure.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for bridge-facing operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Result type for crate operations.
pub type SyncResult<T> = Result<T, SyncError>;
