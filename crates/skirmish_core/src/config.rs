//! # Configuration
//!
//! Tunables for the entity layer, loaded once at startup from TOML.
//!
//! ```toml
//! update_speed = 1.0
//! projectile_height = 0.5
//! hook_spin_rate = 15.0
//! tombstone_window_ms = 10000
//! tombstone_capacity = 4096
//! ```

use parking_lot::RwLock;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::error::ConfigError;

/// Entity layer configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Initial global simulation speed factor.
    pub update_speed: f64,
    /// Resting z of projectile meshes.
    pub projectile_height: f32,
    /// Grappling hook spin in radians per second of timestep.
    pub hook_spin_rate: f32,
    /// How long a deleted address keeps rejecting late updates.
    pub tombstone_window_ms: u64,
    /// Most deleted addresses remembered at once; oldest are forgotten first.
    pub tombstone_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            update_speed: 1.0,
            projectile_height: 0.5,
            hook_spin_rate: 15.0,
            tombstone_window_ms: 10_000,
            tombstone_capacity: 4096,
        }
    }
}

impl SyncConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`SyncConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.update_speed.is_finite() || self.update_speed < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "update_speed must be a non-negative number, got {}",
                self.update_speed
            )));
        }
        if !self.projectile_height.is_finite() {
            return Err(ConfigError::Invalid("projectile_height must be finite".into()));
        }
        if !self.hook_spin_rate.is_finite() {
            return Err(ConfigError::Invalid("hook_spin_rate must be finite".into()));
        }
        Ok(())
    }
}

/// Live, shared simulation speed factor.
///
/// Every entity and container holds a clone; changing it slows down or
/// speeds up all timesteps from the next frame on.
#[derive(Clone, Debug)]
pub struct SimSpeed(Arc<RwLock<f64>>);

impl SimSpeed {
    /// Creates a speed factor.
    #[must_use]
    pub fn new(factor: f64) -> Self {
        Self(Arc::new(RwLock::new(factor)))
    }

    /// Current factor.
    #[must_use]
    pub fn get(&self) -> f64 {
        *self.0.read()
    }

    /// Replaces the factor.
    pub fn set(&self, factor: f64) {
        *self.0.write() = factor;
    }
}

impl Default for SimSpeed {
    fn default() -> Self {
        Self::new(1.0)
    }
}
