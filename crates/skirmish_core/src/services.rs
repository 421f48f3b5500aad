//! Collaborators handed to every entity and container.

use std::path::Path;
use std::sync::Arc;

use crate::bridge::SharedBridge;
use crate::clock::{SharedClock, SystemClock};
use crate::config::{SimSpeed, SyncConfig};
use crate::error::SyncResult;

/// Injected collaborators: simulation bridge, clock, speed factor, config.
#[derive(Clone)]
pub struct Services {
    /// Simulation bridge.
    pub bridge: SharedBridge,
    /// Frame clock.
    pub clock: SharedClock,
    /// Global speed factor.
    pub speed: SimSpeed,
    /// Static tunables.
    pub config: Arc<SyncConfig>,
}

impl Services {
    /// Builds services from a bridge and config, on the real clock.
    #[must_use]
    pub fn new(bridge: SharedBridge, config: SyncConfig) -> Self {
        Self::with_clock(bridge, Arc::new(SystemClock::new()), config)
    }

    /// Builds services from a TOML config file, on the real clock.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::Config`] if the file is unreadable or invalid.
    pub fn from_config_file(bridge: SharedBridge, path: impl AsRef<Path>) -> SyncResult<Self> {
        let config = SyncConfig::load(path)?;
        tracing::info!(?config, "loaded sync config");
        Ok(Self::new(bridge, config))
    }

    /// Builds services on an explicit clock.
    #[must_use]
    pub fn with_clock(bridge: SharedBridge, clock: SharedClock, config: SyncConfig) -> Self {
        Self {
            bridge,
            clock,
            speed: SimSpeed::new(config.update_speed),
            config: Arc::new(config),
        }
    }

    /// Current clock reading.
    #[inline]
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Converts a wall-clock delta into a scaled timestep in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn scaled_timestep(&self, delta_ms: u64) -> f64 {
        delta_ms as f64 / 1000.0 * self.speed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{share, RecordingBridge};
    use crate::clock::ManualClock;
    use crate::error::SyncError;

    #[test]
    fn test_scaled_timestep_follows_speed() {
        let (_, bridge) = share(RecordingBridge::new());
        let services = Services::with_clock(bridge, Arc::new(ManualClock::default()), SyncConfig::default());
        assert!((services.scaled_timestep(250) - 0.25).abs() < 1e-9);

        services.speed.set(0.5);
        assert!((services.scaled_timestep(250) - 0.125).abs() < 1e-9);
    }

    #[test]
    fn test_from_config_file() {
        let path = std::env::temp_dir().join(format!("skirmish_sync_{}.toml", std::process::id()));
        std::fs::write(&path, "update_speed = 2.0\nhook_spin_rate = 3.0\n").unwrap();

        let (_, bridge) = share(RecordingBridge::new());
        let services = Services::from_config_file(bridge, &path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!((services.speed.get() - 2.0).abs() < f64::EPSILON);
        assert!((services.config.hook_spin_rate - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_config_file() {
        let (_, bridge) = share(RecordingBridge::new());
        let err = Services::from_config_file(bridge, "/nonexistent/skirmish.toml").err().unwrap();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
