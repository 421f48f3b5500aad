//! # SKIRMISH Core
//!
//! Client-side entity synchronization for a networked arena game:
//! - Versioned property store that drops stale and duplicate updates
//! - Entity lifecycle mirrored into the embedded simulation module
//! - Scene container with TTL removal and deferred mesh loads
//!
//! ## Architecture Rules
//!
//! 1. **Per-property versioning** - Every property keeps its own sequence number
//! 2. **One bridge, three calls** - add, set_data, delete, in that order per address
//! 3. **Injected time** - Nothing reads the wall clock directly; see [`Services`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use skirmish_core::{bridge, EntityMap, RecordingBridge, Services, SyncConfig};
//!
//! let (_, shared) = bridge::share(RecordingBridge::new());
//! let mut map = EntityMap::new(Services::new(shared, SyncConfig::default()));
//! map.upsert(address, bag, Some(seq));
//! let report = map.tick();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod bridge;
pub mod clock;
pub mod config;
pub mod entity;
pub mod error;
pub mod map;
pub mod scene;
pub mod services;
pub mod store;

pub use bridge::{BridgeCall, RecordingBridge, SharedBridge, SimulationBridge};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{SimSpeed, SyncConfig};
pub use entity::{
    Block, Entity, EntityEvent, EntityKind, GrapplingHook, Lifecycle, Mesh, Projectile,
};
pub use error::{BridgeError, BridgeResult, ConfigError, SyncError, SyncResult};
pub use map::{EntityMap, TickReport};
pub use scene::{CustomObject, LoadStatus, LoadTrigger, MeshLoad, ObjectId, OnDelete, SceneContainer};
pub use services::Services;
pub use store::PropertyStore;
