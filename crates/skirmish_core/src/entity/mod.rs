//! # Entities
//!
//! An entity wraps a [`PropertyStore`] and keeps it in step with the
//! simulation bridge and its own render placement.
//!
//! ## Lifecycle
//!
//! ```text
//!                initialize()              delete()
//! Uninitialized ─────────────► Initialized ─────────► Deleted
//!       │                                                ▲
//!       └──────────────────── delete() ──────────────────┘
//! ```
//!
//! `initialize()` pushes the full snapshot with `add`. Each frame,
//! `snapshot_wasm()` pushes a new full snapshot with `set_data`, but only
//! when some property has a newer sequence number than the last push.
//!
//! ## Derived values
//!
//! `pos()`, `dim()`, `owner()` and friends are cached. A cache refreshes
//! only while its backing property is present; once the property goes away
//! the last value seen is returned instead of zero.

mod kind;
mod mesh;

pub use kind::{Block, EntityEvent, EntityKind, GrapplingHook, Projectile};
pub use mesh::Mesh;

use skirmish_shared::{
    Attribute, Box2, ByteAttribute, EntityAddress, FloatAttribute, IntAttribute, Prop,
    PropertyBag, PropertyValue, SeqNum, Vec2, Vec3,
};
use std::cell::Cell;
use std::collections::HashMap;

use crate::error::BridgeResult;
use crate::services::Services;
use crate::store::PropertyStore;

/// Where an entity is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed, not yet known to the simulation.
    #[default]
    Uninitialized,
    /// Pushed to the simulation.
    Initialized,
    /// Removed from the simulation and the scene. Terminal.
    Deleted,
}

/// Last value observed for each derived quantity.
#[derive(Debug, Default)]
struct DerivedCache {
    pos: Cell<Option<Vec2>>,
    pos3: Cell<Option<Vec3>>,
    dim: Cell<Option<Vec2>>,
    dim3: Cell<Option<Vec3>>,
    vel: Cell<Option<Vec2>>,
    acc: Cell<Option<Vec2>>,
    dir: Cell<Option<Vec2>>,
    owner: Cell<Option<EntityAddress>>,
    target: Cell<Option<EntityAddress>>,
}

/// Refreshes `cell` from `fresh` when present, otherwise keeps what it has.
fn refresh<T: Copy + Default>(cell: &Cell<Option<T>>, fresh: Option<T>) -> T {
    let value = fresh.or_else(|| cell.get()).unwrap_or_default();
    cell.set(Some(value));
    value
}

/// A networked game entity.
pub struct Entity {
    address: EntityAddress,
    store: PropertyStore,
    lifecycle: Lifecycle,
    kind: EntityKind,
    services: Services,
    mesh: Option<Mesh>,
    auto_update_pos: bool,
    initialize_time_ms: Option<u64>,
    last_update_ms: u64,
    timestep_ms: u64,
    wasm_last_seq: SeqNum,
    cache: DerivedCache,
    events: Vec<EntityEvent>,
}

impl Entity {
    /// Creates an uninitialized entity.
    #[must_use]
    pub fn new(address: EntityAddress, kind: EntityKind, services: Services) -> Self {
        let auto_update_pos = kind.tracks_position();
        let now = services.now_ms();
        Self {
            address,
            store: PropertyStore::new(),
            lifecycle: Lifecycle::Uninitialized,
            kind,
            services,
            mesh: None,
            auto_update_pos,
            initialize_time_ms: None,
            last_update_ms: now,
            timestep_ms: 0,
            wasm_last_seq: 0,
            cache: DerivedCache::default(),
            events: Vec::new(),
        }
    }

    /// Address of this entity.
    #[inline]
    #[must_use]
    pub fn address(&self) -> EntityAddress {
        self.address
    }

    /// Space part of the address.
    #[inline]
    #[must_use]
    pub fn space(&self) -> u32 {
        self.address.space()
    }

    /// Id part of the address.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.address.id()
    }

    /// Kind-specific behavior.
    #[must_use]
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// Injected collaborators.
    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Backing property store.
    #[must_use]
    pub fn store(&self) -> &PropertyStore {
        &self.store
    }

    /// Snapshot of every present property.
    #[must_use]
    pub fn data(&self) -> PropertyBag {
        self.store.data()
    }

    /// Highest sequence number accepted so far.
    #[must_use]
    pub fn last_seq_num(&self) -> SeqNum {
        self.store.last_seq_num()
    }

    /// Sequence number `prop` was last applied at.
    #[must_use]
    pub fn seq_num(&self, prop: Prop) -> SeqNum {
        self.store.seq_num(prop)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Whether the simulation has been told about this entity.
    #[must_use]
    pub fn initialized(&self) -> bool {
        self.lifecycle == Lifecycle::Initialized
    }

    /// Whether this entity is gone or marked for deletion by the server.
    #[must_use]
    pub fn deleted(&self) -> bool {
        self.lifecycle == Lifecycle::Deleted
            || self.store.get(Prop::DELETED).and_then(PropertyValue::as_flag) == Some(true)
            || self.attribute(Attribute::DELETED)
    }

    /// Clock reading at initialization.
    #[must_use]
    pub fn initialize_time(&self) -> Option<u64> {
        self.initialize_time_ms
    }

    /// Seconds between the last two updates, scaled by the speed factor.
    #[must_use]
    pub fn timestep(&self) -> f64 {
        self.services.scaled_timestep(self.timestep_ms)
    }

    /// Whether enough is known to build visuals.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.has_pos() && self.has_dim() && self.kind.ready_extra(self)
    }

    /// Pushes the full snapshot to the simulation.
    ///
    /// A second call, or a call after deletion, is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns the bridge's error; the entity then stays uninitialized.
    pub fn initialize(&mut self) -> BridgeResult<()> {
        match self.lifecycle {
            Lifecycle::Initialized => {
                tracing::error!(address = %self.address, "double initialization of entity");
                return Ok(());
            }
            Lifecycle::Deleted => {
                tracing::error!(address = %self.address, "initialize called on deleted entity");
                return Ok(());
            }
            Lifecycle::Uninitialized => {}
        }

        self.services.bridge.lock().add(self.address, self.store.data())?;
        self.wasm_last_seq = self.store.last_seq_num();
        self.lifecycle = Lifecycle::Initialized;
        self.initialize_time_ms = Some(self.services.now_ms());
        tracing::debug!(address = %self.address, seq = self.wasm_last_seq, "entity initialized");

        self.with_kind(|kind, e| kind.on_initialize(e));
        Ok(())
    }

    /// Merges network or local data. Returns how many properties applied.
    ///
    /// Local writes (`seq` of `None`) do not advance [`Entity::last_seq_num`],
    /// so they reach the simulation only with the next snapshot triggered by
    /// a newer network update.
    pub fn set_data(&mut self, bag: PropertyBag, seq: Option<SeqNum>) -> usize {
        self.store.set_data(bag, seq)
    }

    /// Drops a property locally.
    pub fn remove_prop(&mut self, prop: Prop) -> Option<PropertyValue> {
        self.store.remove(prop)
    }

    /// Pushes a fresh snapshot to the simulation if anything newer arrived
    /// since the last push. Returns whether a push happened.
    ///
    /// # Errors
    ///
    /// Returns the bridge's error; the watermark is not advanced.
    pub fn snapshot_wasm(&mut self) -> BridgeResult<bool> {
        if self.lifecycle != Lifecycle::Initialized {
            return Ok(false);
        }
        let last = self.store.last_seq_num();
        if last <= self.wasm_last_seq {
            return Ok(false);
        }

        self.services.bridge.lock().set_data(self.address, self.store.data())?;
        self.wasm_last_seq = last;
        tracing::trace!(address = %self.address, seq = last, "pushed snapshot");
        Ok(true)
    }

    /// Per-frame refresh of timestep and render placement.
    pub fn update(&mut self) {
        if self.mesh.is_some() && self.has_pos() {
            if self.auto_update_pos {
                let pos = self.pos3();
                let has_z = self.has_pos_z();
                if let Some(mesh) = self.mesh.as_mut() {
                    mesh.position.x = pos.x;
                    mesh.position.y = pos.y;
                    if has_z {
                        mesh.position.z = pos.z;
                    }
                }
            }

            let now = self.services.now_ms();
            self.timestep_ms = now.saturating_sub(self.last_update_ms);
            self.last_update_ms = now;
        }

        self.with_kind(|kind, e| kind.on_update(e));
    }

    /// Removes the entity from the simulation and the scene.
    ///
    /// The simulation is told even if the entity was never initialized; a
    /// bridge must accept deletes for addresses it never saw. Deleting twice
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the bridge's error; the entity then stays alive.
    pub fn delete(&mut self) -> BridgeResult<()> {
        if self.lifecycle == Lifecycle::Deleted {
            return Ok(());
        }
        self.services.bridge.lock().delete(self.address)?;

        if let Some(mesh) = self.mesh.as_mut() {
            mesh.detach();
        }
        self.lifecycle = Lifecycle::Deleted;
        tracing::debug!(address = %self.address, "entity deleted");
        Ok(())
    }

    /// Drains events raised by kind hooks.
    pub fn take_events(&mut self) -> Vec<EntityEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: EntityEvent) {
        self.events.push(event);
    }

    fn with_kind<R>(&mut self, f: impl FnOnce(&mut EntityKind, &mut Self) -> R) -> R {
        let mut kind = std::mem::take(&mut self.kind);
        let out = f(&mut kind, self);
        self.kind = kind;
        out
    }

    // ------------------------------------------------------------------
    // Render placement
    // ------------------------------------------------------------------

    /// Hands the entity its render placement.
    pub fn set_mesh(&mut self, mesh: Mesh) {
        self.install_mesh(mesh);
        self.with_kind(|kind, e| kind.on_set_mesh(e));
    }

    fn install_mesh(&mut self, mut mesh: Mesh) {
        if self.has_pos() && self.auto_update_pos {
            let pos = self.pos();
            mesh.position.x = pos.x;
            mesh.position.y = pos.y;
        }
        mesh.name = self.address.to_string();
        self.mesh = Some(mesh);
    }

    /// Whether a placement exists.
    #[must_use]
    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    /// Render placement.
    #[must_use]
    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    /// Mutable render placement.
    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        self.mesh.as_mut()
    }

    /// Whether `update()` copies the position into the mesh.
    #[must_use]
    pub fn auto_update_pos(&self) -> bool {
        self.auto_update_pos
    }

    /// Stops `update()` from moving the mesh.
    pub fn disable_auto_update_pos(&mut self) {
        self.auto_update_pos = false;
    }

    /// Box around `pos()` with half extents `dim() / 2 + buffer`.
    #[must_use]
    pub fn bbox(&self, buffer: f32) -> Box2 {
        let half = self.dim() * 0.5 + Vec2::new(buffer, buffer);
        Box2::from_center(self.pos(), half)
    }

    /// Label text and `#RRGGBB` color for name tags.
    #[must_use]
    pub fn special_name(&self) -> (String, String) {
        let text = if self.has_name() { self.name() } else { self.address.to_string() };
        let color = if self.has_color() {
            format!("#{:06X}", self.color() & 0x00FF_FFFF)
        } else {
            "#FFFFFF".to_string()
        };
        (text, color)
    }

    // ------------------------------------------------------------------
    // Attribute channels
    // ------------------------------------------------------------------

    /// Whole boolean channel, empty if absent.
    #[must_use]
    pub fn attributes(&self) -> HashMap<Attribute, bool> {
        self.store
            .get(Prop::ATTRIBUTES)
            .and_then(PropertyValue::as_attributes)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether the boolean channel holds `id`.
    #[must_use]
    pub fn has_attribute(&self, id: Attribute) -> bool {
        self.store
            .get(Prop::ATTRIBUTES)
            .and_then(PropertyValue::as_attributes)
            .is_some_and(|c| c.contains_key(&id))
    }

    /// Boolean attribute, `false` if the channel or the id is absent.
    #[must_use]
    pub fn attribute(&self, id: Attribute) -> bool {
        match self.store.get(Prop::ATTRIBUTES).and_then(PropertyValue::as_attributes) {
            Some(channel) => channel.get(&id).copied().unwrap_or(false),
            None => false,
        }
    }

    /// Whole byte channel, empty if absent.
    #[must_use]
    pub fn byte_attributes(&self) -> HashMap<ByteAttribute, u8> {
        self.store
            .get(Prop::BYTE_ATTRIBUTES)
            .and_then(PropertyValue::as_byte_attributes)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether the byte channel holds `id`.
    #[must_use]
    pub fn has_byte_attribute(&self, id: ByteAttribute) -> bool {
        self.store
            .get(Prop::BYTE_ATTRIBUTES)
            .and_then(PropertyValue::as_byte_attributes)
            .is_some_and(|c| c.contains_key(&id))
    }

    /// Byte attribute, `0` if the channel or the id is absent.
    #[must_use]
    pub fn byte_attribute(&self, id: ByteAttribute) -> u8 {
        match self.store.get(Prop::BYTE_ATTRIBUTES).and_then(PropertyValue::as_byte_attributes) {
            Some(channel) => channel.get(&id).copied().unwrap_or(0),
            None => 0,
        }
    }

    /// Whole int channel, empty if absent.
    #[must_use]
    pub fn int_attributes(&self) -> HashMap<IntAttribute, i32> {
        self.store
            .get(Prop::INT_ATTRIBUTES)
            .and_then(PropertyValue::as_int_attributes)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether the int channel holds `id`.
    #[must_use]
    pub fn has_int_attribute(&self, id: IntAttribute) -> bool {
        self.store
            .get(Prop::INT_ATTRIBUTES)
            .and_then(PropertyValue::as_int_attributes)
            .is_some_and(|c| c.contains_key(&id))
    }

    /// Int attribute, `0` if the channel or the id is absent.
    #[must_use]
    pub fn int_attribute(&self, id: IntAttribute) -> i32 {
        match self.store.get(Prop::INT_ATTRIBUTES).and_then(PropertyValue::as_int_attributes) {
            Some(channel) => channel.get(&id).copied().unwrap_or(0),
            None => 0,
        }
    }

    /// Whole float channel, empty if absent.
    #[must_use]
    pub fn float_attributes(&self) -> HashMap<FloatAttribute, f32> {
        self.store
            .get(Prop::FLOAT_ATTRIBUTES)
            .and_then(PropertyValue::as_float_attributes)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether the float channel holds `id`.
    #[must_use]
    pub fn has_float_attribute(&self, id: FloatAttribute) -> bool {
        self.store
            .get(Prop::FLOAT_ATTRIBUTES)
            .and_then(PropertyValue::as_float_attributes)
            .is_some_and(|c| c.contains_key(&id))
    }

    /// Float attribute, `0.0` if the channel or the id is absent.
    #[must_use]
    pub fn float_attribute(&self, id: FloatAttribute) -> f32 {
        match self.store.get(Prop::FLOAT_ATTRIBUTES).and_then(PropertyValue::as_float_attributes) {
            Some(channel) => channel.get(&id).copied().unwrap_or(0.0),
            None => 0.0,
        }
    }

    /// Whether a primary color is set.
    #[must_use]
    pub fn has_color(&self) -> bool {
        self.has_int_attribute(IntAttribute::COLOR)
    }

    /// Primary color as `0xRRGGBB`.
    #[must_use]
    pub fn color(&self) -> i32 {
        self.int_attribute(IntAttribute::COLOR)
    }

    /// Whether a secondary color is set.
    #[must_use]
    pub fn has_secondary_color(&self) -> bool {
        self.has_int_attribute(IntAttribute::SECONDARY_COLOR)
    }

    /// Secondary color as `0xRRGGBB`.
    #[must_use]
    pub fn secondary_color(&self) -> i32 {
        self.int_attribute(IntAttribute::SECONDARY_COLOR)
    }

    /// Whether a depth is set.
    #[must_use]
    pub fn has_dim_z(&self) -> bool {
        self.has_float_attribute(FloatAttribute::DIM_Z)
    }

    /// Depth of the 3D dimension.
    #[must_use]
    pub fn dim_z(&self) -> f32 {
        self.float_attribute(FloatAttribute::DIM_Z)
    }

    /// Whether an explicit z position is known.
    #[must_use]
    pub fn has_pos_z(&self) -> bool {
        self.store.has(Prop::POS_Z) || self.has_float_attribute(FloatAttribute::POS_Z)
    }

    /// Explicit z position, preferring the property over the attribute.
    #[must_use]
    pub fn pos_z(&self) -> f32 {
        self.store
            .get(Prop::POS_Z)
            .and_then(PropertyValue::as_float)
            .unwrap_or_else(|| self.float_attribute(FloatAttribute::POS_Z))
    }

    /// Whether a display name is set.
    #[must_use]
    pub fn has_name(&self) -> bool {
        self.store.has(Prop::NAME)
    }

    /// Display name, empty if unset.
    #[must_use]
    pub fn name(&self) -> String {
        self.store
            .get(Prop::NAME)
            .and_then(PropertyValue::as_text)
            .unwrap_or_default()
            .to_string()
    }

    // ------------------------------------------------------------------
    // Derived vectors
    // ------------------------------------------------------------------

    fn vec2_prop(&self, prop: Prop) -> Option<Vec2> {
        self.store.get(prop).and_then(PropertyValue::as_vec2)
    }

    fn address_prop(&self, prop: Prop) -> Option<EntityAddress> {
        self.store.get(prop).and_then(PropertyValue::as_address)
    }

    /// Whether a position is present.
    #[must_use]
    pub fn has_pos(&self) -> bool {
        self.store.has(Prop::POS)
    }

    /// Position, or the last one seen.
    #[must_use]
    pub fn pos(&self) -> Vec2 {
        refresh(&self.cache.pos, self.vec2_prop(Prop::POS))
    }

    /// 3D position. Z comes from the explicit z, else the mesh, else 0.
    #[must_use]
    pub fn pos3(&self) -> Vec3 {
        let fresh = self.vec2_prop(Prop::POS).map(|p| {
            let z = if self.has_pos_z() {
                self.pos_z()
            } else {
                self.mesh.as_ref().map_or(0.0, |m| m.position.z)
            };
            p.extend(z)
        });
        refresh(&self.cache.pos3, fresh)
    }

    /// Whether a dimension is present.
    #[must_use]
    pub fn has_dim(&self) -> bool {
        self.store.has(Prop::DIM)
    }

    /// Dimension, or the last one seen.
    #[must_use]
    pub fn dim(&self) -> Vec2 {
        refresh(&self.cache.dim, self.vec2_prop(Prop::DIM))
    }

    /// 3D dimension with depth from the float channel.
    #[must_use]
    pub fn dim3(&self) -> Vec3 {
        let fresh = self.vec2_prop(Prop::DIM).map(|d| d.extend(self.dim_z()));
        refresh(&self.cache.dim3, fresh)
    }

    /// Whether a velocity is present.
    #[must_use]
    pub fn has_vel(&self) -> bool {
        self.store.has(Prop::VEL)
    }

    /// Velocity, or the last one seen.
    #[must_use]
    pub fn vel(&self) -> Vec2 {
        refresh(&self.cache.vel, self.vec2_prop(Prop::VEL))
    }

    /// Whether an acceleration is present.
    #[must_use]
    pub fn has_acc(&self) -> bool {
        self.store.has(Prop::ACC)
    }

    /// Acceleration, or the last one seen.
    #[must_use]
    pub fn acc(&self) -> Vec2 {
        refresh(&self.cache.acc, self.vec2_prop(Prop::ACC))
    }

    /// Whether a direction is present.
    #[must_use]
    pub fn has_dir(&self) -> bool {
        self.store.has(Prop::DIR)
    }

    /// Direction, or the last one seen.
    #[must_use]
    pub fn dir(&self) -> Vec2 {
        refresh(&self.cache.dir, self.vec2_prop(Prop::DIR))
    }

    /// Whether an owner is present.
    #[must_use]
    pub fn has_owner(&self) -> bool {
        self.store.has(Prop::OWNER)
    }

    /// Owner address, or the last one seen, or [`EntityAddress::NONE`].
    #[must_use]
    pub fn owner(&self) -> EntityAddress {
        refresh(&self.cache.owner, self.address_prop(Prop::OWNER))
    }

    /// Whether a target is present.
    #[must_use]
    pub fn has_target(&self) -> bool {
        self.store.has(Prop::TARGET)
    }

    /// Target address, or the last one seen, or [`EntityAddress::NONE`].
    #[must_use]
    pub fn target(&self) -> EntityAddress {
        refresh(&self.cache.target, self.address_prop(Prop::TARGET))
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("address", &self.address)
            .field("lifecycle", &self.lifecycle)
            .field("kind", &self.kind)
            .field("last_seq", &self.store.last_seq_num())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
