//! # Entity Kinds
//!
//! Kind-specific behavior plugged into the shared [`Entity`] lifecycle.
//! Each kind can add readiness requirements and react when the entity gets
//! a mesh, is initialized, or is updated.
//!
//! | Kind            | Ready also needs   | Tracks position |
//! |-----------------|--------------------|-----------------|
//! | `Basic`         | -                  | yes             |
//! | `Projectile`    | owner, direction   | yes             |
//! | `GrapplingHook` | owner, direction   | yes             |
//! | `Block`         | `TYPE` byte attr   | no              |

use skirmish_shared::{Attribute, Box2, ByteAttribute, EntityAddress, Space, Vec2};

use super::{Entity, Mesh};

/// Something a kind hook wants the game layer to react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityEvent {
    /// A player-owned projectile entered the simulation.
    Fired {
        /// The projectile.
        projectile: EntityAddress,
        /// The player that fired it.
        owner: EntityAddress,
    },
}

/// Behavior variant of an entity.
#[derive(Clone, Debug, Default)]
pub enum EntityKind {
    /// No extra behavior.
    #[default]
    Basic,
    /// Something fired by an owner.
    Projectile(Projectile),
    /// A projectile trailing a rope back to its owner.
    GrapplingHook(GrapplingHook),
    /// Static level geometry.
    Block(Block),
}

impl EntityKind {
    /// Picks the behavior for entities of a server space.
    #[must_use]
    pub fn for_space(space: u32) -> Self {
        match space {
            Space::GRAPPLING_HOOK => Self::GrapplingHook(GrapplingHook::default()),
            Space::BOMB | Space::PELLET | Space::BOLT | Space::ROCKET | Space::STAR => {
                Self::Projectile(Projectile)
            }
            Space::WALL => Self::Block(Block::default()),
            _ => Self::Basic,
        }
    }

    /// Whether `update()` should copy the position into the mesh.
    #[must_use]
    pub fn tracks_position(&self) -> bool {
        !matches!(self, Self::Block(_))
    }

    pub(crate) fn ready_extra(&self, e: &Entity) -> bool {
        match self {
            Self::Basic => true,
            Self::Projectile(p) => p.ready_extra(e),
            Self::GrapplingHook(h) => h.projectile.ready_extra(e),
            Self::Block(b) => b.ready_extra(e),
        }
    }

    pub(crate) fn on_set_mesh(&mut self, e: &mut Entity) {
        match self {
            Self::Basic => {}
            Self::Projectile(p) => p.on_set_mesh(e),
            Self::GrapplingHook(h) => h.projectile.on_set_mesh(e),
            Self::Block(b) => b.on_set_mesh(e),
        }
    }

    pub(crate) fn on_initialize(&mut self, e: &mut Entity) {
        match self {
            Self::Basic | Self::Block(_) => {}
            Self::Projectile(p) => p.on_initialize(e),
            Self::GrapplingHook(h) => h.on_initialize(e),
        }
    }

    pub(crate) fn on_update(&mut self, e: &mut Entity) {
        match self {
            Self::Basic | Self::Block(_) => {}
            Self::Projectile(p) => p.on_update(e),
            Self::GrapplingHook(h) => h.on_update(e),
        }
    }
}

/// Projectile behavior: flies at a fixed height and drops when it stops.
#[derive(Clone, Copy, Debug, Default)]
pub struct Projectile;

impl Projectile {
    fn ready_extra(self, e: &Entity) -> bool {
        e.has_owner() && e.has_dir()
    }

    fn on_set_mesh(self, e: &mut Entity) {
        let height = e.services().config.projectile_height;
        if let Some(mesh) = e.mesh_mut() {
            mesh.position.z = height;
        }
    }

    fn on_initialize(self, e: &mut Entity) {
        let owner = e.owner();
        if owner.valid() && owner.space() == Space::PLAYER {
            let projectile = e.address();
            e.emit(EntityEvent::Fired { projectile, owner });
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn on_update(self, e: &mut Entity) {
        if !e.has_mesh() {
            return;
        }

        let stopped = Self::stopped(e);
        let timestep = e.timestep() as f32;
        if let Some(mesh) = e.mesh_mut() {
            if stopped {
                mesh.position.z = 0.0;
            }
            if mesh.position.z > 0.0 {
                mesh.position.z = (mesh.position.z - timestep).max(0.0);
            }
        }
    }

    /// Whether the projectile has come to rest.
    #[must_use]
    pub fn stopped(e: &Entity) -> bool {
        e.vel().length_squared() == 0.0 || e.attribute(Attribute::ATTACHED)
    }
}

/// Grappling hook behavior: a projectile that spins while in flight.
#[derive(Clone, Copy, Debug, Default)]
pub struct GrapplingHook {
    projectile: Projectile,
}

impl GrapplingHook {
    /// Wobble amplitude on x/y while spinning.
    const WOBBLE: f32 = 0.05;

    fn on_initialize(&mut self, e: &mut Entity) {
        self.projectile.on_initialize(e);

        // The hook's geometry is procedural, so it owns its placement.
        if !e.has_mesh() {
            e.install_mesh(Mesh::new());
            self.projectile.on_set_mesh(e);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn on_update(&mut self, e: &mut Entity) {
        self.projectile.on_update(e);

        if !e.has_mesh() || e.attribute(Attribute::ATTACHED) {
            return;
        }

        let sign = if e.vel().x >= 0.0 { 1.0 } else { -1.0 };
        let spin = sign * e.timestep() as f32 * e.services().config.hook_spin_rate;
        if let Some(mesh) = e.mesh_mut() {
            mesh.rotation.z -= spin;
            let factor = mesh.rotation.z.sin();
            mesh.rotation.x = factor * Self::WOBBLE;
            mesh.rotation.y = factor * Self::WOBBLE;
        }
    }
}

/// Block behavior: placed once, never follows position updates.
#[derive(Clone, Copy, Debug, Default)]
pub struct Block {
    bbox: Option<Box2>,
}

impl Block {
    /// Shrinks the block's hit box so touching edges do not count as inside.
    const BOX_BUFFER: f32 = -0.2;

    fn ready_extra(self, e: &Entity) -> bool {
        e.has_byte_attribute(ByteAttribute::TYPE)
    }

    fn on_set_mesh(&mut self, e: &mut Entity) {
        let pos = e.pos3();
        if let Some(mesh) = e.mesh_mut() {
            mesh.position = pos;
        }
        self.bbox = Some(e.bbox(Self::BOX_BUFFER));
    }

    /// Whether `point` lies inside the placed block.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        self.bbox.is_some_and(|b| b.contains_point(point))
    }

    /// Whether `other` overlaps the placed block.
    #[must_use]
    pub fn contains_entity(&self, other: &Entity) -> bool {
        match self.bbox {
            Some(b) => b.contains_point(other.pos()) || b.intersects(&other.bbox(0.0)),
            None => false,
        }
    }
}
