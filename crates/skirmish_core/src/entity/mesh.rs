//! Render placement owned by an entity.
//!
//! The renderer builds the actual geometry; the entity layer only decides
//! where it sits, how it is turned, and whether it is still in the scene.

use skirmish_shared::Vec3;

/// Placement of an entity's visual representation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    /// Scene node name, the owner's address once assigned.
    pub name: String,
    /// World position.
    pub position: Vec3,
    /// Euler rotation in radians.
    pub rotation: Vec3,
    attached: bool,
}

impl Mesh {
    /// A placement at the origin, attached to the scene.
    #[must_use]
    pub fn new() -> Self {
        Self { attached: true, ..Self::default() }
    }

    /// A placement at `position`, attached to the scene.
    #[must_use]
    pub fn at(position: Vec3) -> Self {
        Self { position, ..Self::new() }
    }

    /// Whether the node still hangs in the scene graph.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Removes the node from its parent.
    pub fn detach(&mut self) {
        self.attached = false;
    }
}
