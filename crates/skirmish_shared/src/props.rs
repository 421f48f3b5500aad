//! # Property Bags
//!
//! Entity state travels as a bag of properties keyed by [`Prop`]. Four of
//! those properties are attribute channels: nested maps from a typed
//! attribute id to a boolean, byte, int or float.
//!
//! ```text
//! PropertyBag
//! ├── POS              -> Vec2
//! ├── OWNER            -> EntityAddress
//! ├── ATTRIBUTES       -> { ATTACHED: true, ... }
//! └── INT_ATTRIBUTES   -> { COLOR: 0xff0000, ... }
//! ```
//!
//! The numeric ids are assigned by the server protocol. The entity layer
//! only cares about the role each one plays.

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::{BTreeMap, HashMap};

use crate::address::EntityAddress;
use crate::math::Vec2;

/// Per-property version counter assigned by the server.
pub type SeqNum = u32;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident { $($(#[$cmeta:meta])* $konst:ident = $val:expr,)* }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u8);

        impl $name {
            $($(#[$cmeta])* pub const $konst: Self = Self($val);)*
        }
    };
}

id_type!(
    /// Identifies one property slot on an entity.
    Prop {
        /// Terminal deletion flag set by the server.
        DELETED = 3,
        /// Boolean attribute channel.
        ATTRIBUTES = 4,
        /// Byte attribute channel.
        BYTE_ATTRIBUTES = 5,
        /// Int attribute channel.
        INT_ATTRIBUTES = 6,
        /// Float attribute channel.
        FLOAT_ATTRIBUTES = 7,
        /// Dimension.
        DIM = 8,
        /// Position.
        POS = 9,
        /// Velocity.
        VEL = 10,
        /// Acceleration.
        ACC = 11,
        /// Facing direction.
        DIR = 13,
        /// Owning entity.
        OWNER = 15,
        /// Targeted entity.
        TARGET = 16,
        /// Display name.
        NAME = 19,
        /// Explicit z of the 3D position.
        POS_Z = 20,
    }
);

id_type!(
    /// Key into the boolean attribute channel.
    Attribute {
        /// Marked for deletion.
        DELETED = 1,
        /// Solid to collisions.
        SOLID = 2,
        /// Stuck to another entity.
        ATTACHED = 4,
        /// Door or panel is opening.
        OPENING = 5,
        /// Standing on the ground.
        GROUNDED = 6,
        /// Dead.
        DEAD = 7,
    }
);

id_type!(
    /// Key into the byte attribute channel.
    ByteAttribute {
        /// Entity kind / subtype.
        TYPE = 1,
        /// Health.
        HEALTH = 2,
    }
);

id_type!(
    /// Key into the int attribute channel.
    IntAttribute {
        /// Primary color as `0xRRGGBB`.
        COLOR = 1,
        /// Secondary color as `0xRRGGBB`.
        SECONDARY_COLOR = 2,
    }
);

id_type!(
    /// Key into the float attribute channel.
    FloatAttribute {
        /// Depth of the 3D dimension.
        DIM_Z = 1,
        /// Z of the 3D position.
        POS_Z = 2,
    }
);

/// One property value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Boolean flag.
    Flag(bool),
    /// Scalar.
    Float(f32),
    /// Text.
    Text(String),
    /// 2D vector.
    Vec2(Vec2),
    /// Reference to another entity.
    Address(EntityAddress),
    /// Boolean attribute channel.
    Attributes(HashMap<Attribute, bool>),
    /// Byte attribute channel.
    ByteAttributes(HashMap<ByteAttribute, u8>),
    /// Int attribute channel.
    IntAttributes(HashMap<IntAttribute, i32>),
    /// Float attribute channel.
    FloatAttributes(HashMap<FloatAttribute, f32>),
}

impl PropertyValue {
    /// Returns the flag, if this is one.
    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the scalar, if this is one.
    #[must_use]
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the vector, if this is one.
    #[must_use]
    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            Self::Vec2(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the address, if this is one.
    #[must_use]
    pub fn as_address(&self) -> Option<EntityAddress> {
        match self {
            Self::Address(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean channel, if this is one.
    #[must_use]
    pub fn as_attributes(&self) -> Option<&HashMap<Attribute, bool>> {
        match self {
            Self::Attributes(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the byte channel, if this is one.
    #[must_use]
    pub fn as_byte_attributes(&self) -> Option<&HashMap<ByteAttribute, u8>> {
        match self {
            Self::ByteAttributes(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the int channel, if this is one.
    #[must_use]
    pub fn as_int_attributes(&self) -> Option<&HashMap<IntAttribute, i32>> {
        match self {
            Self::IntAttributes(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the float channel, if this is one.
    #[must_use]
    pub fn as_float_attributes(&self) -> Option<&HashMap<FloatAttribute, f32>> {
        match self {
            Self::FloatAttributes(v) => Some(v),
            _ => None,
        }
    }
}

/// An unordered set of property values, keyed by property id.
///
/// Bags are handed around by value: whoever receives one gets a snapshot,
/// never a view into live entity state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(BTreeMap<Prop, PropertyValue>);

impl PropertyBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, prop: Prop, value: PropertyValue) -> Self {
        self.0.insert(prop, value);
        self
    }

    /// Inserts or replaces a value, returning the old one.
    pub fn insert(&mut self, prop: Prop, value: PropertyValue) -> Option<PropertyValue> {
        self.0.insert(prop, value)
    }

    /// Removes a value.
    pub fn remove(&mut self, prop: Prop) -> Option<PropertyValue> {
        self.0.remove(&prop)
    }

    /// Looks up a value.
    #[must_use]
    pub fn get(&self, prop: Prop) -> Option<&PropertyValue> {
        self.0.get(&prop)
    }

    /// Whether the bag carries `prop`.
    #[must_use]
    pub fn contains(&self, prop: Prop) -> bool {
        self.0.contains_key(&prop)
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in property id order.
    pub fn iter(&self) -> btree_map::Iter<'_, Prop, PropertyValue> {
        self.0.iter()
    }
}

impl FromIterator<(Prop, PropertyValue)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (Prop, PropertyValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for PropertyBag {
    type Item = (Prop, PropertyValue);
    type IntoIter = btree_map::IntoIter<Prop, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PropertyBag {
    type Item = (&'a Prop, &'a PropertyValue);
    type IntoIter = btree_map::Iter<'a, Prop, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bag_builder() {
        let bag = PropertyBag::new()
            .with(Prop::POS, PropertyValue::Vec2(Vec2::new(1.0, 2.0)))
            .with(Prop::NAME, PropertyValue::Text("bird".into()));

        assert_eq!(bag.len(), 2);
        assert_eq!(bag.get(Prop::POS).and_then(PropertyValue::as_vec2), Some(Vec2::new(1.0, 2.0)));
        assert_eq!(bag.get(Prop::NAME).and_then(PropertyValue::as_text), Some("bird"));
        assert!(!bag.contains(Prop::DIM));
    }

    #[test]
    fn test_accessors_reject_other_variants() {
        let value = PropertyValue::Flag(true);
        assert_eq!(value.as_flag(), Some(true));
        assert_eq!(value.as_vec2(), None);
        assert!(value.as_int_attributes().is_none());
    }

    #[test]
    fn test_bag_iterates_in_id_order() {
        let bag: PropertyBag = [
            (Prop::VEL, PropertyValue::Vec2(Vec2::ZERO)),
            (Prop::DIM, PropertyValue::Vec2(Vec2::ZERO)),
        ]
        .into_iter()
        .collect();

        let ids: Vec<Prop> = bag.iter().map(|(p, _)| *p).collect();
        assert_eq!(ids, vec![Prop::DIM, Prop::VEL]);
    }
}
