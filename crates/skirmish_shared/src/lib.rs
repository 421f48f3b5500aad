//! # SKIRMISH Shared
//!
//! Plain data shared by the network decoder and the client entity layer.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - the renderer
//! - the embedded simulation module
//! - any clock or I/O
//!
//! If you need behavior, put it in `skirmish_core`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod address;
pub mod constants;
pub mod math;
pub mod props;

pub use address::{AddressParseError, EntityAddress};
pub use constants::Space;
pub use math::{Box2, Vec2, Vec3};
pub use props::{
    Attribute, ByteAttribute, FloatAttribute, IntAttribute, Prop, PropertyBag, PropertyValue,
    SeqNum,
};
