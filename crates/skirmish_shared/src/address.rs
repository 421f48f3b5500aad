//! # Entity Addressing
//!
//! Entities are identified by a `(space, id)` pair. Ids are only unique
//! within their space, so the pair is the identity.
//!
//! `(0, 0)` is the "no address" sentinel. Validity only looks at the id:
//! space 0 with a non-zero id is still a valid address.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifies an entity within a partitioned id space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityAddress {
    space: u32,
    id: u32,
}

impl EntityAddress {
    /// The invalid / "no reference" address.
    pub const NONE: Self = Self::new(0, 0);

    /// Creates an address.
    #[inline]
    #[must_use]
    pub const fn new(space: u32, id: u32) -> Self {
        Self { space, id }
    }

    /// Returns the space.
    #[inline]
    #[must_use]
    pub const fn space(self) -> u32 {
        self.space
    }

    /// Returns the id within the space.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u32 {
        self.id
    }

    /// Replaces the space.
    #[inline]
    pub fn set_space(&mut self, space: u32) {
        self.space = space;
    }

    /// Replaces the id.
    #[inline]
    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    /// Whether this refers to an entity at all.
    #[inline]
    #[must_use]
    pub const fn valid(self) -> bool {
        self.id != 0
    }
}

impl fmt::Display for EntityAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.space, self.id)
    }
}

/// Failure to parse the `"space:id"` form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed entity address: {0:?}")]
pub struct AddressParseError(pub String);

impl FromStr for EntityAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || AddressParseError(s.to_string());
        let (space, id) = s.split_once(':').ok_or_else(err)?;
        let space = space.trim().parse().map_err(|_| err())?;
        let id = id.trim().parse().map_err(|_| err())?;
        Ok(Self::new(space, id))
    }
}
