//! # Well-Known Spaces
//!
//! Space ids assigned by the server. Addresses in different spaces never
//! collide even when their ids do.

/// Address spaces used by the game server.
pub struct Space;

impl Space {
    /// Unassigned.
    pub const UNKNOWN: u32 = 0;
    /// Players.
    pub const PLAYER: u32 = 1;
    /// Walls and level blocks.
    pub const WALL: u32 = 2;
    /// Held weapons.
    pub const WEAPON: u32 = 3;
    /// Bombs.
    pub const BOMB: u32 = 4;
    /// Pellets.
    pub const PELLET: u32 = 5;
    /// Bolts.
    pub const BOLT: u32 = 6;
    /// Rockets.
    pub const ROCKET: u32 = 7;
    /// Stars.
    pub const STAR: u32 = 8;
    /// Grappling hooks.
    pub const GRAPPLING_HOOK: u32 = 9;
    /// Explosions.
    pub const EXPLOSION: u32 = 10;
    /// Pickups.
    pub const PICKUP: u32 = 11;
}
