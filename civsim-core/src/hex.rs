//! Axial hex coordinates.
//!
//! The map is a pointy-top hex grid addressed by axial `(q, r)` pairs; the
//! implicit cube coordinate is `s = -q - r`. Aerial distance is cube distance.

use serde::{Deserialize, Serialize};

/// Position of a tile on the hex grid.
///
/// Stored everywhere a tile back-reference is needed (units, cities,
/// notifications): entities hold a *position*, never a tile handle, and
/// resolve it through the owning map on demand.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub const DIRECTIONS: [HexCoord; 6] = [
        HexCoord { q: 1, r: 0 },  // East
        HexCoord { q: 1, r: -1 }, // Northeast
        HexCoord { q: 0, r: -1 }, // Northwest
        HexCoord { q: -1, r: 0 }, // West
        HexCoord { q: -1, r: 1 }, // Southwest
        HexCoord { q: 0, r: 1 },  // Southeast
    ];

    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    #[inline]
    pub const fn s(self) -> i32 {
        -self.q - self.r
    }

    /// The six adjacent coordinates, whether or not they exist on the map.
    pub fn neighbors(self) -> impl Iterator<Item = HexCoord> {
        Self::DIRECTIONS.into_iter().map(move |d| self + d)
    }

    /// Aerial (cube) distance in tiles.
    #[inline]
    pub fn distance(self, other: HexCoord) -> i32 {
        ((self.q - other.q).abs() + (self.r - other.r).abs() + (self.s() - other.s()).abs()) / 2
    }
}

impl std::ops::Add for HexCoord {
    type Output = HexCoord;

    fn add(self, other: HexCoord) -> HexCoord {
        HexCoord {
            q: self.q + other.q,
            r: self.r + other.r,
        }
    }
}

impl std::fmt::Display for HexCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.q, self.r)
    }
}
