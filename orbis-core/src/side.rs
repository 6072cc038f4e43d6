//! # Sides - Who Owns a Unit
//!
//! Ownership travels through the simulation as a float tag in the 4th
//! channel of a unit's position (and the 2nd channel of its aggregate).
//! The two tags sit `0.001` apart, so decoding accepts anything within
//! half that gap of a tag and rejects everything else.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// Largest distance from a tag that still decodes to that tag
pub const TAG_TOLERANCE: f32 = 0.0005;

/// The two competing sides
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// Human-controlled side
    Player,
    /// AI-controlled side
    Enemy,
}

impl Side {
    /// Every side, in index order
    pub const ALL: [Side; 2] = [Side::Player, Side::Enemy];

    /// Float tag written into position.w / aggregate.y
    pub const fn tag(self) -> f32 {
        match self {
            Side::Player => 0.600,
            Side::Enemy => 0.601,
        }
    }

    /// Decode a float tag back into a side
    pub fn from_tag(tag: f32) -> Option<Side> {
        Self::ALL
            .into_iter()
            .find(|side| (tag - side.tag()).abs() < TAG_TOLERANCE)
    }

    /// Dense index, for per-side tables
    pub const fn index(self) -> usize {
        match self {
            Side::Player => 0,
            Side::Enemy => 1,
        }
    }

    /// The other side
    pub const fn opponent(self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Side::Player => "player",
            Side::Enemy => "enemy",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per side
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSide<T>([T; 2]);

impl<T> PerSide<T> {
    pub const fn new(player: T, enemy: T) -> Self {
        Self([player, enemy])
    }

    /// Iterate `(side, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (Side, &T)> {
        Side::ALL.into_iter().zip(self.0.iter())
    }
}

impl PerSide<usize> {
    /// Sum over both sides
    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }
}

impl<T> Index<Side> for PerSide<T> {
    type Output = T;

    fn index(&self, side: Side) -> &T {
        &self.0[side.index()]
    }
}

impl<T> IndexMut<Side> for PerSide<T> {
    fn index_mut(&mut self, side: Side) -> &mut T {
        &mut self.0[side.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for side in Side::ALL {
            assert_eq!(Side::from_tag(side.tag()), Some(side));
        }
    }

    #[test]
    fn test_tags_are_distinct() {
        assert_eq!(Side::from_tag(0.6004), Some(Side::Player));
        assert_eq!(Side::from_tag(0.6007), Some(Side::Enemy));
        assert_eq!(Side::from_tag(crate::ANCHOR_TAG), None);
        assert_eq!(Side::from_tag(0.0), None);
    }

    #[test]
    fn test_per_side_indexing() {
        let mut counts: PerSide<usize> = PerSide::default();
        counts[Side::Enemy] += 3;
        counts[Side::Player] += 1;
        assert_eq!(counts[Side::Enemy], 3);
        assert_eq!(counts.total(), 4);
        assert_eq!(Side::Player.opponent(), Side::Enemy);
    }
}
