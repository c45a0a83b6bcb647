//! Core index and cost types shared across the graph store, profiles and
//! the search engine.

use bytemuck::{Pod, Zeroable};

/// Edge / path cost in seconds. `INFEASIBLE` is a reserved sentinel meaning
/// "no edge here" and is distinct from a legal zero cost.
pub type Cost = u16;

pub const INFEASIBLE: Cost = u16::MAX;

/// Distance along a way segment, in meters.
pub type Distance = u16;

/// Clamp a 32-bit accumulated cost into the `Cost` range, below the sentinel.
#[inline]
pub fn saturate_cost(v: u32) -> Cost {
    v.min((INFEASIBLE - 1) as u32) as Cost
}

/// Node index into the graph's node address space.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Pod, Zeroable)]
pub struct NodeIdx(pub u32);

impl NodeIdx {
    pub const INVALID: NodeIdx = NodeIdx(u32::MAX);

    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }
}

/// Way index into the graph's way address space. Never interchangeable with
/// `NodeIdx`.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Pod, Zeroable)]
pub struct WayIdx(pub u32);

impl WayIdx {
    pub const INVALID: WayIdx = WayIdx(u32::MAX);

    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }
}

/// Quantized vertical level of a node. `Level::ANY` is a query wildcard that
/// matches every node level during start resolution.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Pod, Zeroable)]
pub struct Level(pub u8);

impl Level {
    pub const GROUND: Level = Level(0);
    pub const ANY: Level = Level(u8::MAX);

    #[inline]
    pub fn matches(self, node_level: Level) -> bool {
        self == Level::ANY || self == node_level
    }
}

/// Travel direction along a way, and search direction. A backward search
/// relaxes edges against their travel orientation.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Forward = 0,
    Backward = 1,
}

impl Direction {
    #[inline]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    /// Effective travel direction along a way: a backward search traverses
    /// way segments against their nominal orientation.
    #[inline]
    pub fn effective(self, search_dir: Direction) -> Direction {
        match search_dir {
            Direction::Forward => self,
            Direction::Backward => self.opposite(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_opposite_is_involution() {
        for d in [Direction::Forward, Direction::Backward] {
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn effective_direction_flips_only_backward() {
        assert_eq!(
            Direction::Forward.effective(Direction::Forward),
            Direction::Forward
        );
        assert_eq!(
            Direction::Forward.effective(Direction::Backward),
            Direction::Backward
        );
        assert_eq!(
            Direction::Backward.effective(Direction::Backward),
            Direction::Forward
        );
    }

    #[test]
    fn cost_saturation_stays_below_sentinel() {
        assert_eq!(saturate_cost(7), 7);
        assert_eq!(saturate_cost(u32::MAX), INFEASIBLE - 1);
        assert_ne!(saturate_cost(u32::MAX), INFEASIBLE);
    }

    #[test]
    fn level_wildcard_matches_everything() {
        assert!(Level::ANY.matches(Level(3)));
        assert!(Level(3).matches(Level(3)));
        assert!(!Level(2).matches(Level(3)));
    }
}
