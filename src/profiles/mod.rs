//! Travel-mode profiles and the contract the search engine drives them
//! through.
//!
//! A profile supplies its own search-node type (what a position "is" while
//! traveling in that mode), a hashable key grouping nodes that share cost
//! state, and an entry holding that state. The engine never inspects nodes
//! itself - resolution, expansion and costing all go through the contract.

use std::fmt::Debug;
use std::hash::Hash;
use std::str::FromStr;

use thiserror::Error;

use crate::graph::{NodeMask, RoutingGraph, WayProperties};
use crate::types::{saturate_cost, Cost, Direction, Distance, Level, NodeIdx, WayIdx};

pub mod bike;
pub mod car;
pub mod combi;
pub mod foot;
pub mod transitions;

pub use bike::BikeProfile;
pub use car::CarProfile;
pub use combi::{CombiNode, CombiProfile, ModeKind, ModeNode, ModeProfile};
pub use foot::FootProfile;
pub use transitions::Transition;

/// A queued search label: a profile node plus the cost to reach it.
#[derive(Clone, Copy, Debug)]
pub struct Label<N> {
    pub node: N,
    pub cost: Cost,
}

impl<N> Label<N> {
    #[inline]
    pub fn new(node: N, cost: Cost) -> Self {
        Self { node, cost }
    }
}

/// One feasible expansion out of a node.
#[derive(Clone, Copy, Debug)]
pub struct EdgeOut<N> {
    pub to: N,
    pub cost: Cost,
    pub dist: Distance,
    pub way: WayIdx,
    pub from_pos: u16,
    pub to_pos: u16,
}

impl<N> EdgeOut<N> {
    #[inline]
    pub fn map_node<M>(self, f: impl FnOnce(N) -> M) -> EdgeOut<M> {
        EdgeOut {
            to: f(self.to),
            cost: self.cost,
            dist: self.dist,
            way: self.way,
            from_pos: self.from_pos,
            to_pos: self.to_pos,
        }
    }
}

/// Per-key search state. Entries start unvisited (`cost` = INFEASIBLE) and
/// only ever improve; ties keep the first-found predecessor.
pub trait SearchEntry<N: Copy>: Default {
    /// Best known cost for `node`, INFEASIBLE when unvisited.
    fn cost(&self, node: N) -> Cost;

    /// Record `cost` for `node` if strictly better. Returns whether the
    /// entry improved. `pred` equal to the profile's invalid node marks a
    /// search origin.
    fn update(&mut self, label: &Label<N>, node: N, cost: Cost, pred: N) -> bool;

    /// Predecessor on the best known path, None at a search origin.
    fn pred(&self, node: N, search_dir: Direction) -> Option<N>;
}

/// The profile contract. All methods are statically dispatched; composite
/// profiles do their own runtime dispatch behind this trait.
pub trait Profile {
    type Node: Copy + Eq + Hash + Debug;
    type Key: Copy + Eq + Hash;
    type Entry: SearchEntry<Self::Node>;

    fn name(&self) -> &'static str;

    /// Cost-map key for a node. Several nodes may share one key.
    fn key(node: Self::Node) -> Self::Key;

    /// The underlying graph node.
    fn graph_node(node: Self::Node) -> NodeIdx;

    /// Slot offset of `node` inside its entry's sub-state. Profiles with a
    /// single slot per key return 0.
    fn node_offset(node: Self::Node) -> u32;

    /// Sentinel used as the "no predecessor" marker for search origins.
    fn invalid_node() -> Self::Node;

    /// Resolve a (way, node, level) anchor into the profile's search nodes
    /// for a search in `search_dir`.
    fn resolve_start_node<F: FnMut(Self::Node)>(
        &self,
        g: &RoutingGraph,
        way: WayIdx,
        node: NodeIdx,
        level: Level,
        search_dir: Direction,
        f: F,
    );

    /// Resolve a (way, node, level) anchor into the search nodes a search
    /// in `search_dir` can arrive at. For most profiles arrivals and
    /// departures coincide; composite profiles override this to resolve
    /// the chain's far end instead of its near end.
    fn resolve_dest_node<F: FnMut(Self::Node)>(
        &self,
        g: &RoutingGraph,
        way: WayIdx,
        node: NodeIdx,
        level: Level,
        search_dir: Direction,
        f: F,
    ) {
        self.resolve_start_node(g, way, node, level, search_dir, f);
    }

    /// Resolve every search node the profile defines at a graph node.
    fn resolve_all<F: FnMut(Self::Node)>(
        &self,
        g: &RoutingGraph,
        node: NodeIdx,
        level: Level,
        f: F,
    );

    /// Emit each feasible expansion of `node`. Emits nothing when `node` is
    /// blocked; infeasible edges are skipped, never emitted with a sentinel
    /// cost.
    fn adjacent<F: FnMut(EdgeOut<Self::Node>)>(
        &self,
        g: &RoutingGraph,
        node: Self::Node,
        search_dir: Direction,
        blocked: Option<&NodeMask>,
        f: F,
    );

    /// Fast rejection test for destination candidates on `way`.
    fn is_dest_reachable(
        &self,
        g: &RoutingGraph,
        node: Self::Node,
        way: WayIdx,
        way_dir: Direction,
        search_dir: Direction,
    ) -> bool;

    /// Cost of traversing `dist` meters of a way, INFEASIBLE when the way
    /// cannot be used in this mode/direction.
    fn way_cost(
        &self,
        props: WayProperties,
        way_dir: Direction,
        search_dir: Direction,
        dist: Distance,
    ) -> Cost;
}

/// Seconds to cover `dist` meters at `speed_mmps` millimeters per second.
#[inline]
pub(crate) fn travel_seconds(dist: Distance, speed_mmps: u32) -> Cost {
    saturate_cost(dist as u32 * 1000 / speed_mmps.max(1))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("unknown profile '{0}'")]
    UnknownProfile(String),

    #[error("a mode chain needs at least one profile")]
    EmptyChain,

    #[error("{profiles} chained profiles need {expected} transitions, got {got}")]
    TransitionCount {
        profiles: usize,
        expected: usize,
        got: usize,
    },
}

/// Named profile selection, the registry surface used by binaries.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SearchProfile {
    Foot,
    Wheelchair,
    Bike,
    Car,
    /// Drive, park at a parking node, continue on foot.
    CarFootParking,
}

impl SearchProfile {
    pub fn all() -> [SearchProfile; 5] {
        [
            SearchProfile::Foot,
            SearchProfile::Wheelchair,
            SearchProfile::Bike,
            SearchProfile::Car,
            SearchProfile::CarFootParking,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            SearchProfile::Foot => "foot",
            SearchProfile::Wheelchair => "wheelchair",
            SearchProfile::Bike => "bike",
            SearchProfile::Car => "car",
            SearchProfile::CarFootParking => "car-foot-parking",
        }
    }
}

impl FromStr for SearchProfile {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SearchProfile::all()
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| ProfileError::UnknownProfile(s.to_string()))
    }
}
