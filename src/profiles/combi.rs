//! Composite profile: a chain of single-mode profiles joined by transition
//! predicates. A label travels inside one submode until a feasible
//! transition lets it cross to the neighboring chain slot (next slot when
//! searching forward, previous when backward).
//!
//! Dispatch is a runtime tagged union: every node/key/entry carries its
//! mode variant and the submode discriminant indexes the chain. Driving a
//! node through a profile of another mode is a wiring bug and panics.

use super::bike::{BikeEntry, BikeNode, BikeProfile};
use super::car::{CarEntry, CarNode, CarProfile};
use super::foot::{FootEntry, FootNode, FootProfile};
use super::transitions::Transition;
use super::{EdgeOut, Label, Profile, ProfileError, SearchEntry};
use crate::graph::{NodeMask, RoutingGraph, WayProperties};
use crate::types::{saturate_cost, Cost, Direction, Distance, Level, NodeIdx, WayIdx, INFEASIBLE};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ModeKind {
    Foot,
    Bike,
    Car,
}

/// One chain slot: a configured single-mode profile.
#[derive(Clone, Copy, Debug)]
pub enum ModeProfile {
    Foot(FootProfile),
    Bike(BikeProfile),
    Car(CarProfile),
}

/// A search node of any single mode.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ModeNode {
    Foot(FootNode),
    Bike(BikeNode),
    Car(CarNode),
}

/// A cost-map key of any single mode.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ModeKey {
    Foot(FootNode),
    Bike(BikeNode),
    Car(NodeIdx),
}

/// Search state of any single mode.
#[derive(Clone, Debug)]
pub enum ModeEntry {
    Foot(FootEntry),
    Bike(BikeEntry),
    Car(CarEntry),
}

fn mode_mismatch(what: &str, node: ModeNode) -> ! {
    panic!("{what} cannot drive a {node:?}")
}

impl ModeNode {
    #[inline]
    pub fn kind(self) -> ModeKind {
        match self {
            ModeNode::Foot(_) => ModeKind::Foot,
            ModeNode::Bike(_) => ModeKind::Bike,
            ModeNode::Car(_) => ModeKind::Car,
        }
    }

    #[inline]
    pub fn graph_node(self) -> NodeIdx {
        match self {
            ModeNode::Foot(n) => n.n,
            ModeNode::Bike(n) => n.n,
            ModeNode::Car(n) => n.n,
        }
    }

    #[inline]
    fn key(self) -> ModeKey {
        match self {
            ModeNode::Foot(n) => ModeKey::Foot(n),
            ModeNode::Bike(n) => ModeKey::Bike(n),
            ModeNode::Car(n) => ModeKey::Car(n.n),
        }
    }

    /// Slot offset inside the mode's entry.
    #[inline]
    fn offset(self) -> u32 {
        match self {
            ModeNode::Foot(_) | ModeNode::Bike(_) => 0,
            ModeNode::Car(n) => n.offset(),
        }
    }

    /// The mode's own invalid sentinel, used to seed virtual starts.
    fn invalid_of_same_mode(self) -> ModeNode {
        match self {
            ModeNode::Foot(_) => ModeNode::Foot(FootNode::INVALID),
            ModeNode::Bike(_) => ModeNode::Bike(BikeNode::INVALID),
            ModeNode::Car(_) => ModeNode::Car(CarNode::INVALID),
        }
    }
}

impl ModeProfile {
    #[inline]
    pub fn kind(&self) -> ModeKind {
        match self {
            ModeProfile::Foot(_) => ModeKind::Foot,
            ModeProfile::Bike(_) => ModeKind::Bike,
            ModeProfile::Car(_) => ModeKind::Car,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModeProfile::Foot(p) => p.name(),
            ModeProfile::Bike(p) => p.name(),
            ModeProfile::Car(p) => p.name(),
        }
    }

    pub fn resolve_start_node<F: FnMut(ModeNode)>(
        &self,
        g: &RoutingGraph,
        way: WayIdx,
        node: NodeIdx,
        level: Level,
        search_dir: Direction,
        mut f: F,
    ) {
        match self {
            ModeProfile::Foot(p) => {
                p.resolve_start_node(g, way, node, level, search_dir, |n| f(ModeNode::Foot(n)))
            }
            ModeProfile::Bike(p) => {
                p.resolve_start_node(g, way, node, level, search_dir, |n| f(ModeNode::Bike(n)))
            }
            ModeProfile::Car(p) => {
                p.resolve_start_node(g, way, node, level, search_dir, |n| f(ModeNode::Car(n)))
            }
        }
    }

    pub fn resolve_dest_node<F: FnMut(ModeNode)>(
        &self,
        g: &RoutingGraph,
        way: WayIdx,
        node: NodeIdx,
        level: Level,
        search_dir: Direction,
        mut f: F,
    ) {
        match self {
            ModeProfile::Foot(p) => {
                p.resolve_dest_node(g, way, node, level, search_dir, |n| f(ModeNode::Foot(n)))
            }
            ModeProfile::Bike(p) => {
                p.resolve_dest_node(g, way, node, level, search_dir, |n| f(ModeNode::Bike(n)))
            }
            ModeProfile::Car(p) => {
                p.resolve_dest_node(g, way, node, level, search_dir, |n| f(ModeNode::Car(n)))
            }
        }
    }

    pub fn resolve_all<F: FnMut(ModeNode)>(
        &self,
        g: &RoutingGraph,
        node: NodeIdx,
        level: Level,
        mut f: F,
    ) {
        match self {
            ModeProfile::Foot(p) => p.resolve_all(g, node, level, |n| f(ModeNode::Foot(n))),
            ModeProfile::Bike(p) => p.resolve_all(g, node, level, |n| f(ModeNode::Bike(n))),
            ModeProfile::Car(p) => p.resolve_all(g, node, level, |n| f(ModeNode::Car(n))),
        }
    }

    pub fn adjacent<F: FnMut(EdgeOut<ModeNode>)>(
        &self,
        g: &RoutingGraph,
        node: ModeNode,
        search_dir: Direction,
        blocked: Option<&NodeMask>,
        mut f: F,
    ) {
        match (self, node) {
            (ModeProfile::Foot(p), ModeNode::Foot(n)) => {
                p.adjacent(g, n, search_dir, blocked, |e| f(e.map_node(ModeNode::Foot)))
            }
            (ModeProfile::Bike(p), ModeNode::Bike(n)) => {
                p.adjacent(g, n, search_dir, blocked, |e| f(e.map_node(ModeNode::Bike)))
            }
            (ModeProfile::Car(p), ModeNode::Car(n)) => {
                p.adjacent(g, n, search_dir, blocked, |e| f(e.map_node(ModeNode::Car)))
            }
            (p, n) => mode_mismatch(p.name(), n),
        }
    }

    pub fn is_dest_reachable(
        &self,
        g: &RoutingGraph,
        node: ModeNode,
        way: WayIdx,
        way_dir: Direction,
        search_dir: Direction,
    ) -> bool {
        match (self, node) {
            (ModeProfile::Foot(p), ModeNode::Foot(n)) => {
                p.is_dest_reachable(g, n, way, way_dir, search_dir)
            }
            (ModeProfile::Bike(p), ModeNode::Bike(n)) => {
                p.is_dest_reachable(g, n, way, way_dir, search_dir)
            }
            (ModeProfile::Car(p), ModeNode::Car(n)) => {
                p.is_dest_reachable(g, n, way, way_dir, search_dir)
            }
            (p, n) => mode_mismatch(p.name(), n),
        }
    }

    pub fn way_cost(
        &self,
        props: WayProperties,
        way_dir: Direction,
        search_dir: Direction,
        dist: Distance,
    ) -> Cost {
        match self {
            ModeProfile::Foot(p) => p.way_cost(props, way_dir, search_dir, dist),
            ModeProfile::Bike(p) => p.way_cost(props, way_dir, search_dir, dist),
            ModeProfile::Car(p) => p.way_cost(props, way_dir, search_dir, dist),
        }
    }
}

impl From<FootProfile> for ModeProfile {
    fn from(p: FootProfile) -> Self {
        ModeProfile::Foot(p)
    }
}

impl From<BikeProfile> for ModeProfile {
    fn from(p: BikeProfile) -> Self {
        ModeProfile::Bike(p)
    }
}

impl From<CarProfile> for ModeProfile {
    fn from(p: CarProfile) -> Self {
        ModeProfile::Car(p)
    }
}

impl ModeEntry {
    fn new_for(node: ModeNode) -> ModeEntry {
        match node {
            ModeNode::Foot(_) => ModeEntry::Foot(FootEntry::default()),
            ModeNode::Bike(_) => ModeEntry::Bike(BikeEntry::default()),
            ModeNode::Car(_) => ModeEntry::Car(CarEntry::default()),
        }
    }

    fn cost(&self, node: ModeNode) -> Cost {
        match (self, node) {
            (ModeEntry::Foot(e), ModeNode::Foot(n)) => e.cost(n),
            (ModeEntry::Bike(e), ModeNode::Bike(n)) => e.cost(n),
            (ModeEntry::Car(e), ModeNode::Car(n)) => e.cost(n),
            (_, n) => mode_mismatch("entry", n),
        }
    }

    fn update(&mut self, node: ModeNode, cost: Cost, pred: ModeNode, prior_cost: Cost) -> bool {
        match self {
            ModeEntry::Foot(e) => {
                let (ModeNode::Foot(n), ModeNode::Foot(p)) = (node, pred) else {
                    mode_mismatch("foot entry", node)
                };
                e.update(&Label::new(p, prior_cost), n, cost, p)
            }
            ModeEntry::Bike(e) => {
                let (ModeNode::Bike(n), ModeNode::Bike(p)) = (node, pred) else {
                    mode_mismatch("bike entry", node)
                };
                e.update(&Label::new(p, prior_cost), n, cost, p)
            }
            ModeEntry::Car(e) => {
                let (ModeNode::Car(n), ModeNode::Car(p)) = (node, pred) else {
                    mode_mismatch("car entry", node)
                };
                e.update(&Label::new(p, prior_cost), n, cost, p)
            }
        }
    }

    fn pred(&self, node: ModeNode, search_dir: Direction) -> Option<ModeNode> {
        match (self, node) {
            (ModeEntry::Foot(e), ModeNode::Foot(n)) => {
                e.pred(n, search_dir).map(ModeNode::Foot)
            }
            (ModeEntry::Bike(e), ModeNode::Bike(n)) => {
                e.pred(n, search_dir).map(ModeNode::Bike)
            }
            (ModeEntry::Car(e), ModeNode::Car(n)) => e.pred(n, search_dir).map(ModeNode::Car),
            (_, n) => mode_mismatch("entry", n),
        }
    }
}

/// A mode node tagged with its chain slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CombiNode {
    pub node: ModeNode,
    pub submode: u8,
}

impl CombiNode {
    const INVALID_SUBMODE: u8 = u8::MAX;

    pub const INVALID: CombiNode = CombiNode {
        node: ModeNode::Foot(FootNode::INVALID),
        submode: Self::INVALID_SUBMODE,
    };

    #[inline]
    pub fn is_invalid(self) -> bool {
        self.submode == Self::INVALID_SUBMODE
    }

    #[inline]
    pub fn graph_node(self) -> NodeIdx {
        self.node.graph_node()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CombiKey {
    pub submode: u8,
    pub key: ModeKey,
}

/// Search state for one (submode, mode key): the inner mode entry, created
/// on first touch, plus the cross-boundary predecessors recorded when a
/// label enters this submode through a transition. The side table grows
/// with the slot offsets actually used.
#[derive(Clone, Debug, Default)]
pub struct CombiEntry {
    inner: Option<ModeEntry>,
    cross: Vec<(u32, CombiNode)>,
}

impl CombiEntry {
    fn record_cross(&mut self, offset: u32, pred: CombiNode) {
        if let Some(slot) = self.cross.iter_mut().find(|(o, _)| *o == offset) {
            slot.1 = pred;
        } else {
            self.cross.push((offset, pred));
        }
    }

    fn clear_cross(&mut self, offset: u32) {
        self.cross.retain(|(o, _)| *o != offset);
    }

    fn cross_pred(&self, offset: u32) -> Option<CombiNode> {
        self.cross
            .iter()
            .find(|(o, _)| *o == offset)
            .map(|&(_, p)| p)
    }
}

impl SearchEntry<CombiNode> for CombiEntry {
    fn cost(&self, node: CombiNode) -> Cost {
        self.inner
            .as_ref()
            .map_or(INFEASIBLE, |e| e.cost(node.node))
    }

    fn update(&mut self, label: &Label<CombiNode>, node: CombiNode, cost: Cost, pred: CombiNode) -> bool {
        let crossing = !pred.is_invalid() && pred.submode != node.submode;
        let sub_pred = if pred.is_invalid() || crossing {
            // A search origin or a boundary crossing seeds a virtual start:
            // the inner mode sees no predecessor of its own.
            node.node.invalid_of_same_mode()
        } else {
            pred.node
        };
        let inner = self.inner.get_or_insert_with(|| ModeEntry::new_for(node.node));
        let improved = inner.update(node.node, cost, sub_pred, label.cost);
        if improved {
            // The slot's recorded crossing only stays while the best path
            // into it still enters through a boundary.
            if crossing {
                self.record_cross(node.node.offset(), pred);
            } else {
                self.clear_cross(node.node.offset());
            }
        }
        improved
    }

    fn pred(&self, node: CombiNode, search_dir: Direction) -> Option<CombiNode> {
        let inner = self.inner.as_ref()?;
        if let Some(p) = inner.pred(node.node, search_dir) {
            return Some(CombiNode {
                node: p,
                submode: node.submode,
            });
        }
        self.cross_pred(node.node.offset())
    }
}

/// The composite profile. The chain and its transitions are assembled once
/// and never mutated afterwards.
#[derive(Clone, Debug)]
pub struct CombiProfile {
    name: &'static str,
    chain: Vec<ModeProfile>,
    transitions: Vec<Transition>,
}

impl CombiProfile {
    pub fn new(chain: Vec<ModeProfile>, transitions: Vec<Transition>) -> Result<Self, ProfileError> {
        if chain.is_empty() {
            return Err(ProfileError::EmptyChain);
        }
        if transitions.len() != chain.len() - 1 {
            return Err(ProfileError::TransitionCount {
                profiles: chain.len(),
                expected: chain.len() - 1,
                got: transitions.len(),
            });
        }
        tracing::debug!(slots = chain.len(), "composite profile assembled");
        Ok(Self {
            name: "combi",
            chain,
            transitions,
        })
    }

    /// Drive, park at a parking node, continue on foot.
    pub fn car_foot_parking(parking_cost: Cost) -> Self {
        Self {
            name: "car-foot-parking",
            chain: vec![CarProfile.into(), FootProfile::walking().into()],
            transitions: vec![Transition::parking(parking_cost)],
        }
    }

    /// Walk to the car, drive, park, walk again.
    pub fn foot_car_foot_parking(parking_cost: Cost) -> Self {
        Self {
            name: "foot-car-foot-parking",
            chain: vec![
                FootProfile::walking().into(),
                CarProfile.into(),
                FootProfile::walking().into(),
            ],
            transitions: vec![
                Transition::parking(parking_cost),
                Transition::parking(parking_cost),
            ],
        }
    }

    #[inline]
    pub fn chain(&self) -> &[ModeProfile] {
        &self.chain
    }

    #[inline]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    fn end_profile(&self, search_dir: Direction) -> &ModeProfile {
        match search_dir {
            Direction::Forward => &self.chain[0],
            Direction::Backward => &self.chain[self.chain.len() - 1],
        }
    }
}

impl Profile for CombiProfile {
    type Node = CombiNode;
    type Key = CombiKey;
    type Entry = CombiEntry;

    fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    fn key(node: CombiNode) -> CombiKey {
        CombiKey {
            submode: node.submode,
            key: node.node.key(),
        }
    }

    #[inline]
    fn graph_node(node: CombiNode) -> NodeIdx {
        node.graph_node()
    }

    #[inline]
    fn node_offset(node: CombiNode) -> u32 {
        node.node.offset()
    }

    fn invalid_node() -> CombiNode {
        CombiNode::INVALID
    }

    fn resolve_start_node<F: FnMut(CombiNode)>(
        &self,
        g: &RoutingGraph,
        way: WayIdx,
        node: NodeIdx,
        level: Level,
        search_dir: Direction,
        mut f: F,
    ) {
        let submode = match search_dir {
            Direction::Forward => 0,
            Direction::Backward => self.chain.len() - 1,
        };
        self.chain[submode].resolve_start_node(g, way, node, level, search_dir, |m| {
            f(CombiNode {
                node: m,
                submode: submode as u8,
            })
        });
    }

    /// A journey that starts in the first sub-mode ends in the last one, so
    /// destination states live at the opposite end of the chain from starts.
    fn resolve_dest_node<F: FnMut(CombiNode)>(
        &self,
        g: &RoutingGraph,
        way: WayIdx,
        node: NodeIdx,
        level: Level,
        search_dir: Direction,
        mut f: F,
    ) {
        let submode = match search_dir {
            Direction::Forward => self.chain.len() - 1,
            Direction::Backward => 0,
        };
        self.chain[submode].resolve_dest_node(g, way, node, level, search_dir, |m| {
            f(CombiNode {
                node: m,
                submode: submode as u8,
            })
        });
    }

    fn resolve_all<F: FnMut(CombiNode)>(
        &self,
        g: &RoutingGraph,
        node: NodeIdx,
        level: Level,
        mut f: F,
    ) {
        for (i, p) in self.chain.iter().enumerate() {
            p.resolve_all(g, node, level, |m| {
                f(CombiNode {
                    node: m,
                    submode: i as u8,
                })
            });
        }
    }

    fn adjacent<F: FnMut(EdgeOut<CombiNode>)>(
        &self,
        g: &RoutingGraph,
        node: CombiNode,
        search_dir: Direction,
        blocked: Option<&NodeMask>,
        mut f: F,
    ) {
        let sm = node.submode as usize;
        self.chain[sm].adjacent(g, node.node, search_dir, blocked, |e| {
            f(e.map_node(|m| CombiNode {
                node: m,
                submode: node.submode,
            }))
        });

        // Boundary crossing: next slot when searching forward, previous
        // when backward. The predicate is evaluated once, at this node.
        let crossing = match search_dir {
            Direction::Forward if sm + 1 < self.chain.len() => {
                Some((self.transitions[sm], sm + 1))
            }
            Direction::Backward if sm > 0 => Some((self.transitions[sm - 1], sm - 1)),
            _ => None,
        };
        let Some((transition, next)) = crossing else {
            return;
        };
        let gn = node.graph_node();
        let extra = transition.eval(g, gn, blocked);
        if extra == INFEASIBLE {
            return;
        }
        let level = g.node_properties(gn).level();
        let np = &self.chain[next];
        np.resolve_all(g, gn, level, |m| {
            np.adjacent(g, m, search_dir, blocked, |e| {
                let mut e = e.map_node(|to| CombiNode {
                    node: to,
                    submode: next as u8,
                });
                e.cost = saturate_cost(e.cost as u32 + extra as u32);
                f(e);
            });
        });
    }

    fn is_dest_reachable(
        &self,
        g: &RoutingGraph,
        node: CombiNode,
        way: WayIdx,
        way_dir: Direction,
        search_dir: Direction,
    ) -> bool {
        self.end_profile(search_dir)
            .is_dest_reachable(g, node.node, way, way_dir, search_dir)
    }

    fn way_cost(
        &self,
        props: WayProperties,
        way_dir: Direction,
        search_dir: Direction,
        dist: Distance,
    ) -> Cost {
        self.end_profile(search_dir)
            .way_cost(props, way_dir, search_dir, dist)
    }
}
