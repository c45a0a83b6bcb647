//! Cycling profile. Respects bike one-way restrictions and refuses steps;
//! no turn state, so a plain graph node is enough.

use super::{travel_seconds, EdgeOut, Label, Profile, SearchEntry};
use crate::graph::{NodeMask, RoutingGraph, WayProperties};
use crate::types::{Cost, Direction, Distance, Level, NodeIdx, WayIdx, INFEASIBLE};

pub const BIKE_SPEED_MMPS: u32 = 4_200;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BikeNode {
    pub n: NodeIdx,
}

impl BikeNode {
    pub const INVALID: BikeNode = BikeNode {
        n: NodeIdx::INVALID,
    };
}

#[derive(Clone, Copy, Debug)]
pub struct BikeEntry {
    cost: Cost,
    pred: NodeIdx,
}

impl Default for BikeEntry {
    fn default() -> Self {
        Self {
            cost: INFEASIBLE,
            pred: NodeIdx::INVALID,
        }
    }
}

impl SearchEntry<BikeNode> for BikeEntry {
    #[inline]
    fn cost(&self, _node: BikeNode) -> Cost {
        self.cost
    }

    fn update(&mut self, _label: &Label<BikeNode>, _node: BikeNode, cost: Cost, pred: BikeNode) -> bool {
        if cost < self.cost {
            self.cost = cost;
            self.pred = pred.n;
            true
        } else {
            false
        }
    }

    fn pred(&self, _node: BikeNode, _search_dir: Direction) -> Option<BikeNode> {
        if self.pred.is_invalid() {
            None
        } else {
            Some(BikeNode { n: self.pred })
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BikeProfile;

impl BikeProfile {
    #[inline]
    fn way_ok(props: WayProperties) -> bool {
        props.is_bike_accessible() && !props.is_steps()
    }

    /// One-way check for traversing a segment in `seg_dir` during a search
    /// in `search_dir`.
    #[inline]
    fn dir_ok(props: WayProperties, seg_dir: Direction, search_dir: Direction) -> bool {
        !props.is_oneway_bike() || seg_dir.effective(search_dir) == Direction::Forward
    }
}

impl Profile for BikeProfile {
    type Node = BikeNode;
    type Key = BikeNode;
    type Entry = BikeEntry;

    fn name(&self) -> &'static str {
        "bike"
    }

    #[inline]
    fn key(node: BikeNode) -> BikeNode {
        node
    }

    #[inline]
    fn graph_node(node: BikeNode) -> NodeIdx {
        node.n
    }

    #[inline]
    fn node_offset(_node: BikeNode) -> u32 {
        0
    }

    fn invalid_node() -> BikeNode {
        BikeNode::INVALID
    }

    fn resolve_start_node<F: FnMut(BikeNode)>(
        &self,
        g: &RoutingGraph,
        way: WayIdx,
        node: NodeIdx,
        level: Level,
        _search_dir: Direction,
        mut f: F,
    ) {
        let props = g.node_properties(node);
        if Self::way_ok(g.way_properties(way))
            && props.is_bike_accessible()
            && level.matches(props.level())
        {
            f(BikeNode { n: node });
        }
    }

    fn resolve_all<F: FnMut(BikeNode)>(
        &self,
        g: &RoutingGraph,
        node: NodeIdx,
        level: Level,
        mut f: F,
    ) {
        let props = g.node_properties(node);
        if props.is_bike_accessible() && level.matches(props.level()) {
            f(BikeNode { n: node });
        }
    }

    fn adjacent<F: FnMut(EdgeOut<BikeNode>)>(
        &self,
        g: &RoutingGraph,
        node: BikeNode,
        search_dir: Direction,
        blocked: Option<&NodeMask>,
        mut f: F,
    ) {
        if blocked.is_some_and(|b| b.get(node.n)) {
            return;
        }
        for (way, pos) in g.node_ways(node.n) {
            let wp = g.way_properties(way);
            if !Self::way_ok(wp) {
                continue;
            }
            let way_len = g.way_nodes(way).len();
            let mut expand = |to_pos: u16, seg: u16, seg_dir: Direction| {
                if !Self::dir_ok(wp, seg_dir, search_dir) {
                    return;
                }
                let to_n = g.way_nodes(way)[to_pos as usize];
                if !g.node_properties(to_n).is_bike_accessible()
                    || blocked.is_some_and(|b| b.get(to_n))
                {
                    return;
                }
                let dist = g.seg_distance(way, seg);
                f(EdgeOut {
                    to: BikeNode { n: to_n },
                    cost: travel_seconds(dist, BIKE_SPEED_MMPS),
                    dist,
                    way,
                    from_pos: pos,
                    to_pos,
                });
            };
            if pos > 0 {
                expand(pos - 1, pos - 1, Direction::Backward);
            }
            if (pos as usize) + 1 < way_len {
                expand(pos + 1, pos, Direction::Forward);
            }
        }
    }

    fn is_dest_reachable(
        &self,
        g: &RoutingGraph,
        _node: BikeNode,
        way: WayIdx,
        way_dir: Direction,
        search_dir: Direction,
    ) -> bool {
        let props = g.way_properties(way);
        Self::way_ok(props) && Self::dir_ok(props, way_dir, search_dir)
    }

    fn way_cost(
        &self,
        props: WayProperties,
        way_dir: Direction,
        search_dir: Direction,
        dist: Distance,
    ) -> Cost {
        if Self::way_ok(props) && Self::dir_ok(props, way_dir, search_dir) {
            travel_seconds(dist, BIKE_SPEED_MMPS)
        } else {
            INFEASIBLE
        }
    }
}
