//! Driving profile. A car position remembers its arrival way (as the
//! way-list slot at the node) and travel direction so turning back onto the
//! same way costs a U-turn penalty. Entries keep one slot per
//! (way slot, direction) pair and grow with the node's actual degree.

use super::{travel_seconds, EdgeOut, Label, Profile, SearchEntry};
use crate::graph::{NodeMask, RoutingGraph, WayProperties};
use crate::types::{saturate_cost, Cost, Direction, Distance, Level, NodeIdx, WayIdx, INFEASIBLE};

pub const U_TURN_PENALTY: Cost = 120;

#[inline]
fn speed_mmps(kmh: u8) -> u32 {
    kmh as u32 * 2500 / 9
}

/// A car position: at `n`, having arrived along the way in way-list slot
/// `way_pos`, traveling `dir` along that way.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CarNode {
    pub n: NodeIdx,
    pub way_pos: u16,
    pub dir: Direction,
}

impl CarNode {
    pub const INVALID: CarNode = CarNode {
        n: NodeIdx::INVALID,
        way_pos: u16::MAX,
        dir: Direction::Forward,
    };

    /// Slot offset inside the per-graph-node entry.
    #[inline]
    pub fn offset(self) -> u32 {
        self.way_pos as u32 * 2 + self.dir as u32
    }
}

#[derive(Clone, Copy, Debug)]
struct CarSlot {
    cost: Cost,
    pred: CarNode,
}

impl Default for CarSlot {
    fn default() -> Self {
        Self {
            cost: INFEASIBLE,
            pred: CarNode::INVALID,
        }
    }
}

/// All (way slot, direction) states of one graph node, demand-grown.
#[derive(Clone, Debug, Default)]
pub struct CarEntry {
    slots: Vec<CarSlot>,
}

impl SearchEntry<CarNode> for CarEntry {
    fn cost(&self, node: CarNode) -> Cost {
        self.slots
            .get(node.offset() as usize)
            .map_or(INFEASIBLE, |s| s.cost)
    }

    fn update(&mut self, _label: &Label<CarNode>, node: CarNode, cost: Cost, pred: CarNode) -> bool {
        let off = node.offset() as usize;
        if off >= self.slots.len() {
            self.slots.resize(off + 1, CarSlot::default());
        }
        let slot = &mut self.slots[off];
        if cost < slot.cost {
            slot.cost = cost;
            slot.pred = pred;
            true
        } else {
            false
        }
    }

    fn pred(&self, node: CarNode, _search_dir: Direction) -> Option<CarNode> {
        let slot = self.slots.get(node.offset() as usize)?;
        if slot.pred.n.is_invalid() {
            None
        } else {
            Some(slot.pred)
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CarProfile;

impl CarProfile {
    #[inline]
    fn dir_ok(props: WayProperties, seg_dir: Direction, search_dir: Direction) -> bool {
        !props.is_oneway_car() || seg_dir.effective(search_dir) == Direction::Forward
    }
}

impl Profile for CarProfile {
    type Node = CarNode;
    type Key = NodeIdx;
    type Entry = CarEntry;

    fn name(&self) -> &'static str {
        "car"
    }

    #[inline]
    fn key(node: CarNode) -> NodeIdx {
        node.n
    }

    #[inline]
    fn graph_node(node: CarNode) -> NodeIdx {
        node.n
    }

    #[inline]
    fn node_offset(node: CarNode) -> u32 {
        node.offset()
    }

    fn invalid_node() -> CarNode {
        CarNode::INVALID
    }

    fn resolve_start_node<F: FnMut(CarNode)>(
        &self,
        g: &RoutingGraph,
        way: WayIdx,
        node: NodeIdx,
        _level: Level,
        search_dir: Direction,
        mut f: F,
    ) {
        let wp = g.way_properties(way);
        if !wp.is_car_accessible() || !g.node_properties(node).is_car_accessible() {
            return;
        }
        let Some(way_pos) = g.way_pos_at(node, way) else {
            return;
        };
        for dir in [Direction::Forward, Direction::Backward] {
            if Self::dir_ok(wp, dir, search_dir) {
                f(CarNode { n: node, way_pos, dir });
            }
        }
    }

    fn resolve_all<F: FnMut(CarNode)>(
        &self,
        g: &RoutingGraph,
        node: NodeIdx,
        _level: Level,
        mut f: F,
    ) {
        if !g.node_properties(node).is_car_accessible() {
            return;
        }
        for (list_idx, (way, _pos)) in g.node_ways(node).enumerate() {
            let wp = g.way_properties(way);
            if !wp.is_car_accessible() {
                continue;
            }
            f(CarNode {
                n: node,
                way_pos: list_idx as u16,
                dir: Direction::Forward,
            });
            if !wp.is_oneway_car() {
                f(CarNode {
                    n: node,
                    way_pos: list_idx as u16,
                    dir: Direction::Backward,
                });
            }
        }
    }

    fn adjacent<F: FnMut(EdgeOut<CarNode>)>(
        &self,
        g: &RoutingGraph,
        node: CarNode,
        search_dir: Direction,
        blocked: Option<&NodeMask>,
        mut f: F,
    ) {
        if blocked.is_some_and(|b| b.get(node.n)) {
            return;
        }
        for (list_idx, (way, pos)) in g.node_ways(node.n).enumerate() {
            let wp = g.way_properties(way);
            if !wp.is_car_accessible() {
                continue;
            }
            let way_len = g.way_nodes(way).len();
            let mut expand = |to_pos: u16, seg: u16, seg_dir: Direction| {
                if !Self::dir_ok(wp, seg_dir, search_dir) {
                    return;
                }
                let to_n = g.way_nodes(way)[to_pos as usize];
                if !g.node_properties(to_n).is_car_accessible()
                    || blocked.is_some_and(|b| b.get(to_n))
                {
                    return;
                }
                let u_turn =
                    list_idx as u16 == node.way_pos && seg_dir == node.dir.opposite();
                let dist = g.seg_distance(way, seg);
                let mut cost = travel_seconds(dist, speed_mmps(wp.speed_kmh)) as u32;
                if u_turn {
                    cost += U_TURN_PENALTY as u32;
                }
                let to_way_pos = g
                    .way_pos_at(to_n, way)
                    .expect("way missing from its own node's way list");
                f(EdgeOut {
                    to: CarNode {
                        n: to_n,
                        way_pos: to_way_pos,
                        dir: seg_dir,
                    },
                    cost: saturate_cost(cost),
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
        _node: CarNode,
        way: WayIdx,
        way_dir: Direction,
        search_dir: Direction,
    ) -> bool {
        let props = g.way_properties(way);
        props.is_car_accessible() && Self::dir_ok(props, way_dir, search_dir)
    }

    fn way_cost(
        &self,
        props: WayProperties,
        way_dir: Direction,
        search_dir: Direction,
        dist: Distance,
    ) -> Cost {
        if props.is_car_accessible() && Self::dir_ok(props, way_dir, search_dir) {
            travel_seconds(dist, speed_mmps(props.speed_kmh))
        } else {
            INFEASIBLE
        }
    }
}
