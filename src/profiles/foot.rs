//! Walking profile, with a wheelchair variant that avoids steps and moves
//! slower. Pedestrians ignore one-way restrictions, so expansion is
//! symmetric in the search direction.

use super::{travel_seconds, EdgeOut, Label, Profile, SearchEntry};
use crate::graph::{NodeMask, RoutingGraph, WayProperties};
use crate::types::{Cost, Direction, Distance, Level, NodeIdx, WayIdx, INFEASIBLE};

pub const FOOT_SPEED_MMPS: u32 = 1_400;
pub const WHEELCHAIR_SPEED_MMPS: u32 = 800;

/// A pedestrian position: a graph node at its level.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FootNode {
    pub n: NodeIdx,
    pub lvl: Level,
}

impl FootNode {
    pub const INVALID: FootNode = FootNode {
        n: NodeIdx::INVALID,
        lvl: Level::GROUND,
    };
}

/// One cost/predecessor slot per (node, level) key.
#[derive(Clone, Copy, Debug)]
pub struct FootEntry {
    cost: Cost,
    pred: NodeIdx,
    pred_lvl: Level,
}

impl Default for FootEntry {
    fn default() -> Self {
        Self {
            cost: INFEASIBLE,
            pred: NodeIdx::INVALID,
            pred_lvl: Level::GROUND,
        }
    }
}

impl SearchEntry<FootNode> for FootEntry {
    #[inline]
    fn cost(&self, _node: FootNode) -> Cost {
        self.cost
    }

    fn update(&mut self, _label: &Label<FootNode>, _node: FootNode, cost: Cost, pred: FootNode) -> bool {
        if cost < self.cost {
            self.cost = cost;
            self.pred = pred.n;
            self.pred_lvl = pred.lvl;
            true
        } else {
            false
        }
    }

    fn pred(&self, _node: FootNode, _search_dir: Direction) -> Option<FootNode> {
        if self.pred.is_invalid() {
            None
        } else {
            Some(FootNode {
                n: self.pred,
                lvl: self.pred_lvl,
            })
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FootProfile {
    pub wheelchair: bool,
}

impl FootProfile {
    pub fn walking() -> Self {
        Self { wheelchair: false }
    }

    pub fn wheelchair() -> Self {
        Self { wheelchair: true }
    }

    #[inline]
    fn speed_mmps(&self) -> u32 {
        if self.wheelchair {
            WHEELCHAIR_SPEED_MMPS
        } else {
            FOOT_SPEED_MMPS
        }
    }

    #[inline]
    fn way_ok(&self, props: WayProperties) -> bool {
        props.is_foot_accessible() && !(self.wheelchair && props.is_steps())
    }
}

impl Profile for FootProfile {
    type Node = FootNode;
    type Key = FootNode;
    type Entry = FootEntry;

    fn name(&self) -> &'static str {
        if self.wheelchair {
            "wheelchair"
        } else {
            "foot"
        }
    }

    #[inline]
    fn key(node: FootNode) -> FootNode {
        node
    }

    #[inline]
    fn graph_node(node: FootNode) -> NodeIdx {
        node.n
    }

    #[inline]
    fn node_offset(_node: FootNode) -> u32 {
        0
    }

    fn invalid_node() -> FootNode {
        FootNode::INVALID
    }

    fn resolve_start_node<F: FnMut(FootNode)>(
        &self,
        g: &RoutingGraph,
        way: WayIdx,
        node: NodeIdx,
        level: Level,
        _search_dir: Direction,
        mut f: F,
    ) {
        let props = g.node_properties(node);
        if self.way_ok(g.way_properties(way))
            && props.is_foot_accessible()
            && level.matches(props.level())
        {
            f(FootNode {
                n: node,
                lvl: props.level(),
            });
        }
    }

    fn resolve_all<F: FnMut(FootNode)>(
        &self,
        g: &RoutingGraph,
        node: NodeIdx,
        level: Level,
        mut f: F,
    ) {
        let props = g.node_properties(node);
        if props.is_foot_accessible() && level.matches(props.level()) {
            f(FootNode {
                n: node,
                lvl: props.level(),
            });
        }
    }

    fn adjacent<F: FnMut(EdgeOut<FootNode>)>(
        &self,
        g: &RoutingGraph,
        node: FootNode,
        _search_dir: Direction,
        blocked: Option<&NodeMask>,
        mut f: F,
    ) {
        if blocked.is_some_and(|b| b.get(node.n)) {
            return;
        }
        for (way, pos) in g.node_ways(node.n) {
            let wp = g.way_properties(way);
            if !self.way_ok(wp) {
                continue;
            }
            let way_len = g.way_nodes(way).len();
            let mut expand = |to_pos: u16, seg: u16| {
                let to_n = g.way_nodes(way)[to_pos as usize];
                let tp = g.node_properties(to_n);
                if !tp.is_foot_accessible() || blocked.is_some_and(|b| b.get(to_n)) {
                    return;
                }
                let dist = g.seg_distance(way, seg);
                f(EdgeOut {
                    to: FootNode {
                        n: to_n,
                        lvl: tp.level(),
                    },
                    cost: travel_seconds(dist, self.speed_mmps()),
                    dist,
                    way,
                    from_pos: pos,
                    to_pos,
                });
            };
            if pos > 0 {
                expand(pos - 1, pos - 1);
            }
            if (pos as usize) + 1 < way_len {
                expand(pos + 1, pos);
            }
        }
    }

    fn is_dest_reachable(
        &self,
        g: &RoutingGraph,
        _node: FootNode,
        way: WayIdx,
        _way_dir: Direction,
        _search_dir: Direction,
    ) -> bool {
        self.way_ok(g.way_properties(way))
    }

    fn way_cost(
        &self,
        props: WayProperties,
        _way_dir: Direction,
        _search_dir: Direction,
        dist: Distance,
    ) -> Cost {
        if self.way_ok(props) {
            travel_seconds(dist, self.speed_mmps())
        } else {
            INFEASIBLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, NodeProperties};

    fn path_graph() -> RoutingGraph {
        let mut b = GraphBuilder::new();
        let nodes: Vec<_> = (0..3)
            .map(|_| b.add_node(NodeProperties::all_modes()))
            .collect();
        b.add_way(WayProperties::footpath(), &nodes, &[140, 280]);
        b.build()
    }

    #[test]
    fn expands_both_neighbors_with_time_costs() {
        let g = path_graph();
        let p = FootProfile::walking();
        let mut out = Vec::new();
        p.adjacent(
            &g,
            FootNode {
                n: NodeIdx(1),
                lvl: Level::GROUND,
            },
            Direction::Forward,
            None,
            |e| out.push((e.to.n, e.cost)),
        );
        out.sort();
        // 140 m and 280 m at 1.4 m/s.
        assert_eq!(out, vec![(NodeIdx(0), 100), (NodeIdx(2), 200)]);
    }

    #[test]
    fn wheelchair_rejects_steps() {
        let mut b = GraphBuilder::new();
        let n0 = b.add_node(NodeProperties::all_modes());
        let n1 = b.add_node(NodeProperties::all_modes());
        let w = b.add_way(WayProperties::footpath().with_steps(), &[n0, n1], &[10]);
        let g = b.build();

        let walk = FootProfile::walking();
        let chair = FootProfile::wheelchair();

        let mut walk_edges = 0;
        walk.adjacent(
            &g,
            FootNode {
                n: n0,
                lvl: Level::GROUND,
            },
            Direction::Forward,
            None,
            |_| walk_edges += 1,
        );
        assert_eq!(walk_edges, 1);

        let mut chair_edges = 0;
        chair.adjacent(
            &g,
            FootNode {
                n: n0,
                lvl: Level::GROUND,
            },
            Direction::Forward,
            None,
            |_| chair_edges += 1,
        );
        assert_eq!(chair_edges, 0);
        assert_eq!(
            chair.way_cost(g.way_properties(w), Direction::Forward, Direction::Forward, 10),
            INFEASIBLE
        );
    }

    #[test]
    fn car_only_way_is_infeasible() {
        let p = FootProfile::walking();
        let props = WayProperties::new(WayProperties::CAR, 50, Level::GROUND);
        assert_eq!(
            p.way_cost(props, Direction::Forward, Direction::Forward, 100),
            INFEASIBLE
        );
    }
}
