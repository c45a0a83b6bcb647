//! Point-to-point queries on top of the search engine.
//!
//! Callers describe both endpoints as [`Anchor`]s, positions already
//! matched onto the network. The origin anchor seeds the search, the
//! destination anchor resolves into arrival states that are scored
//! against the settled costs.

use crate::dijkstra::Dijkstra;
use crate::graph::{NodeMask, RoutingGraph};
use crate::profiles::Profile;
use crate::types::{Cost, Direction, Distance, Level, NodeIdx, WayIdx, INFEASIBLE};

/// A position matched onto the network: a way, the nearest node on it, the
/// level to match at, and the distance along the way between that node and
/// the matched point.
#[derive(Clone, Copy, Debug)]
pub struct Anchor {
    pub way: WayIdx,
    pub node: NodeIdx,
    pub level: Level,
    pub along: Distance,
}

impl Anchor {
    /// An anchor sitting exactly on `node`.
    pub fn at(way: WayIdx, node: NodeIdx) -> Self {
        Self {
            way,
            node,
            level: Level::ANY,
            along: 0,
        }
    }
}

/// A found journey: total cost plus the graph nodes in travel order.
/// Consecutive duplicates collapse where the journey switches modes in
/// place.
#[derive(Clone, Debug)]
pub struct Route {
    pub cost: Cost,
    pub nodes: Vec<NodeIdx>,
}

/// Cheapest feasible way across the partial segment of an anchor.
fn partial_cost<P: Profile>(
    p: &P,
    g: &RoutingGraph,
    anchor: Anchor,
    search_dir: Direction,
) -> Cost {
    let props = g.way_properties(anchor.way);
    [Direction::Forward, Direction::Backward]
        .into_iter()
        .map(|wd| p.way_cost(props, wd, search_dir, anchor.along))
        .min()
        .unwrap_or(INFEASIBLE)
}

/// One shortest-path query. Returns the cheapest journey within `max`, or
/// None when the destination is unreachable inside the budget.
///
/// A backward search traverses every edge reversed; callers doing
/// one-to-many from a common destination pass that destination as `from`.
pub fn route<P: Profile>(
    profile: P,
    g: &RoutingGraph,
    from: Anchor,
    to: Anchor,
    max: Cost,
    search_dir: Direction,
    blocked: Option<&NodeMask>,
) -> Option<Route> {
    let mut d = Dijkstra::new(profile);

    let seed = partial_cost(d.profile(), g, from, search_dir);
    let mut starts = Vec::new();
    d.profile()
        .resolve_start_node(g, from.way, from.node, from.level, search_dir, |n| {
            starts.push(n)
        });
    let mut seeded = false;
    for n in starts {
        seeded |= d.add_start(n, seed, max);
    }
    if !seeded {
        return None;
    }
    d.run(g, max, blocked, search_dir);

    // Candidate states come from the arrival-side resolution; reachability
    // and the partial segment are scored from the reversed perspective so a
    // composite profile defers them to its arrival-end sub-profile.
    let dest_dir = search_dir.opposite();
    let to_props = g.way_properties(to.way);
    let mut best: Option<(Cost, P::Node)> = None;
    d.profile()
        .resolve_dest_node(g, to.way, to.node, to.level, search_dir, |n| {
            let settled = d.cost_to(n);
            if settled == INFEASIBLE {
                return;
            }
            for wd in [Direction::Forward, Direction::Backward] {
                if !d.profile().is_dest_reachable(g, n, to.way, wd, dest_dir) {
                    continue;
                }
                let partial = d.profile().way_cost(to_props, wd, dest_dir, to.along);
                if partial == INFEASIBLE {
                    continue;
                }
                let total = settled as u32 + partial as u32;
                if total >= INFEASIBLE as u32 || total > max as u32 {
                    continue;
                }
                let total = total as Cost;
                if best.map_or(true, |(c, _)| total < c) {
                    best = Some((total, n));
                }
            }
        });

    let (cost, node) = best?;
    let mut nodes: Vec<NodeIdx> = d
        .path_to(node, search_dir)
        .into_iter()
        .map(P::graph_node)
        .collect();
    nodes.dedup();
    tracing::debug!(
        profile = d.profile().name(),
        cost,
        hops = nodes.len(),
        "route found"
    );
    Some(Route { cost, nodes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, NodeProperties, WayProperties};
    use crate::profiles::FootProfile;

    /// 0 -140m- 1 -280m- 2 on one walkable way.
    fn line() -> (RoutingGraph, WayIdx) {
        let mut b = GraphBuilder::new();
        let nodes: Vec<_> = (0..3)
            .map(|_| b.add_node(NodeProperties::all_modes()))
            .collect();
        let w = b.add_way(WayProperties::footpath(), &nodes, &[140, 280]);
        (b.build(), w)
    }

    #[test]
    fn walks_the_line() {
        let (g, w) = line();
        let r = route(
            FootProfile::walking(),
            &g,
            Anchor::at(w, NodeIdx(0)),
            Anchor::at(w, NodeIdx(2)),
            INFEASIBLE,
            Direction::Forward,
            None,
        )
        .unwrap();
        assert_eq!(r.cost, 300);
        assert_eq!(r.nodes, vec![NodeIdx(0), NodeIdx(1), NodeIdx(2)]);
    }

    #[test]
    fn partial_segments_count_toward_the_budget() {
        let (g, w) = line();
        let mut to = Anchor::at(w, NodeIdx(2));
        to.along = 140;

        let r = route(
            FootProfile::walking(),
            &g,
            Anchor::at(w, NodeIdx(0)),
            to,
            INFEASIBLE,
            Direction::Forward,
            None,
        )
        .unwrap();
        assert_eq!(r.cost, 400);

        // 400 exactly fits; anything lower does not.
        assert!(route(
            FootProfile::walking(),
            &g,
            Anchor::at(w, NodeIdx(0)),
            to,
            400,
            Direction::Forward,
            None,
        )
        .is_some());
        assert!(route(
            FootProfile::walking(),
            &g,
            Anchor::at(w, NodeIdx(0)),
            to,
            399,
            Direction::Forward,
            None,
        )
        .is_none());
    }

    #[test]
    fn blocked_nodes_sever_the_route() {
        let (g, w) = line();
        let mut blocked = NodeMask::new(g.n_nodes());
        blocked.set(NodeIdx(1), true);
        assert!(route(
            FootProfile::walking(),
            &g,
            Anchor::at(w, NodeIdx(0)),
            Anchor::at(w, NodeIdx(2)),
            INFEASIBLE,
            Direction::Forward,
            Some(&blocked),
        )
        .is_none());
    }

    #[test]
    fn swapped_anchors_round_trip_backward() {
        let (g, w) = line();
        let fwd = route(
            FootProfile::walking(),
            &g,
            Anchor::at(w, NodeIdx(0)),
            Anchor::at(w, NodeIdx(2)),
            INFEASIBLE,
            Direction::Forward,
            None,
        )
        .unwrap();
        let bwd = route(
            FootProfile::walking(),
            &g,
            Anchor::at(w, NodeIdx(2)),
            Anchor::at(w, NodeIdx(0)),
            INFEASIBLE,
            Direction::Backward,
            None,
        )
        .unwrap();
        assert_eq!(fwd.cost, bwd.cost);
    }
}
