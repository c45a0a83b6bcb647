//! Single-mode search scenarios: cost accumulation, budget truncation,
//! blocked nodes and direction symmetry on a small line graph.

mod common;

use common::scenario_line;
use switchback::profiles::foot::FootNode;
use switchback::{
    route, Anchor, Dijkstra, Direction, FootProfile, GraphBuilder, Level, NodeIdx, NodeMask,
    NodeProperties, WayProperties, INFEASIBLE,
};

fn foot_at(n: u32) -> FootNode {
    FootNode {
        n: NodeIdx(n),
        lvl: Level::GROUND,
    }
}

fn searched_line(max: u16, blocked: Option<&NodeMask>) -> Dijkstra<FootProfile> {
    let (g, _) = scenario_line();
    let mut d = Dijkstra::new(FootProfile::walking());
    d.add_start(foot_at(0), 0, max);
    d.run(&g, max, blocked, Direction::Forward);
    d
}

#[test]
fn costs_accumulate_along_the_line() {
    let d = searched_line(10, None);
    let costs: Vec<_> = (0..4).map(|n| d.cost_to(foot_at(n))).collect();
    assert_eq!(costs, vec![0, 1, 3, 6]);
}

#[test]
fn budget_truncates_reachability() {
    let d = searched_line(5, None);
    assert_eq!(d.cost_to(foot_at(2)), 3);
    assert_eq!(d.cost_to(foot_at(3)), INFEASIBLE);

    // The budget boundary itself is reachable.
    let d = searched_line(6, None);
    assert_eq!(d.cost_to(foot_at(3)), 6);
}

#[test]
fn blocked_nodes_stop_expansion() {
    let (g, _) = scenario_line();
    let mut blocked = NodeMask::new(g.n_nodes());
    blocked.set(NodeIdx(2), true);

    let d = searched_line(10, Some(&blocked));
    assert_eq!(d.cost_to(foot_at(1)), 1);
    assert_eq!(d.cost_to(foot_at(2)), INFEASIBLE);
    assert_eq!(d.cost_to(foot_at(3)), INFEASIBLE);
}

#[test]
fn backward_search_mirrors_forward() {
    let (g, _) = scenario_line();
    let mut bwd = Dijkstra::new(FootProfile::walking());
    bwd.add_start(foot_at(3), 0, 10);
    bwd.run(&g, 10, None, Direction::Backward);

    let fwd = searched_line(10, None);
    for n in 0..4 {
        assert_eq!(fwd.cost_to(foot_at(n)), bwd.cost_to(foot_at(3 - n)));
    }
}

#[test]
fn routes_reconstruct_the_node_path() {
    let (g, w) = scenario_line();
    let r = route(
        FootProfile::walking(),
        &g,
        Anchor::at(w, NodeIdx(0)),
        Anchor::at(w, NodeIdx(3)),
        INFEASIBLE,
        Direction::Forward,
        None,
    )
    .unwrap();
    assert_eq!(r.cost, 6);
    assert_eq!(
        r.nodes,
        vec![NodeIdx(0), NodeIdx(1), NodeIdx(2), NodeIdx(3)]
    );
}

#[test]
fn oneway_roads_route_only_with_the_grain() {
    let mut b = GraphBuilder::new();
    let nodes: Vec<_> = (0..3)
        .map(|_| b.add_node(NodeProperties::all_modes()))
        .collect();
    let w = b.add_way(
        WayProperties::road(36).with_oneway_car(),
        &nodes,
        &[10, 10],
    );
    let g = b.build();

    let with = route(
        switchback::CarProfile,
        &g,
        Anchor::at(w, NodeIdx(0)),
        Anchor::at(w, NodeIdx(2)),
        INFEASIBLE,
        Direction::Forward,
        None,
    );
    assert!(with.is_some());

    let against = route(
        switchback::CarProfile,
        &g,
        Anchor::at(w, NodeIdx(2)),
        Anchor::at(w, NodeIdx(0)),
        INFEASIBLE,
        Direction::Forward,
        None,
    );
    assert!(against.is_none());
}
