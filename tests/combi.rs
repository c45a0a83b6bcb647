//! Park-and-ride journeys across a mode chain: crossings happen only at
//! parking nodes, carry the transition cost, and reconstruct across mode
//! boundaries in both search directions.

use switchback::profiles::CombiNode;
use switchback::{
    route, Anchor, CombiProfile, Cost, Dijkstra, Direction, GraphBuilder, Level, NodeIdx,
    NodeProperties, Profile, RoutingGraph, WayIdx, WayProperties, INFEASIBLE,
};

const PARKING_COST: Cost = 60;

/// Eight nodes on one 36 km/h road, 10 m apart, with parking at nodes 2
/// and 5. Driving costs 1 s per segment, walking 7 s.
fn parking_line(parking: bool) -> (RoutingGraph, WayIdx) {
    let mut b = GraphBuilder::new();
    let nodes: Vec<_> = (0..8)
        .map(|i| {
            let props = NodeProperties::all_modes();
            if parking && (i == 2 || i == 5) {
                b.add_node(props.with_parking())
            } else {
                b.add_node(props)
            }
        })
        .collect();
    let w = b.add_way(WayProperties::road(36), &nodes, &[10; 7]);
    (b.build(), w)
}

fn searched(g: &RoutingGraph, w: WayIdx) -> Dijkstra<CombiProfile> {
    let mut d = Dijkstra::new(CombiProfile::foot_car_foot_parking(PARKING_COST));
    let mut starts = Vec::new();
    d.profile()
        .resolve_start_node(g, w, NodeIdx(0), Level::ANY, Direction::Forward, |n| {
            starts.push(n)
        });
    for n in starts {
        d.add_start(n, 0, INFEASIBLE);
    }
    d.run(g, INFEASIBLE, None, Direction::Forward);
    d
}

/// Every settled search node of one sub-mode, collected node by node.
fn settled_in_submode(d: &Dijkstra<CombiProfile>, g: &RoutingGraph, submode: u8) -> Vec<CombiNode> {
    let mut out = Vec::new();
    for i in 0..g.n_nodes() {
        d.profile().resolve_all(g, NodeIdx(i as u32), Level::ANY, |n| {
            if n.submode == submode && d.cost_to(n) != INFEASIBLE {
                out.push(n);
            }
        });
    }
    out
}

#[test]
fn driving_engages_only_at_parking_nodes() {
    let (g, w) = parking_line(true);
    let d = searched(&g, w);

    let car_states = settled_in_submode(&d, &g, 1);
    assert!(!car_states.is_empty());

    // Wherever the journey steps up a sub-mode, the boundary node must be
    // one of the parking nodes.
    for c in car_states {
        let path = d.path_to(c, Direction::Forward);
        for pair in path.windows(2) {
            if pair[1].submode == pair[0].submode + 1 {
                assert!(matches!(pair[0].graph_node().0, 2 | 5));
            }
        }
    }
}

#[test]
fn without_parking_the_car_never_engages() {
    let (g, w) = parking_line(false);
    let d = searched(&g, w);

    assert!(settled_in_submode(&d, &g, 1).is_empty());
    assert!(settled_in_submode(&d, &g, 2).is_empty());

    // The walk itself still reaches the far end.
    let walked: Vec<_> = settled_in_submode(&d, &g, 0)
        .into_iter()
        .filter(|n| n.graph_node() == NodeIdx(7))
        .map(|n| d.cost_to(n))
        .collect();
    assert_eq!(walked, vec![49]);
}

#[test]
fn routes_walk_drive_walk_through_both_garages() {
    let (g, w) = parking_line(true);
    let r = route(
        CombiProfile::foot_car_foot_parking(PARKING_COST),
        &g,
        Anchor::at(w, NodeIdx(0)),
        Anchor::at(w, NodeIdx(7)),
        INFEASIBLE,
        Direction::Forward,
        None,
    )
    .unwrap();

    // Walking 0-2 costs 14, the crossing edge onto the road costs 60 + 1,
    // driving on to node 5 costs 2, the crossing edge back to foot costs
    // 60 + 7, and the final walk costs 7. The plain 49 s walk never enters
    // the arrival sub-mode, so it does not qualify.
    assert_eq!(r.cost, 151);
    assert_eq!(r.nodes, (0..8).map(NodeIdx).collect::<Vec<_>>());
}

#[test]
fn backward_routes_cross_symmetrically() {
    let (g, w) = parking_line(true);
    let r = route(
        CombiProfile::foot_car_foot_parking(PARKING_COST),
        &g,
        Anchor::at(w, NodeIdx(7)),
        Anchor::at(w, NodeIdx(0)),
        INFEASIBLE,
        Direction::Backward,
        None,
    )
    .unwrap();

    // Same journey seen from the destination side.
    assert_eq!(r.cost, 151);
    assert_eq!(r.nodes, (0..8).map(NodeIdx).collect::<Vec<_>>());
}

#[test]
fn backward_routes_arrive_in_the_driving_submode() {
    let (g, w) = parking_line(true);

    // Drive, park at node 5, walk: 5 s driving, 60 + 7 s crossing onto the
    // footpath, 7 s walking.
    let fwd = route(
        CombiProfile::car_foot_parking(PARKING_COST),
        &g,
        Anchor::at(w, NodeIdx(0)),
        Anchor::at(w, NodeIdx(7)),
        INFEASIBLE,
        Direction::Forward,
        None,
    )
    .unwrap();
    assert_eq!(fwd.cost, 79);

    // The same journey queried from the walking end: the destination
    // resolution must enumerate exactly the directional car states the
    // backward search settled at node 0.
    let bwd = route(
        CombiProfile::car_foot_parking(PARKING_COST),
        &g,
        Anchor::at(w, NodeIdx(7)),
        Anchor::at(w, NodeIdx(0)),
        INFEASIBLE,
        Direction::Backward,
        None,
    )
    .unwrap();
    assert_eq!(bwd.cost, fwd.cost);
    assert_eq!(bwd.nodes, (0..8).map(NodeIdx).collect::<Vec<_>>());
}

#[test]
fn chain_ends_price_the_partial_segments() {
    let p = CombiProfile::car_foot_parking(PARKING_COST);
    let props = WayProperties::road(36);

    // Forward queries start driving, so the origin partial is priced by
    // car; the arrival side of the same query prices it on foot.
    assert_eq!(
        p.way_cost(props, Direction::Forward, Direction::Forward, 100),
        10
    );
    assert_eq!(
        p.way_cost(props, Direction::Forward, Direction::Backward, 100),
        71
    );
}
