use switchback::{GraphBuilder, NodeProperties, RoutingGraph, WayIdx, WayProperties};

/// Four nodes on one walkable way. Segment costs come out as 1, 2 and 3
/// seconds at walking speed, so cumulative costs from node 0 are 0/1/3/6.
pub fn scenario_line() -> (RoutingGraph, WayIdx) {
    let mut b = GraphBuilder::new();
    let nodes: Vec<_> = (0..4)
        .map(|_| b.add_node(NodeProperties::all_modes()))
        .collect();
    let w = b.add_way(WayProperties::footpath(), &nodes, &[2, 3, 5]);
    (b.build(), w)
}
