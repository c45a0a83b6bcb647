//! Transition predicates gating mode switches in composite profiles.
//!
//! A predicate looks at one graph node and answers with the extra cost of
//! switching modes there, or INFEASIBLE to keep the boundary closed.

use crate::graph::{NodeMask, RoutingGraph};
use crate::types::{Cost, NodeIdx, INFEASIBLE};

/// Cost of parking the car before continuing in the next mode.
pub const DEFAULT_PARKING_COST: Cost = 300;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TransitionKind {
    /// Feasible only at nodes flagged as parking.
    Parking,
    /// Feasible everywhere (e.g. dismounting).
    Fixed,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Transition {
    pub kind: TransitionKind,
    pub cost: Cost,
}

impl Transition {
    pub fn parking(cost: Cost) -> Self {
        Self {
            kind: TransitionKind::Parking,
            cost,
        }
    }

    pub fn fixed(cost: Cost) -> Self {
        Self {
            kind: TransitionKind::Fixed,
            cost,
        }
    }

    /// Extra cost of crossing this boundary at `node`, INFEASIBLE when the
    /// switch is not possible there. A blocked node never admits a switch.
    pub fn eval(&self, g: &RoutingGraph, node: NodeIdx, blocked: Option<&NodeMask>) -> Cost {
        if blocked.is_some_and(|b| b.get(node)) {
            return INFEASIBLE;
        }
        match self.kind {
            TransitionKind::Parking => {
                if g.node_properties(node).is_parking() {
                    self.cost
                } else {
                    INFEASIBLE
                }
            }
            TransitionKind::Fixed => self.cost,
        }
    }
}
