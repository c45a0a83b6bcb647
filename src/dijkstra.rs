//! Profile-generic best-first search.
//!
//! One engine drives every profile through the contract in
//! [`crate::profiles`]: a binary heap orders labels by cost, a hash map
//! keyed by the profile's key holds the per-node state, and stale heap
//! entries are skipped on pop. The engine is direction-aware; a backward
//! search settles costs toward the journey origin.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use crate::graph::{NodeMask, RoutingGraph};
use crate::profiles::{Label, Profile, SearchEntry};
use crate::types::{Cost, Direction, INFEASIBLE};

/// Heap element, ordered by cost alone so node types never need Ord.
struct QueueEntry<N> {
    cost: Cost,
    node: N,
}

impl<N> PartialEq for QueueEntry<N> {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}

impl<N> Eq for QueueEntry<N> {}

impl<N> PartialOrd for QueueEntry<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<N> Ord for QueueEntry<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost.cmp(&other.cost)
    }
}

/// Counters for one run.
#[derive(Clone, Copy, Debug, Default)]
pub struct SearchStats {
    /// Labels popped and expanded.
    pub settled: usize,
    /// Labels popped but already beaten.
    pub stale: usize,
    /// Edges offered by the profile.
    pub relaxed: usize,
    /// Edges that improved an entry.
    pub improved: usize,
}

/// The search engine. Built once per profile and reused across queries;
/// [`Dijkstra::reset`] drops state but keeps allocations.
pub struct Dijkstra<P: Profile> {
    profile: P,
    queue: BinaryHeap<Reverse<QueueEntry<P::Node>>>,
    cost: FxHashMap<P::Key, P::Entry>,
    stats: SearchStats,
}

impl<P: Profile> Dijkstra<P> {
    pub fn new(profile: P) -> Self {
        Self {
            profile,
            queue: BinaryHeap::new(),
            cost: FxHashMap::default(),
            stats: SearchStats::default(),
        }
    }

    #[inline]
    pub fn profile(&self) -> &P {
        &self.profile
    }

    #[inline]
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Clear all per-query state, keeping allocations for the next run.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.cost.clear();
        self.stats = SearchStats::default();
    }

    /// Seed the queue with a start node. Infeasible seeds and seeds beyond
    /// the budget are ignored; returns whether the seed was admitted. `max`
    /// must be the budget the following [`Dijkstra::run`] is given, so that
    /// no settled entry ever exceeds it.
    pub fn add_start(&mut self, node: P::Node, cost: Cost, max: Cost) -> bool {
        if cost == INFEASIBLE || cost > max {
            return false;
        }
        let label = Label::new(node, cost);
        let entry = self.cost.entry(P::key(node)).or_default();
        if entry.update(&label, node, cost, P::invalid_node()) {
            self.queue.push(Reverse(QueueEntry { cost, node }));
            true
        } else {
            false
        }
    }

    /// Settle labels until the queue drains. Labels whose cost would exceed
    /// `max` are never queued; `max` itself is still admitted.
    pub fn run(
        &mut self,
        g: &RoutingGraph,
        max: Cost,
        blocked: Option<&NodeMask>,
        search_dir: Direction,
    ) {
        while let Some(Reverse(QueueEntry { cost, node })) = self.queue.pop() {
            let best = self
                .cost
                .get(&P::key(node))
                .map_or(INFEASIBLE, |e| e.cost(node));
            if best < cost {
                self.stats.stale += 1;
                continue;
            }
            self.stats.settled += 1;

            let label = Label::new(node, cost);
            self.profile.adjacent(g, node, search_dir, blocked, |edge| {
                self.stats.relaxed += 1;
                let total = cost as u32 + edge.cost as u32;
                if total >= INFEASIBLE as u32 || total > max as u32 {
                    return;
                }
                let total = total as Cost;
                let entry = self.cost.entry(P::key(edge.to)).or_default();
                if entry.update(&label, edge.to, total, node) {
                    self.stats.improved += 1;
                    self.queue.push(Reverse(QueueEntry {
                        cost: total,
                        node: edge.to,
                    }));
                }
            });
        }
        tracing::trace!(
            dir = search_dir.name(),
            settled = self.stats.settled,
            relaxed = self.stats.relaxed,
            "search drained"
        );
    }

    /// Best known cost to reach `node`, INFEASIBLE when unreached.
    pub fn cost_to(&self, node: P::Node) -> Cost {
        self.cost
            .get(&P::key(node))
            .map_or(INFEASIBLE, |e| e.cost(node))
    }

    /// Walk predecessors from `node` back to a seed. The returned sequence
    /// is in travel order: a forward search's chain is reversed, a backward
    /// search's chain already runs origin to destination.
    pub fn path_to(&self, node: P::Node, search_dir: Direction) -> Vec<P::Node> {
        let mut nodes = vec![node];
        let mut at = node;
        while let Some(p) = self
            .cost
            .get(&P::key(at))
            .and_then(|e| e.pred(at, search_dir))
        {
            nodes.push(p);
            at = p;
        }
        if search_dir == Direction::Forward {
            nodes.reverse();
        }
        nodes
    }
}
