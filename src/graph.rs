//! Street graph store: node/way properties, adjacency, blocked-node mask
//! and directory persistence.
//!
//! Layout (little-endian, mmap-friendly): every large table is one
//! headerless record file plus a small JSON meta with the node/way counts.
//! Adjacency is CSR both ways - for each node the ways through it with the
//! node's position inside each way, and for each way its node list with
//! per-segment distances. Expansion walks a way one position left or right.

use std::fs;
use std::ops::Deref;
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::mmap_vec::{MmapVec, StoreError};
use crate::types::{Distance, Level, NodeIdx, WayIdx};

/// Per-node flags and level, two bytes per node.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Pod, Zeroable)]
pub struct NodeProperties {
    pub flags: u8,
    pub level: u8,
}

impl NodeProperties {
    pub const FOOT: u8 = 1 << 0;
    pub const BIKE: u8 = 1 << 1;
    pub const CAR: u8 = 1 << 2;
    pub const PARKING: u8 = 1 << 3;

    pub fn new(flags: u8, level: Level) -> Self {
        Self {
            flags,
            level: level.0,
        }
    }

    /// Accessible to every mode, ground level.
    pub fn all_modes() -> Self {
        Self::new(Self::FOOT | Self::BIKE | Self::CAR, Level::GROUND)
    }

    pub fn with_parking(mut self) -> Self {
        self.flags |= Self::PARKING;
        self
    }

    #[inline]
    pub fn is_foot_accessible(self) -> bool {
        self.flags & Self::FOOT != 0
    }

    #[inline]
    pub fn is_bike_accessible(self) -> bool {
        self.flags & Self::BIKE != 0
    }

    #[inline]
    pub fn is_car_accessible(self) -> bool {
        self.flags & Self::CAR != 0
    }

    #[inline]
    pub fn is_parking(self) -> bool {
        self.flags & Self::PARKING != 0
    }

    #[inline]
    pub fn level(self) -> Level {
        Level(self.level)
    }
}

/// Per-way flags, speed limit and level, three bytes per way.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Pod, Zeroable)]
pub struct WayProperties {
    pub flags: u8,
    pub speed_kmh: u8,
    pub level: u8,
}

impl WayProperties {
    pub const FOOT: u8 = 1 << 0;
    pub const BIKE: u8 = 1 << 1;
    pub const CAR: u8 = 1 << 2;
    pub const ONEWAY_CAR: u8 = 1 << 3;
    pub const ONEWAY_BIKE: u8 = 1 << 4;
    pub const STEPS: u8 = 1 << 5;

    pub fn new(flags: u8, speed_kmh: u8, level: Level) -> Self {
        Self {
            flags,
            speed_kmh,
            level: level.0,
        }
    }

    /// A general road: every mode, given car speed limit.
    pub fn road(speed_kmh: u8) -> Self {
        Self::new(Self::FOOT | Self::BIKE | Self::CAR, speed_kmh, Level::GROUND)
    }

    /// Foot-only path.
    pub fn footpath() -> Self {
        Self::new(Self::FOOT, 0, Level::GROUND)
    }

    pub fn with_oneway_car(mut self) -> Self {
        self.flags |= Self::ONEWAY_CAR;
        self
    }

    pub fn with_oneway_bike(mut self) -> Self {
        self.flags |= Self::ONEWAY_BIKE;
        self
    }

    pub fn with_steps(mut self) -> Self {
        self.flags |= Self::STEPS;
        self
    }

    #[inline]
    pub fn is_foot_accessible(self) -> bool {
        self.flags & Self::FOOT != 0
    }

    #[inline]
    pub fn is_bike_accessible(self) -> bool {
        self.flags & Self::BIKE != 0
    }

    #[inline]
    pub fn is_car_accessible(self) -> bool {
        self.flags & Self::CAR != 0
    }

    #[inline]
    pub fn is_oneway_car(self) -> bool {
        self.flags & Self::ONEWAY_CAR != 0
    }

    #[inline]
    pub fn is_oneway_bike(self) -> bool {
        self.flags & Self::ONEWAY_BIKE != 0
    }

    #[inline]
    pub fn is_steps(self) -> bool {
        self.flags & Self::STEPS != 0
    }

    #[inline]
    pub fn level(self) -> Level {
        Level(self.level)
    }
}

/// Table storage: heap-built during construction, file-mapped after `load`.
pub enum Table<T: Pod> {
    Heap(Vec<T>),
    Mapped(MmapVec<T>),
}

impl<T: Pod> Table<T> {
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        match self {
            Table::Heap(v) => v,
            Table::Mapped(m) => m.as_slice(),
        }
    }
}

impl<T: Pod> Deref for Table<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Pod> From<Vec<T>> for Table<T> {
    fn from(v: Vec<T>) -> Self {
        Table::Heap(v)
    }
}

/// Shared bitset over node indices, used as the blocked-node filter.
/// One bit per node, eight nodes per byte.
pub struct NodeMask {
    bits: Vec<u8>,
    len: usize,
}

impl NodeMask {
    pub fn new(len: usize) -> Self {
        Self {
            bits: vec![0u8; len.div_ceil(8)],
            len,
        }
    }

    #[inline]
    pub fn set(&mut self, n: NodeIdx, value: bool) {
        let byte_idx = n.idx() / 8;
        let bit_idx = n.idx() % 8;
        if byte_idx < self.bits.len() {
            if value {
                self.bits[byte_idx] |= 1 << bit_idx;
            } else {
                self.bits[byte_idx] &= !(1 << bit_idx);
            }
        }
    }

    #[inline]
    pub fn get(&self, n: NodeIdx) -> bool {
        let byte_idx = n.idx() / 8;
        let bit_idx = n.idx() % 8;
        byte_idx < self.bits.len() && (self.bits[byte_idx] >> bit_idx) & 1 == 1
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The read-only routing graph. Built once (builder or `load`), then shared
/// across search workers.
pub struct RoutingGraph {
    node_props: Table<NodeProperties>,
    way_props: Table<WayProperties>,
    node_way_offsets: Table<u32>,
    node_way_ids: Table<WayIdx>,
    node_way_pos: Table<u16>,
    way_node_offsets: Table<u32>,
    way_node_ids: Table<NodeIdx>,
    way_seg_offsets: Table<u32>,
    way_seg_dist: Table<u16>,
}

impl RoutingGraph {
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.node_props.len()
    }

    #[inline]
    pub fn n_ways(&self) -> usize {
        self.way_props.len()
    }

    #[inline]
    pub fn node_properties(&self, n: NodeIdx) -> NodeProperties {
        self.node_props[n.idx()]
    }

    #[inline]
    pub fn way_properties(&self, w: WayIdx) -> WayProperties {
        self.way_props[w.idx()]
    }

    /// Ways through `n`, each with the position of `n` inside that way's
    /// node list. Iteration order defines the per-node way-list index used
    /// by profiles that track an arrival way.
    #[inline]
    pub fn node_ways(&self, n: NodeIdx) -> impl Iterator<Item = (WayIdx, u16)> + '_ {
        let lo = self.node_way_offsets[n.idx()] as usize;
        let hi = self.node_way_offsets[n.idx() + 1] as usize;
        self.node_way_ids[lo..hi]
            .iter()
            .copied()
            .zip(self.node_way_pos[lo..hi].iter().copied())
    }

    #[inline]
    pub fn way_nodes(&self, w: WayIdx) -> &[NodeIdx] {
        let lo = self.way_node_offsets[w.idx()] as usize;
        let hi = self.way_node_offsets[w.idx() + 1] as usize;
        &self.way_node_ids[lo..hi]
    }

    /// Distance of the segment between way positions `seg` and `seg + 1`.
    #[inline]
    pub fn seg_distance(&self, w: WayIdx, seg: u16) -> Distance {
        let lo = self.way_seg_offsets[w.idx()] as usize;
        self.way_seg_dist[lo + seg as usize]
    }

    /// Way-list index of `w` at node `n` (the arrival-way slot profiles
    /// store), or None when `w` does not pass through `n`.
    pub fn way_pos_at(&self, n: NodeIdx, w: WayIdx) -> Option<u16> {
        self.node_ways(n)
            .position(|(way, _)| way == w)
            .map(|i| i as u16)
    }

    pub fn save(&self, dir: &Path) -> Result<(), StoreError> {
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            op: "create dir",
            path: dir.to_path_buf(),
            source,
        })?;

        write_table(dir, files::NODE_PROPS, &self.node_props)?;
        write_table(dir, files::WAY_PROPS, &self.way_props)?;
        write_table(dir, files::NODE_WAY_OFFSETS, &self.node_way_offsets)?;
        write_table(dir, files::NODE_WAY_IDS, &self.node_way_ids)?;
        write_table(dir, files::NODE_WAY_POS, &self.node_way_pos)?;
        write_table(dir, files::WAY_NODE_OFFSETS, &self.way_node_offsets)?;
        write_table(dir, files::WAY_NODE_IDS, &self.way_node_ids)?;
        write_table(dir, files::WAY_SEG_OFFSETS, &self.way_seg_offsets)?;
        write_table(dir, files::WAY_SEG_DIST, &self.way_seg_dist)?;

        let meta = GraphMeta {
            n_nodes: self.n_nodes() as u64,
            n_ways: self.n_ways() as u64,
        };
        let meta_path = dir.join(files::META);
        let json = serde_json::to_string_pretty(&meta).map_err(|e| StoreError::Corrupt {
            path: meta_path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&meta_path, json).map_err(|source| StoreError::Io {
            op: "write",
            path: meta_path,
            source,
        })?;

        tracing::info!(
            n_nodes = self.n_nodes(),
            n_ways = self.n_ways(),
            dir = %dir.display(),
            "graph saved"
        );
        Ok(())
    }

    /// Open a saved graph with every table mapped read-only.
    pub fn load(dir: &Path) -> Result<Self, StoreError> {
        let meta_path = dir.join(files::META);
        let json = fs::read_to_string(&meta_path).map_err(|source| StoreError::Io {
            op: "read",
            path: meta_path.clone(),
            source,
        })?;
        let meta: GraphMeta = serde_json::from_str(&json).map_err(|e| StoreError::Corrupt {
            path: meta_path.clone(),
            reason: e.to_string(),
        })?;
        let n_nodes = meta.n_nodes as usize;
        let n_ways = meta.n_ways as usize;

        let g = Self {
            node_props: open_table(dir, files::NODE_PROPS)?,
            way_props: open_table(dir, files::WAY_PROPS)?,
            node_way_offsets: open_table(dir, files::NODE_WAY_OFFSETS)?,
            node_way_ids: open_table(dir, files::NODE_WAY_IDS)?,
            node_way_pos: open_table(dir, files::NODE_WAY_POS)?,
            way_node_offsets: open_table(dir, files::WAY_NODE_OFFSETS)?,
            way_node_ids: open_table(dir, files::WAY_NODE_IDS)?,
            way_seg_offsets: open_table(dir, files::WAY_SEG_OFFSETS)?,
            way_seg_dist: open_table(dir, files::WAY_SEG_DIST)?,
        };

        let ensure = |cond: bool, reason: &str| -> Result<(), StoreError> {
            if cond {
                Ok(())
            } else {
                Err(StoreError::Corrupt {
                    path: meta_path.clone(),
                    reason: reason.to_string(),
                })
            }
        };
        ensure(g.node_props.len() == n_nodes, "node property count mismatch")?;
        ensure(g.way_props.len() == n_ways, "way property count mismatch")?;
        check_offsets(&g.node_way_offsets, n_nodes, g.node_way_ids.len(), &meta_path, "node_way")?;
        ensure(
            g.node_way_pos.len() == g.node_way_ids.len(),
            "node way position table length mismatch",
        )?;
        check_offsets(&g.way_node_offsets, n_ways, g.way_node_ids.len(), &meta_path, "way_node")?;
        check_offsets(&g.way_seg_offsets, n_ways, g.way_seg_dist.len(), &meta_path, "way_seg")?;

        tracing::info!(
            n_nodes,
            n_ways,
            dir = %dir.display(),
            "graph mapped"
        );
        Ok(g)
    }
}

mod files {
    pub const META: &str = "graph_meta.json";
    pub const NODE_PROPS: &str = "node_props.bin";
    pub const WAY_PROPS: &str = "way_props.bin";
    pub const NODE_WAY_OFFSETS: &str = "node_way_offsets.bin";
    pub const NODE_WAY_IDS: &str = "node_way_ids.bin";
    pub const NODE_WAY_POS: &str = "node_way_pos.bin";
    pub const WAY_NODE_OFFSETS: &str = "way_node_offsets.bin";
    pub const WAY_NODE_IDS: &str = "way_node_ids.bin";
    pub const WAY_SEG_OFFSETS: &str = "way_seg_offsets.bin";
    pub const WAY_SEG_DIST: &str = "way_seg_dist.bin";
}

#[derive(Serialize, Deserialize)]
struct GraphMeta {
    n_nodes: u64,
    n_ways: u64,
}

fn write_table<T: Pod>(dir: &Path, name: &str, data: &[T]) -> Result<(), StoreError> {
    let mut v = MmapVec::<T>::create(&dir.join(name))?;
    v.resize(data.len())?;
    v.as_mut_slice().copy_from_slice(data);
    v.flush()
}

fn open_table<T: Pod>(dir: &Path, name: &str) -> Result<Table<T>, StoreError> {
    Ok(Table::Mapped(MmapVec::open_read_only(&dir.join(name))?))
}

fn check_offsets(
    offsets: &[u32],
    n: usize,
    data_len: usize,
    meta_path: &Path,
    what: &str,
) -> Result<(), StoreError> {
    let ok = offsets.len() == n + 1
        && offsets.first() == Some(&0)
        && offsets.last() == Some(&(data_len as u32))
        && offsets.windows(2).all(|w| w[0] <= w[1]);
    if ok {
        Ok(())
    } else {
        Err(StoreError::Corrupt {
            path: meta_path.to_path_buf(),
            reason: format!("{what} offsets are inconsistent"),
        })
    }
}

/// Incremental graph construction for tests, benchmarks and importers.
#[derive(Default)]
pub struct GraphBuilder {
    node_props: Vec<NodeProperties>,
    ways: Vec<(WayProperties, Vec<NodeIdx>, Vec<Distance>)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, props: NodeProperties) -> NodeIdx {
        let idx = NodeIdx(self.node_props.len() as u32);
        self.node_props.push(props);
        idx
    }

    pub fn add_way(
        &mut self,
        props: WayProperties,
        nodes: &[NodeIdx],
        seg_dists: &[Distance],
    ) -> WayIdx {
        assert!(nodes.len() >= 2, "a way needs at least two nodes");
        assert_eq!(
            seg_dists.len() + 1,
            nodes.len(),
            "one distance per way segment"
        );
        assert!(
            nodes.iter().all(|n| n.idx() < self.node_props.len()),
            "way references an unknown node"
        );
        let idx = WayIdx(self.ways.len() as u32);
        self.ways
            .push((props, nodes.to_vec(), seg_dists.to_vec()));
        idx
    }

    pub fn build(self) -> RoutingGraph {
        let n = self.node_props.len();

        let mut node_way_offsets = vec![0u32; n + 1];
        for (_, nodes, _) in &self.ways {
            for nd in nodes {
                node_way_offsets[nd.idx() + 1] += 1;
            }
        }
        for i in 0..n {
            node_way_offsets[i + 1] += node_way_offsets[i];
        }

        let total = node_way_offsets[n] as usize;
        let mut node_way_ids = vec![WayIdx::INVALID; total];
        let mut node_way_pos = vec![0u16; total];
        let mut cursor = node_way_offsets.clone();
        let mut way_node_offsets = vec![0u32; self.ways.len() + 1];
        let mut way_seg_offsets = vec![0u32; self.ways.len() + 1];
        let mut way_node_ids = Vec::new();
        let mut way_seg_dist = Vec::new();
        let mut way_props = Vec::with_capacity(self.ways.len());

        for (w, (props, nodes, dists)) in self.ways.into_iter().enumerate() {
            for (pos, nd) in nodes.iter().enumerate() {
                let at = cursor[nd.idx()] as usize;
                node_way_ids[at] = WayIdx(w as u32);
                node_way_pos[at] = pos as u16;
                cursor[nd.idx()] += 1;
            }
            way_node_ids.extend_from_slice(&nodes);
            way_seg_dist.extend_from_slice(&dists);
            way_node_offsets[w + 1] = way_node_ids.len() as u32;
            way_seg_offsets[w + 1] = way_seg_dist.len() as u32;
            way_props.push(props);
        }

        RoutingGraph {
            node_props: self.node_props.into(),
            way_props: way_props.into(),
            node_way_offsets: node_way_offsets.into(),
            node_way_ids: node_way_ids.into(),
            node_way_pos: node_way_pos.into(),
            way_node_offsets: way_node_offsets.into(),
            way_node_ids: way_node_ids.into(),
            way_seg_offsets: way_seg_offsets.into(),
            way_seg_dist: way_seg_dist.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_way_graph() -> RoutingGraph {
        let mut b = GraphBuilder::new();
        let n0 = b.add_node(NodeProperties::all_modes());
        let n1 = b.add_node(NodeProperties::all_modes());
        let n2 = b.add_node(NodeProperties::all_modes());
        b.add_way(WayProperties::road(50), &[n0, n1], &[100]);
        b.add_way(WayProperties::footpath(), &[n1, n2], &[40]);
        b.build()
    }

    #[test]
    fn builder_produces_consistent_adjacency() {
        let g = two_way_graph();
        assert_eq!(g.n_nodes(), 3);
        assert_eq!(g.n_ways(), 2);

        let ways_at_1: Vec<_> = g.node_ways(NodeIdx(1)).collect();
        assert_eq!(ways_at_1, vec![(WayIdx(0), 1), (WayIdx(1), 0)]);

        assert_eq!(g.way_nodes(WayIdx(0)), &[NodeIdx(0), NodeIdx(1)]);
        assert_eq!(g.seg_distance(WayIdx(0), 0), 100);
        assert_eq!(g.seg_distance(WayIdx(1), 0), 40);
    }

    #[test]
    fn way_pos_at_finds_the_way_list_slot() {
        let g = two_way_graph();
        assert_eq!(g.way_pos_at(NodeIdx(1), WayIdx(0)), Some(0));
        assert_eq!(g.way_pos_at(NodeIdx(1), WayIdx(1)), Some(1));
        assert_eq!(g.way_pos_at(NodeIdx(0), WayIdx(1)), None);
    }

    #[test]
    fn node_mask_set_get() {
        let mut m = NodeMask::new(10);
        assert!(!m.get(NodeIdx(3)));
        m.set(NodeIdx(3), true);
        assert!(m.get(NodeIdx(3)));
        m.set(NodeIdx(3), false);
        assert!(!m.get(NodeIdx(3)));
        assert!(!m.get(NodeIdx(999)));
    }

    #[test]
    fn save_then_load_round_trips() {
        let g = two_way_graph();
        let dir = tempfile::tempdir().unwrap();
        g.save(dir.path()).unwrap();

        let loaded = RoutingGraph::load(dir.path()).unwrap();
        assert_eq!(loaded.n_nodes(), g.n_nodes());
        assert_eq!(loaded.n_ways(), g.n_ways());
        for n in 0..g.n_nodes() {
            let n = NodeIdx(n as u32);
            assert_eq!(loaded.node_properties(n), g.node_properties(n));
            assert_eq!(
                loaded.node_ways(n).collect::<Vec<_>>(),
                g.node_ways(n).collect::<Vec<_>>()
            );
        }
        for w in 0..g.n_ways() {
            let w = WayIdx(w as u32);
            assert_eq!(loaded.way_properties(w), g.way_properties(w));
            assert_eq!(loaded.way_nodes(w), g.way_nodes(w));
        }
        assert_eq!(loaded.seg_distance(WayIdx(1), 0), 40);
    }

    #[test]
    fn load_rejects_truncated_table() {
        let g = two_way_graph();
        let dir = tempfile::tempdir().unwrap();
        g.save(dir.path()).unwrap();

        // Drop one record from the node property table.
        let p = dir.path().join("node_props.bin");
        let f = fs::OpenOptions::new().write(true).open(&p).unwrap();
        f.set_len(4).unwrap();

        assert!(matches!(
            RoutingGraph::load(dir.path()),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
