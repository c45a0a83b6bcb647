//! Multi-modal street routing: profile-generic shortest paths with
//! mode-switching journeys.

pub mod dijkstra;
pub mod graph;
pub mod mmap_vec;
pub mod profiles;
pub mod route;
pub mod types;

pub use dijkstra::{Dijkstra, SearchStats};
pub use graph::{GraphBuilder, NodeMask, NodeProperties, RoutingGraph, WayProperties};
pub use mmap_vec::{MmapVec, StoreError};
pub use profiles::{
    BikeProfile, CarProfile, CombiProfile, FootProfile, Profile, ProfileError, SearchProfile,
    Transition,
};
pub use route::{route, Anchor, Route};
pub use types::{Cost, Direction, Distance, Level, NodeIdx, WayIdx, INFEASIBLE};
