//! Per-region adjacency and its composition into a world graph.

pub mod cross_region;
pub mod fake_graph;
pub mod index_graph;
pub mod joint_index;
pub mod loader;
mod restrictions;
pub mod road_index;
pub mod world_graph;

pub use cross_region::{CrossRegionGraph, RegionTransitions};
pub use fake_graph::{FakeGraph, GraphView};
pub use index_graph::IndexGraph;
pub use joint_index::JointIndex;
pub use loader::{IndexGraphLoader, LazyGraphLoader, SharedRegionGraphs};
pub use road_index::{RoadIndex, RoadJointIds};
pub use world_graph::{SingleVehicleWorldGraph, WorldGraph, WorldGraphMode};
