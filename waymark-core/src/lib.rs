//! Route-graph substrate for an offline, region-partitioned road router.
//!
//! Roads are addressed by [`RoadPoint`](model::RoadPoint) and
//! [`Segment`](model::Segment); junctions are dense [`JointId`]s. Every region
//! builds one read-only [`IndexGraph`](graph::IndexGraph), and requests compose
//! regions through a [`WorldGraph`](graph::WorldGraph).

pub mod algo;
pub mod error;
pub mod graph;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;

pub use error::{Error, ResultCode, RouterError};

/// Road feature identifier inside a region
pub type FeatureId = u32;
/// Index of a point in a feature's point array
pub type PointId = u32;
/// Region (map partition) identifier
pub type RegionId = u16;
/// Dense junction identifier
pub type JointId = u32;

pub const INVALID_JOINT_ID: JointId = JointId::MAX;

/// First id handed out to features created by graph rewrites and route requests
pub const START_FAKE_FEATURE_IDS: FeatureId = 1024 * 1024 * 1024;

/// Maximum number of road candidates examined when snapping a location
pub const MAX_ROAD_CANDIDATES: usize = 6;
