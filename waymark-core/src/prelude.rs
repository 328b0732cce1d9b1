pub use crate::{Error, FeatureId, JointId, PointId, RegionId, ResultCode, RouterError};

// Request entry points
pub use crate::algo::batch::{route_many, shared_graphs};
pub use crate::loading::{MapSource, MemoryMap, RouterConfig};
pub use crate::routing::{
    CancelToken, IndexRouter, NoopDelegate, RegionTransition, Route, RouterDelegate, VehicleType,
};

// Graph layer
pub use crate::graph::{
    IndexGraph, IndexGraphLoader, LazyGraphLoader, SharedRegionGraphs, SingleVehicleWorldGraph,
    WorldGraph, WorldGraphMode,
};
pub use crate::model::{AccessType, Restriction, RestrictionKind, RoadGeometry, RoadPoint, RouteWeight, Segment};
