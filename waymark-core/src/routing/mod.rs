//! Cost model, search and request orchestration.

pub mod astar;
pub mod delegate;
pub mod estimator;
pub mod leaps;
pub mod progress;
pub mod route;
pub mod router;
pub mod snapping;
pub mod starter;
pub mod traffic;

pub use delegate::{CancelToken, NoopDelegate, RouterDelegate};
pub use estimator::{
    BicycleEstimator, CarEstimator, EdgeEstimator, PedestrianEstimator, Purpose, VehicleType,
    create_estimator,
};
pub use leaps::process_leaps;
pub use progress::{AStarProgress, ProgressObserver};
pub use route::{RegionTransition, Route};
pub use router::{IndexRouter, RegionAdjacency, select_mode};
pub use snapping::{RoadSnapper, SnappedPoint};
pub use starter::{Endpoint, IndexGraphStarter, RoutePoint};
pub use traffic::{SpeedGroup, TrafficStash};
