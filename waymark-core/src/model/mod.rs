//! Addressing primitives and road data shared by the graph and routing layers.

pub mod edge;
pub mod geometry;
pub mod joint;
pub mod restriction;
pub mod road_access;
pub mod road_point;
pub mod route_weight;

pub use edge::{JointEdge, SegmentEdge};
pub use geometry::{Geometry, GeometryLoader, RoadGeometry};
pub use joint::{DirectedEdge, Joint};
pub use restriction::{Restriction, RestrictionKind};
pub use road_access::AccessType;
pub use road_point::{JointSegment, RoadPoint, Segment};
pub use route_weight::RouteWeight;
