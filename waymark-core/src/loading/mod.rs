//! This module is responsible for reading road data from a map source and
//! building the per-region routing graphs.

mod builder;
mod config;
mod joints_builder;
pub mod memory;
mod restriction_loader;
mod source;

pub use builder::{build_index_graph, build_index_graphs, region_coverage};
pub use config::RouterConfig;
pub use joints_builder::build_joints;
pub use memory::MemoryMap;
pub use restriction_loader::{RestrictionLoader, RestrictionStats, convert_only_to_no};
pub use source::{MapSource, RegionGeometryLoader};
