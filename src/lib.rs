//! Offline road routing over region-partitioned networks.
//!
//! The engine lives in `waymark_core`; this crate re-exports its prelude and adds
//! the JSON network description used by the command line tool and the tests.

pub mod network;

pub use network::{NetworkDescription, RegionDescription, RestrictionDescription, RoadDescription};
pub use waymark_core::prelude::*;
pub use waymark_core::{algo, graph, loading, model, routing};
