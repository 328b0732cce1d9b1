//! Algorithms built on top of the router

pub mod batch;
pub mod connectivity;
