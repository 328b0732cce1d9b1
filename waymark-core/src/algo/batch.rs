//! Many independent route requests over shared region graphs

use std::sync::Arc;

use geo::Point;
use log::info;
use rayon::prelude::*;

use crate::{
    Error,
    graph::SharedRegionGraphs,
    loading::{MapSource, RouterConfig},
    routing::{IndexRouter, Route, RouterDelegate, create_estimator},
};

/// Builds every region graph of `source` once for batch routing
///
/// # Errors
///
/// Fails on an invalid configuration or when a region cannot be built.
pub fn shared_graphs(source: &Arc<dyn MapSource>, config: &RouterConfig) -> Result<SharedRegionGraphs, Error> {
    config.validate()?;
    let estimator = create_estimator(config.vehicle, config.max_speed(), None);
    SharedRegionGraphs::build(source, estimator)
}

/// Routes every `(start, finish)` pair in parallel.
///
/// Each worker thread owns one router over the shared graphs; results keep the
/// order of `requests`.
///
/// # Errors
///
/// Fails up front on an invalid configuration. Failures of single requests are
/// returned in their slot.
pub fn route_many(
    source: &Arc<dyn MapSource>,
    graphs: &SharedRegionGraphs,
    config: &RouterConfig,
    requests: &[(Point<f64>, Point<f64>)],
    delegate: &dyn RouterDelegate,
) -> Result<Vec<Result<Route, Error>>, Error> {
    config.validate()?;
    info!("Routing {} requests over {} regions", requests.len(), graphs.len());

    let results: Vec<Result<Route, Error>> = requests
        .par_iter()
        .map_init(
            || IndexRouter::with_loader(Arc::clone(source), config.clone(), Box::new(graphs.clone())),
            |router, &(start, finish)| match router {
                Ok(router) => router.calculate_route(start, finish, delegate),
                Err(e) => Err(Error::InternalError(format!("Router setup failed: {e}"))),
            },
        )
        .collect();

    let found = results.iter().filter(|r| r.is_ok()).count();
    info!("Batch finished: {found} of {} routes found", results.len());
    Ok(results)
}
