use std::sync::Arc;

use geo::Intersects;
use log::{debug, info, warn};
use rayon::prelude::*;

use super::restriction_loader::RestrictionLoader;
use super::source::{MapSource, RegionGeometryLoader};
use crate::{Error, RegionId, graph::IndexGraph, model::Geometry, routing::EdgeEstimator};

/// Builds the routing graph of one region: geometry cache, joint tables and
/// restrictions.
///
/// # Errors
///
/// Returns an error if the region is unknown or its features or joints cannot be read.
/// Unreadable restrictions only produce a warning.
pub fn build_index_graph(
    source: &Arc<dyn MapSource>,
    region: RegionId,
    estimator: Arc<dyn EdgeEstimator>,
) -> Result<IndexGraph, Error> {
    let feature_ids = source.feature_ids(region)?;
    info!("Building graph of region {region} with {} features", feature_ids.len());

    let loader = RegionGeometryLoader::new(Arc::clone(source), region);
    let geometry = Geometry::new(region, Box::new(loader), feature_ids);
    let joints = source.joints(region)?;

    let mut graph = IndexGraph::new(region, geometry, estimator);
    graph.import(&joints);
    debug!(
        "Region {region}: {} joints over {} roads",
        graph.num_joints(),
        graph.road_index().num_roads()
    );

    let restrictions = RestrictionLoader::load(source.as_ref(), region, &graph);
    let stats = restrictions.stats();
    graph.apply_restrictions(restrictions.no_restrictions());
    info!(
        "Region {region}: {} restrictions loaded ({} No, {} Only turned into {} No, {} skipped), \
         {} restriction pairs",
        stats.loaded,
        stats.no,
        stats.only,
        stats.converted,
        stats.skipped,
        graph.restrictions().len()
    );

    Ok(graph)
}

/// Builds several region graphs on the rayon pool
///
/// # Errors
///
/// Returns the first region error.
pub fn build_index_graphs(
    source: &Arc<dyn MapSource>,
    regions: &[RegionId],
    estimator: &Arc<dyn EdgeEstimator>,
) -> Result<Vec<(RegionId, IndexGraph)>, Error> {
    regions
        .par_iter()
        .map(|&region| {
            build_index_graph(source, region, Arc::clone(estimator)).map(|graph| (region, graph))
        })
        .collect()
}

/// Share of road points of `region` lying outside its rectangle, in percent.
///
/// Stray points usually mean a misassigned feature; routes through them may miss
/// region transitions.
///
/// # Errors
///
/// Returns an error if the region or one of its roads cannot be read.
#[allow(clippy::cast_precision_loss)]
pub fn region_coverage(source: &dyn MapSource, region: RegionId) -> Result<f64, Error> {
    let rect = source.region_rect(region)?;
    let mut total = 0usize;
    let mut outside = 0usize;
    for feature_id in source.feature_ids(region)? {
        let road = source.load_road(region, feature_id)?;
        total += road.point_count();
        outside += road.points().iter().filter(|p| !rect.intersects(*p)).count();
    }
    if total == 0 {
        return Ok(0.0);
    }

    let percentage = (outside as f64 / total as f64) * 100.0;
    if outside > 0 {
        warn!(
            "{outside} of {total} road points ({percentage:.1}%) of region {region} lie outside \
             its rectangle. Roads crossing a border must be present in both regions."
        );
    }
    Ok(percentage)
}
