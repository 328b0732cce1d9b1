//! Nearest-road lookup for start and finish locations

use geo::{Closest, ClosestPoint, Distance, Euclidean, Point};
use hashbrown::HashMap;
use log::debug;
use rstar::{
    RTree,
    primitives::{GeomWithData, Line},
};

use crate::{
    Error, FeatureId, RegionId,
    graph::IndexGraph,
    model::{RoadPoint, Segment},
};

type IndexedSegment = GeomWithData<Line<[f64; 2]>, (FeatureId, u32)>;

/// Projections closer than this to a segment end are moved onto it, in metres
const VERTEX_TOLERANCE_M: f64 = 1e-6;

/// Location projected onto a road segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnappedPoint {
    pub region: RegionId,
    /// Forward segment under the location
    pub segment: Segment,
    /// Projection of the location onto `segment`
    pub point: Point<f64>,
    /// End point of `segment` the projection falls on, `None` inside the segment
    pub vertex: Option<RoadPoint>,
    /// Distance from the requested location to the road segment
    pub distance: f64,
}

/// Per-region segment trees, built on first use
#[derive(Default)]
pub struct RoadSnapper {
    trees: HashMap<RegionId, RTree<IndexedSegment>>,
}

impl RoadSnapper {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_region(&mut self, graph: &IndexGraph) -> Result<&RTree<IndexedSegment>, Error> {
        let region = graph.region();
        if !self.trees.contains_key(&region) {
            let mut entries = Vec::new();
            for feature_id in graph.geometry().feature_ids() {
                let road = graph.road(feature_id)?;
                for (idx, pair) in road.points().windows(2).enumerate() {
                    let line = Line::new([pair[0].x(), pair[0].y()], [pair[1].x(), pair[1].y()]);
                    entries.push(GeomWithData::new(line, (feature_id, idx as u32)));
                }
            }
            debug!("Indexed {} segments of region {region} for snapping", entries.len());
            self.trees.insert(region, RTree::bulk_load(entries));
        }
        self.trees
            .get(&region)
            .ok_or(Error::UnknownRegion(region))
    }

    /// Nearest usable road within `radius` of `location`, checking at most
    /// `max_candidates` segments ordered by distance.
    ///
    /// Roads that cannot be driven or are closed to everyone are skipped. The
    /// location is projected onto the chosen segment.
    ///
    /// # Errors
    ///
    /// Fails when a road of the region cannot be loaded.
    pub fn snap(
        &mut self,
        graph: &IndexGraph,
        location: Point<f64>,
        radius: f64,
        max_candidates: usize,
    ) -> Result<Option<SnappedPoint>, Error> {
        let tree = self.ensure_region(graph)?;
        let radius_2 = radius * radius;
        let candidates: Vec<(FeatureId, u32, f64)> = tree
            .nearest_neighbor_iter_with_distance_2(&[location.x(), location.y()])
            .take(max_candidates)
            .take_while(|(_, distance_2)| *distance_2 <= radius_2)
            .map(|(entry, distance_2)| (entry.data.0, entry.data.1, distance_2.sqrt()))
            .collect();

        for (feature_id, segment_idx, distance) in candidates {
            let road = graph.road(feature_id)?;
            if !road.is_routable() || road.access().is_blocked() {
                continue;
            }
            let (Some(a), Some(b)) = (road.point(segment_idx), road.point(segment_idx + 1)) else {
                continue;
            };
            let (point, vertex) = project(location, a, b, feature_id, segment_idx);
            return Ok(Some(SnappedPoint {
                region: graph.region(),
                segment: Segment::new(graph.region(), feature_id, segment_idx, true),
                point,
                vertex,
                distance,
            }));
        }
        Ok(None)
    }

    pub fn clear(&mut self) {
        self.trees.clear();
    }
}

/// Closest point of the segment `a -> b` to `location` and the end point it
/// coincides with
fn project(
    location: Point<f64>,
    a: Point<f64>,
    b: Point<f64>,
    feature_id: FeatureId,
    segment_idx: u32,
) -> (Point<f64>, Option<RoadPoint>) {
    let point = match geo::Line::new(a, b).closest_point(&location) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => p,
        Closest::Indeterminate => a,
    };
    if Euclidean.distance(point, a) <= VERTEX_TOLERANCE_M {
        (a, Some(RoadPoint::new(feature_id, segment_idx)))
    } else if Euclidean.distance(point, b) <= VERTEX_TOLERANCE_M {
        (b, Some(RoadPoint::new(feature_id, segment_idx + 1)))
    } else {
        (point, None)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        loading::{MapSource, MemoryMap, build_index_graph},
        model::{AccessType, RoadGeometry},
        routing::{VehicleType, create_estimator},
    };

    fn graph(roads: Vec<(FeatureId, RoadGeometry)>) -> IndexGraph {
        let source: Arc<dyn MapSource> = Arc::new(MemoryMap::single_region(roads));
        build_index_graph(&source, 0, create_estimator(VehicleType::Car, 130.0, None)).unwrap()
    }

    fn road(points: &[(f64, f64)]) -> RoadGeometry {
        RoadGeometry::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect(), 36.0)
    }

    #[test]
    fn locations_are_projected_inside_segments() {
        let graph = graph(vec![(1, road(&[(0.0, 0.0), (100.0, 0.0), (200.0, 0.0)]))]);
        let mut snapper = RoadSnapper::new();
        let snapped = snapper
            .snap(&graph, Point::new(150.0, 20.0), 50.0, 8)
            .unwrap()
            .unwrap();
        assert_eq!(snapped.segment, Segment::new(0, 1, 1, true));
        assert_eq!(snapped.point, Point::new(150.0, 0.0));
        assert_eq!(snapped.vertex, None);
        assert!((snapped.distance - 20.0).abs() < 1e-9);

        let on_vertex = snapper
            .snap(&graph, Point::new(100.0, 5.0), 50.0, 8)
            .unwrap()
            .unwrap();
        assert_eq!(on_vertex.point, Point::new(100.0, 0.0));
        assert_eq!(on_vertex.vertex, Some(RoadPoint::new(1, 1)));
    }

    #[test]
    fn closed_and_distant_roads_are_skipped() {
        let graph = graph(vec![
            (1, road(&[(0.0, 0.0), (100.0, 0.0)]).with_access(AccessType::No)),
            (2, road(&[(0.0, 30.0), (100.0, 30.0)])),
        ]);
        let mut snapper = RoadSnapper::new();
        let snapped = snapper.snap(&graph, Point::new(50.0, 1.0), 50.0, 8).unwrap().unwrap();
        assert_eq!(snapped.segment.feature_id(), 2);
        assert_eq!(snapped.point, Point::new(50.0, 30.0));
        assert!(snapper.snap(&graph, Point::new(50.0, 500.0), 50.0, 8).unwrap().is_none());
    }
}
