//! Road geometry and the lazily filled per-region geometry cache

use std::sync::{Arc, OnceLock};

use geo::{Distance, Euclidean, Point};
use hashbrown::HashMap;

use crate::{Error, FeatureId, PointId, RegionId, model::AccessType};

/// Immutable description of one road feature
#[derive(Debug, Clone, PartialEq)]
pub struct RoadGeometry {
    points: Vec<Point<f64>>,
    speed_kmph: f64,
    one_way: bool,
    pass_through_allowed: bool,
    is_ferry: bool,
    access: AccessType,
    point_access: HashMap<PointId, AccessType>,
}

impl RoadGeometry {
    /// Two-way road open to everyone
    pub fn new(points: Vec<Point<f64>>, speed_kmph: f64) -> Self {
        Self {
            points,
            speed_kmph,
            one_way: false,
            pass_through_allowed: true,
            is_ferry: false,
            access: AccessType::Yes,
            point_access: HashMap::new(),
        }
    }

    pub fn with_one_way(mut self, one_way: bool) -> Self {
        self.one_way = one_way;
        self
    }

    pub fn with_pass_through(mut self, allowed: bool) -> Self {
        self.pass_through_allowed = allowed;
        self
    }

    pub fn with_ferry(mut self, is_ferry: bool) -> Self {
        self.is_ferry = is_ferry;
        self
    }

    pub fn with_access(mut self, access: AccessType) -> Self {
        self.access = access;
        self
    }

    pub fn with_point_access(mut self, point_id: PointId, access: AccessType) -> Self {
        self.point_access.insert(point_id, access);
        self
    }

    /// One-way road over `points` carrying the attributes of `source`
    pub fn derived(points: Vec<Point<f64>>, source: &Self) -> Self {
        Self::piece(points, source).with_one_way(true)
    }

    /// Road over `points` with the attributes and direction of `source`, without
    /// its barriers
    pub fn piece(points: Vec<Point<f64>>, source: &Self) -> Self {
        Self {
            points,
            speed_kmph: source.speed_kmph,
            one_way: source.one_way,
            pass_through_allowed: source.pass_through_allowed,
            is_ferry: source.is_ferry,
            access: source.access,
            point_access: HashMap::new(),
        }
    }

    pub fn points(&self) -> &[Point<f64>] {
        &self.points
    }

    pub fn point(&self, point_id: PointId) -> Option<Point<f64>> {
        self.points.get(point_id as usize).copied()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn last_point_id(&self) -> PointId {
        self.points.len().saturating_sub(1) as PointId
    }

    pub fn is_end_point(&self, point_id: PointId) -> bool {
        point_id == 0 || point_id == self.last_point_id()
    }

    pub fn speed_kmph(&self) -> f64 {
        self.speed_kmph
    }

    pub fn is_one_way(&self) -> bool {
        self.one_way
    }

    pub fn is_pass_through_allowed(&self) -> bool {
        self.pass_through_allowed
    }

    pub fn is_ferry(&self) -> bool {
        self.is_ferry
    }

    pub fn access(&self) -> AccessType {
        self.access
    }

    pub fn point_access(&self, point_id: PointId) -> AccessType {
        self.point_access
            .get(&point_id)
            .copied()
            .unwrap_or(AccessType::Yes)
    }

    /// Point access values set explicitly, sorted by point id
    pub fn barriers(&self) -> Vec<(PointId, AccessType)> {
        let mut barriers: Vec<_> = self.point_access.iter().map(|(&p, &a)| (p, a)).collect();
        barriers.sort_by_key(|&(p, _)| p);
        barriers
    }

    /// A road with a positive speed and at least one segment
    pub fn is_routable(&self) -> bool {
        self.speed_kmph > 0.0 && self.points.len() >= 2
    }

    /// Length in metres between two consecutive points
    pub fn segment_length(&self, segment_idx: u32) -> f64 {
        match (self.point(segment_idx), self.point(segment_idx + 1)) {
            (Some(a), Some(b)) => Euclidean.distance(a, b),
            _ => 0.0,
        }
    }

    pub fn length(&self) -> f64 {
        (0..self.points.len().saturating_sub(1) as u32)
            .map(|idx| self.segment_length(idx))
            .sum()
    }
}

/// Source of road geometry for one region
pub trait GeometryLoader: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the feature is unknown or its data cannot be read.
    fn load(&self, feature_id: FeatureId) -> Result<RoadGeometry, Error>;
}

/// Per-region geometry cache.
///
/// Roads are loaded on first access and never change afterwards. A failed load
/// is not cached, so a later access retries it.
pub struct Geometry {
    region: RegionId,
    loader: Box<dyn GeometryLoader>,
    roads: HashMap<FeatureId, OnceLock<Arc<RoadGeometry>>>,
    fake_roads: HashMap<FeatureId, Arc<RoadGeometry>>,
}

impl Geometry {
    pub fn new(
        region: RegionId,
        loader: Box<dyn GeometryLoader>,
        feature_ids: impl IntoIterator<Item = FeatureId>,
    ) -> Self {
        let roads = feature_ids
            .into_iter()
            .map(|feature_id| (feature_id, OnceLock::new()))
            .collect();
        Self {
            region,
            loader,
            roads,
            fake_roads: HashMap::new(),
        }
    }

    pub fn region(&self) -> RegionId {
        self.region
    }

    /// # Errors
    ///
    /// Returns [`Error::FeatureNotFound`] for ids outside this region, or the loader
    /// error when the road cannot be read.
    pub fn road(&self, feature_id: FeatureId) -> Result<Arc<RoadGeometry>, Error> {
        if let Some(road) = self.fake_roads.get(&feature_id) {
            return Ok(Arc::clone(road));
        }
        let cell = self.roads.get(&feature_id).ok_or(Error::FeatureNotFound {
            region: self.region,
            feature: feature_id,
        })?;
        if let Some(road) = cell.get() {
            return Ok(Arc::clone(road));
        }
        let loaded = Arc::new(self.loader.load(feature_id)?);
        Ok(Arc::clone(cell.get_or_init(|| loaded)))
    }

    pub fn contains(&self, feature_id: FeatureId) -> bool {
        self.roads.contains_key(&feature_id) || self.fake_roads.contains_key(&feature_id)
    }

    pub fn insert_fake(&mut self, feature_id: FeatureId, road: RoadGeometry) {
        self.fake_roads.insert(feature_id, Arc::new(road));
    }

    /// Real feature ids, sorted
    pub fn feature_ids(&self) -> Vec<FeatureId> {
        let mut ids: Vec<_> = self.roads.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn num_loaded(&self) -> usize {
        self.roads.values().filter(|cell| cell.get().is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingLoader {
        loads: Arc<AtomicUsize>,
    }

    impl GeometryLoader for CountingLoader {
        fn load(&self, feature_id: FeatureId) -> Result<RoadGeometry, Error> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if feature_id == 13 {
                return Err(Error::InvalidData("corrupt feature".into()));
            }
            Ok(RoadGeometry::new(
                vec![Point::new(0.0, 0.0), Point::new(f64::from(feature_id), 0.0)],
                50.0,
            ))
        }
    }

    #[test]
    fn roads_are_loaded_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let geometry = Geometry::new(
            0,
            Box::new(CountingLoader {
                loads: Arc::clone(&loads),
            }),
            [1, 2, 13],
        );

        let first = geometry.road(2).unwrap();
        let second = geometry.road(2).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(geometry.num_loaded(), 1);
    }

    #[test]
    fn failed_loads_are_retried() {
        let loads = Arc::new(AtomicUsize::new(0));
        let geometry = Geometry::new(
            0,
            Box::new(CountingLoader {
                loads: Arc::clone(&loads),
            }),
            [13],
        );
        assert!(geometry.road(13).is_err());
        assert!(geometry.road(13).is_err());
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unknown_features_are_reported() {
        let geometry = Geometry::new(
            4,
            Box::new(CountingLoader {
                loads: Arc::new(AtomicUsize::new(0)),
            }),
            [1],
        );
        assert!(matches!(
            geometry.road(99),
            Err(Error::FeatureNotFound {
                region: 4,
                feature: 99
            })
        ));
    }

    #[test]
    fn road_measures_and_barriers() {
        let road = RoadGeometry::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(3.0, 4.0),
                Point::new(3.0, 10.0),
            ],
            36.0,
        )
        .with_point_access(1, AccessType::No);
        assert_eq!(road.segment_length(0), 5.0);
        assert_eq!(road.length(), 11.0);
        assert!(road.is_end_point(2));
        assert!(!road.is_end_point(1));
        assert_eq!(road.point_access(1), AccessType::No);
        assert_eq!(road.point_access(0), AccessType::Yes);
        assert_eq!(road.barriers(), vec![(1, AccessType::No)]);
    }
}
