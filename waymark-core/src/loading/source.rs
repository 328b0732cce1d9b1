use std::sync::Arc;

use geo::{Intersects, Point, Rect};

use crate::{
    Error, FeatureId, RegionId,
    loading::build_joints,
    model::{GeometryLoader, Joint, Restriction, RoadGeometry},
};

/// Provider of region-partitioned road data
pub trait MapSource: Send + Sync {
    fn regions(&self) -> Vec<RegionId>;

    fn region_rect(&self, region: RegionId) -> Result<Rect<f64>, Error>;

    /// First region whose rectangle contains `point`
    fn region_at(&self, point: Point<f64>) -> Option<RegionId> {
        self.regions().into_iter().find(|&region| {
            self.region_rect(region)
                .is_ok_and(|rect| rect.intersects(&point))
        })
    }

    fn feature_ids(&self, region: RegionId) -> Result<Vec<FeatureId>, Error>;

    fn load_road(&self, region: RegionId, feature_id: FeatureId) -> Result<RoadGeometry, Error>;

    /// Raw restriction records of a region
    fn restrictions(&self, region: RegionId) -> Result<Vec<Restriction>, Error>;

    /// Joints of a region. By default every location shared by at least two road
    /// points becomes a joint.
    fn joints(&self, region: RegionId) -> Result<Vec<Joint>, Error> {
        build_joints(self, region)
    }
}

/// Geometry loader reading one region of a map source
pub struct RegionGeometryLoader {
    source: Arc<dyn MapSource>,
    region: RegionId,
}

impl RegionGeometryLoader {
    pub fn new(source: Arc<dyn MapSource>, region: RegionId) -> Self {
        Self { source, region }
    }
}

impl GeometryLoader for RegionGeometryLoader {
    fn load(&self, feature_id: FeatureId) -> Result<RoadGeometry, Error> {
        self.source.load_road(self.region, feature_id)
    }
}
