//! In-memory map source, used by tests, benchmarks and the JSON network loader

use std::collections::BTreeMap;

use geo::{Intersects, Point, Rect, coord};
use log::debug;

use crate::{
    Error, FeatureId, RegionId,
    loading::MapSource,
    model::{Joint, Restriction, RoadGeometry},
};

#[derive(Debug, Clone)]
struct MemoryRegion {
    rect: Rect<f64>,
    roads: BTreeMap<FeatureId, RoadGeometry>,
    restrictions: Vec<Restriction>,
    joints: Option<Vec<Joint>>,
    corrupt_restrictions: bool,
}

impl MemoryRegion {
    fn new(rect: Rect<f64>) -> Self {
        Self {
            rect,
            roads: BTreeMap::new(),
            restrictions: Vec::new(),
            joints: None,
            corrupt_restrictions: false,
        }
    }
}

/// Map held entirely in memory, regions ordered by id
#[derive(Debug, Clone, Default)]
pub struct MemoryMap {
    regions: BTreeMap<RegionId, MemoryRegion>,
}

impl MemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// One region 0 covering every given road with a margin of one unit
    pub fn single_region(roads: Vec<(FeatureId, RoadGeometry)>) -> Self {
        let rect = bounding_rect(roads.iter().map(|(_, road)| road))
            .unwrap_or_else(|| Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 0.0, y: 0.0 }));
        let mut map = Self::new();
        map.add_region(0, expand(rect, 1.0));
        for (feature_id, road) in roads {
            if let Some(region) = map.regions.get_mut(&0) {
                region.roads.insert(feature_id, road);
            }
        }
        map
    }

    pub fn add_region(&mut self, region: RegionId, rect: Rect<f64>) -> &mut Self {
        self.regions.insert(region, MemoryRegion::new(rect));
        self
    }

    fn region_mut(&mut self, region: RegionId) -> Result<&mut MemoryRegion, Error> {
        self.regions
            .get_mut(&region)
            .ok_or(Error::UnknownRegion(region))
    }

    fn region(&self, region: RegionId) -> Result<&MemoryRegion, Error> {
        self.regions.get(&region).ok_or(Error::UnknownRegion(region))
    }

    /// # Errors
    ///
    /// Returns [`Error::UnknownRegion`] when the region was not added.
    pub fn add_road(
        &mut self,
        region: RegionId,
        feature_id: FeatureId,
        road: RoadGeometry,
    ) -> Result<&mut Self, Error> {
        self.region_mut(region)?.roads.insert(feature_id, road);
        Ok(self)
    }

    /// Adds `road` to every region whose rectangle contains one of its points.
    ///
    /// Roads crossing a border end up in both regions under the same feature id,
    /// which is what links regions together. Returns the number of regions.
    pub fn add_road_by_location(&mut self, feature_id: FeatureId, road: RoadGeometry) -> usize {
        let targets: Vec<RegionId> = self
            .regions
            .iter()
            .filter(|(_, region)| road.points().iter().any(|p| region.rect.intersects(p)))
            .map(|(&id, _)| id)
            .collect();
        if targets.is_empty() {
            debug!("Road {feature_id} lies outside every region");
        }
        for id in &targets {
            if let Some(region) = self.regions.get_mut(id) {
                region.roads.insert(feature_id, road.clone());
            }
        }
        targets.len()
    }

    /// # Errors
    ///
    /// Returns [`Error::UnknownRegion`] when the region was not added.
    pub fn add_restriction(
        &mut self,
        region: RegionId,
        restriction: Restriction,
    ) -> Result<&mut Self, Error> {
        self.region_mut(region)?.restrictions.push(restriction);
        Ok(self)
    }

    /// Replaces the coordinate-derived joints of a region
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRegion`] when the region was not added.
    pub fn set_joints(&mut self, region: RegionId, joints: Vec<Joint>) -> Result<&mut Self, Error> {
        self.region_mut(region)?.joints = Some(joints);
        Ok(self)
    }

    /// Makes restriction reads of a region fail, as an unreadable section would
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRegion`] when the region was not added.
    pub fn break_restrictions(&mut self, region: RegionId) -> Result<&mut Self, Error> {
        self.region_mut(region)?.corrupt_restrictions = true;
        Ok(self)
    }

    pub fn num_roads(&self, region: RegionId) -> usize {
        self.regions.get(&region).map_or(0, |r| r.roads.len())
    }
}

impl MapSource for MemoryMap {
    fn regions(&self) -> Vec<RegionId> {
        self.regions.keys().copied().collect()
    }

    fn region_rect(&self, region: RegionId) -> Result<Rect<f64>, Error> {
        Ok(self.region(region)?.rect)
    }

    fn feature_ids(&self, region: RegionId) -> Result<Vec<FeatureId>, Error> {
        Ok(self.region(region)?.roads.keys().copied().collect())
    }

    fn load_road(&self, region: RegionId, feature_id: FeatureId) -> Result<RoadGeometry, Error> {
        self.region(region)?
            .roads
            .get(&feature_id)
            .cloned()
            .ok_or(Error::FeatureNotFound {
                region,
                feature: feature_id,
            })
    }

    fn restrictions(&self, region: RegionId) -> Result<Vec<Restriction>, Error> {
        let data = self.region(region)?;
        if data.corrupt_restrictions {
            return Err(Error::InvalidData(format!(
                "Restriction section of region {region} is unreadable"
            )));
        }
        Ok(data.restrictions.clone())
    }

    fn joints(&self, region: RegionId) -> Result<Vec<Joint>, Error> {
        match &self.region(region)?.joints {
            Some(joints) => Ok(joints.clone()),
            None => super::build_joints(self, region),
        }
    }
}

fn bounding_rect<'a>(roads: impl Iterator<Item = &'a RoadGeometry>) -> Option<Rect<f64>> {
    let mut points = roads.flat_map(|road| road.points().iter().copied());
    let first: Point<f64> = points.next()?;
    let (mut min, mut max) = (first.0, first.0);
    for p in points {
        min.x = min.x.min(p.x());
        min.y = min.y.min(p.y());
        max.x = max.x.max(p.x());
        max.y = max.y.max(p.y());
    }
    Some(Rect::new(min, max))
}

fn expand(rect: Rect<f64>, margin: f64) -> Rect<f64> {
    Rect::new(
        coord! { x: rect.min().x - margin, y: rect.min().y - margin },
        coord! { x: rect.max().x + margin, y: rect.max().y + margin },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn road(points: &[(f64, f64)]) -> RoadGeometry {
        RoadGeometry::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect(), 60.0)
    }

    #[test]
    fn border_roads_join_both_regions() {
        let mut map = MemoryMap::new();
        map.add_region(0, Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 10.0 }))
            .add_region(1, Rect::new(coord! { x: 10.0, y: 0.0 }, coord! { x: 20.0, y: 10.0 }));

        assert_eq!(map.add_road_by_location(1, road(&[(2.0, 2.0), (8.0, 2.0)])), 1);
        assert_eq!(map.add_road_by_location(2, road(&[(8.0, 2.0), (12.0, 2.0)])), 2);
        assert_eq!(map.feature_ids(0).unwrap(), vec![1, 2]);
        assert_eq!(map.feature_ids(1).unwrap(), vec![2]);
        assert_eq!(map.region_at(Point::new(15.0, 5.0)), Some(1));
        assert_eq!(map.region_at(Point::new(25.0, 5.0)), None);
    }

    #[test]
    fn unknown_region_is_an_error() {
        let mut map = MemoryMap::new();
        assert!(matches!(
            map.add_road(3, 1, road(&[(0.0, 0.0), (1.0, 0.0)])),
            Err(Error::UnknownRegion(3))
        ));
        assert!(map.break_restrictions(0).is_err());
    }
}
