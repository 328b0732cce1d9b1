//! JSON description of a road network
//!
//! ```json
//! {
//!   "regions": [{ "id": 0, "min": [0, 0], "max": [100, 100] }],
//!   "roads": [{ "id": 1, "points": [[0, 0], [10, 0]], "speed_kmph": 50 }],
//!   "restrictions": [{ "kind": "no", "features": [1, 2] }]
//! }
//! ```
//!
//! Without regions the whole network becomes region 0.

use std::{fs::File, io::BufReader, path::Path};

use geo::{Point, Rect, coord};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use waymark_core::{
    Error, FeatureId, PointId, RegionId,
    loading::{MapSource, MemoryMap},
    model::{AccessType, Restriction, RestrictionKind, RoadGeometry},
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDescription {
    pub id: RegionId,
    pub min: [f64; 2],
    pub max: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarrierDescription {
    pub point: PointId,
    pub access: AccessType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadDescription {
    pub id: FeatureId,
    pub points: Vec<[f64; 2]>,
    pub speed_kmph: f64,
    #[serde(default)]
    pub one_way: bool,
    #[serde(default = "default_true")]
    pub pass_through: bool,
    #[serde(default)]
    pub ferry: bool,
    #[serde(default)]
    pub access: AccessType,
    #[serde(default)]
    pub barriers: Vec<BarrierDescription>,
}

impl RoadDescription {
    pub fn to_geometry(&self) -> RoadGeometry {
        let points = self.points.iter().map(|&[x, y]| Point::new(x, y)).collect();
        let mut road = RoadGeometry::new(points, self.speed_kmph)
            .with_one_way(self.one_way)
            .with_pass_through(self.pass_through)
            .with_ferry(self.ferry)
            .with_access(self.access);
        for barrier in &self.barriers {
            road = road.with_point_access(barrier.point, barrier.access);
        }
        road
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictionDescription {
    /// Region of the restriction; every region holding all its features when unset
    #[serde(default)]
    pub region: Option<RegionId>,
    pub kind: RestrictionKind,
    pub features: Vec<FeatureId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkDescription {
    #[serde(default)]
    pub regions: Vec<RegionDescription>,
    pub roads: Vec<RoadDescription>,
    #[serde(default)]
    pub restrictions: Vec<RestrictionDescription>,
}

impl NetworkDescription {
    /// # Errors
    ///
    /// Returns [`Error::Json`] for malformed input.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Returns [`Error::IoError`] when the file cannot be opened and [`Error::Json`]
    /// for malformed input.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = File::open(path.as_ref())?;
        let network: Self = serde_json::from_reader(BufReader::new(file))?;
        info!(
            "Read network {} with {} roads in {} regions",
            path.as_ref().display(),
            network.roads.len(),
            network.regions.len().max(1)
        );
        Ok(network)
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] for duplicate feature or region ids, roads
    /// with fewer than two points, or restrictions naming an unknown region.
    pub fn into_memory_map(self) -> Result<MemoryMap, Error> {
        let mut ids: Vec<FeatureId> = self.roads.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|w| w[0] == w[1]) {
            return Err(Error::InvalidData(format!("Duplicate road id {}", pair[0])));
        }
        if let Some(road) = self.roads.iter().find(|r| r.points.len() < 2) {
            return Err(Error::InvalidData(format!(
                "Road {} has fewer than two points",
                road.id
            )));
        }

        let mut map = if self.regions.is_empty() {
            MemoryMap::single_region(self.roads.iter().map(|r| (r.id, r.to_geometry())).collect())
        } else {
            let mut map = MemoryMap::new();
            for region in &self.regions {
                if map.regions().contains(&region.id) {
                    return Err(Error::InvalidData(format!("Duplicate region id {}", region.id)));
                }
                let rect = Rect::new(
                    coord! { x: region.min[0], y: region.min[1] },
                    coord! { x: region.max[0], y: region.max[1] },
                );
                map.add_region(region.id, rect);
            }
            for road in &self.roads {
                if map.add_road_by_location(road.id, road.to_geometry()) == 0 {
                    warn!("Road {} lies outside every region and is dropped", road.id);
                }
            }
            map
        };

        for restriction in self.restrictions {
            let record = Restriction::new(restriction.kind, restriction.features);
            match restriction.region {
                Some(region) => {
                    map.add_restriction(region, record)?;
                }
                None => {
                    let targets: Vec<RegionId> = map
                        .regions()
                        .into_iter()
                        .filter(|&region| {
                            map.feature_ids(region).is_ok_and(|features| {
                                record.feature_ids.iter().all(|f| features.binary_search(f).is_ok())
                            })
                        })
                        .collect();
                    if targets.is_empty() {
                        warn!("Restriction {record} matches no region");
                    }
                    for region in targets {
                        map.add_restriction(region, record.clone())?;
                    }
                }
            }
        }
        Ok(map)
    }
}
