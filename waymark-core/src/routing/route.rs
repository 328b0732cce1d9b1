//! Result of a route request and its `GeoJSON` export

use geo::{Coord, LineString, Point};
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use serde_json::json;

use crate::{Error, RegionId, graph::WorldGraphMode, model::{RouteWeight, Segment}};

/// Region change along the route. `point_index` is the first route point lying in
/// region `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionTransition {
    pub from: RegionId,
    pub to: RegionId,
    pub point_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    points: Vec<Point<f64>>,
    /// Cumulative travel time in seconds per point index
    times: Vec<(usize, f64)>,
    segments: Vec<Segment>,
    region_transitions: Vec<RegionTransition>,
    weight: RouteWeight,
    mode: WorldGraphMode,
}

impl Route {
    /// Builds a route from a segment path whose polyline starts with the back point
    /// of the first segment followed by the front point of every segment
    pub fn new(
        points: Vec<Point<f64>>,
        times: Vec<(usize, f64)>,
        segments: Vec<Segment>,
        weight: RouteWeight,
        mode: WorldGraphMode,
    ) -> Self {
        let region_transitions = segments
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| pair[0].region() != pair[1].region())
            .map(|(idx, pair)| RegionTransition {
                from: pair[0].region(),
                to: pair[1].region(),
                point_index: (idx + 1).min(points.len().saturating_sub(1)),
            })
            .collect();
        Self {
            points,
            times,
            segments,
            region_transitions,
            weight,
            mode,
        }
    }

    pub fn points(&self) -> &[Point<f64>] {
        &self.points
    }

    pub fn times(&self) -> &[(usize, f64)] {
        &self.times
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn region_transitions(&self) -> &[RegionTransition] {
        &self.region_transitions
    }

    pub fn weight(&self) -> RouteWeight {
        self.weight
    }

    pub fn mode(&self) -> WorldGraphMode {
        self.mode
    }

    /// Travel time to the last point in seconds
    pub fn duration(&self) -> f64 {
        self.times.last().map_or(0.0, |&(_, time)| time)
    }

    /// Regions passed in travel order
    pub fn regions(&self) -> Vec<RegionId> {
        let mut regions: Vec<RegionId> = Vec::new();
        for segment in &self.segments {
            if regions.last() != Some(&segment.region()) {
                regions.push(segment.region());
            }
        }
        regions
    }

    /// Converts the route to a `GeoJSON` `FeatureCollection`: one line for the route
    /// and one point per region transition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GeoJsonError`] when a feature cannot be assembled.
    pub fn to_geojson(&self) -> Result<FeatureCollection, Error> {
        let mut features = Vec::with_capacity(self.region_transitions.len() + 1);

        let coords: Vec<Coord<f64>> = self.points.iter().map(|p| Coord::from(*p)).collect();
        let geometry = Geometry::new(GeoJsonValue::from(&LineString::new(coords)));
        let regions = self.regions();
        let value = json!({
            "type": "Feature",
            "geometry": geometry,
            "properties": {
                "feature_type": "route",
                "mode": self.mode.to_string(),
                "duration": self.duration(),
                "weight": self.weight.weight(),
                "segments": self.segments.len(),
                "regions": regions,
            }
        });
        features.push(serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))?);

        for transition in &self.region_transitions {
            let Some(point) = self.points.get(transition.point_index) else {
                continue;
            };
            let geometry = Geometry::new(GeoJsonValue::from(point));
            let value = json!({
                "type": "Feature",
                "geometry": geometry,
                "properties": {
                    "feature_type": "region_transition",
                    "from_region": transition.from,
                    "to_region": transition.to,
                    "point_index": transition.point_index,
                }
            });
            features.push(serde_json::from_value::<Feature>(value).map_err(|e| Error::GeoJsonError(e.to_string()))?);
        }

        Ok(FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        })
    }

    pub fn to_geojson_string(&self) -> Result<String, Error> {
        serde_json::to_string(&self.to_geojson()?).map_err(|e| Error::GeoJsonError(e.to_string()))
    }
}

/// Removes twin duplicates: a segment entering a new region repeats the exit it
/// continues, so it is dropped together with its region change. A segment for which
/// `replaces_exit` holds is kept and the exit before it is dropped instead.
///
/// Only used for direct cross-border searches where both copies end up in the path.
pub fn drop_twins(path: &[Segment], replaces_exit: impl Fn(&Segment) -> bool) -> Vec<Segment> {
    let mut result: Vec<Segment> = Vec::with_capacity(path.len());
    for segment in path {
        match result.last() {
            Some(prev) if prev.region() != segment.region() => {
                if replaces_exit(segment) {
                    result.pop();
                    result.push(*segment);
                }
            }
            _ => result.push(*segment),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_route() -> Route {
        let segments = vec![
            Segment::new(0, 1, 0, true),
            Segment::new(0, 1, 1, true),
            Segment::new(1, 4, 0, true),
        ];
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(30.0, 0.0),
        ];
        let times = vec![(0, 0.0), (1, 1.0), (2, 2.0), (3, 3.5)];
        Route::new(points, times, segments, RouteWeight::new(3.5), WorldGraphMode::NoLeaps)
    }

    #[test]
    fn region_changes_become_transitions() {
        let route = sample_route();
        assert_eq!(
            route.region_transitions(),
            &[RegionTransition {
                from: 0,
                to: 1,
                point_index: 2
            }]
        );
        assert_eq!(route.regions(), vec![0, 1]);
        assert!((route.duration() - 3.5).abs() < 1e-9);
    }

    #[test]
    fn geojson_has_route_line_and_transition_points() {
        let collection = sample_route().to_geojson().unwrap();
        assert_eq!(collection.features.len(), 2);

        let value = serde_json::to_value(&collection).unwrap();
        let route = &value["features"][0];
        assert_eq!(route["geometry"]["type"], "LineString");
        assert_eq!(route["geometry"]["coordinates"].as_array().map(Vec::len), Some(4));
        assert_eq!(route["properties"]["feature_type"], "route");
        assert_eq!(route["properties"]["mode"], "NoLeaps");

        let transition = &value["features"][1];
        assert_eq!(transition["geometry"]["type"], "Point");
        assert_eq!(transition["geometry"]["coordinates"][0].as_f64(), Some(20.0));
        assert_eq!(transition["properties"]["to_region"].as_u64(), Some(1));
    }

    #[test]
    fn twins_are_dropped_at_region_changes() {
        let path = vec![
            Segment::new(0, 1, 0, true),
            Segment::new(0, 1, 1, true),
            Segment::new(1, 3, 0, true),
            Segment::new(1, 3, 1, true),
        ];
        let deduped = drop_twins(&path, |_| false);
        assert_eq!(
            deduped,
            vec![
                Segment::new(0, 1, 0, true),
                Segment::new(0, 1, 1, true),
                Segment::new(1, 3, 1, true),
            ]
        );

        let partial = vec![Segment::new(0, 1, 0, true), Segment::new(0, 1, 1, true), Segment::new(1, 9, 0, true)];
        let deduped = drop_twins(&partial, |s| s.feature_id() == 9);
        assert_eq!(deduped, vec![Segment::new(0, 1, 0, true), Segment::new(1, 9, 0, true)]);
    }
}
