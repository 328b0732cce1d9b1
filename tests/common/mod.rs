#![allow(dead_code)]

use std::sync::Arc;

use geo::{Point, Rect, coord};
use waymark::{FeatureId, MapSource, MemoryMap, RoadGeometry, Route};

/// Speed at which every test road is driven in 10 s per 100 m
pub const SPEED_KMPH: f64 = 36.0;

pub fn road(points: &[(f64, f64)]) -> RoadGeometry {
    RoadGeometry::new(
        points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        SPEED_KMPH,
    )
}

pub fn one_way(points: &[(f64, f64)]) -> RoadGeometry {
    road(points).with_one_way(true)
}

pub fn single(roads: Vec<(FeatureId, RoadGeometry)>) -> Arc<dyn MapSource> {
    Arc::new(MemoryMap::single_region(roads))
}

pub fn rect(min: (f64, f64), max: (f64, f64)) -> Rect<f64> {
    Rect::new(coord! { x: min.0, y: min.1 }, coord! { x: max.0, y: max.1 })
}

/// Two-way grid of `size x size` nodes spaced 100 m apart
pub fn grid(size: u32) -> MemoryMap {
    let mut roads = Vec::new();
    let mut feature: FeatureId = 0;
    for i in 0..size {
        for j in 0..size - 1 {
            let a = f64::from(i) * 100.0;
            let (b, c) = (f64::from(j) * 100.0, f64::from(j + 1) * 100.0);
            feature += 1;
            roads.push((feature, road(&[(b, a), (c, a)])));
            feature += 1;
            roads.push((feature, road(&[(a, b), (a, c)])));
        }
    }
    MemoryMap::single_region(roads)
}

/// Three regions in a row along x, linked by two border-crossing roads at y = 50
pub fn three_regions() -> Arc<dyn MapSource> {
    let mut map = MemoryMap::new();
    map.add_region(0, rect((0.0, 0.0), (100.0, 100.0)))
        .add_region(1, rect((100.0, 0.0), (200.0, 100.0)))
        .add_region(2, rect((200.0, 0.0), (300.0, 100.0)));
    let along = |from: f64, to: f64, step: f64| {
        let mut points = Vec::new();
        let mut x = from;
        while x <= to {
            points.push((x, 50.0));
            x += step;
        }
        road(&points)
    };
    map.add_road_by_location(1, along(10.0, 90.0, 20.0));
    map.add_road_by_location(2, along(90.0, 110.0, 20.0));
    map.add_road_by_location(3, along(110.0, 190.0, 20.0));
    map.add_road_by_location(4, along(190.0, 210.0, 20.0));
    map.add_road_by_location(5, along(210.0, 290.0, 20.0));
    Arc::new(map)
}

pub fn features(route: &Route) -> Vec<FeatureId> {
    route.segments().iter().map(|s| s.feature_id()).collect()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

pub fn assert_point(actual: Option<&Point<f64>>, expected: (f64, f64)) {
    let actual = actual.expect("route has no points");
    assert!(
        (actual.x() - expected.0).abs() < 1e-6 && (actual.y() - expected.1).abs() < 1e-6,
        "expected {expected:?}, got {:?}",
        actual.x_y()
    );
}
