mod common;

use std::sync::Arc;

use common::{assert_close, assert_point, features, grid, three_regions};
use geo::Point;
use waymark::{
    IndexRouter, MapSource, NoopDelegate, ResultCode, RouterConfig, WorldGraphMode, route_many,
    shared_graphs,
};

fn router(source: Arc<dyn MapSource>) -> IndexRouter {
    IndexRouter::new(source, RouterConfig::default()).unwrap()
}

#[test]
fn leaps_expand_into_a_full_route() {
    let mut router = router(three_regions());
    let route = router
        .calculate_route(Point::new(10.0, 50.0), Point::new(290.0, 50.0), &NoopDelegate)
        .unwrap();

    assert_eq!(route.mode(), WorldGraphMode::LeapsOnly);
    // The leap path has six vertices: two connectors, two exits and two enters.
    assert!(route.segments().len() > 6);
    assert_eq!(route.segments().len(), 14);
    assert_eq!(features(&route), vec![1, 1, 1, 1, 2, 3, 3, 3, 3, 4, 5, 5, 5, 5]);
    assert_eq!(route.regions(), vec![0, 1, 2]);
    assert_close(route.duration(), 28.0);

    // Region boundaries sit where the leaps crossed the borders.
    let transitions = route.region_transitions();
    assert_eq!(transitions.len(), 2);
    assert_eq!((transitions[0].from, transitions[0].to), (0, 1));
    assert_eq!(route.points()[transitions[0].point_index], Point::new(110.0, 50.0));
    assert_eq!((transitions[1].from, transitions[1].to), (1, 2));
    assert_eq!(route.points()[transitions[1].point_index], Point::new(210.0, 50.0));

    assert_eq!(route.points().first(), Some(&Point::new(10.0, 50.0)));
    assert_eq!(route.points().last(), Some(&Point::new(290.0, 50.0)));
}

#[test]
fn neighbouring_regions_route_without_leaps() {
    let mut router = router(three_regions());
    let route = router
        .calculate_route(Point::new(10.0, 50.0), Point::new(190.0, 50.0), &NoopDelegate)
        .unwrap();
    assert_eq!(route.mode(), WorldGraphMode::NoLeaps);
    assert_eq!(route.regions(), vec![0, 1]);
    assert_eq!(route.region_transitions().len(), 1);
    assert_close(route.duration(), 18.0);
    // Each border segment appears once even though both regions hold it.
    assert_eq!(features(&route).iter().filter(|&&f| f == 2).count(), 1);
}

#[test]
fn leap_routes_start_and_end_inside_segments() {
    let mut router = router(three_regions());
    let route = router
        .calculate_route(Point::new(15.0, 50.0), Point::new(285.0, 50.0), &NoopDelegate)
        .unwrap();
    assert_eq!(route.mode(), WorldGraphMode::LeapsOnly);
    assert_eq!(features(&route), vec![1, 1, 1, 1, 2, 3, 3, 3, 3, 4, 5, 5, 5, 5]);
    assert_point(route.points().first(), (15.0, 50.0));
    assert_point(route.points().get(1), (30.0, 50.0));
    assert_point(route.points().last(), (285.0, 50.0));
    assert_close(route.duration(), 27.0);

    let transitions = route.region_transitions();
    assert_eq!(transitions.len(), 2);
    assert_point(route.points().get(transitions[0].point_index), (110.0, 50.0));
    assert_point(route.points().get(transitions[1].point_index), (210.0, 50.0));
}

#[test]
fn start_inside_a_border_segment() {
    let mut router = router(three_regions());
    let route = router
        .calculate_route(Point::new(95.0, 50.0), Point::new(185.0, 50.0), &NoopDelegate)
        .unwrap();
    assert_eq!(route.mode(), WorldGraphMode::NoLeaps);
    assert_eq!(route.regions(), vec![0, 1]);
    assert_eq!(features(&route), vec![2, 3, 3, 3, 3]);
    assert_point(route.points().first(), (95.0, 50.0));
    assert_point(route.points().last(), (185.0, 50.0));
    assert_close(route.duration(), 9.0);

    let transitions = route.region_transitions();
    assert_eq!(transitions.len(), 1);
    assert_point(route.points().get(transitions[0].point_index), (110.0, 50.0));
}

#[test]
fn finish_inside_a_border_segment() {
    let mut router = router(three_regions());
    let route = router
        .calculate_route(Point::new(15.0, 50.0), Point::new(105.0, 50.0), &NoopDelegate)
        .unwrap();
    assert_eq!(route.mode(), WorldGraphMode::NoLeaps);
    assert_eq!(route.regions(), vec![0, 1]);
    assert_eq!(features(&route), vec![1, 1, 1, 1, 2]);
    assert_eq!(route.points().len(), 6);
    assert_point(route.points().first(), (15.0, 50.0));
    assert_point(route.points().last(), (105.0, 50.0));
    assert_close(route.duration(), 9.0);

    let transitions = route.region_transitions();
    assert_eq!(transitions.len(), 1);
    assert_point(route.points().get(transitions[0].point_index), (90.0, 50.0));
}

#[test]
fn geojson_lists_route_and_transitions() {
    let mut router = router(three_regions());
    let route = router
        .calculate_route(Point::new(10.0, 50.0), Point::new(290.0, 50.0), &NoopDelegate)
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&route.to_geojson_string().unwrap()).unwrap();

    assert_eq!(json["type"], "FeatureCollection");
    let features = json["features"].as_array().unwrap();
    assert_eq!(features.len(), 3);

    let line = &features[0];
    assert_eq!(line["geometry"]["type"], "LineString");
    assert_eq!(
        line["geometry"]["coordinates"].as_array().unwrap().len(),
        route.points().len()
    );
    assert_eq!(line["properties"]["feature_type"], "route");
    assert_eq!(line["properties"]["mode"], "LeapsOnly");
    assert_eq!(line["properties"]["regions"], serde_json::json!([0, 1, 2]));

    for (feature, (from, to)) in features[1..].iter().zip([(0, 1), (1, 2)]) {
        assert_eq!(feature["geometry"]["type"], "Point");
        assert_eq!(feature["properties"]["feature_type"], "region_transition");
        assert_eq!(feature["properties"]["from_region"], from);
        assert_eq!(feature["properties"]["to_region"], to);
    }
}

#[test]
fn batch_routing_matches_sequential_routing() {
    let source: Arc<dyn MapSource> = Arc::new(grid(6));
    let config = RouterConfig::default();
    let requests: Vec<(Point<f64>, Point<f64>)> = (0..6)
        .flat_map(|i| {
            let y = f64::from(i) * 100.0;
            [
                (Point::new(0.0, y), Point::new(500.0, 500.0 - y)),
                (Point::new(500.0, y), Point::new(0.0, 0.0)),
            ]
        })
        .chain([(Point::new(0.0, 0.0), Point::new(9000.0, 0.0))])
        .collect();

    let graphs = shared_graphs(&source, &config).unwrap();
    let batch = route_many(&source, &graphs, &config, &requests, &NoopDelegate).unwrap();
    assert_eq!(batch.len(), requests.len());

    let mut sequential = IndexRouter::new(Arc::clone(&source), config).unwrap();
    for (result, &(start, finish)) in batch.iter().zip(&requests) {
        let expected = sequential.calculate_route(start, finish, &NoopDelegate);
        assert_eq!(ResultCode::of(result), ResultCode::of(&expected));
        if let (Ok(route), Ok(expected)) = (result, &expected) {
            assert_close(route.weight().weight(), expected.weight().weight());
            assert_eq!(route.points().first(), expected.points().first());
            assert_eq!(route.points().last(), expected.points().last());
        }
    }
    assert_eq!(
        ResultCode::of(batch.last().unwrap()),
        ResultCode::EndPointNotFound
    );
}
