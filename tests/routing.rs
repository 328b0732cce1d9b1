mod common;

use std::sync::Arc;

use common::{assert_close, assert_point, features, grid, one_way, road, single};
use geo::Point;
use waymark::{
    AccessType, CancelToken, Error, IndexRouter, MapSource, MemoryMap, NetworkDescription,
    NoopDelegate, Restriction, ResultCode, RouterConfig, VehicleType, WorldGraphMode,
    routing::{EdgeEstimator, create_estimator},
};

fn router(source: Arc<dyn MapSource>) -> IndexRouter {
    IndexRouter::new(source, RouterConfig::default()).unwrap()
}

fn joint_router(source: Arc<dyn MapSource>) -> IndexRouter {
    let config = RouterConfig {
        use_joints: true,
        ..RouterConfig::default()
    };
    IndexRouter::new(source, config).unwrap()
}

const P: (f64, f64) = (0.0, 0.0);
const Q: (f64, f64) = (100.0, 0.0);
const R: (f64, f64) = (50.0, 80.0);
const S: (f64, f64) = (150.0, 80.0);

/// One-way triangle P -> Q -> R -> P
fn triangle() -> Vec<(u32, waymark::RoadGeometry)> {
    vec![(1, one_way(&[P, Q])), (2, one_way(&[Q, R])), (3, one_way(&[R, P]))]
}

fn triangle_map(extra: Vec<(u32, waymark::RoadGeometry)>, restrictions: Vec<Restriction>) -> Arc<dyn MapSource> {
    let mut roads = triangle();
    roads.extend(extra);
    let mut map = MemoryMap::single_region(roads);
    for restriction in restrictions {
        map.add_restriction(0, restriction).unwrap();
    }
    Arc::new(map)
}

fn point((x, y): (f64, f64)) -> Point<f64> {
    Point::new(x, y)
}

#[test]
fn triangle_takes_the_two_edge_chain() {
    let mut router = router(triangle_map(Vec::new(), Vec::new()));
    let route = router.calculate_route(point(P), point(R), &NoopDelegate).unwrap();
    assert_eq!(features(&route), vec![1, 2]);
    assert_eq!(route.mode(), WorldGraphMode::SingleMwm);
    assert_eq!(route.points(), &[point(P), point(Q), point(R)]);
}

#[test]
fn restricted_triangle_falls_back_to_the_detour() {
    let detour = vec![(4, one_way(&[Q, S])), (5, one_way(&[S, R]))];
    let mut router = router(triangle_map(detour, vec![Restriction::no(vec![1, 2])]));
    let route = router.calculate_route(point(P), point(R), &NoopDelegate).unwrap();
    assert_eq!(features(&route), vec![1, 4, 5]);
}

#[test]
fn restricted_triangle_without_detour_has_no_route() {
    let mut router = router(triangle_map(Vec::new(), vec![Restriction::no(vec![1, 2])]));
    let result = router.calculate_route(point(P), point(R), &NoopDelegate);
    assert!(matches!(result, Err(Error::RouteNotFound)));
    assert_eq!(ResultCode::of(&result), ResultCode::RouteNotFound);
}

#[test]
fn one_way_roads_are_never_driven_backwards() {
    let mut router = router(single(vec![(1, one_way(&[P, Q]))]));
    assert!(router.calculate_route(point(P), point(Q), &NoopDelegate).is_ok());
    assert!(matches!(
        router.calculate_route(point(Q), point(P), &NoopDelegate),
        Err(Error::RouteNotFound)
    ));
}

#[test]
fn far_locations_are_not_snapped() {
    let mut router = router(single(vec![(1, road(&[P, Q]))]));
    assert!(matches!(
        router.calculate_route(Point::new(0.0, 5000.0), point(Q), &NoopDelegate),
        Err(Error::StartPointNotFound)
    ));
    assert!(matches!(
        router.calculate_route(point(P), Point::new(5000.0, 0.0), &NoopDelegate),
        Err(Error::EndPointNotFound)
    ));
}

#[test]
fn roads_without_access_are_avoided() {
    let roads = |access| {
        vec![
            (1, road(&[(0.0, 0.0), (100.0, 0.0)])),
            (2, road(&[(100.0, 0.0), (200.0, 0.0)]).with_access(access)),
            (3, road(&[(100.0, 0.0), (100.0, 100.0)])),
            (4, road(&[(100.0, 100.0), (200.0, 100.0)])),
            (5, road(&[(200.0, 100.0), (200.0, 0.0)])),
        ]
    };
    let (start, finish) = (Point::new(0.0, 0.0), Point::new(200.0, 0.0));

    let route = router(single(roads(AccessType::Yes)))
        .calculate_route(start, finish, &NoopDelegate)
        .unwrap();
    assert_eq!(features(&route), vec![1, 2]);
    assert_close(route.duration(), 20.0);

    let route = router(single(roads(AccessType::No)))
        .calculate_route(start, finish, &NoopDelegate)
        .unwrap();
    assert_eq!(features(&route), vec![1, 3, 4, 5]);
    assert_close(route.duration(), 40.0);
}

#[test]
fn via_way_restriction_only_forbids_the_full_chain() {
    // A and X lead into B, which ends where C and D start.
    let mut map = MemoryMap::single_region(vec![
        (1, road(&[(0.0, 0.0), (100.0, 0.0)])),
        (2, road(&[(100.0, 0.0), (200.0, 0.0)])),
        (3, road(&[(200.0, 0.0), (300.0, 0.0)])),
        (4, road(&[(200.0, 0.0), (200.0, 100.0)])),
        (5, road(&[(100.0, 100.0), (100.0, 0.0)])),
    ]);
    map.add_restriction(0, Restriction::no(vec![1, 2, 3])).unwrap();
    let mut router = router(Arc::new(map));

    let a_to_d = router
        .calculate_route(Point::new(0.0, 0.0), Point::new(200.0, 100.0), &NoopDelegate)
        .unwrap();
    assert_close(a_to_d.weight().weight(), 30.0);

    let x_to_c = router
        .calculate_route(Point::new(100.0, 100.0), Point::new(300.0, 0.0), &NoopDelegate)
        .unwrap();
    assert_eq!(features(&x_to_c), vec![5, 2, 3]);
    assert_close(x_to_c.weight().weight(), 30.0);

    // A -> B -> C is only reachable with a U-turn at a dead end.
    let a_to_c = router
        .calculate_route(Point::new(0.0, 0.0), Point::new(300.0, 0.0), &NoopDelegate)
        .unwrap();
    assert!(a_to_c.weight().weight() > 120.0);
}

#[test]
fn joint_search_matches_segment_search() {
    let source: Arc<dyn MapSource> = Arc::new(grid(5));
    let mut by_segments = router(Arc::clone(&source));
    let mut by_joints = joint_router(source);
    for (finish, expected) in [((400.0, 300.0), 70.0), ((100.0, 400.0), 50.0), ((300.0, 0.0), 30.0)] {
        let finish = point(finish);
        let segments = by_segments
            .calculate_route(Point::new(0.0, 0.0), finish, &NoopDelegate)
            .unwrap();
        let joints = by_joints
            .calculate_route(Point::new(0.0, 0.0), finish, &NoopDelegate)
            .unwrap();
        assert_eq!(joints.mode(), WorldGraphMode::JointSingleMwm);
        assert_close(segments.weight().weight(), expected);
        assert_close(joints.weight().weight(), expected);
        assert_close(joints.duration(), expected);
        assert_eq!(joints.points().first(), Some(&Point::new(0.0, 0.0)));
        assert_eq!(joints.points().last(), Some(&finish));
    }
}

#[test]
fn joint_route_refines_the_joint_sequence() {
    let source = single(vec![
        (1, road(&[(0.0, 0.0), (50.0, 0.0), (100.0, 0.0)])),
        (2, road(&[(100.0, 0.0), (100.0, 50.0), (100.0, 100.0)])),
    ]);
    let (start, finish) = (Point::new(0.0, 0.0), Point::new(100.0, 100.0));
    let by_joints = joint_router(Arc::clone(&source))
        .calculate_route(start, finish, &NoopDelegate)
        .unwrap();
    let by_segments = router(source).calculate_route(start, finish, &NoopDelegate).unwrap();

    let expected = [
        Point::new(0.0, 0.0),
        Point::new(50.0, 0.0),
        Point::new(100.0, 0.0),
        Point::new(100.0, 50.0),
        Point::new(100.0, 100.0),
    ];
    assert_eq!(by_joints.points(), &expected);
    assert_eq!(by_segments.points(), &expected);
    assert_eq!(by_joints.segments(), by_segments.segments());
    assert!(by_joints.times().windows(2).all(|w| w[0].1 < w[1].1));
    assert_close(by_joints.duration(), 20.0);
}

#[test]
fn estimates_never_exceed_route_costs() {
    let source: Arc<dyn MapSource> = Arc::new(grid(4));
    for vehicle in [VehicleType::Car, VehicleType::Bicycle, VehicleType::Pedestrian] {
        let config = RouterConfig::for_vehicle(vehicle);
        let estimator = create_estimator(vehicle, config.max_speed(), None);
        let mut router = IndexRouter::new(Arc::clone(&source), config).unwrap();
        for finish in [(300.0, 300.0), (100.0, 200.0), (300.0, 0.0)] {
            let (from, to) = (Point::new(0.0, 0.0), point(finish));
            let route = router.calculate_route(from, to, &NoopDelegate).unwrap();
            let heuristic = estimator.calc_heuristic(from, to);
            let leap = estimator.calc_leap_weight(from, to);
            assert!(heuristic <= leap);
            assert!(leap <= route.weight().weight());
        }
    }
}

#[test]
fn cancelled_requests_return_no_route() {
    let config = RouterConfig {
        cancel_poll_period: 1,
        ..RouterConfig::default()
    };
    let mut router = IndexRouter::new(Arc::new(grid(4)), config).unwrap();
    let token = CancelToken::new();
    token.cancel();
    let result = router.calculate_route(Point::new(0.0, 0.0), Point::new(300.0, 300.0), &token);
    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(ResultCode::of(&result), ResultCode::Cancelled);

    // The same router keeps working for the next request.
    assert!(
        router
            .calculate_route(Point::new(0.0, 0.0), Point::new(300.0, 300.0), &NoopDelegate)
            .is_ok()
    );
}

#[test]
fn json_network_routes_like_the_builder() {
    let network = NetworkDescription::from_json_str(
        r#"{
            "roads": [
                { "id": 1, "points": [[0, 0], [100, 0]], "speed_kmph": 36 },
                { "id": 2, "points": [[100, 0], [200, 0]], "speed_kmph": 36, "one_way": true },
                { "id": 3, "points": [[100, 0], [100, 100]], "speed_kmph": 36, "access": "no" }
            ]
        }"#,
    )
    .unwrap();
    let mut router = router(Arc::new(network.into_memory_map().unwrap()));
    let route = router
        .calculate_route(Point::new(0.0, 0.0), Point::new(200.0, 0.0), &NoopDelegate)
        .unwrap();
    assert_eq!(features(&route), vec![1, 2]);
    assert!(matches!(
        router.calculate_route(Point::new(200.0, 0.0), Point::new(0.0, 0.0), &NoopDelegate),
        Err(Error::RouteNotFound)
    ));
}

fn long_roads(make: fn(&[(f64, f64)]) -> waymark::RoadGeometry) -> Arc<dyn MapSource> {
    single(vec![
        (1, make(&[(0.0, 0.0), (1000.0, 0.0)])),
        (2, make(&[(1000.0, 0.0), (2000.0, 0.0)])),
    ])
}

#[test]
fn routes_start_and_end_inside_segments() {
    let (start, finish) = (Point::new(400.0, 0.0), Point::new(1600.0, 0.0));
    for mut by_mode in [router(long_roads(road)), joint_router(long_roads(road))] {
        let route = by_mode.calculate_route(start, finish, &NoopDelegate).unwrap();
        assert_eq!(route.points().len(), 3);
        assert_point(route.points().first(), (400.0, 0.0));
        assert_point(route.points().get(1), (1000.0, 0.0));
        assert_point(route.points().last(), (1600.0, 0.0));
        assert_close(route.duration(), 120.0);
        assert_close(route.weight().weight(), 120.0);
        assert_eq!(features(&route), vec![1, 2]);
        assert_close(route.times()[1].1, 60.0);
    }

    // Backwards the same two-way roads take as long.
    let route = router(long_roads(road))
        .calculate_route(finish, start, &NoopDelegate)
        .unwrap();
    assert_point(route.points().first(), (1600.0, 0.0));
    assert_point(route.points().last(), (400.0, 0.0));
    assert_close(route.duration(), 120.0);
}

#[test]
fn partial_segments_respect_one_way_roads() {
    let (start, finish) = (Point::new(400.0, 0.0), Point::new(1600.0, 0.0));
    let mut router = router(long_roads(one_way));
    let route = router.calculate_route(start, finish, &NoopDelegate).unwrap();
    assert_point(route.points().first(), (400.0, 0.0));
    assert_point(route.points().last(), (1600.0, 0.0));
    assert_close(route.duration(), 120.0);

    assert!(matches!(
        router.calculate_route(finish, start, &NoopDelegate),
        Err(Error::RouteNotFound)
    ));
}

#[test]
fn start_and_finish_on_the_same_segment() {
    let (start, finish) = (Point::new(200.0, 10.0), Point::new(700.0, -10.0));
    let mut two_way = router(single(vec![(1, road(&[(0.0, 0.0), (1000.0, 0.0)]))]));
    let route = two_way.calculate_route(start, finish, &NoopDelegate).unwrap();
    assert_eq!(route.points().len(), 2);
    assert_point(route.points().first(), (200.0, 0.0));
    assert_point(route.points().last(), (700.0, 0.0));
    assert_close(route.duration(), 50.0);
    assert_eq!(features(&route), vec![1]);

    let back = two_way.calculate_route(finish, start, &NoopDelegate).unwrap();
    assert_close(back.duration(), 50.0);

    let mut forward_only = router(single(vec![(1, one_way(&[(0.0, 0.0), (1000.0, 0.0)]))]));
    assert!(forward_only.calculate_route(start, finish, &NoopDelegate).is_ok());
    assert!(matches!(
        forward_only.calculate_route(finish, start, &NoopDelegate),
        Err(Error::RouteNotFound)
    ));
}

#[test]
fn via_way_restrictions_do_not_open_one_way_roads() {
    // B runs one-way from the C and D junction back to A.
    let roads = || {
        vec![
            (1, road(&[(0.0, 0.0), (100.0, 0.0)])),
            (2, one_way(&[(200.0, 0.0), (100.0, 0.0)])),
            (3, road(&[(200.0, 0.0), (300.0, 0.0)])),
            (4, road(&[(200.0, 0.0), (200.0, 100.0)])),
        ]
    };
    let (start, finish) = (Point::new(0.0, 0.0), Point::new(200.0, 100.0));
    assert!(matches!(
        router(single(roads())).calculate_route(start, finish, &NoopDelegate),
        Err(Error::RouteNotFound)
    ));

    let mut map = MemoryMap::single_region(roads());
    map.add_restriction(0, Restriction::no(vec![1, 2, 3])).unwrap();
    assert!(matches!(
        router(Arc::new(map)).calculate_route(start, finish, &NoopDelegate),
        Err(Error::RouteNotFound)
    ));
}
