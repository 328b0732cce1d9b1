//! Integration of arbitrary start and finish locations into the graph.
//!
//! A snapped location becomes a joint of a request overlay with a zero-length
//! one-way connector attached: the start connector ends at the joint, the finish
//! connector starts there. A location inside a segment cuts the segment into two
//! pieces meeting at that joint. The search then runs from connector to connector.

use geo::{Distance, Euclidean, Point};
use itertools::Itertools;
use log::trace;

use crate::{
    Error, FeatureId, INVALID_JOINT_ID, JointId, PointId, RegionId,
    graph::{FakeGraph, IndexGraph, WorldGraph, WorldGraphMode},
    model::{AccessType, RoadGeometry, RoadPoint, RouteWeight, Segment, SegmentEdge},
    routing::{EdgeEstimator, Purpose, SnappedPoint, astar::AStarGraph},
};

/// Where a search starts or ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Endpoint {
    /// A location projected onto a road
    Point(SnappedPoint),
    /// An existing segment, used when expanding leaps
    Segment(Segment),
}

/// Point of a redressed route with the cumulative travel time in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutePoint {
    pub road_point: RoadPoint,
    pub point: Point<f64>,
    pub time: f64,
}

#[derive(Debug, Clone, Copy)]
struct FakeEnding {
    connector: Segment,
    joint: JointId,
    point: Point<f64>,
    /// Segment cut at the location
    origin: Option<Segment>,
}

pub struct IndexGraphStarter<'w> {
    world: &'w mut dyn WorldGraph,
    fakes: Vec<FakeGraph>,
    start: Segment,
    finish: Segment,
    start_ending: Option<FakeEnding>,
    finish_ending: Option<FakeEnding>,
}

impl<'w> IndexGraphStarter<'w> {
    /// # Errors
    ///
    /// Fails when an endpoint region cannot be loaded or its road point does not exist.
    pub fn new(start: Endpoint, finish: Endpoint, world: &'w mut dyn WorldGraph) -> Result<Self, Error> {
        let mut fakes: Vec<FakeGraph> = Vec::new();
        let (start_vertex, start_ending) = attach_endpoint(&mut *world, &mut fakes, start, true, None)?;
        let (finish_vertex, finish_ending) =
            attach_endpoint(&mut *world, &mut fakes, finish, false, start_ending.as_ref())?;
        trace!("Starter from {start_vertex} to {finish_vertex}");

        Ok(Self {
            world,
            fakes,
            start: start_vertex,
            finish: finish_vertex,
            start_ending,
            finish_ending,
        })
    }

    pub fn start_segment(&self) -> Segment {
        self.start
    }

    pub fn finish_segment(&self) -> Segment {
        self.finish
    }

    pub fn mode(&self) -> WorldGraphMode {
        self.world.mode()
    }

    pub fn world(&mut self) -> &mut dyn WorldGraph {
        &mut *self.world
    }

    pub fn fake(&self, region: RegionId) -> Option<&FakeGraph> {
        self.fakes.iter().find(|f| f.region() == region)
    }

    pub fn fakes(&self) -> &[FakeGraph] {
        &self.fakes
    }

    pub fn is_connector(&self, segment: &Segment) -> bool {
        self.fake(segment.region())
            .is_some_and(|f| f.is_connector(segment.feature_id()))
    }

    /// # Errors
    ///
    /// Fails when the segment's road cannot be loaded.
    pub fn point(&mut self, segment: &Segment, front: bool) -> Result<Point<f64>, Error> {
        let fake = self.fakes.iter().find(|f| f.region() == segment.region());
        self.world.point(segment, front, fake)
    }

    /// Joint of the start location, `None` for a segment endpoint
    pub fn start_joint(&self) -> Option<JointId> {
        self.start_ending.map(|e| e.joint)
    }

    pub fn finish_joint(&self) -> Option<JointId> {
        self.finish_ending.map(|e| e.joint)
    }

    pub fn start_point(&self) -> Option<Point<f64>> {
        self.start_ending.map(|e| e.point)
    }

    pub fn finish_point(&self) -> Option<Point<f64>> {
        self.finish_ending.map(|e| e.point)
    }

    fn leap_edges(&mut self, segment: &Segment, edges: &mut Vec<(Segment, RouteWeight)>) -> Result<(), Error> {
        let from = self.point(segment, true)?;
        if *segment == self.start && self.start_ending.is_some() {
            for exit in self.world.transitions(segment.region(), true)? {
                let to = self.point(&exit, true)?;
                edges.push((exit, self.world.calc_leap_weight(from, to)));
            }
        } else {
            let mut world_edges = Vec::new();
            self.world.get_edge_list(segment, true, None, &mut world_edges)?;
            edges.extend(world_edges.into_iter().map(|e| (e.target, e.weight)));
        }

        let to_finish = self.finish_ending.is_some()
            && segment.region() == self.finish.region()
            && (*segment == self.start || self.world.is_transition(segment, false)?);
        if to_finish {
            let finish = self.finish;
            let to = self.point(&finish, true)?;
            edges.push((finish, self.world.calc_leap_weight(from, to)));
        }
        Ok(())
    }

    fn segment_edges(
        &mut self,
        segment: &Segment,
        is_outgoing: bool,
        edges: &mut Vec<(Segment, RouteWeight)>,
    ) -> Result<(), Error> {
        let mut world_edges: Vec<SegmentEdge> = Vec::new();
        let fake = self.fakes.iter().find(|f| f.region() == segment.region());
        self.world
            .get_edge_list(segment, is_outgoing, fake, &mut world_edges)?;
        edges.extend(world_edges.into_iter().map(|e| (e.target, e.weight)));
        self.piece_twins(segment, is_outgoing, edges)?;
        self.border_pieces(segment, is_outgoing, edges)
    }

    fn joint_edges(&mut self, segment: &Segment, edges: &mut Vec<(Segment, RouteWeight)>) -> Result<(), Error> {
        let mut runs = Vec::new();
        let fake = self.fakes.iter().find(|f| f.region() == segment.region());
        self.world.get_joint_edge_list(segment, fake, &mut runs)?;
        edges.extend(runs.into_iter().map(|(run, weight)| (run.last_segment(), weight)));
        self.piece_twins(segment, true, edges)?;
        self.border_pieces(segment, true, edges)
    }

    /// Twins of a cut border segment, reached from the piece sharing the segment's
    /// front (`is_outgoing`) or back
    fn piece_twins(
        &mut self,
        segment: &Segment,
        is_outgoing: bool,
        edges: &mut Vec<(Segment, RouteWeight)>,
    ) -> Result<(), Error> {
        if !self.world.mode().crosses_borders() {
            return Ok(());
        }
        let Some(origin) = self.fake(segment.region()).and_then(|f| f.origin(segment)) else {
            return Ok(());
        };
        let end = self.point(segment, is_outgoing)?;
        if end != self.world.point(&origin, is_outgoing, None)? || !self.world.is_transition(&origin, is_outgoing)? {
            return Ok(());
        }
        for twin in self.world.twins(&origin, is_outgoing)? {
            let to = self.world.point(&twin, is_outgoing, None)?;
            edges.push((twin, self.world.heuristic_cost_estimate(end, to)));
        }
        Ok(())
    }

    /// Pieces cut from the twins of a transition, entered in place of the twin.
    ///
    /// Outgoing, a piece starting where the twin starts follows an exit. Ingoing, a
    /// piece ending where the twin ends precedes an enter.
    fn border_pieces(
        &mut self,
        segment: &Segment,
        is_outgoing: bool,
        edges: &mut Vec<(Segment, RouteWeight)>,
    ) -> Result<(), Error> {
        if !self.world.mode().crosses_borders()
            || !self.fakes.iter().any(FakeGraph::has_pieces)
            || !self.world.is_transition(segment, is_outgoing)?
        {
            return Ok(());
        }
        let from = self.point(segment, !is_outgoing)?;
        for twin in self.world.twins(segment, is_outgoing)? {
            let pieces = self.fake(twin.region()).map(|f| f.pieces_of(&twin)).unwrap_or_default();
            if pieces.is_empty() {
                continue;
            }
            let twin_end = self.world.point(&twin, !is_outgoing, None)?;
            for piece in pieces {
                let piece_end = self.point(&piece, !is_outgoing)?;
                if piece_end == twin_end {
                    edges.push((piece, self.world.heuristic_cost_estimate(from, piece_end)));
                }
            }
        }
        Ok(())
    }

    /// Replaces every compressed run of a joint-mode path by its segments
    ///
    /// # Errors
    ///
    /// Fails when a road on the path cannot be loaded.
    pub fn expand_joint_path(&mut self, path: &[Segment]) -> Result<Vec<Segment>, Error> {
        let Some(&first) = path.first() else {
            return Ok(Vec::new());
        };
        let mut result = vec![first];
        for (prev, vertex) in path.iter().tuple_windows() {
            // Twins and connectors are single segments.
            if vertex.region() != prev.region() || self.is_connector(vertex) {
                result.push(*vertex);
                continue;
            }
            let fake = self.fakes.iter().find(|f| f.region() == vertex.region());
            result.extend(self.world.expand_joint_segment(vertex, fake)?);
        }
        Ok(result)
    }

    /// Path without the request connectors
    pub fn strip_connectors(&self, path: &[Segment]) -> Vec<Segment> {
        path.iter()
            .filter(|s| !self.is_connector(s))
            .copied()
            .collect()
    }

    pub fn is_piece(&self, segment: &Segment) -> bool {
        self.fake(segment.region())
            .is_some_and(|f| f.origin(segment).is_some())
    }

    /// Path with every cut piece replaced by the segment it was cut from
    pub fn original_segments(&self, path: &[Segment]) -> Vec<Segment> {
        path.iter()
            .map(|s| self.fake(s.region()).and_then(|f| f.origin(s)).unwrap_or(*s))
            .collect()
    }

    /// Joints passed by a joint-mode path, `None` when a vertex does not end at a joint.
    ///
    /// Every vertex but the last (the finish connector) contributes the joint at its
    /// front point.
    pub fn joints_of_path(&mut self, path: &[Segment]) -> Result<Option<Vec<JointId>>, Error> {
        let Some((_, body)) = path.split_last() else {
            return Ok(Some(Vec::new()));
        };
        let mut joints = Vec::with_capacity(body.len());
        for segment in body {
            let graph = self.world.index_graph(segment.region())?;
            let view = graph.view(self.fake(segment.region()));
            let joint = view.joint_id(segment.road_point(true));
            if joint == INVALID_JOINT_ID {
                return Ok(None);
            }
            if joints.last() != Some(&joint) {
                joints.push(joint);
            }
        }
        Ok(Some(joints))
    }

    /// Point-level route through a joint sequence of one region.
    ///
    /// Between parallel features the cheaper one is taken; its cost is only
    /// computed once a second candidate shows up. One-way features are never
    /// followed backwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InternalError`] when two consecutive joints share no
    /// usable feature.
    pub fn redress_route(&mut self, region: RegionId, joints: &[JointId]) -> Result<Vec<RoutePoint>, Error> {
        let graph = self.world.index_graph(region)?;
        let view = graph.view(self.fake(region));
        let estimator = graph.estimator();

        let Some(&first) = joints.first() else {
            return Ok(Vec::new());
        };
        if joints.len() == 1 {
            let Some(road_point) = view.points(first).into_iter().find(|rp| !view.is_connector(rp.feature_id()))
            else {
                return Err(Error::JointNotFound(first));
            };
            let point = view.road(road_point.feature_id())?
                .point(road_point.point_id())
                .ok_or(Error::JointNotFound(first))?;
            return Ok(vec![RoutePoint { road_point, point, time: 0.0 }]);
        }

        let mut route: Vec<RoutePoint> = Vec::new();
        let mut time = 0.0;
        for (&from, &to) in joints.iter().tuple_windows() {
            let mut best: Option<(RoadPoint, RoadPoint)> = None;
            let mut best_cost: Option<f64> = None;
            for (a, b) in view.find_points_with_common_feature(from, to) {
                if view.is_connector(a.feature_id()) {
                    continue;
                }
                let road = view.road(a.feature_id())?;
                if road.is_one_way() && b.point_id() < a.point_id() {
                    continue;
                }
                let Some(current) = best else {
                    best = Some((a, b));
                    continue;
                };
                let current_cost = match best_cost {
                    Some(cost) => cost,
                    None => {
                        let current_road = view.road(current.0.feature_id())?;
                        connection_cost(&current_road, estimator.as_ref(), current)
                    }
                };
                let cost = connection_cost(&road, estimator.as_ref(), (a, b));
                if cost < current_cost {
                    best = Some((a, b));
                    best_cost = Some(cost);
                } else {
                    best_cost = Some(current_cost);
                }
            }
            let (a, b) = best.ok_or_else(|| {
                Error::InternalError(format!("Joints {from} and {to} share no usable feature"))
            })?;

            let road = view.road(a.feature_id())?;
            let path = graph.single_feature_path(a, b);
            for (i, rp) in path.iter().enumerate() {
                if i == 0 && !route.is_empty() {
                    continue;
                }
                if i > 0 {
                    time += estimator.calc_edges_weight(
                        rp.feature_id(),
                        &road,
                        path[i - 1].point_id(),
                        rp.point_id(),
                    );
                }
                let point = road
                    .point(rp.point_id())
                    .ok_or(Error::InternalError(format!("{rp} is outside its feature")))?;
                route.push(RoutePoint {
                    road_point: *rp,
                    point,
                    time,
                });
            }
        }
        Ok(route)
    }

    /// Polyline and cumulative times of a segment path.
    ///
    /// # Errors
    ///
    /// Fails when a road on the path cannot be loaded.
    pub fn redress_segments(&mut self, segments: &[Segment]) -> Result<(Vec<Point<f64>>, Vec<(usize, f64)>), Error> {
        redress_segments(&mut *self.world, &self.fakes, segments)
    }
}

fn connection_cost(road: &RoadGeometry, estimator: &dyn EdgeEstimator, (a, b): (RoadPoint, RoadPoint)) -> f64 {
    estimator.calc_edges_weight(a.feature_id(), road, a.point_id(), b.point_id())
}

/// Polyline of a segment path: the back point of the first segment, then the front
/// point of every segment, with cumulative travel times per point
fn redress_segments(
    world: &mut dyn WorldGraph,
    fakes: &[FakeGraph],
    segments: &[Segment],
) -> Result<(Vec<Point<f64>>, Vec<(usize, f64)>), Error> {
    let Some(first) = segments.first() else {
        return Ok((Vec::new(), Vec::new()));
    };
    let fake_of = |region: RegionId| fakes.iter().find(|f| f.region() == region);

    let mut points = Vec::with_capacity(segments.len() + 1);
    let mut times = Vec::with_capacity(segments.len() + 1);
    points.push(world.point(first, false, fake_of(first.region()))?);
    times.push((0, 0.0));
    let mut time = 0.0;
    for segment in segments {
        let fake = fake_of(segment.region());
        time += world
            .calc_segment_weight(segment, fake, Purpose::Eta)?
            .weight();
        points.push(world.point(segment, true, fake)?);
        times.push((points.len() - 1, time));
    }
    Ok((points, times))
}

fn attach_endpoint(
    world: &mut dyn WorldGraph,
    fakes: &mut Vec<FakeGraph>,
    endpoint: Endpoint,
    is_start: bool,
    other: Option<&FakeEnding>,
) -> Result<(Segment, Option<FakeEnding>), Error> {
    let snapped = match endpoint {
        Endpoint::Segment(segment) => return Ok((segment, None)),
        Endpoint::Point(snapped) => snapped,
    };
    let graph = world.index_graph(snapped.region)?;
    let position = match fakes.iter().position(|f| f.region() == snapped.region) {
        Some(position) => position,
        None => {
            fakes.push(FakeGraph::new(&graph));
            fakes.len() - 1
        }
    };
    let ending = attach_ending(&graph, &mut fakes[position], &snapped, is_start, other)?;
    Ok((ending.connector, Some(ending)))
}

/// Attaches one endpoint to the overlay of its region.
///
/// A location on a segment end uses the joint there. Inside a segment it gets a
/// joint of its own between two pieces of the segment, and a direct piece to the
/// other endpoint when both lie on the same segment.
fn attach_ending(
    graph: &IndexGraph,
    fake: &mut FakeGraph,
    snapped: &SnappedPoint,
    is_start: bool,
    other: Option<&FakeEnding>,
) -> Result<FakeEnding, Error> {
    let road = graph.road(snapped.segment.feature_id())?;
    let (joint, origin) = match snapped.vertex {
        Some(road_point) => (vertex_joint(graph, fake, road_point)?, None),
        None => {
            let joint = cut_segment(graph, fake, &road, snapped)?;
            if let Some(other) = other.filter(|o| o.origin == Some(snapped.segment)) {
                link_on_segment(graph, fake, &road, other, joint, snapped)?;
            }
            (joint, Some(snapped.segment))
        }
    };

    let point = snapped.point;
    let connector_road = RoadGeometry::new(vec![point, point], road.speed_kmph()).with_one_way(true);
    let feature_id = fake.add_road(connector_road);
    fake.attach(joint, RoadPoint::new(feature_id, if is_start { 1 } else { 0 }));
    Ok(FakeEnding {
        connector: Segment::new(graph.region(), feature_id, 0, true),
        joint,
        point,
        origin,
    })
}

/// Joint at a road point, created in the overlay when the region graph has none
fn vertex_joint(graph: &IndexGraph, fake: &mut FakeGraph, road_point: RoadPoint) -> Result<JointId, Error> {
    let static_joint = graph.road_index().joint_id(road_point);
    if static_joint != INVALID_JOINT_ID {
        return Ok(static_joint);
    }
    if let Some(joint) = fake.joint_id(road_point) {
        return Ok(joint);
    }
    let joint = fake.add_joint();
    fake.attach(joint, road_point);
    attach_mapped_copies(graph, fake, joint, road_point, graph.point(road_point)?)?;
    Ok(joint)
}

/// Cuts the snapped segment at its projected point and returns the joint between
/// the two pieces. Both pieces keep the direction of the road.
fn cut_segment(
    graph: &IndexGraph,
    fake: &mut FakeGraph,
    road: &RoadGeometry,
    snapped: &SnappedPoint,
) -> Result<JointId, Error> {
    let origin = snapped.segment;
    let (back, front) = (origin.road_point(false), origin.road_point(true));
    let back_joint = vertex_joint(graph, fake, back)?;
    let front_joint = vertex_joint(graph, fake, front)?;
    let joint = fake.add_joint();

    let before = cut_piece(road, (graph.point(back)?, Some(back.point_id())), (snapped.point, None));
    let before = fake.add_piece(before, origin);
    fake.attach(back_joint, RoadPoint::new(before, 0));
    fake.attach(joint, RoadPoint::new(before, 1));

    let after = cut_piece(road, (snapped.point, None), (graph.point(front)?, Some(front.point_id())));
    let after = fake.add_piece(after, origin);
    fake.attach(joint, RoadPoint::new(after, 0));
    fake.attach(front_joint, RoadPoint::new(after, 1));

    trace!("{origin} cut at {:?} into features {before} and {after}", snapped.point.x_y());
    Ok(joint)
}

/// Piece of `road` between two points; ends on a road point keep its barrier
fn cut_piece(
    road: &RoadGeometry,
    from: (Point<f64>, Option<PointId>),
    to: (Point<f64>, Option<PointId>),
) -> RoadGeometry {
    let mut piece = RoadGeometry::piece(vec![from.0, to.0], road);
    for (idx, point_id) in [(0, from.1), (1, to.1)] {
        let Some(point_id) = point_id else {
            continue;
        };
        let access = road.point_access(point_id);
        if access != AccessType::Yes {
            piece = piece.with_point_access(idx, access);
        }
    }
    piece
}

/// Direct piece between two locations cut from the same segment, laid out in
/// the direction of the road
fn link_on_segment(
    graph: &IndexGraph,
    fake: &mut FakeGraph,
    road: &RoadGeometry,
    other: &FakeEnding,
    joint: JointId,
    snapped: &SnappedPoint,
) -> Result<(), Error> {
    let back = graph.point(snapped.segment.road_point(false))?;
    let here = (joint, snapped.point);
    let there = (other.joint, other.point);
    let (first, second) = if Euclidean.distance(back, there.1) <= Euclidean.distance(back, here.1) {
        (there, here)
    } else {
        (here, there)
    };
    let link = fake.add_piece(RoadGeometry::piece(vec![first.1, second.1], road), snapped.segment);
    fake.attach(first.0, RoadPoint::new(link, 0));
    fake.attach(second.0, RoadPoint::new(link, 1));
    Ok(())
}

/// Restriction rewrites may have copied the feature under `road_point`; the
/// copies get the same joint so the search can enter them too.
fn attach_mapped_copies(
    graph: &IndexGraph,
    fake: &mut FakeGraph,
    joint: JointId,
    road_point: RoadPoint,
    point: Point<f64>,
) -> Result<(), Error> {
    let mut copies: Vec<FeatureId> = Vec::new();
    for edge in graph.get_intermediate_point_edges(road_point)? {
        graph.for_each_edge_mapping_node(&edge, |mapped| {
            if mapped.feature_id != edge.feature_id {
                copies.push(mapped.feature_id);
            }
        });
    }
    copies.sort_unstable();
    copies.dedup();

    for copy in copies {
        let road = graph.road(copy)?;
        let Some(point_id) = road.points().iter().position(|p| *p == point) else {
            continue;
        };
        let rp = RoadPoint::new(copy, point_id as u32);
        if !fake.joint_points(joint).contains(&rp) {
            fake.attach(joint, rp);
        }
    }
    Ok(())
}

impl AStarGraph for IndexGraphStarter<'_> {
    type Vertex = Segment;
    type Weight = RouteWeight;

    fn outgoing_edges(&mut self, vertex: &Segment, edges: &mut Vec<(Segment, RouteWeight)>) -> Result<(), Error> {
        match self.world.mode() {
            WorldGraphMode::LeapsOnly => self.leap_edges(vertex, edges),
            mode if mode.is_joint_mode() => self.joint_edges(vertex, edges),
            _ => self.segment_edges(vertex, true, edges),
        }
    }

    fn ingoing_edges(&mut self, vertex: &Segment, edges: &mut Vec<(Segment, RouteWeight)>) -> Result<(), Error> {
        match self.world.mode() {
            WorldGraphMode::LeapsOnly => Err(Error::InternalError(
                "Leap search only runs forward".into(),
            )),
            mode if mode.is_joint_mode() => Err(Error::InternalError(
                "Joint search only runs forward".into(),
            )),
            _ => self.segment_edges(vertex, false, edges),
        }
    }

    fn heuristic(&mut self, from: &Segment, to: &Segment) -> Result<RouteWeight, Error> {
        let from = self.point(from, true)?;
        let to = self.point(to, true)?;
        Ok(self.world.heuristic_cost_estimate(from, to))
    }
}
