use std::sync::Arc;

use geo::Point;
use hashbrown::{HashMap, HashSet};

use crate::{
    Error, FeatureId, INVALID_JOINT_ID, JointId, RegionId, START_FAKE_FEATURE_IDS,
    graph::{FakeGraph, GraphView, JointIndex, RoadIndex},
    model::{
        AccessType, DirectedEdge, Geometry, Joint, JointEdge, JointSegment, RoadGeometry, RoadPoint, RouteWeight,
        Segment, SegmentEdge,
    },
    routing::estimator::{EdgeEstimator, Purpose},
};

/// Adjacency engine of one region.
///
/// Built once per region, then shared read-only between requests. Request
/// specific joints and connectors come in through a [`FakeGraph`].
pub struct IndexGraph {
    region: RegionId,
    geometry: Geometry,
    estimator: Arc<dyn EdgeEstimator>,
    road_index: RoadIndex,
    joint_index: JointIndex,
    pub(super) restrictions: Vec<(FeatureId, FeatureId)>,
    blocked_edges: HashSet<DirectedEdge>,
    edge_mapping: HashMap<DirectedEdge, Vec<DirectedEdge>>,
    pub(super) next_fake_feature_id: FeatureId,
    pub(super) via_copies: HashMap<(FeatureId, FeatureId), FeatureId>,
}

impl IndexGraph {
    pub fn new(region: RegionId, geometry: Geometry, estimator: Arc<dyn EdgeEstimator>) -> Self {
        Self {
            region,
            geometry,
            estimator,
            road_index: RoadIndex::default(),
            joint_index: JointIndex::default(),
            restrictions: Vec::new(),
            blocked_edges: HashSet::new(),
            edge_mapping: HashMap::new(),
            next_fake_feature_id: START_FAKE_FEATURE_IDS,
            via_copies: HashMap::new(),
        }
    }

    pub fn import(&mut self, joints: &[Joint]) {
        self.road_index = RoadIndex::import(joints);
        self.joint_index = JointIndex::build(&self.road_index, joints.len() as u32);
    }

    pub fn region(&self) -> RegionId {
        self.region
    }

    pub fn estimator(&self) -> &Arc<dyn EdgeEstimator> {
        &self.estimator
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn road_index(&self) -> &RoadIndex {
        &self.road_index
    }

    pub fn joint_index(&self) -> &JointIndex {
        &self.joint_index
    }

    pub fn num_joints(&self) -> JointId {
        self.joint_index.num_joints()
    }

    pub fn next_fake_feature_id(&self) -> FeatureId {
        self.next_fake_feature_id
    }

    pub fn is_fake_feature(feature_id: FeatureId) -> bool {
        feature_id >= START_FAKE_FEATURE_IDS
    }

    pub fn view<'a>(&'a self, fake: Option<&'a FakeGraph>) -> GraphView<'a> {
        GraphView::new(self, fake)
    }

    pub fn road(&self, feature_id: FeatureId) -> Result<Arc<RoadGeometry>, Error> {
        self.geometry.road(feature_id)
    }

    pub fn point(&self, rp: RoadPoint) -> Result<Point<f64>, Error> {
        let road = self.road(rp.feature_id())?;
        road.point(rp.point_id()).ok_or(Error::SegmentOutOfRange {
            feature: rp.feature_id(),
            segment: rp.point_id(),
            points: road.point_count(),
        })
    }

    pub fn joint_point(&self, joint_id: JointId) -> Result<Point<f64>, Error> {
        let rp = self
            .joint_index
            .point(joint_id)
            .ok_or(Error::JointNotFound(joint_id))?;
        self.point(rp)
    }

    pub fn restrictions(&self) -> &[(FeatureId, FeatureId)] {
        &self.restrictions
    }

    pub fn is_restricted(&self, from: FeatureId, to: FeatureId) -> bool {
        self.restrictions.binary_search(&(from, to)).is_ok()
    }

    pub fn calc_segment_weight(
        &self,
        segment: &Segment,
        fake: Option<&FakeGraph>,
        purpose: Purpose,
    ) -> Result<RouteWeight, Error> {
        let road = self.view(fake).road(segment.feature_id())?;
        if !segment.is_valid_for(road.point_count()) {
            return Err(segment_out_of_range(segment, &road));
        }
        Ok(RouteWeight::new(
            self.estimator.calc_segment_weight(segment, &road, purpose),
        ))
    }

    /// Lists the segments reachable from `segment` in one step.
    ///
    /// Outgoing edges leave the front point of `segment`, ingoing edges arrive at its
    /// back point. The weight is the travel time of the segment entered in travel
    /// order plus the turn penalties.
    ///
    /// # Errors
    ///
    /// Returns an error when a road touching the endpoint cannot be loaded or the
    /// segment is outside its feature.
    pub fn get_edge_list(
        &self,
        segment: &Segment,
        is_outgoing: bool,
        fake: Option<&FakeGraph>,
        edges: &mut Vec<SegmentEdge>,
    ) -> Result<(), Error> {
        let view = self.view(fake);
        let from_road = view.road(segment.feature_id())?;
        if !segment.is_valid_for(from_road.point_count()) {
            return Err(segment_out_of_range(segment, &from_road));
        }

        let pivot = segment.road_point(is_outgoing);
        let joint_id = view.joint_id(pivot);
        if joint_id == INVALID_JOINT_ID {
            return self.neighboring_edges(&view, segment, &from_road, pivot, is_outgoing, edges);
        }
        for rp in view.points(joint_id) {
            self.neighboring_edges(&view, segment, &from_road, rp, is_outgoing, edges)?;
        }
        Ok(())
    }

    fn neighboring_edges(
        &self,
        view: &GraphView<'_>,
        from: &Segment,
        from_road: &RoadGeometry,
        rp: RoadPoint,
        is_outgoing: bool,
        edges: &mut Vec<SegmentEdge>,
    ) -> Result<(), Error> {
        let road = view.road(rp.feature_id())?;
        if !road.is_routable() {
            return Ok(());
        }

        let feature_id = rp.feature_id();
        let point_id = rp.point_id();
        let has_next = (point_id as usize) + 1 < road.point_count();
        let bidirectional = !road.is_one_way();

        let mut candidates = Vec::with_capacity(2);
        if is_outgoing {
            if has_next {
                candidates.push(Segment::new(self.region, feature_id, point_id, true));
            }
            if bidirectional && point_id > 0 {
                candidates.push(Segment::new(self.region, feature_id, point_id - 1, false));
            }
        } else {
            if point_id > 0 {
                candidates.push(Segment::new(self.region, feature_id, point_id - 1, true));
            }
            if bidirectional && has_next {
                candidates.push(Segment::new(self.region, feature_id, point_id, false));
            }
        }

        for candidate in candidates {
            if let Some(weight) =
                self.transition_weight(view, from, from_road, &candidate, &road, is_outgoing)
            {
                edges.push(SegmentEdge::new(candidate, weight));
            }
        }
        Ok(())
    }

    /// Weight of stepping from `from` onto `to`, `None` when the step is forbidden
    fn transition_weight(
        &self,
        view: &GraphView<'_>,
        from: &Segment,
        from_road: &RoadGeometry,
        to: &Segment,
        to_road: &RoadGeometry,
        is_outgoing: bool,
    ) -> Option<RouteWeight> {
        // In travel order the route goes prev -> next.
        let (prev, prev_road, next, next_road) = if is_outgoing {
            (from, from_road, to, to_road)
        } else {
            (to, to_road, from, from_road)
        };
        let prev_point = prev.road_point(true);
        let next_point = next.road_point(false);

        let u_turn = is_u_turn(prev, next);
        if u_turn
            && view.static_joint_id(prev_point) == INVALID_JOINT_ID
            && !prev_road.is_end_point(prev_point.point_id())
        {
            return None;
        }

        if to_road.access().is_blocked() || prev_road.point_access(prev_point.point_id()).is_blocked() {
            return None;
        }

        let touches_connector =
            view.is_connector(prev.feature_id()) || view.is_connector(next.feature_id());
        let touches_request =
            view.is_request_feature(prev.feature_id()) || view.is_request_feature(next.feature_id());
        if prev.feature_id() != next.feature_id() && !touches_request {
            let joint = view.static_joint_id(prev_point);
            if joint == INVALID_JOINT_ID || joint != view.static_joint_id(next_point) {
                return None;
            }
        }

        // Pieces of a cut segment follow the restrictions of their road.
        let prev_origin = view.origin_segment(prev);
        let next_origin = view.origin_segment(next);
        let restricted = if prev_origin.feature_id() != next_origin.feature_id() {
            self.is_restricted(prev_origin.feature_id(), next_origin.feature_id())
        } else {
            is_u_turn(&prev_origin, &next_origin)
                && self.is_restricted(prev_origin.feature_id(), next_origin.feature_id())
        };
        if restricted {
            return None;
        }

        if !self.blocked_edges.is_empty() && !view.is_connector(to.feature_id()) {
            if let Some(edge) = self.joint_edge_of(&view.origin_segment(to)) {
                if self.blocked_edges.contains(&edge) {
                    return None;
                }
            }
        }

        let entered = if is_outgoing { to } else { from };
        let entered_road = if is_outgoing { to_road } else { from_road };
        let weight = self
            .estimator
            .calc_segment_weight(entered, entered_road, Purpose::Weight);

        let penalties = if touches_connector {
            RouteWeight::default()
        } else {
            self.penalties(prev, prev_road, next_road, u_turn)
        };
        Some(RouteWeight::new(weight) + penalties)
    }

    fn penalties(
        &self,
        prev: &Segment,
        prev_road: &RoadGeometry,
        next_road: &RoadGeometry,
        is_u_turn: bool,
    ) -> RouteWeight {
        let pass_through = i32::from(
            prev_road.is_pass_through_allowed() != next_road.is_pass_through_allowed(),
        );

        let prev_public = prev_road.access() == AccessType::Yes;
        let next_public = next_road.access() == AccessType::Yes;
        let mut access = i32::from(prev_public != next_public);
        // A barrier on the border of an access zone counts once.
        if prev_road.point_access(prev.point_id(true)) != AccessType::Yes {
            access = 1;
        }

        let mut weight = 0.0;
        if is_u_turn {
            weight += self.estimator.u_turn_penalty(Purpose::Weight);
        }
        if !prev_road.is_ferry() && next_road.is_ferry() {
            weight += self.estimator.ferry_landing_penalty(Purpose::Weight);
        }
        RouteWeight::with_penalties(weight, pass_through, access, 0.0)
    }

    /// Compressed edges: every outgoing step from `segment` followed along its
    /// feature until a joint, a feature end or a segment accepted by `is_stop`.
    ///
    /// Interior points are checked for access blocks on the way.
    pub fn get_joint_segment_edges(
        &self,
        segment: &Segment,
        fake: Option<&FakeGraph>,
        is_stop: &mut dyn FnMut(&Segment) -> bool,
        edges: &mut Vec<(JointSegment, RouteWeight)>,
    ) -> Result<(), Error> {
        let view = self.view(fake);
        let mut first_steps = Vec::new();
        self.get_edge_list(segment, true, fake, &mut first_steps)?;

        for step in first_steps {
            let road = view.road(step.target.feature_id())?;
            let mut weight = step.weight;
            let mut current = step.target;
            let mut blocked = false;
            loop {
                let front = current.road_point(true);
                if view.joint_id(front) != INVALID_JOINT_ID
                    || road.is_end_point(front.point_id())
                    || is_stop(&current)
                {
                    break;
                }
                let Some(next) = current.next_along(road.point_count()) else {
                    break;
                };
                let access = road.point_access(front.point_id());
                if access.is_blocked() {
                    blocked = true;
                    break;
                }
                let unit = self
                    .estimator
                    .calc_segment_weight(&next, &road, Purpose::Weight);
                let access_changes = i32::from(access != AccessType::Yes);
                weight += RouteWeight::with_penalties(unit, 0, access_changes, 0.0);
                current = next;
            }
            if !blocked {
                edges.push((JointSegment::from_segments(&step.target, &current), weight));
            }
        }
        Ok(())
    }

    /// Segments of the compressed run ending with `last`, in travel order
    pub fn expand_joint_segment(
        &self,
        last: &Segment,
        fake: Option<&FakeGraph>,
        is_stop: &mut dyn FnMut(&Segment) -> bool,
    ) -> Result<Vec<Segment>, Error> {
        let view = self.view(fake);
        let road = view.road(last.feature_id())?;
        let mut run = vec![*last];
        let mut current = *last;
        while let Some(prev) = current.prev_along(road.point_count()) {
            let pivot = prev.road_point(true);
            if view.joint_id(pivot) != INVALID_JOINT_ID || is_stop(&prev) {
                break;
            }
            run.push(prev);
            current = prev;
        }
        run.reverse();
        Ok(run)
    }

    /// Joint edge of the region graph that contains `segment`
    pub fn joint_edge_of(&self, segment: &Segment) -> Option<DirectedEdge> {
        let back = segment.road_point(false);
        let front = segment.road_point(true);
        let forward = segment.is_forward();
        let from = match self.road_index.joint_id(back) {
            INVALID_JOINT_ID => self.road_index.find_neighbor(back, !forward)?.0,
            joint => joint,
        };
        let to = match self.road_index.joint_id(front) {
            INVALID_JOINT_ID => self.road_index.find_neighbor(front, forward)?.0,
            joint => joint,
        };
        Some(DirectedEdge::new(from, to, segment.feature_id()))
    }

    /// Joint-level adjacency: neighbouring joints along every feature at `joint_id`.
    ///
    /// With `without_restrictions` fake features are skipped and blocked edges kept,
    /// which gives the view of the source network.
    pub fn get_joint_edge_list(
        &self,
        joint_id: JointId,
        is_outgoing: bool,
        without_restrictions: bool,
    ) -> Result<Vec<JointEdge>, Error> {
        let mut edges = Vec::new();
        for rp in self.joint_index.points(joint_id) {
            if without_restrictions && Self::is_fake_feature(rp.feature_id()) {
                continue;
            }
            let road = self.road(rp.feature_id())?;
            let bidirectional = !road.is_one_way();
            for forward in [false, true] {
                if !bidirectional && forward != is_outgoing {
                    continue;
                }
                let Some((neighbor, neighbor_point)) = self.road_index.find_neighbor(rp, forward)
                else {
                    continue;
                };
                if !without_restrictions {
                    let edge = if is_outgoing {
                        DirectedEdge::new(joint_id, neighbor, rp.feature_id())
                    } else {
                        DirectedEdge::new(neighbor, joint_id, rp.feature_id())
                    };
                    if self.blocked_edges.contains(&edge) {
                        continue;
                    }
                }
                let weight = self.estimator.calc_edges_weight(
                    rp.feature_id(),
                    &road,
                    rp.point_id(),
                    neighbor_point,
                );
                edges.push(JointEdge::new(neighbor, weight));
            }
        }
        Ok(edges)
    }

    /// Joint edges passing through `rp`, or touching it when it is a joint
    pub fn get_intermediate_point_edges(&self, rp: RoadPoint) -> Result<Vec<DirectedEdge>, Error> {
        let mut result = Vec::new();
        let joint_id = self.road_index.joint_id(rp);
        if joint_id != INVALID_JOINT_ID {
            for point in self.joint_index.points(joint_id) {
                let road = self.road(point.feature_id())?;
                if let Some((next, _)) = self.road_index.find_neighbor(point, true) {
                    result.push(DirectedEdge::new(joint_id, next, point.feature_id()));
                    if !road.is_one_way() {
                        result.push(DirectedEdge::new(next, joint_id, point.feature_id()));
                    }
                }
                if let Some((prev, _)) = self.road_index.find_neighbor(point, false) {
                    result.push(DirectedEdge::new(prev, joint_id, point.feature_id()));
                    if !road.is_one_way() {
                        result.push(DirectedEdge::new(joint_id, prev, point.feature_id()));
                    }
                }
            }
            return Ok(result);
        }

        let road = self.road(rp.feature_id())?;
        let prev = self.road_index.find_neighbor(rp, false);
        let next = self.road_index.find_neighbor(rp, true);
        if let (Some((prev, _)), Some((next, _))) = (prev, next) {
            result.push(DirectedEdge::new(prev, next, rp.feature_id()));
            if !road.is_one_way() {
                result.push(DirectedEdge::new(next, prev, rp.feature_id()));
            }
        }
        Ok(result)
    }

    pub fn disable_edge(&mut self, edge: DirectedEdge) {
        self.blocked_edges.insert(edge);
    }

    /// Disables every feature edge leading from `from` straight to `to`
    pub fn disable_all_edges(&mut self, from: JointId, to: JointId) {
        let mut disabled = Vec::new();
        for (a, b) in self.joint_index.find_points_with_common_feature(from, to) {
            let forward = b.point_id() > a.point_id();
            if let Some((neighbor, point)) = self.road_index.find_neighbor(a, forward) {
                if neighbor == to && point == b.point_id() {
                    disabled.push(DirectedEdge::new(from, to, a.feature_id()));
                }
            }
        }
        self.blocked_edges.extend(disabled);
    }

    pub fn is_blocked(&self, edge: &DirectedEdge) -> bool {
        self.blocked_edges.contains(edge)
    }

    pub fn num_blocked_edges(&self) -> usize {
        self.blocked_edges.len()
    }

    pub fn insert_joint(&mut self, rp: RoadPoint) -> JointId {
        let existing = self.road_index.joint_id(rp);
        if existing != INVALID_JOINT_ID {
            return existing;
        }
        let joint_id = self.joint_index.insert_joint(rp);
        self.road_index.add_joint(rp, joint_id);
        joint_id
    }

    pub(super) fn attach_point(&mut self, joint_id: JointId, rp: RoadPoint) {
        self.road_index.add_joint(rp, joint_id);
        self.joint_index.append_to_joint(joint_id, rp);
    }

    pub(super) fn insert_fake_road(&mut self, road: RoadGeometry) -> FeatureId {
        let feature_id = self.next_fake_feature_id;
        self.next_fake_feature_id += 1;
        self.geometry.insert_fake(feature_id, road);
        feature_id
    }

    fn fake_feature_geometry(&self, geometry_source: &[RoadPoint]) -> Result<RoadGeometry, Error> {
        if geometry_source.len() < 2 {
            return Err(Error::InvalidData(
                "Fake feature needs at least two points".into(),
            ));
        }
        let mut points = Vec::with_capacity(geometry_source.len());
        let mut average_speed = 0.0;
        for &rp in geometry_source {
            average_speed += self.road(rp.feature_id())?.speed_kmph() / geometry_source.len() as f64;
            points.push(self.point(rp)?);
        }
        let source = self.road(geometry_source[0].feature_id())?;
        Ok(RoadGeometry::new(points, average_speed)
            .with_one_way(true)
            .with_pass_through(source.is_pass_through_allowed())
            .with_ferry(source.is_ferry())
            .with_access(source.access()))
    }

    /// Adds a one-way feature over the points of `geometry_source` starting at `from`
    ///
    /// # Errors
    ///
    /// Fails for unknown joints or fewer than two source points.
    pub fn add_fake_loose_end_feature(
        &mut self,
        from: JointId,
        geometry_source: &[RoadPoint],
    ) -> Result<FeatureId, Error> {
        if !self.joint_index.contains(from) {
            return Err(Error::JointNotFound(from));
        }
        let road = self.fake_feature_geometry(geometry_source)?;
        let feature_id = self.insert_fake_road(road);
        self.attach_point(from, RoadPoint::new(feature_id, 0));
        Ok(feature_id)
    }

    /// Adds a one-way feature from `from` to `to` over the points of `geometry_source`
    pub fn add_fake_feature(
        &mut self,
        from: JointId,
        to: JointId,
        geometry_source: &[RoadPoint],
    ) -> Result<FeatureId, Error> {
        if !self.joint_index.contains(to) {
            return Err(Error::JointNotFound(to));
        }
        let feature_id = self.add_fake_loose_end_feature(from, geometry_source)?;
        let last = (geometry_source.len() - 1) as u32;
        self.attach_point(to, RoadPoint::new(feature_id, last));
        Ok(feature_id)
    }

    pub fn joint_lies_on_road(&self, joint_id: JointId, feature_id: FeatureId) -> bool {
        let mut lies = false;
        self.joint_index.for_each_point(joint_id, |rp| {
            lies |= rp.feature_id() == feature_id;
        });
        lies
    }

    pub fn insert_to_edge_mapping(&mut self, from: DirectedEdge, to: DirectedEdge) {
        let children = self.edge_mapping.entry(from).or_default();
        if !children.contains(&to) {
            children.push(to);
        }
    }

    /// Visits every edge derived from `edge`, children before parents, `edge` last
    pub fn for_each_edge_mapping_node(&self, edge: &DirectedEdge, mut f: impl FnMut(&DirectedEdge)) {
        let mut visited = HashSet::new();
        self.visit_mapping(edge, &mut visited, &mut |e| f(e));
    }

    /// Same as [`Self::for_each_edge_mapping_node`] without blocked edges
    pub fn for_each_non_blocked_edge_mapping_node(
        &self,
        edge: &DirectedEdge,
        mut f: impl FnMut(&DirectedEdge),
    ) {
        let mut visited = HashSet::new();
        self.visit_mapping(edge, &mut visited, &mut |e| {
            if !self.blocked_edges.contains(e) {
                f(e);
            }
        });
    }

    fn visit_mapping(
        &self,
        edge: &DirectedEdge,
        visited: &mut HashSet<DirectedEdge>,
        f: &mut dyn FnMut(&DirectedEdge),
    ) {
        if !visited.insert(*edge) {
            return;
        }
        if let Some(children) = self.edge_mapping.get(edge) {
            for child in children {
                self.visit_mapping(child, visited, f);
            }
        }
        f(edge);
    }

    pub fn single_feature_path(&self, from: RoadPoint, to: RoadPoint) -> Vec<RoadPoint> {
        let feature_id = from.feature_id();
        if from.point_id() <= to.point_id() {
            (from.point_id()..=to.point_id())
                .map(|p| RoadPoint::new(feature_id, p))
                .collect()
        } else {
            (to.point_id()..=from.point_id())
                .rev()
                .map(|p| RoadPoint::new(feature_id, p))
                .collect()
        }
    }

    pub fn connection_paths(&self, from: JointId, to: JointId) -> Result<Vec<Vec<RoadPoint>>, Error> {
        let connections = self.joint_index.find_points_with_common_feature(from, to);
        if connections.is_empty() {
            return Err(not_connected(from, to));
        }
        Ok(connections
            .into_iter()
            .map(|(a, b)| self.single_feature_path(a, b))
            .collect())
    }

    /// Cheapest single-feature path between two joints
    pub fn shortest_connection_path(&self, from: JointId, to: JointId) -> Result<Vec<RoadPoint>, Error> {
        let connections = self.joint_index.find_points_with_common_feature(from, to);
        match connections.as_slice() {
            [] => Err(not_connected(from, to)),
            [(a, b)] => Ok(self.single_feature_path(*a, *b)),
            _ => {
                let mut best: Option<(f64, RoadPoint, RoadPoint)> = None;
                for &(a, b) in &connections {
                    let road = self.road(a.feature_id())?;
                    let weight = self.estimator.calc_edges_weight(
                        a.feature_id(),
                        &road,
                        a.point_id(),
                        b.point_id(),
                    );
                    if best.is_none_or(|(w, _, _)| weight < w) {
                        best = Some((weight, a, b));
                    }
                }
                best.map(|(_, a, b)| self.single_feature_path(a, b))
                    .ok_or_else(|| not_connected(from, to))
            }
        }
    }

    pub fn feature_connection_path(
        &self,
        from: JointId,
        to: JointId,
        feature_id: FeatureId,
    ) -> Result<Vec<RoadPoint>, Error> {
        self.joint_index
            .find_points_with_common_feature(from, to)
            .into_iter()
            .find(|(a, _)| a.feature_id() == feature_id)
            .map(|(a, b)| self.single_feature_path(a, b))
            .ok_or_else(|| {
                Error::InvalidData(format!(
                    "Joints {from} and {to} are not connected by feature {feature_id}"
                ))
            })
    }
}

fn is_u_turn(prev: &Segment, next: &Segment) -> bool {
    prev.feature_id() == next.feature_id()
        && prev.segment_idx() == next.segment_idx()
        && prev.is_forward() != next.is_forward()
}

fn segment_out_of_range(segment: &Segment, road: &RoadGeometry) -> Error {
    Error::SegmentOutOfRange {
        feature: segment.feature_id(),
        segment: segment.segment_idx(),
        points: road.point_count(),
    }
}

fn not_connected(from: JointId, to: JointId) -> Error {
    Error::InvalidData(format!("Joints {from} and {to} share no feature"))
}
