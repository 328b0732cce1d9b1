//! Request-local overlay on top of a region graph

use std::sync::Arc;

use hashbrown::HashMap;

use crate::{
    Error, FeatureId, INVALID_JOINT_ID, JointId, RegionId,
    graph::IndexGraph,
    model::{RoadGeometry, RoadPoint, Segment},
};

/// Joints and features created for one route request.
///
/// Features are either zero-length connectors at a request location or pieces
/// of a road segment cut at that location. Ids continue after the region graph's
/// own joints and fake features, and nothing is written back into the static
/// tables.
#[derive(Debug, Clone)]
pub struct FakeGraph {
    region: RegionId,
    first_joint_id: JointId,
    next_joint_id: JointId,
    next_feature_id: FeatureId,
    roads: HashMap<FeatureId, Arc<RoadGeometry>>,
    /// Forward segment every piece was cut from
    pieces: HashMap<FeatureId, Segment>,
    point_joints: HashMap<RoadPoint, JointId>,
    joint_points: HashMap<JointId, Vec<RoadPoint>>,
}

impl FakeGraph {
    pub fn new(graph: &IndexGraph) -> Self {
        Self {
            region: graph.region(),
            first_joint_id: graph.num_joints(),
            next_joint_id: graph.num_joints(),
            next_feature_id: graph.next_fake_feature_id(),
            roads: HashMap::new(),
            pieces: HashMap::new(),
            point_joints: HashMap::new(),
            joint_points: HashMap::new(),
        }
    }

    pub fn region(&self) -> RegionId {
        self.region
    }

    pub fn add_joint(&mut self) -> JointId {
        let joint_id = self.next_joint_id;
        self.next_joint_id += 1;
        joint_id
    }

    pub fn attach(&mut self, joint_id: JointId, rp: RoadPoint) {
        self.point_joints.insert(rp, joint_id);
        self.joint_points.entry(joint_id).or_default().push(rp);
    }

    pub fn add_road(&mut self, road: RoadGeometry) -> FeatureId {
        let feature_id = self.next_feature_id;
        self.next_feature_id += 1;
        self.roads.insert(feature_id, Arc::new(road));
        feature_id
    }

    /// Adds a one-segment piece of `origin`, laid out in the direction of `origin`
    pub fn add_piece(&mut self, road: RoadGeometry, origin: Segment) -> FeatureId {
        let feature_id = self.add_road(road);
        self.pieces.insert(feature_id, origin);
        feature_id
    }

    pub fn road(&self, feature_id: FeatureId) -> Option<&Arc<RoadGeometry>> {
        self.roads.get(&feature_id)
    }

    pub fn contains(&self, feature_id: FeatureId) -> bool {
        self.roads.contains_key(&feature_id)
    }

    pub fn is_connector(&self, feature_id: FeatureId) -> bool {
        self.roads.contains_key(&feature_id) && !self.pieces.contains_key(&feature_id)
    }

    pub fn has_pieces(&self) -> bool {
        !self.pieces.is_empty()
    }

    /// Pieces cut from `segment`, travelled in its direction
    pub fn pieces_of(&self, segment: &Segment) -> Vec<Segment> {
        let mut pieces: Vec<Segment> = self
            .pieces
            .iter()
            .filter(|(_, origin)| {
                origin.feature_id() == segment.feature_id() && origin.segment_idx() == segment.segment_idx()
            })
            .map(|(&feature_id, _)| Segment::new(self.region, feature_id, 0, segment.is_forward()))
            .collect();
        pieces.sort_unstable();
        pieces
    }

    /// Segment of the region graph a piece segment was cut from, travelled in the
    /// same direction
    pub fn origin(&self, segment: &Segment) -> Option<Segment> {
        self.pieces.get(&segment.feature_id()).map(|origin| {
            Segment::new(
                origin.region(),
                origin.feature_id(),
                origin.segment_idx(),
                segment.is_forward(),
            )
        })
    }

    pub fn is_fake_joint(&self, joint_id: JointId) -> bool {
        joint_id >= self.first_joint_id && joint_id < self.next_joint_id
    }

    pub fn joint_id(&self, rp: RoadPoint) -> Option<JointId> {
        self.point_joints.get(&rp).copied()
    }

    pub fn joint_points(&self, joint_id: JointId) -> &[RoadPoint] {
        self.joint_points.get(&joint_id).map_or(&[], Vec::as_slice)
    }
}

/// Read access to a region graph with an optional request overlay
#[derive(Clone, Copy)]
pub struct GraphView<'a> {
    graph: &'a IndexGraph,
    fake: Option<&'a FakeGraph>,
}

impl<'a> GraphView<'a> {
    pub fn new(graph: &'a IndexGraph, fake: Option<&'a FakeGraph>) -> Self {
        Self { graph, fake }
    }

    pub fn graph(&self) -> &'a IndexGraph {
        self.graph
    }

    pub fn joint_id(&self, rp: RoadPoint) -> JointId {
        self.fake
            .and_then(|fake| fake.joint_id(rp))
            .unwrap_or_else(|| self.graph.road_index().joint_id(rp))
    }

    /// Joint id from the region graph alone, ignoring request joints
    pub fn static_joint_id(&self, rp: RoadPoint) -> JointId {
        self.graph.road_index().joint_id(rp)
    }

    pub fn for_each_point(&self, joint_id: JointId, mut f: impl FnMut(RoadPoint)) {
        if joint_id == INVALID_JOINT_ID {
            return;
        }
        self.graph.joint_index().for_each_point(joint_id, &mut f);
        if let Some(fake) = self.fake {
            for &rp in fake.joint_points(joint_id) {
                f(rp);
            }
        }
    }

    pub fn points(&self, joint_id: JointId) -> Vec<RoadPoint> {
        let mut points = Vec::new();
        self.for_each_point(joint_id, |rp| points.push(rp));
        points
    }

    /// # Errors
    ///
    /// Returns an error when the feature is neither a request connector nor a
    /// feature of the region graph.
    pub fn road(&self, feature_id: FeatureId) -> Result<Arc<RoadGeometry>, Error> {
        if let Some(road) = self.fake.and_then(|fake| fake.road(feature_id)) {
            return Ok(Arc::clone(road));
        }
        self.graph.road(feature_id)
    }

    pub fn is_connector(&self, feature_id: FeatureId) -> bool {
        self.fake.is_some_and(|fake| fake.is_connector(feature_id))
    }

    /// Whether the feature belongs to the request overlay
    pub fn is_request_feature(&self, feature_id: FeatureId) -> bool {
        self.fake.is_some_and(|fake| fake.contains(feature_id))
    }

    /// `segment` itself, or the segment of the region graph it was cut from
    pub fn origin_segment(&self, segment: &Segment) -> Segment {
        self.fake
            .and_then(|fake| fake.origin(segment))
            .unwrap_or(*segment)
    }

    pub fn find_points_with_common_feature(
        &self,
        from: JointId,
        to: JointId,
    ) -> Vec<(RoadPoint, RoadPoint)> {
        let to_points = self.points(to);
        let mut result = Vec::new();
        self.for_each_point(from, |a| {
            for &b in &to_points {
                if a.feature_id() == b.feature_id() && a != b {
                    result.push((a, b));
                }
            }
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use geo::Point;

    use super::*;
    use crate::{
        loading::{MapSource, MemoryMap, build_index_graph},
        routing::{VehicleType, create_estimator},
    };

    fn graph() -> IndexGraph {
        let road = RoadGeometry::new(vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)], 36.0);
        let source: Arc<dyn MapSource> = Arc::new(MemoryMap::single_region(vec![(1, road)]));
        build_index_graph(&source, 0, create_estimator(VehicleType::Car, 130.0, None)).unwrap()
    }

    #[test]
    fn pieces_map_back_to_their_segment() {
        let graph = graph();
        let mut fake = FakeGraph::new(&graph);
        let source = graph.road(1).unwrap();
        let origin = Segment::new(0, 1, 0, true);
        let piece = fake.add_piece(
            RoadGeometry::piece(vec![Point::new(40.0, 0.0), Point::new(100.0, 0.0)], &source),
            origin,
        );
        let connector = fake.add_road(RoadGeometry::new(vec![Point::new(40.0, 0.0); 2], 36.0));

        assert!(fake.contains(piece) && fake.contains(connector));
        assert!(!fake.is_connector(piece));
        assert!(fake.is_connector(connector));
        assert_eq!(fake.origin(&Segment::new(0, piece, 0, false)), Some(origin.reversed()));
        assert_eq!(fake.origin(&Segment::new(0, connector, 0, true)), None);
        assert_eq!(fake.pieces_of(&origin.reversed()), vec![Segment::new(0, piece, 0, false)]);
        assert!(fake.pieces_of(&Segment::new(0, 2, 0, true)).is_empty());

        let view = graph.view(Some(&fake));
        assert_eq!(view.origin_segment(&Segment::new(0, piece, 0, true)), origin);
        assert_eq!(view.origin_segment(&origin), origin);
        assert!(view.is_request_feature(piece));
        assert!(!view.is_request_feature(1));
    }
}
