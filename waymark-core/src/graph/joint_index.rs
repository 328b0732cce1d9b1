use hashbrown::HashMap;
use log::warn;

use crate::{
    JointId,
    graph::RoadIndex,
    model::RoadPoint,
};

/// Mapping from joints to the road points coincident there.
///
/// Static joints live in one flat array addressed by offsets. Joints inserted
/// after the build and points appended to existing joints are kept aside.
#[derive(Debug, Clone, Default)]
pub struct JointIndex {
    offsets: Vec<u32>,
    points: Vec<RoadPoint>,
    dynamic: HashMap<JointId, Vec<RoadPoint>>,
    num_joints: u32,
}

impl JointIndex {
    pub fn build(road_index: &RoadIndex, num_joints: u32) -> Self {
        let mut offsets = vec![0u32; num_joints as usize + 1];

        road_index.for_each_road(|_, road| {
            road.for_each_joint(|_, joint_id| {
                if joint_id < num_joints {
                    offsets[joint_id as usize + 1] += 1;
                }
            });
        });

        for i in 1..offsets.len() {
            offsets[i] += offsets[i - 1];
        }

        let total = offsets[num_joints as usize] as usize;
        let mut points = vec![RoadPoint::default(); total];
        let mut cursors = offsets.clone();
        let mut skipped = 0usize;
        road_index.for_each_road(|feature_id, road| {
            road.for_each_joint(|point_id, joint_id| {
                if joint_id >= num_joints {
                    skipped += 1;
                    return;
                }
                let cursor = &mut cursors[joint_id as usize];
                points[*cursor as usize] = RoadPoint::new(feature_id, point_id);
                *cursor += 1;
            });
        });
        if skipped > 0 {
            warn!("Ignored {skipped} road points referencing joints beyond {num_joints}");
        }

        Self {
            offsets,
            points,
            dynamic: HashMap::new(),
            num_joints,
        }
    }

    pub fn num_joints(&self) -> u32 {
        self.num_joints
    }

    pub fn num_static_points(&self) -> usize {
        self.points.len()
    }

    fn static_points(&self, joint_id: JointId) -> &[RoadPoint] {
        let idx = joint_id as usize;
        if idx + 1 >= self.offsets.len() {
            return &[];
        }
        &self.points[self.offsets[idx] as usize..self.offsets[idx + 1] as usize]
    }

    pub fn for_each_point(&self, joint_id: JointId, mut f: impl FnMut(RoadPoint)) {
        for &rp in self.static_points(joint_id) {
            f(rp);
        }
        if let Some(extra) = self.dynamic.get(&joint_id) {
            for &rp in extra {
                f(rp);
            }
        }
    }

    pub fn points(&self, joint_id: JointId) -> Vec<RoadPoint> {
        let mut points = Vec::new();
        self.for_each_point(joint_id, |rp| points.push(rp));
        points
    }

    /// Any point of the joint
    pub fn point(&self, joint_id: JointId) -> Option<RoadPoint> {
        self.static_points(joint_id)
            .first()
            .or_else(|| self.dynamic.get(&joint_id).and_then(|extra| extra.first()))
            .copied()
    }

    pub fn contains(&self, joint_id: JointId) -> bool {
        joint_id < self.num_joints
    }

    pub fn append_to_joint(&mut self, joint_id: JointId, rp: RoadPoint) {
        self.dynamic.entry(joint_id).or_default().push(rp);
    }

    pub fn insert_joint(&mut self, rp: RoadPoint) -> JointId {
        let joint_id = self.num_joints;
        self.num_joints += 1;
        self.dynamic.insert(joint_id, vec![rp]);
        joint_id
    }

    /// Pairs of points of `from` and `to` lying on the same feature
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
