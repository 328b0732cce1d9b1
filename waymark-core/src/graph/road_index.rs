use hashbrown::HashMap;

use crate::{
    FeatureId, INVALID_JOINT_ID, JointId, PointId,
    model::{Joint, RoadPoint},
};

/// Joint ids of one feature, indexed by point id
#[derive(Debug, Clone, Default)]
pub struct RoadJointIds {
    joint_ids: Vec<JointId>,
}

impl RoadJointIds {
    pub fn joint_id(&self, point_id: PointId) -> JointId {
        self.joint_ids
            .get(point_id as usize)
            .copied()
            .unwrap_or(INVALID_JOINT_ID)
    }

    pub fn add_joint(&mut self, point_id: PointId, joint_id: JointId) {
        let idx = point_id as usize;
        if idx >= self.joint_ids.len() {
            self.joint_ids.resize(idx + 1, INVALID_JOINT_ID);
        }
        self.joint_ids[idx] = joint_id;
    }

    pub fn for_each_joint(&self, mut f: impl FnMut(PointId, JointId)) {
        for (point_id, &joint_id) in self.joint_ids.iter().enumerate() {
            if joint_id != INVALID_JOINT_ID {
                f(point_id as PointId, joint_id);
            }
        }
    }

    /// Nearest point with a joint strictly after (`forward`) or before `point_id`
    pub fn find_neighbor(&self, point_id: PointId, forward: bool) -> Option<(JointId, PointId)> {
        let idx = point_id as usize;
        if forward {
            self.joint_ids
                .iter()
                .enumerate()
                .skip(idx + 1)
                .find(|&(_, &j)| j != INVALID_JOINT_ID)
                .map(|(p, &j)| (j, p as PointId))
        } else {
            self.joint_ids
                .iter()
                .enumerate()
                .take(idx.min(self.joint_ids.len()))
                .rev()
                .find(|&(_, &j)| j != INVALID_JOINT_ID)
                .map(|(p, &j)| (j, p as PointId))
        }
    }

    /// Highest point id that carries a joint plus one
    pub fn len(&self) -> usize {
        self.joint_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joint_ids.is_empty()
    }
}

/// Mapping from road points to joints
#[derive(Debug, Clone, Default)]
pub struct RoadIndex {
    roads: HashMap<FeatureId, RoadJointIds>,
}

impl RoadIndex {
    /// Joint ids are the positions in `joints`
    pub fn import(joints: &[Joint]) -> Self {
        let mut index = Self::default();
        for (joint_id, joint) in joints.iter().enumerate() {
            for &rp in joint.points() {
                index.add_joint(rp, joint_id as JointId);
            }
        }
        index
    }

    pub fn add_joint(&mut self, rp: RoadPoint, joint_id: JointId) {
        self.roads
            .entry(rp.feature_id())
            .or_default()
            .add_joint(rp.point_id(), joint_id);
    }

    pub fn joint_id(&self, rp: RoadPoint) -> JointId {
        self.roads
            .get(&rp.feature_id())
            .map_or(INVALID_JOINT_ID, |road| road.joint_id(rp.point_id()))
    }

    pub fn road(&self, feature_id: FeatureId) -> Option<&RoadJointIds> {
        self.roads.get(&feature_id)
    }

    pub fn find_neighbor(&self, rp: RoadPoint, forward: bool) -> Option<(JointId, PointId)> {
        self.roads
            .get(&rp.feature_id())
            .and_then(|road| road.find_neighbor(rp.point_id(), forward))
    }

    /// End points of two features meeting at a common joint.
    ///
    /// `from_last` and `to_last` are the last point ids of the features. Returns the
    /// end point of `from`, the end point of `to` and the joint they share.
    pub fn adjacent_ft_points(
        &self,
        from: FeatureId,
        from_last: PointId,
        to: FeatureId,
        to_last: PointId,
    ) -> Option<(RoadPoint, RoadPoint, JointId)> {
        let from_road = self.roads.get(&from)?;
        let to_road = self.roads.get(&to)?;
        for from_point in [from_last, 0] {
            let joint = from_road.joint_id(from_point);
            if joint == INVALID_JOINT_ID {
                continue;
            }
            for to_point in [0, to_last] {
                if to_road.joint_id(to_point) == joint {
                    return Some((
                        RoadPoint::new(from, from_point),
                        RoadPoint::new(to, to_point),
                        joint,
                    ));
                }
            }
        }
        None
    }

    /// Roads in ascending feature order
    pub fn for_each_road(&self, mut f: impl FnMut(FeatureId, &RoadJointIds)) {
        let mut ids: Vec<_> = self.roads.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            if let Some(road) = self.roads.get(&id) {
                f(id, road);
            }
        }
    }

    pub fn num_roads(&self) -> usize {
        self.roads.len()
    }
}
