use serde::{Deserialize, Serialize};

use crate::{FeatureId, JointId, model::RoadPoint};

/// Group of road points sharing one physical location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joint {
    points: Vec<RoadPoint>,
}

impl Joint {
    pub fn new(points: Vec<RoadPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[RoadPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn add_point(&mut self, point: RoadPoint) {
        self.points.push(point);
    }
}

/// Edge between two neighbouring joints along one feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DirectedEdge {
    pub from: JointId,
    pub to: JointId,
    pub feature_id: FeatureId,
}

impl DirectedEdge {
    pub const fn new(from: JointId, to: JointId, feature_id: FeatureId) -> Self {
        Self {
            from,
            to,
            feature_id,
        }
    }
}
