use crate::{
    JointId,
    model::{RouteWeight, Segment},
};

/// Search edge between segments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentEdge {
    pub target: Segment,
    pub weight: RouteWeight,
}

impl SegmentEdge {
    pub const fn new(target: Segment, weight: RouteWeight) -> Self {
        Self { target, weight }
    }
}

/// Edge between neighbouring joints, weighted in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointEdge {
    pub target: JointId,
    pub weight: f64,
}

impl JointEdge {
    pub const fn new(target: JointId, weight: f64) -> Self {
        Self { target, weight }
    }
}
