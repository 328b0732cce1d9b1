use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{FeatureId, PointId, RegionId, START_FAKE_FEATURE_IDS};

/// A point of a road feature, addressed by feature id and index in its point array
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct RoadPoint {
    feature_id: FeatureId,
    point_id: PointId,
}

impl RoadPoint {
    pub const fn new(feature_id: FeatureId, point_id: PointId) -> Self {
        Self {
            feature_id,
            point_id,
        }
    }

    pub const fn feature_id(&self) -> FeatureId {
        self.feature_id
    }

    pub const fn point_id(&self) -> PointId {
        self.point_id
    }
}

impl fmt::Display for RoadPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoadPoint({}, {})", self.feature_id, self.point_id)
    }
}

/// Directed unit edge between two consecutive points of a feature.
///
/// A forward segment goes from `segment_idx` to `segment_idx + 1`, a backward one
/// the other way round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Segment {
    region: RegionId,
    feature_id: FeatureId,
    segment_idx: u32,
    forward: bool,
}

impl Segment {
    pub const fn new(region: RegionId, feature_id: FeatureId, segment_idx: u32, forward: bool) -> Self {
        Self {
            region,
            feature_id,
            segment_idx,
            forward,
        }
    }

    pub const fn region(&self) -> RegionId {
        self.region
    }

    pub const fn feature_id(&self) -> FeatureId {
        self.feature_id
    }

    pub const fn segment_idx(&self) -> u32 {
        self.segment_idx
    }

    pub const fn is_forward(&self) -> bool {
        self.forward
    }

    /// Point id of the front (`front == true`) or back end of the segment
    pub const fn point_id(&self, front: bool) -> PointId {
        if front == self.forward {
            self.segment_idx + 1
        } else {
            self.segment_idx
        }
    }

    pub const fn road_point(&self, front: bool) -> RoadPoint {
        RoadPoint::new(self.feature_id, self.point_id(front))
    }

    pub const fn reversed(&self) -> Self {
        Self::new(self.region, self.feature_id, self.segment_idx, !self.forward)
    }

    /// Features above the fake id offset are created by graph rewrites or requests
    pub const fn is_fake_feature(&self) -> bool {
        self.feature_id >= START_FAKE_FEATURE_IDS
    }

    pub const fn is_valid_for(&self, point_count: usize) -> bool {
        (self.segment_idx as usize) + 1 < point_count
    }

    /// Next segment along the same feature in the travel direction
    pub fn next_along(&self, point_count: usize) -> Option<Self> {
        if self.forward {
            let next = Self::new(self.region, self.feature_id, self.segment_idx + 1, true);
            next.is_valid_for(point_count).then_some(next)
        } else {
            self.segment_idx
                .checked_sub(1)
                .map(|idx| Self::new(self.region, self.feature_id, idx, false))
        }
    }

    /// Previous segment along the same feature in the travel direction
    pub fn prev_along(&self, point_count: usize) -> Option<Self> {
        self.reversed()
            .next_along(point_count)
            .map(|segment| segment.reversed())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Segment(region {}, feature {}, idx {}, {})",
            self.region,
            self.feature_id,
            self.segment_idx,
            if self.forward { "fwd" } else { "bwd" }
        )
    }
}

/// Run of consecutive segments along one feature between two stop points.
///
/// `start_segment_idx` and `end_segment_idx` are both inclusive; for backward runs
/// the start index is the larger one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointSegment {
    region: RegionId,
    feature_id: FeatureId,
    start_segment_idx: u32,
    end_segment_idx: u32,
    forward: bool,
}

impl JointSegment {
    pub fn from_segments(first: &Segment, last: &Segment) -> Self {
        Self {
            region: first.region(),
            feature_id: first.feature_id(),
            start_segment_idx: first.segment_idx(),
            end_segment_idx: last.segment_idx(),
            forward: first.is_forward(),
        }
    }

    pub const fn feature_id(&self) -> FeatureId {
        self.feature_id
    }

    pub const fn is_forward(&self) -> bool {
        self.forward
    }

    pub const fn first_segment(&self) -> Segment {
        Segment::new(self.region, self.feature_id, self.start_segment_idx, self.forward)
    }

    pub const fn last_segment(&self) -> Segment {
        Segment::new(self.region, self.feature_id, self.end_segment_idx, self.forward)
    }

    pub fn segment_count(&self) -> usize {
        (self.start_segment_idx.abs_diff(self.end_segment_idx) + 1) as usize
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        (0..self.segment_count() as u32).map(move |offset| {
            let idx = if self.forward {
                self.start_segment_idx + offset
            } else {
                self.start_segment_idx - offset
            };
            Segment::new(self.region, self.feature_id, idx, self.forward)
        })
    }
}
