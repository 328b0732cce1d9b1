//! Traffic weight-injection point: speed groups attached to segments

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::model::Segment;

/// Observed speed as a share of the free-flow speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeedGroup {
    G0,
    G1,
    G2,
    G3,
    G4,
    G5,
    TempBlock,
    Unknown,
}

impl SpeedGroup {
    pub fn threshold_percentage(self) -> u32 {
        match self {
            Self::G0 => 8,
            Self::G1 => 16,
            Self::G2 => 33,
            Self::G3 => 57,
            Self::G4 => 75,
            Self::G5 | Self::TempBlock | Self::Unknown => 100,
        }
    }

    /// Multiplier applied to a segment's free-flow travel time
    pub fn traffic_factor(self) -> f64 {
        const IMPOSSIBLE_DRIVING_FACTOR: f64 = 1e4;
        if self == Self::TempBlock {
            return IMPOSSIBLE_DRIVING_FACTOR;
        }
        100.0 / f64::from(self.threshold_percentage())
    }
}

/// Speed groups known for the segments of all loaded regions
#[derive(Debug, Clone, Default)]
pub struct TrafficStash {
    groups: HashMap<Segment, SpeedGroup>,
}

impl TrafficStash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_speed_group(&mut self, segment: Segment, group: SpeedGroup) {
        self.groups.insert(segment, group);
    }

    pub fn speed_group(&self, segment: &Segment) -> SpeedGroup {
        self.groups
            .get(segment)
            .copied()
            .unwrap_or(SpeedGroup::Unknown)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factors_grow_as_speed_drops() {
        assert_eq!(SpeedGroup::Unknown.traffic_factor(), 1.0);
        assert_eq!(SpeedGroup::G5.traffic_factor(), 1.0);
        assert_eq!(SpeedGroup::G4.traffic_factor(), 100.0 / 75.0);
        assert!(SpeedGroup::G0.traffic_factor() > SpeedGroup::G1.traffic_factor());
        assert_eq!(SpeedGroup::TempBlock.traffic_factor(), 1e4);
    }

    #[test]
    fn unknown_segments_have_no_group() {
        let mut stash = TrafficStash::new();
        let jammed = Segment::new(0, 1, 0, true);
        stash.set_speed_group(jammed, SpeedGroup::G1);
        assert_eq!(stash.speed_group(&jammed), SpeedGroup::G1);
        assert_eq!(stash.speed_group(&jammed.reversed()), SpeedGroup::Unknown);
    }
}
