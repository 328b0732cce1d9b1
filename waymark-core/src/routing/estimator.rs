//! Travel-time cost model per vehicle type

use std::sync::Arc;

use geo::{Distance, Euclidean, Point};
use serde::{Deserialize, Serialize};

use crate::{
    FeatureId, PointId,
    model::{RoadGeometry, Segment},
    routing::traffic::{SpeedGroup, TrafficStash},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    #[default]
    Car,
    Bicycle,
    Pedestrian,
}

impl VehicleType {
    pub fn default_max_speed_kmph(self) -> f64 {
        match self {
            Self::Car => 130.0,
            Self::Bicycle => 25.0,
            Self::Pedestrian => 5.0,
        }
    }
}

/// What an estimate is used for: search weights or reported travel times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Weight,
    Eta,
}

fn kmph_to_mps(kmph: f64) -> f64 {
    kmph * 1000.0 / 3600.0
}

/// Cost model consumed by the graph layer.
///
/// `calc_heuristic` never overestimates the cost between two points and
/// `calc_leap_weight` never exceeds it, so both stay admissible.
pub trait EdgeEstimator: Send + Sync {
    fn max_speed_kmph(&self) -> f64;

    fn u_turn_penalty(&self, purpose: Purpose) -> f64;

    fn ferry_landing_penalty(&self, purpose: Purpose) -> f64;

    /// Free-flow travel time of one segment in seconds
    fn calc_free_flow_weight(&self, segment: &Segment, road: &RoadGeometry) -> f64 {
        let speed = road.speed_kmph().min(self.max_speed_kmph());
        if speed <= 0.0 {
            return f64::INFINITY;
        }
        road.segment_length(segment.segment_idx()) / kmph_to_mps(speed)
    }

    fn calc_segment_weight(&self, segment: &Segment, road: &RoadGeometry, _purpose: Purpose) -> f64 {
        self.calc_free_flow_weight(segment, road)
    }

    /// Free-flow travel time between two points of one feature
    fn calc_edges_weight(
        &self,
        feature_id: FeatureId,
        road: &RoadGeometry,
        from: PointId,
        to: PointId,
    ) -> f64 {
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        (lo..hi)
            .map(|idx| self.calc_free_flow_weight(&Segment::new(0, feature_id, idx, true), road))
            .sum()
    }

    fn calc_heuristic(&self, from: Point<f64>, to: Point<f64>) -> f64 {
        Euclidean.distance(from, to) / kmph_to_mps(self.max_speed_kmph())
    }

    /// Weight of a border-to-border shortcut. It coincides with the heuristic bound.
    fn calc_leap_weight(&self, from: Point<f64>, to: Point<f64>) -> f64 {
        self.calc_heuristic(from, to)
    }
}

pub struct CarEstimator {
    max_speed_kmph: f64,
    traffic: Option<Arc<TrafficStash>>,
}

impl CarEstimator {
    pub fn new(max_speed_kmph: f64, traffic: Option<Arc<TrafficStash>>) -> Self {
        Self {
            max_speed_kmph,
            traffic,
        }
    }
}

impl EdgeEstimator for CarEstimator {
    fn max_speed_kmph(&self) -> f64 {
        self.max_speed_kmph
    }

    fn u_turn_penalty(&self, _purpose: Purpose) -> f64 {
        2.0 * 60.0
    }

    fn ferry_landing_penalty(&self, purpose: Purpose) -> f64 {
        match purpose {
            Purpose::Weight => 40.0 * 60.0,
            Purpose::Eta => 20.0 * 60.0,
        }
    }

    fn calc_segment_weight(&self, segment: &Segment, road: &RoadGeometry, _purpose: Purpose) -> f64 {
        // Slower groups get an extra penalty on top of the speed ratio.
        const TIME_PENALTY: f64 = 1.8;

        let mut result = self.calc_free_flow_weight(segment, road);
        if let Some(traffic) = &self.traffic {
            let group = traffic.speed_group(segment);
            result *= group.traffic_factor();
            if group != SpeedGroup::Unknown && group != SpeedGroup::G5 {
                result *= TIME_PENALTY;
            }
        }
        result
    }
}

pub struct BicycleEstimator {
    max_speed_kmph: f64,
}

impl EdgeEstimator for BicycleEstimator {
    fn max_speed_kmph(&self) -> f64 {
        self.max_speed_kmph
    }

    fn u_turn_penalty(&self, _purpose: Purpose) -> f64 {
        20.0
    }

    fn ferry_landing_penalty(&self, purpose: Purpose) -> f64 {
        match purpose {
            Purpose::Weight => 20.0 * 60.0,
            Purpose::Eta => 8.0 * 60.0,
        }
    }
}

pub struct PedestrianEstimator {
    max_speed_kmph: f64,
}

impl EdgeEstimator for PedestrianEstimator {
    fn max_speed_kmph(&self) -> f64 {
        self.max_speed_kmph
    }

    fn u_turn_penalty(&self, _purpose: Purpose) -> f64 {
        0.0
    }

    fn ferry_landing_penalty(&self, purpose: Purpose) -> f64 {
        match purpose {
            Purpose::Weight => 20.0 * 60.0,
            Purpose::Eta => 8.0 * 60.0,
        }
    }
}

/// Creates the estimator for a vehicle type. Traffic is only used by cars.
pub fn create_estimator(
    vehicle: VehicleType,
    max_speed_kmph: f64,
    traffic: Option<Arc<TrafficStash>>,
) -> Arc<dyn EdgeEstimator> {
    match vehicle {
        VehicleType::Car => Arc::new(CarEstimator::new(max_speed_kmph, traffic)),
        VehicleType::Bicycle => Arc::new(BicycleEstimator { max_speed_kmph }),
        VehicleType::Pedestrian => Arc::new(PedestrianEstimator { max_speed_kmph }),
    }
}
