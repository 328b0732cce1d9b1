use serde::{Deserialize, Serialize};

use crate::{Error, MAX_ROAD_CANDIDATES, routing::VehicleType};

/// Router settings, usually read from a TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub vehicle: VehicleType,
    /// Upper speed bound in km/h, the vehicle default when unset
    pub max_speed_kmph: Option<f64>,
    /// Radius in metres searched for a road near the start and finish
    pub snap_radius_m: f64,
    pub max_road_candidates: usize,
    /// Minimal progress growth in percent between two reports
    pub progress_interval: f64,
    /// Number of visited vertices between two point checks
    pub draw_points_period: u32,
    /// Search joint to joint instead of segment by segment
    pub use_joints: bool,
    pub queue_switch_period: u32,
    pub cancel_poll_period: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            vehicle: VehicleType::Car,
            max_speed_kmph: None,
            snap_radius_m: 1000.0,
            max_road_candidates: MAX_ROAD_CANDIDATES,
            progress_interval: 2.0,
            draw_points_period: 10,
            use_joints: false,
            queue_switch_period: 128,
            cancel_poll_period: 128,
        }
    }
}

impl RouterConfig {
    pub fn for_vehicle(vehicle: VehicleType) -> Self {
        Self {
            vehicle,
            ..Self::default()
        }
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed_kmph
            .unwrap_or_else(|| self.vehicle.default_max_speed_kmph())
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] for non-positive radii, speeds, candidate
    /// counts or periods.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(speed) = self.max_speed_kmph {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(Error::InvalidData(format!(
                    "max_speed_kmph must be positive, got {speed}"
                )));
            }
        }
        if !self.snap_radius_m.is_finite() || self.snap_radius_m <= 0.0 {
            return Err(Error::InvalidData(format!(
                "snap_radius_m must be positive, got {}",
                self.snap_radius_m
            )));
        }
        if self.max_road_candidates == 0 {
            return Err(Error::InvalidData(
                "max_road_candidates must be at least 1".into(),
            ));
        }
        if self.progress_interval < 0.0 {
            return Err(Error::InvalidData(format!(
                "progress_interval must not be negative, got {}",
                self.progress_interval
            )));
        }
        if self.draw_points_period == 0 || self.queue_switch_period == 0 || self.cancel_poll_period == 0
        {
            return Err(Error::InvalidData(
                "draw_points_period, queue_switch_period and cancel_poll_period must be positive"
                    .into(),
            ));
        }
        Ok(())
    }
}
