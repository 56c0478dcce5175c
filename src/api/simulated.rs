//! Simulated positioning adapter — deterministic synthetic fixes.
//!
//! Walks a straight track from an origin at a fixed step per capture.
//! Used by `geolocd watch` when no trace file is given, and as a stand-in
//! for hardware that may refuse high accuracy or time out.

use std::time::{Duration, SystemTime};

use super::PositioningApi;
use crate::geo::{ErrorCode, Position};

/// Meters per degree of latitude (spherical approximation).
const METERS_PER_DEGREE: f64 = 111_195.0;

/// Accuracy reported in high-accuracy mode.
const HIGH_ACCURACY_M: f64 = 5.0;

/// Accuracy reported in power-saving mode.
const LOW_ACCURACY_M: f64 = 50.0;

/// Vertical accuracy as a multiple of horizontal accuracy.
const VERTICAL_ACCURACY_RATIO: f64 = 2.0;

/// Simulation parameters.
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Starting latitude in degrees.
    pub origin_lat: f64,
    /// Starting longitude in degrees.
    pub origin_lon: f64,
    /// Altitude reported with every fix.
    pub altitude_m: f64,
    /// Distance moved per capture.
    pub step_m: f64,
    /// Direction of travel, degrees clockwise from north.
    pub heading_deg: f64,
    /// When false, `set_high_accuracy(true)` is refused.
    pub supports_high_accuracy: bool,
    /// Report a timeout on every Nth capture. 0 disables.
    pub timeout_every: u32,
    /// Time each capture blocks for.
    pub capture_delay: Duration,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            origin_lat: 51.4779,
            origin_lon: -0.0015,
            altitude_m: 45.0,
            step_m: 2.0,
            heading_deg: 90.0,
            supports_high_accuracy: true,
            timeout_every: 0,
            capture_delay: Duration::ZERO,
        }
    }
}

/// Deterministic synthetic positioning adapter.
#[derive(Debug)]
pub struct SimulatedApi {
    config: SimulatedConfig,
    high_accuracy: bool,
    captures: u64,
}

impl SimulatedApi {
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            high_accuracy: false,
            captures: 0,
        }
    }

    /// Position after `steps` steps along the configured heading.
    fn position_after(&self, steps: u64) -> (f64, f64) {
        let travelled = self.config.step_m * steps as f64;
        let heading = self.config.heading_deg.to_radians();

        let d_lat = travelled * heading.cos() / METERS_PER_DEGREE;
        let lat = (self.config.origin_lat + d_lat).clamp(-90.0, 90.0);

        let meters_per_lon_degree = METERS_PER_DEGREE * lat.to_radians().cos().max(1e-9);
        let d_lon = travelled * heading.sin() / meters_per_lon_degree;
        let lon = (self.config.origin_lon + d_lon + 180.0).rem_euclid(360.0) - 180.0;

        (lat, lon)
    }
}

impl PositioningApi for SimulatedApi {
    fn set_high_accuracy(&mut self, enable: bool) -> bool {
        if enable && !self.config.supports_high_accuracy {
            tracing::debug!("simulated adapter refusing high accuracy");
            self.high_accuracy = false;
            return false;
        }
        self.high_accuracy = enable;
        true
    }

    fn get_position(&mut self) -> Position {
        if !self.config.capture_delay.is_zero() {
            std::thread::sleep(self.config.capture_delay);
        }

        self.captures += 1;
        let every = u64::from(self.config.timeout_every);
        if every > 0 && self.captures % every == 0 {
            return Position::error(ErrorCode::Timeout, "simulated capture timeout");
        }

        let (lat, lon) = self.position_after(self.captures - 1);
        let accuracy = if self.high_accuracy {
            HIGH_ACCURACY_M
        } else {
            LOW_ACCURACY_M
        };

        let mut position = Position::fix(lat, lon, accuracy, SystemTime::now());
        position.altitude = Some(self.config.altitude_m);
        position.altitude_accuracy = Some(accuracy * VERTICAL_ACCURACY_RATIO);
        position.heading = Some(self.config.heading_deg);
        position
    }
}
