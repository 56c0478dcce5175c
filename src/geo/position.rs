//! Position fix — one capture from a positioning adapter.
//!
//! A `Position` always carries an [`ErrorCode`]. Adapters report failed
//! captures as error-coded positions rather than as Rust errors, so a
//! listener sees both fixes and failures through the same channel.

use std::fmt;
use std::time::SystemTime;

/// Outcome code attached to every capture.
///
/// Discriminants match the W3C Geolocation `PositionError` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    None = 0,
    PermissionDenied = 1,
    PositionUnavailable = 2,
    Timeout = 3,
}

impl ErrorCode {
    /// Numeric wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Machine-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::None => "none",
            ErrorCode::PermissionDenied => "permission_denied",
            ErrorCode::PositionUnavailable => "position_unavailable",
            ErrorCode::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a position is not a usable fix.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("capture failed: {0}")]
    Capture(ErrorCode),
    #[error("latitude {0} outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} outside [-180, 180]")]
    Longitude(f64),
    #[error("accuracy {0} is negative or not a number")]
    Accuracy(f64),
}

/// One sample of geographic location plus quality and error metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    /// Degrees north of the equator.
    pub latitude: f64,
    /// Degrees east of the prime meridian.
    pub longitude: f64,
    /// Horizontal accuracy radius in meters.
    pub accuracy: f64,
    /// Meters above the WGS84 ellipsoid, if the adapter reports it.
    pub altitude: Option<f64>,
    /// Vertical accuracy in meters. Meaningful only with `altitude`.
    pub altitude_accuracy: Option<f64>,
    /// Degrees clockwise from true north.
    pub heading: Option<f64>,
    /// Ground speed in meters per second.
    pub speed: Option<f64>,
    /// When the capture was produced. `None` only for the unset position.
    pub timestamp: Option<SystemTime>,
    pub error_code: ErrorCode,
    /// Adapter-supplied detail for error-coded captures.
    pub error_message: Option<String>,
}

impl Position {
    /// The positionless state every provider starts from.
    pub fn unset() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            accuracy: 0.0,
            altitude: None,
            altitude_accuracy: None,
            heading: None,
            speed: None,
            timestamp: None,
            error_code: ErrorCode::PositionUnavailable,
            error_message: None,
        }
    }

    /// A successful capture with the mandatory fields set.
    pub fn fix(latitude: f64, longitude: f64, accuracy: f64, timestamp: SystemTime) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            timestamp: Some(timestamp),
            error_code: ErrorCode::None,
            ..Self::unset()
        }
    }

    /// A failed capture, stamped with the current time.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            timestamp: Some(SystemTime::now()),
            error_code: code,
            error_message: Some(message.into()),
            ..Self::unset()
        }
    }

    /// Check the fix against the validity rules.
    ///
    /// An error-coded position is never valid. Otherwise latitude must lie
    /// in [-90, 90], longitude in [-180, 180], and accuracy must be
    /// non-negative. NaN fails every range check.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.error_code != ErrorCode::None {
            return Err(ValidationError::Capture(self.error_code));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::Latitude(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::Longitude(self.longitude));
        }
        if self.accuracy.is_nan() || self.accuracy < 0.0 {
            return Err(ValidationError::Accuracy(self.accuracy));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::unset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn at_200() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(200)
    }

    #[test]
    fn reference_fix_is_valid() {
        let p = Position::fix(4.5, -34.1, 0.5, at_200());
        assert!(p.is_valid());
        assert_eq!(p.validate(), Ok(()));
    }

    #[test]
    fn longitude_out_of_range_is_invalid() {
        let p = Position::fix(4.5, -340000.1, 0.5, at_200());
        assert_eq!(p.validate(), Err(ValidationError::Longitude(-340000.1)));
    }

    #[test]
    fn error_code_overrides_numeric_fields() {
        let mut p = Position::fix(4.5, -34.1, 0.5, at_200());
        p.error_code = ErrorCode::PositionUnavailable;
        assert_eq!(
            p.validate(),
            Err(ValidationError::Capture(ErrorCode::PositionUnavailable))
        );
    }

    #[test]
    fn range_edges_are_inclusive() {
        assert!(Position::fix(90.0, 180.0, 0.0, at_200()).is_valid());
        assert!(Position::fix(-90.0, -180.0, 0.0, at_200()).is_valid());
    }

    #[test]
    fn optional_fields_do_not_affect_validity() {
        let mut p = Position::fix(4.5, -34.1, 0.5, at_200());
        p.altitude = Some(-12.0);
        p.altitude_accuracy = Some(-1.0);
        p.speed = Some(f64::NAN);
        assert!(p.is_valid());
    }

    #[test]
    fn latitude_past_pole_is_invalid() {
        let p = Position::fix(90.0001, 0.0, 1.0, at_200());
        assert_eq!(p.validate(), Err(ValidationError::Latitude(90.0001)));
    }

    #[test]
    fn negative_accuracy_is_invalid() {
        let p = Position::fix(0.0, 0.0, -0.1, at_200());
        assert_eq!(p.validate(), Err(ValidationError::Accuracy(-0.1)));
    }

    #[test]
    fn nan_fields_are_invalid() {
        assert!(!Position::fix(f64::NAN, 0.0, 1.0, at_200()).is_valid());
        assert!(!Position::fix(0.0, f64::NAN, 1.0, at_200()).is_valid());
        assert!(!Position::fix(0.0, 0.0, f64::NAN, at_200()).is_valid());
    }

    #[test]
    fn unset_position_is_unavailable() {
        let p = Position::unset();
        assert_eq!(p.error_code, ErrorCode::PositionUnavailable);
        assert!(p.timestamp.is_none());
        assert!(p.altitude.is_none());
        assert!(p.altitude_accuracy.is_none());
        assert!(!p.is_valid());
        assert_eq!(Position::default(), p);
    }

    #[test]
    fn error_position_carries_message_and_time() {
        let p = Position::error(ErrorCode::Timeout, "no satellites");
        assert_eq!(p.error_code, ErrorCode::Timeout);
        assert_eq!(p.error_message.as_deref(), Some("no satellites"));
        assert!(p.timestamp.is_some());
        assert!(!p.is_valid());
    }

    #[test]
    fn error_codes_match_w3c_numbering() {
        assert_eq!(ErrorCode::None.code(), 0);
        assert_eq!(ErrorCode::PermissionDenied.code(), 1);
        assert_eq!(ErrorCode::PositionUnavailable.code(), 2);
        assert_eq!(ErrorCode::Timeout.code(), 3);
        assert_eq!(ErrorCode::Timeout.to_string(), "timeout");
    }
}
