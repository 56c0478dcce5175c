//! Replay adapter — plays back a recorded trace of captures.
//!
//! Trace format, one capture per line:
//!
//! ```text
//! # lat lon accuracy [altitude [altitude_accuracy [heading [speed]]]]
//! 4.5 -34.1 0.5
//! 4.5001, -34.1, 0.5, 12.0, 3.0
//! error timeout gps warming up
//! error denied
//! ```
//!
//! Fields may be separated by whitespace or commas. Blank lines and `#`
//! comments are skipped. Error lines take a code (`denied`,
//! `unavailable`, `timeout`) and an optional message. Numbers are not
//! range-checked here; out-of-range fixes replay as-is so the provider's
//! validation sees them.

use std::path::Path;
use std::time::SystemTime;

use regex::Regex;

use super::PositioningApi;
use crate::geo::{ErrorCode, Position};

/// Decimal number, optionally signed, optionally with exponent.
const NUMBER: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";

/// Field separator: comma with optional padding, or whitespace.
const SEP: &str = r"(?:\s*,\s*|\s+)";

const ERROR_LINE: &str = r"^\s*error\s+(\w+)(?:\s+(.+?))?\s*$";

/// Trace loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("failed to read trace {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("line {line}: unrecognized sample: {text:?}")]
    Syntax { line: usize, text: String },
    #[error("line {line}: unknown error code {code:?} (expected: denied, unavailable, timeout)")]
    UnknownErrorCode { line: usize, code: String },
    #[error("line {line}: bad number {text:?}")]
    Number { line: usize, text: String },
    #[error("invalid trace pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// One recorded capture.
#[derive(Debug, Clone, PartialEq)]
enum Sample {
    Fix {
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        altitude: Option<f64>,
        altitude_accuracy: Option<f64>,
        heading: Option<f64>,
        speed: Option<f64>,
    },
    Error {
        code: ErrorCode,
        message: Option<String>,
    },
}

/// Line parser for the trace format.
struct TraceParser {
    fix: Regex,
    error: Regex,
}

impl TraceParser {
    fn new() -> Result<Self, ReplayError> {
        let fix = format!(
            r"^\s*({NUMBER}){SEP}({NUMBER}){SEP}({NUMBER})(?:{SEP}({NUMBER}))?(?:{SEP}({NUMBER}))?(?:{SEP}({NUMBER}))?(?:{SEP}({NUMBER}))?\s*,?\s*$"
        );
        Ok(Self {
            fix: Regex::new(&fix)?,
            error: Regex::new(ERROR_LINE)?,
        })
    }

    /// Parse one line. `Ok(None)` for blank lines and comments.
    fn parse_line(&self, line_no: usize, line: &str) -> Result<Option<Sample>, ReplayError> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }

        if let Some(caps) = self.error.captures(trimmed) {
            let code = parse_error_code(&caps[1]).ok_or_else(|| ReplayError::UnknownErrorCode {
                line: line_no,
                code: caps[1].to_string(),
            })?;
            return Ok(Some(Sample::Error {
                code,
                message: caps.get(2).map(|m| m.as_str().to_string()),
            }));
        }

        let caps = self
            .fix
            .captures(trimmed)
            .ok_or_else(|| ReplayError::Syntax {
                line: line_no,
                text: trimmed.to_string(),
            })?;

        let number = |idx: usize| -> Result<Option<f64>, ReplayError> {
            caps.get(idx)
                .map(|m| {
                    m.as_str().parse::<f64>().map_err(|_| ReplayError::Number {
                        line: line_no,
                        text: m.as_str().to_string(),
                    })
                })
                .transpose()
        };

        // Groups 1-3 are mandatory in the pattern.
        let (Some(latitude), Some(longitude), Some(accuracy)) = (number(1)?, number(2)?, number(3)?)
        else {
            return Err(ReplayError::Syntax {
                line: line_no,
                text: trimmed.to_string(),
            });
        };

        Ok(Some(Sample::Fix {
            latitude,
            longitude,
            accuracy,
            altitude: number(4)?,
            altitude_accuracy: number(5)?,
            heading: number(6)?,
            speed: number(7)?,
        }))
    }
}

fn parse_error_code(name: &str) -> Option<ErrorCode> {
    match name.to_ascii_lowercase().as_str() {
        "denied" | "permission_denied" => Some(ErrorCode::PermissionDenied),
        "unavailable" | "position_unavailable" => Some(ErrorCode::PositionUnavailable),
        "timeout" => Some(ErrorCode::Timeout),
        _ => None,
    }
}

/// Positioning adapter that replays a trace in order, looping at the end.
#[derive(Debug)]
pub struct ReplayApi {
    samples: Vec<Sample>,
    cursor: usize,
}

impl ReplayApi {
    /// Load a trace file.
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let text = std::fs::read_to_string(path).map_err(|e| ReplayError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let api = Self::parse(&text)?;
        tracing::info!(
            path = %path.display(),
            samples = api.len(),
            "trace loaded"
        );
        Ok(api)
    }

    /// Parse trace text.
    pub fn parse(text: &str) -> Result<Self, ReplayError> {
        let parser = TraceParser::new()?;
        let mut samples = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if let Some(sample) = parser.parse_line(idx + 1, line)? {
                samples.push(sample);
            }
        }
        Ok(Self { samples, cursor: 0 })
    }

    /// Number of samples in one pass of the trace.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl PositioningApi for ReplayApi {
    fn set_high_accuracy(&mut self, _enable: bool) -> bool {
        true
    }

    fn get_position(&mut self) -> Position {
        let Some(sample) = self.samples.get(self.cursor) else {
            return Position::error(ErrorCode::PositionUnavailable, "trace is empty");
        };
        self.cursor = (self.cursor + 1) % self.samples.len();

        match sample {
            Sample::Fix {
                latitude,
                longitude,
                accuracy,
                altitude,
                altitude_accuracy,
                heading,
                speed,
            } => {
                let mut position =
                    Position::fix(*latitude, *longitude, *accuracy, SystemTime::now());
                position.altitude = *altitude;
                position.altitude_accuracy = *altitude_accuracy;
                position.heading = *heading;
                position.speed = *speed;
                position
            }
            Sample::Error { code, message } => Position::error(
                *code,
                message.clone().unwrap_or_else(|| code.as_str().to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixes_and_errors() {
        let mut api = ReplayApi::parse(
            "# recorded trace\n\
             4.5 -34.1 0.5\n\
             \n\
             4.5001, -34.1, 0.5, 12.0, 3.0, 270, 1.5\n\
             error timeout gps warming up\n",
        )
        .unwrap();
        assert_eq!(api.len(), 3);

        let first = api.get_position();
        assert!(first.is_valid());
        assert_eq!(
            (first.latitude, first.longitude, first.accuracy),
            (4.5, -34.1, 0.5)
        );
        assert_eq!(first.altitude, None);

        let second = api.get_position();
        assert_eq!(second.altitude, Some(12.0));
        assert_eq!(second.altitude_accuracy, Some(3.0));
        assert_eq!(second.heading, Some(270.0));
        assert_eq!(second.speed, Some(1.5));

        let third = api.get_position();
        assert_eq!(third.error_code, ErrorCode::Timeout);
        assert_eq!(third.error_message.as_deref(), Some("gps warming up"));
    }

    #[test]
    fn altitude_without_accuracy() {
        let mut api = ReplayApi::parse("4.5 -34.1 0.5 12.0").unwrap();
        let p = api.get_position();
        assert_eq!(p.altitude, Some(12.0));
        assert_eq!(p.altitude_accuracy, None);
        assert_eq!(p.heading, None);
    }

    #[test]
    fn too_many_fields_is_syntax_error() {
        let err = ReplayApi::parse("1 2 3 4 5 6 7 8").unwrap_err();
        assert!(matches!(err, ReplayError::Syntax { line: 1, .. }));
    }

    #[test]
    fn loops_at_end_of_trace() {
        let mut api = ReplayApi::parse("1 2 3\n4 5 6\n").unwrap();
        let lats: Vec<f64> = (0..5).map(|_| api.get_position().latitude).collect();
        assert_eq!(lats, vec![1.0, 4.0, 1.0, 4.0, 1.0]);
    }

    #[test]
    fn out_of_range_fix_replays_as_is() {
        let mut api = ReplayApi::parse("4.5 -340000.1 0.5").unwrap();
        let p = api.get_position();
        assert_eq!(p.error_code, ErrorCode::None);
        assert_eq!(p.longitude, -340000.1);
        assert!(!p.is_valid());
    }

    #[test]
    fn error_without_message_uses_code_name() {
        let mut api = ReplayApi::parse("error denied").unwrap();
        let p = api.get_position();
        assert_eq!(p.error_code, ErrorCode::PermissionDenied);
        assert_eq!(p.error_message.as_deref(), Some("permission_denied"));
    }

    #[test]
    fn empty_trace_is_unavailable_forever() {
        let mut api = ReplayApi::parse("# nothing\n\n").unwrap();
        assert!(api.is_empty());
        for _ in 0..3 {
            assert_eq!(
                api.get_position().error_code,
                ErrorCode::PositionUnavailable
            );
        }
    }

    #[test]
    fn scientific_notation() {
        let mut api = ReplayApi::parse("4.5e0 -3.41e1 5e-1").unwrap();
        let p = api.get_position();
        assert_eq!(
            (p.latitude, p.longitude, p.accuracy),
            (4.5, -34.1, 0.5)
        );
    }

    #[test]
    fn syntax_error_reports_line() {
        let err = ReplayApi::parse("1 2 3\nnot a sample\n").unwrap_err();
        match err {
            ReplayError::Syntax { line, text } => {
                assert_eq!(line, 2);
                assert_eq!(text, "not a sample");
            }
            other => panic!("expected Syntax, got {other:?}"),
        }
    }

    #[test]
    fn too_few_fields_is_syntax_error() {
        let err = ReplayApi::parse("4.5 -34.1").unwrap_err();
        assert!(matches!(err, ReplayError::Syntax { line: 1, .. }));
    }

    #[test]
    fn unknown_error_code() {
        let err = ReplayApi::parse("error meltdown").unwrap_err();
        assert!(err.to_string().contains("meltdown"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.txt");
        std::fs::write(&path, "4.5 -34.1 0.5\nerror unavailable\n").unwrap();

        let mut api = ReplayApi::load(&path).unwrap();
        assert!(api.get_position().is_valid());
        assert_eq!(
            api.get_position().error_code,
            ErrorCode::PositionUnavailable
        );
    }

    #[test]
    fn load_missing_file() {
        let err = ReplayApi::load(Path::new("/nonexistent/trace.txt")).unwrap_err();
        assert!(matches!(err, ReplayError::Read { .. }));
    }

    #[test]
    fn high_accuracy_always_accepted() {
        let mut api = ReplayApi::parse("1 2 3").unwrap();
        assert!(api.set_high_accuracy(true));
        assert!(api.set_high_accuracy(false));
    }
}
