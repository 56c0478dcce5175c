//! Output formatting for `watch` and `check`.
//!
//! One fixed-width row per update on stdout; logs go to stderr so the
//! table can be piped.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::geo::{ErrorCode, Position, ValidationError};

/// Print the update table header.
pub fn print_header() {
    println!(
        "{:>6} {:>12} {:>12} {:>8} {:>8} {:>9} {:>7} {:>7} {:>15} STATUS",
        "SEQ", "LATITUDE", "LONGITUDE", "ACC_M", "ALT_M", "ALT_ACC_M", "HDG", "SPD", "TIMESTAMP_MS"
    );
    println!("{}", "-".repeat(102));
}

/// Print one delivered update.
pub fn print_update(seq: u64, position: &Position) {
    println!("{}", format_update(seq, position));
}

/// Print the result of `check`.
pub fn print_check(position: &Position, result: &Result<(), ValidationError>) {
    match result {
        Ok(()) => println!(
            "valid: {:.6}, {:.6} ±{}m",
            position.latitude, position.longitude, position.accuracy
        ),
        Err(e) => println!("invalid: {e}"),
    }
}

fn format_update(seq: u64, position: &Position) -> String {
    if position.error_code != ErrorCode::None {
        return format!(
            "{:>6} {:>12} {:>12} {:>8} {:>8} {:>9} {:>7} {:>7} {:>15} {}",
            seq,
            "-",
            "-",
            "-",
            "-",
            "-",
            "-",
            "-",
            format_timestamp(position.timestamp),
            format_status(position),
        );
    }
    format!(
        "{:>6} {:>12.6} {:>12.6} {:>8.1} {:>8} {:>9} {:>7} {:>7} {:>15} {}",
        seq,
        position.latitude,
        position.longitude,
        position.accuracy,
        format_optional(position.altitude, 1),
        format_optional(position.altitude_accuracy, 1),
        format_optional(position.heading, 0),
        format_optional(position.speed, 1),
        format_timestamp(position.timestamp),
        format_status(position),
    )
}

/// `ok`, `invalid (<reason>)`, or `error <code> (<message>)`.
fn format_status(position: &Position) -> String {
    match position.validate() {
        Ok(()) => "ok".to_string(),
        Err(ValidationError::Capture(code)) => match &position.error_message {
            Some(message) => format!("error {} ({message})", code.code()),
            None => format!("error {}", code.code()),
        },
        Err(e) => format!("invalid ({e})"),
    }
}

/// Unix epoch milliseconds, or `-` when unset.
fn format_timestamp(timestamp: Option<SystemTime>) -> String {
    timestamp
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis().to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_optional(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "-".to_string(),
    }
}
