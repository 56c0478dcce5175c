use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "geolocd", about = "Polling location provider")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start a provider and print every delivered update
    Watch {
        /// Request high-accuracy capture
        #[arg(long)]
        high_accuracy: bool,

        /// Replay captures from a trace file instead of simulating
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Stop after this many updates
        #[arg(long)]
        count: Option<u64>,

        /// Poll interval while moving or after an error, in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,

        /// Poll interval while stationary, in milliseconds
        #[arg(long, default_value_t = 1500)]
        stationary_interval_ms: u64,

        /// Movement below this distance counts as stationary
        #[arg(long, default_value_t = 20.0)]
        movement_threshold_m: f64,

        /// Simulated starting latitude
        #[arg(long, default_value_t = 51.4779, allow_hyphen_values = true)]
        origin_lat: f64,

        /// Simulated starting longitude
        #[arg(long, default_value_t = -0.0015, allow_hyphen_values = true)]
        origin_lon: f64,

        /// Simulated distance travelled per capture, in meters
        #[arg(long, default_value_t = 2.0)]
        step_m: f64,

        /// Simulate hardware without a high-accuracy mode
        #[arg(long)]
        refuse_high_accuracy: bool,

        /// Simulate a capture timeout every N captures (0 = never)
        #[arg(long, default_value_t = 0)]
        timeout_every: u32,

        /// Simulated capture latency, in milliseconds
        #[arg(long, default_value_t = 0)]
        capture_delay_ms: u64,
    },

    /// Validate a single fix
    Check {
        /// Latitude in degrees
        #[arg(allow_hyphen_values = true)]
        latitude: f64,

        /// Longitude in degrees
        #[arg(allow_hyphen_values = true)]
        longitude: f64,

        /// Accuracy radius in meters
        #[arg(allow_hyphen_values = true)]
        accuracy: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_accepts_every_flag() {
        let cli = Cli::try_parse_from([
            "geolocd",
            "watch",
            "--high-accuracy",
            "--count",
            "3",
            "--interval-ms",
            "100",
            "--stationary-interval-ms",
            "400",
            "--movement-threshold-m",
            "5",
            "--origin-lat",
            "-33.86",
            "--origin-lon",
            "151.21",
            "--step-m",
            "1.5",
            "--refuse-high-accuracy",
            "--timeout-every",
            "4",
            "--capture-delay-ms",
            "10",
        ])
        .unwrap();
        match cli.command {
            Command::Watch {
                high_accuracy,
                count,
                origin_lat,
                origin_lon,
                refuse_high_accuracy,
                timeout_every,
                capture_delay_ms,
                ..
            } => {
                assert!(high_accuracy);
                assert_eq!(count, Some(3));
                assert_eq!((origin_lat, origin_lon), (-33.86, 151.21));
                assert!(refuse_high_accuracy);
                assert_eq!(timeout_every, 4);
                assert_eq!(capture_delay_ms, 10);
            }
            Command::Check { .. } => panic!("expected watch"),
        }
    }

    #[test]
    fn watch_defaults() {
        let cli = Cli::try_parse_from(["geolocd", "watch"]).unwrap();
        let Command::Watch {
            interval_ms,
            stationary_interval_ms,
            movement_threshold_m,
            replay,
            ..
        } = cli.command
        else {
            panic!("expected watch");
        };
        assert_eq!((interval_ms, stationary_interval_ms), (500, 1500));
        assert_eq!(movement_threshold_m, 20.0);
        assert!(replay.is_none());
    }

    #[test]
    fn check_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from(["geolocd", "check", "4.5", "-34.1", "0.5"]).unwrap();
        let Command::Check {
            latitude,
            longitude,
            accuracy,
        } = cli.command
        else {
            panic!("expected check");
        };
        assert_eq!((latitude, longitude, accuracy), (4.5, -34.1, 0.5));
    }
}
