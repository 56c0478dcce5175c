mod api;
mod cli;
mod geo;
mod provider;
mod watch;

use std::time::Duration;

use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

/// Current-thread runtime: the main thread is the provider's owning
/// context, and every listener callback runs on it.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Watch {
            high_accuracy,
            replay,
            count,
            interval_ms,
            stationary_interval_ms,
            movement_threshold_m,
            origin_lat,
            origin_lon,
            step_m,
            refuse_high_accuracy,
            timeout_every,
            capture_delay_ms,
        } => {
            let options = watch::WatchOptions {
                high_accuracy,
                replay,
                count,
                provider: provider::ProviderConfig {
                    moving_interval: Duration::from_millis(interval_ms),
                    stationary_interval: Duration::from_millis(stationary_interval_ms),
                    movement_threshold_m,
                },
                simulated: api::SimulatedConfig {
                    origin_lat,
                    origin_lon,
                    step_m,
                    supports_high_accuracy: !refuse_high_accuracy,
                    timeout_every,
                    capture_delay: Duration::from_millis(capture_delay_ms),
                    ..api::SimulatedConfig::default()
                },
            };
            if let Err(e) = watch::run(options).await {
                tracing::error!(error = %e, "watch failed");
                eprintln!("geolocd watch: {e}");
                std::process::exit(1);
            }
        }
        Command::Check {
            latitude,
            longitude,
            accuracy,
        } => {
            if !watch::check(latitude, longitude, accuracy) {
                std::process::exit(2);
            }
        }
    }
}
