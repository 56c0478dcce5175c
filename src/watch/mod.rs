//! Watch front-end — hosts an owning context and prints provider updates.
//!
//! The current-thread runtime plus a `LocalSet` forms the owning context:
//! the provider is started from it, and every listener callback runs on
//! it. The callback forwards positions to the print loop over a channel
//! so printing and shutdown handling share one `select!`.

mod format;

use std::path::PathBuf;
use std::time::SystemTime;

use tokio::signal::unix::{SignalKind, signal as tokio_signal};
use tokio::sync::mpsc;
use tokio::task::LocalSet;

use crate::api::{PositioningApi, ReplayApi, ReplayError, SimulatedApi, SimulatedConfig};
use crate::geo::Position;
use crate::provider::{LocationProvider, ProviderConfig, ProviderError, ProviderRef};

/// Watch errors.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("trace: {0}")]
    Replay(#[from] ReplayError),
    #[error("provider: {0}")]
    Provider(#[from] ProviderError),
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything `geolocd watch` needs.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    /// Trace file; `None` uses the simulated adapter.
    pub replay: Option<PathBuf>,
    /// Stop after this many updates.
    pub count: Option<u64>,
    pub provider: ProviderConfig,
    pub simulated: SimulatedConfig,
}

impl WatchOptions {
    /// Reject option combinations the provider cannot honor.
    pub fn validate(&self) -> Result<(), WatchError> {
        if self.provider.moving_interval.is_zero() || self.provider.stationary_interval.is_zero() {
            return Err(WatchError::InvalidOption(
                "poll intervals must be greater than zero".into(),
            ));
        }
        if self.provider.movement_threshold_m.is_nan() || self.provider.movement_threshold_m < 0.0
        {
            return Err(WatchError::InvalidOption(
                "--movement-threshold-m must be non-negative".into(),
            ));
        }
        if self.count == Some(0) {
            return Err(WatchError::InvalidOption("--count must be at least 1".into()));
        }
        let origin = Position::fix(
            self.simulated.origin_lat,
            self.simulated.origin_lon,
            0.0,
            SystemTime::now(),
        );
        if self.replay.is_none()
            && let Err(e) = origin.validate()
        {
            return Err(WatchError::InvalidOption(format!("origin: {e}")));
        }
        Ok(())
    }
}

/// Run `geolocd watch` until `--count` updates or SIGINT/SIGTERM.
pub async fn run(options: WatchOptions) -> Result<(), WatchError> {
    options.validate()?;

    let api: Box<dyn PositioningApi> = match &options.replay {
        Some(path) => {
            let replay = ReplayApi::load(path)?;
            if replay.is_empty() {
                tracing::warn!(path = %path.display(), "trace has no samples");
            }
            Box::new(replay)
        }
        None => Box::new(SimulatedApi::new(options.simulated.clone())),
    };

    LocalSet::new().run_until(watch_updates(api, options)).await
}

async fn watch_updates(
    api: Box<dyn PositioningApi>,
    options: WatchOptions,
) -> Result<(), WatchError> {
    let mut sig_term = tokio_signal(SignalKind::terminate())?;
    let mut sig_int = tokio_signal(SignalKind::interrupt())?;

    let mut provider = LocationProvider::new(api, options.provider.clone());

    let (update_tx, mut update_rx) = mpsc::unbounded_channel::<Position>();
    provider.set_update_callback(move |source: &ProviderRef, position: Position| {
        tracing::trace!(provider = %source.id(), "update delivered");
        let _ = update_tx.send(position);
    })?;

    let accepted = provider.start_provider(options.high_accuracy);
    if options.high_accuracy && !accepted {
        eprintln!("warning: high accuracy refused, continuing with best-effort accuracy");
    }
    tracing::info!(
        provider = %provider.id(),
        state = ?provider.state(),
        high_accuracy = provider.high_accuracy(),
        accepted,
        "watching"
    );

    format::print_header();

    let mut delivered: u64 = 0;
    loop {
        tokio::select! {
            update = update_rx.recv() => {
                // The sender lives in the provider's listener.
                let Some(position) = update else { break };
                delivered += 1;
                format::print_update(delivered, &position);
                if options.count.is_some_and(|n| delivered >= n) {
                    break;
                }
            }
            _ = sig_term.recv() => {
                tracing::info!("received SIGTERM, shutting down");
                break;
            }
            _ = sig_int.recv() => {
                tracing::info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    provider.stop_provider();

    let last = provider.get_position();
    tracing::info!(
        delivered,
        last_valid = last.is_valid(),
        "watch stopped"
    );
    Ok(())
}

/// Run `geolocd check`. Returns whether the fix is valid.
pub fn check(latitude: f64, longitude: f64, accuracy: f64) -> bool {
    let position = Position::fix(latitude, longitude, accuracy, SystemTime::now());
    let result = position.validate();
    format::print_check(&position, &result);
    result.is_ok()
}
