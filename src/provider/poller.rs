//! Poll thread — blocking captures off the owning context.
//!
//! The adapter moves onto a dedicated OS thread for the duration of a
//! run and comes back through the join handle. Each iteration captures,
//! stores the sample as the provider's last-known position, and forwards
//! a copy to the owning context. The wait between captures doubles as the
//! stop signal: dropping the stop sender wakes the thread immediately.

use std::sync::mpsc::{self as std_mpsc, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::mpsc;

use super::{ProviderConfig, ProviderId};
use crate::api::PositioningApi;
use crate::geo::{Position, distance_m};

/// Handle to a running poll thread.
pub(super) struct PollThread<A> {
    /// Dropped to request stop. Never sent on.
    stop_tx: std_mpsc::Sender<()>,
    handle: JoinHandle<A>,
}

impl<A> PollThread<A> {
    /// Stop the thread and recover the adapter.
    ///
    /// Blocks until any in-flight capture finishes; its result is
    /// discarded. Returns `None` if the thread panicked (the adapter was
    /// dropped during unwinding).
    pub(super) fn stop(self) -> Option<A> {
        drop(self.stop_tx);
        self.handle.join().ok()
    }
}

/// Spawn the poll thread for one run.
///
/// The first capture happens immediately.
pub(super) fn spawn_poll_thread<A: PositioningApi>(
    mut api: A,
    id: ProviderId,
    config: ProviderConfig,
    last_position: Arc<Mutex<Position>>,
    update_tx: mpsc::UnboundedSender<Position>,
) -> PollThread<A> {
    let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

    let handle = std::thread::Builder::new()
        .name("geolocd-poll".into())
        .spawn(move || {
            let mut previous_fix: Option<Position> = None;

            loop {
                let position = api.get_position();

                // Stop arrived during the capture; discard the result.
                if !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
                    tracing::debug!(provider = %id, "stop during capture, sample discarded");
                    break;
                }

                let valid = position.is_valid();
                tracing::debug!(
                    provider = %id,
                    valid,
                    error_code = %position.error_code,
                    latitude = position.latitude,
                    longitude = position.longitude,
                    accuracy = position.accuracy,
                    "sample captured"
                );

                let wait = next_interval(&config, previous_fix.as_ref(), &position);
                if valid {
                    previous_fix = Some(position.clone());
                }

                store(&last_position, position.clone());

                if update_tx.send(position).is_err() {
                    // Consumer gone, the provider is stopping.
                    break;
                }

                match stop_rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            tracing::debug!(provider = %id, "poll thread exiting");
            api
        })
        .expect("failed to spawn poll thread");

    PollThread { stop_tx, handle }
}

/// Replace the last-known position.
///
/// The whole value is swapped under the lock so readers never observe a
/// partially written position.
fn store(last_position: &Mutex<Position>, position: Position) {
    let mut guard = last_position
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    *guard = position;
}

/// Wait before the next capture.
///
/// A valid fix that moved less than the threshold from the previous valid
/// fix means the device is stationary; anything else polls at the moving
/// rate.
pub(super) fn next_interval(
    config: &ProviderConfig,
    previous_fix: Option<&Position>,
    current: &Position,
) -> Duration {
    if !current.is_valid() {
        return config.moving_interval;
    }
    match previous_fix {
        Some(prev) if distance_m(prev, current) < config.movement_threshold_m => {
            config.stationary_interval
        }
        _ => config.moving_interval,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::ErrorCode;
    use std::time::SystemTime;

    fn config() -> ProviderConfig {
        ProviderConfig {
            moving_interval: Duration::from_millis(500),
            stationary_interval: Duration::from_millis(1500),
            movement_threshold_m: 20.0,
        }
    }

    fn at(lat: f64, lon: f64) -> Position {
        Position::fix(lat, lon, 5.0, SystemTime::now())
    }

    #[test]
    fn first_fix_polls_at_moving_rate() {
        assert_eq!(
            next_interval(&config(), None, &at(4.5, -34.1)),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn small_movement_polls_at_stationary_rate() {
        // ~11 m north.
        let prev = at(4.5, -34.1);
        let cur = at(4.5001, -34.1);
        assert_eq!(
            next_interval(&config(), Some(&prev), &cur),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn large_movement_polls_at_moving_rate() {
        // ~111 m north.
        let prev = at(4.5, -34.1);
        let cur = at(4.501, -34.1);
        assert_eq!(
            next_interval(&config(), Some(&prev), &cur),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn error_sample_polls_at_moving_rate() {
        let prev = at(4.5, -34.1);
        let cur = Position::error(ErrorCode::Timeout, "timeout");
        assert_eq!(
            next_interval(&config(), Some(&prev), &cur),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn store_recovers_from_poison() {
        let last = Arc::new(Mutex::new(Position::unset()));
        let poisoner = Arc::clone(&last);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(last.is_poisoned());

        store(&last, at(1.0, 2.0));
        let guard = last.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(guard.latitude, 1.0);
    }
}
