//! Location provider — polls a positioning adapter and delivers fixes.
//!
//! Architecture: two concurrency domains. The owning context is the
//! single-threaded `LocalSet` that calls [`LocationProvider::start_provider`];
//! it services every provider call and receives listener callbacks. A
//! private OS thread performs the blocking captures (see [`poller`]) and
//! forwards each sample over an unbounded channel to a consumer task on
//! the owning context (see [`dispatch`]).
//!
//! State machine: `Stopped` → `Starting` → `Running` → `Stopped`.
//!
//! Misuse policy:
//! - `set_update_callback` while running is rejected.
//! - `start_provider` while running with the same mode is a no-op that
//!   returns the last negotiation result; with a different mode the
//!   provider restarts in the new mode. A run whose poll thread has died
//!   is stopped first, so neither shortcut applies to it.
//! - `stop_provider` while stopped is a no-op.
//! - `get_position` is valid in every state.

mod dispatch;
mod poller;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::PositioningApi;
use crate::geo::Position;

use poller::PollThread;

/// Listener invoked on the owning context for every captured sample,
/// valid or error-coded.
pub type UpdateCallback = Box<dyn FnMut(&ProviderRef, Position)>;

/// Provider misuse errors.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("update callback cannot be replaced while the provider is running")]
    CallbackWhileRunning,
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Stopped,
    /// Negotiating accuracy and spawning the poll thread.
    Starting,
    Running,
}

/// Poll scheduling.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Wait after an error sample or a fix that moved.
    pub moving_interval: Duration,
    /// Wait after a fix that stayed within `movement_threshold_m`.
    pub stationary_interval: Duration,
    pub movement_threshold_m: f64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            moving_interval: Duration::from_millis(500),
            stationary_interval: Duration::from_millis(1500),
            movement_threshold_m: 20.0,
        }
    }
}

/// Unique identifier for a provider instance, used in logs and passed to
/// listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderId(Uuid);

impl ProviderId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cheap handle identifying a provider, handed to listeners.
///
/// Also reads the last-known position, so it can be cloned out to other
/// threads that only need snapshots.
#[derive(Clone)]
pub struct ProviderRef {
    id: ProviderId,
    last_position: Arc<Mutex<Position>>,
}

impl ProviderRef {
    pub fn id(&self) -> ProviderId {
        self.id
    }

    /// Snapshot of the most recent capture.
    pub fn position(&self) -> Position {
        self.last_position
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl fmt::Debug for ProviderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRef")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Resources of one start/stop cycle.
struct ActiveRun<A> {
    poll: PollThread<A>,
    cancel: CancellationToken,
    consumer: tokio::task::JoinHandle<()>,
    /// Set by the consumer when the poll thread exits on its own.
    closed: Rc<Cell<bool>>,
}

/// Polling location provider bound to one positioning adapter.
///
/// Owns the adapter for its whole lifetime. Dropping the provider stops
/// it and then drops the adapter exactly once.
pub struct LocationProvider<A: PositioningApi> {
    shared: ProviderRef,
    config: ProviderConfig,
    state: ProviderState,
    /// Last mode passed to `start_provider`.
    high_accuracy: bool,
    /// Adapter's answer to the most recent accuracy request.
    last_negotiation: bool,
    /// Present while stopped; lives on the poll thread while running.
    /// `None` after the poll thread panicked.
    api: Option<A>,
    listener: Option<Rc<RefCell<UpdateCallback>>>,
    run: Option<ActiveRun<A>>,
}

impl<A: PositioningApi> LocationProvider<A> {
    pub fn new(api: A, config: ProviderConfig) -> Self {
        let provider = Self {
            shared: ProviderRef {
                id: ProviderId::new(),
                last_position: Arc::new(Mutex::new(Position::unset())),
            },
            config,
            state: ProviderState::Stopped,
            high_accuracy: false,
            last_negotiation: false,
            api: Some(api),
            listener: None,
            run: None,
        };
        tracing::debug!(provider = %provider.id(), "provider created");
        provider
    }

    pub fn id(&self) -> ProviderId {
        self.shared.id
    }

    pub fn state(&self) -> ProviderState {
        self.state
    }

    /// Last mode passed to `start_provider`, regardless of whether the
    /// adapter applied it.
    pub fn high_accuracy(&self) -> bool {
        self.high_accuracy
    }

    /// Register the single listener.
    ///
    /// Replaces any previous listener while stopped. Rejected while
    /// running; the current listener stays in place.
    pub fn set_update_callback<F>(&mut self, callback: F) -> Result<(), ProviderError>
    where
        F: FnMut(&ProviderRef, Position) + 'static,
    {
        if self.state != ProviderState::Stopped {
            tracing::warn!(provider = %self.id(), "rejected listener change while running");
            return Err(ProviderError::CallbackWhileRunning);
        }
        let callback: UpdateCallback = Box::new(callback);
        self.listener = Some(Rc::new(RefCell::new(callback)));
        Ok(())
    }

    /// Configure accuracy and begin polling.
    ///
    /// Returns whether the adapter applied the requested mode. A refusal
    /// does not prevent starting; polling proceeds at best-effort accuracy.
    /// The requested mode is stored either way.
    ///
    /// Listener callbacks are delivered on the calling thread.
    ///
    /// # Panics
    ///
    /// Panics if called outside a `tokio::task::LocalSet`.
    pub fn start_provider(&mut self, high_accuracy: bool) -> bool {
        if self.run.as_ref().is_some_and(|run| run.closed.get()) {
            tracing::warn!(provider = %self.id(), "previous run lost its poll thread");
            self.stop_provider();
        }

        if self.state == ProviderState::Running {
            if high_accuracy == self.high_accuracy {
                tracing::debug!(
                    provider = %self.id(),
                    high_accuracy,
                    "already running in requested mode"
                );
                return self.last_negotiation;
            }
            tracing::info!(
                provider = %self.id(),
                from = self.high_accuracy,
                to = high_accuracy,
                "reconfiguring accuracy"
            );
            self.stop_provider();
        }

        self.high_accuracy = high_accuracy;

        let Some(mut api) = self.api.take() else {
            tracing::error!(
                provider = %self.id(),
                "positioning adapter lost after poll thread failure, cannot start"
            );
            self.last_negotiation = false;
            return false;
        };

        self.state = ProviderState::Starting;

        let accepted = api.set_high_accuracy(high_accuracy);
        self.last_negotiation = accepted;
        if !accepted {
            tracing::warn!(
                provider = %self.id(),
                high_accuracy,
                "adapter refused accuracy mode, polling best-effort"
            );
        }

        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let closed = Rc::new(Cell::new(false));

        let consumer = dispatch::spawn_consumer(
            self.shared.clone(),
            update_rx,
            self.listener.clone(),
            cancel.clone(),
            Rc::clone(&closed),
        );
        let poll = poller::spawn_poll_thread(
            api,
            self.id(),
            self.config.clone(),
            Arc::clone(&self.shared.last_position),
            update_tx,
        );

        self.run = Some(ActiveRun {
            poll,
            cancel,
            consumer,
            closed,
        });
        self.state = ProviderState::Running;

        tracing::info!(
            provider = %self.id(),
            high_accuracy,
            accepted,
            has_listener = self.listener.is_some(),
            "provider started"
        );
        accepted
    }

    /// Halt polling.
    ///
    /// Blocks until any in-flight capture completes; its result is
    /// discarded. No listener callback runs after this returns. Safe to
    /// call in any state.
    pub fn stop_provider(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };

        run.cancel.cancel();
        run.consumer.abort();

        match run.poll.stop() {
            Some(api) => self.api = Some(api),
            None => tracing::error!(
                provider = %self.id(),
                "poll thread panicked, positioning adapter dropped"
            ),
        }

        self.state = ProviderState::Stopped;
        tracing::info!(provider = %self.id(), "provider stopped");
    }

    /// Most recent capture without triggering a new one.
    ///
    /// Before the first capture this is [`Position::unset`].
    pub fn get_position(&self) -> Position {
        self.shared.position()
    }
}

impl<A: PositioningApi> Drop for LocationProvider<A> {
    fn drop(&mut self) {
        self.stop_provider();
    }
}
