//! Owning-context consumer — delivers updates to the listener.
//!
//! Runs as a `spawn_local` task on the `LocalSet` that started the
//! provider, so the listener only ever executes on that thread. The
//! cancellation token is checked before every delivery; since the
//! provider cancels it from the same thread, no delivery can follow a
//! completed `stop_provider`.
//!
//! The update channel closes on its own only when the poll thread died
//! without being asked to stop. The consumer records that in the run's
//! `closed` flag so the provider can clean up on its next call.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{ProviderRef, UpdateCallback};
use crate::geo::Position;

/// Spawn the consumer task for one run.
///
/// # Panics
///
/// Panics if called outside a `tokio::task::LocalSet`.
pub(super) fn spawn_consumer(
    provider: ProviderRef,
    mut updates: mpsc::UnboundedReceiver<Position>,
    listener: Option<Rc<RefCell<UpdateCallback>>>,
    cancel: CancellationToken,
    closed: Rc<Cell<bool>>,
) -> tokio::task::JoinHandle<()> {
    let owner = std::thread::current().id();

    tokio::task::spawn_local(async move {
        loop {
            let position = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                update = updates.recv() => match update {
                    Some(position) => position,
                    None => {
                        tracing::warn!(provider = %provider.id(), "poll thread ended unexpectedly");
                        closed.set(true);
                        break;
                    }
                },
            };

            debug_assert_eq!(
                std::thread::current().id(),
                owner,
                "update delivered off the owning thread"
            );

            match &listener {
                Some(callback) => (&mut *callback.borrow_mut())(&provider, position),
                None => tracing::trace!(provider = %provider.id(), "no listener, update dropped"),
            }
        }
        tracing::debug!(provider = %provider.id(), "consumer exiting");
    })
}
