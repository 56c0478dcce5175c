//! Positioning API adapters — the capability a provider polls.
//!
//! Platform positioning mechanisms sit behind [`PositioningApi`]. The
//! provider is the adapter's only caller and serializes every call, so
//! implementations need no internal locking.

pub mod replay;
pub mod simulated;

pub use replay::{ReplayApi, ReplayError};
pub use simulated::{SimulatedApi, SimulatedConfig};

use crate::geo::Position;

/// One positioning mechanism: a capture call plus an accuracy toggle.
///
/// `Send + 'static` is required because the adapter moves onto the
/// provider's poll thread while the provider runs. Dropping the adapter
/// is its teardown.
pub trait PositioningApi: Send + 'static {
    /// Request high-accuracy (`true`) or power-saving (`false`) capture.
    ///
    /// Returns whether the mode was applied. Idempotent and safe to call
    /// before the first capture.
    fn set_high_accuracy(&mut self, enable: bool) -> bool;

    /// Perform one synchronous capture. May block for the duration of the
    /// underlying call.
    ///
    /// Always yields a position. Ordinary failures (no signal, permission
    /// denied, timeout) come back as error-coded positions.
    fn get_position(&mut self) -> Position;
}

impl PositioningApi for Box<dyn PositioningApi> {
    fn set_high_accuracy(&mut self, enable: bool) -> bool {
        (**self).set_high_accuracy(enable)
    }

    fn get_position(&mut self) -> Position {
        (**self).get_position()
    }
}
