//! Geographic fixes — the [`Position`] value type, its validation rules,
//! and distance between fixes.

mod distance;
mod position;

pub use distance::distance_m;
pub use position::{ErrorCode, Position, ValidationError};
