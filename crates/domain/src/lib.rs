//! Core domain types for the wallet position watcher.
//!
//! Positions, snapshots, fills and the transition records produced by
//! comparing two snapshots. Everything in this crate is synchronous and
//! free of I/O.

pub mod diff;
pub mod entities;
pub mod enums;
pub mod error;
pub mod transition;

pub use diff::diff_positions;
pub use entities::fill::Fill;
pub use entities::position::{Position, PositionSnapshot};
pub use enums::{FillSide, Side, SizeChange};
pub use error::DomainError;
pub use transition::TransitionRecord;
