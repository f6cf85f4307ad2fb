//! Transition records produced by comparing two snapshots.

use crate::entities::position::Position;
use crate::enums::SizeChange;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One detected position-state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionRecord {
    /// A coin appeared that was not held before.
    Opened { coin: String, position: Position },
    /// A previously held coin is gone.
    Closed {
        wallet: String,
        coin: String,
        last_known: Position,
        /// Sum of realized PnL reported by the fills that closed the position.
        /// Always `None` when the change was found without fills.
        realized_pnl: Option<Decimal>,
    },
    /// The coin is still held but its size or side changed.
    Updated {
        coin: String,
        old: Position,
        new: Position,
    },
}

impl TransitionRecord {
    pub fn coin(&self) -> &str {
        match self {
            TransitionRecord::Opened { coin, .. }
            | TransitionRecord::Closed { coin, .. }
            | TransitionRecord::Updated { coin, .. } => coin,
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TransitionRecord::Opened { .. } => "opened",
            TransitionRecord::Closed { .. } => "closed",
            TransitionRecord::Updated { .. } => "updated",
        }
    }

    /// Size direction of an update; `None` for opens and closes.
    pub fn direction(&self) -> Option<SizeChange> {
        match self {
            TransitionRecord::Updated { old, new, .. } => {
                Some(SizeChange::between(old.size, new.size))
            }
            _ => None,
        }
    }
}
