use crate::enums::FillSide;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One trade execution reported on the user event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub coin: String,
    /// `None` when the venue sent a side code this build does not know.
    pub side: Option<FillSide>,
    pub size: Decimal,
    pub price: Option<Decimal>,
    /// Profit or loss realized by this fill; zero unless it reduced or closed a position.
    pub closed_pnl: Decimal,
}

impl Fill {
    pub fn realizes_pnl(&self) -> bool {
        !self.closed_pnl.is_zero()
    }
}
