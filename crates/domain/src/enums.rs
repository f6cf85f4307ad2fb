use crate::error::DomainError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Derives the side from a signed position size.
    ///
    /// Returns `None` for a zero size, which is not a position at all.
    pub fn from_signed_size(signed_size: Decimal) -> Option<Self> {
        if signed_size.is_zero() {
            None
        } else if signed_size.is_sign_positive() {
            Some(Side::Long)
        } else {
            Some(Side::Short)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggressor side of a fill as reported by the venue (`B` = buy, `A` = sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillSide {
    #[serde(rename = "B")]
    Buy,
    #[serde(rename = "A")]
    Sell,
}

impl FromStr for FillSide {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "B" | "b" | "buy" | "Buy" | "BUY" => Ok(FillSide::Buy),
            "A" | "a" | "sell" | "Sell" | "SELL" => Ok(FillSide::Sell),
            other => Err(DomainError::UnknownFillSide(other.to_string())),
        }
    }
}

/// Direction of a size change between two observations of the same coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeChange {
    Increased,
    Decreased,
}

impl SizeChange {
    /// A zero delta only happens on a side reversal at equal size and is
    /// reported as a decrease.
    pub fn between(old_size: Decimal, new_size: Decimal) -> Self {
        if new_size > old_size {
            SizeChange::Increased
        } else {
            SizeChange::Decreased
        }
    }
}
