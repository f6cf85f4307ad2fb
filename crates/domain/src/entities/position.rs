use crate::enums::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub coin: String,
    pub size: Decimal,
    pub side: Side,
    pub entry_price: Decimal,
    pub leverage: Decimal,
    pub position_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub return_on_equity: Decimal,
}

impl Position {
    /// Builds a position from the venue's signed size.
    ///
    /// A zero signed size means the coin has no open exposure; `None` is
    /// returned so that it never enters a snapshot.
    pub fn from_signed_size(
        coin: impl Into<String>,
        signed_size: Decimal,
        entry_price: Decimal,
        leverage: Decimal,
        unrealized_pnl: Decimal,
        return_on_equity: Decimal,
    ) -> Option<Self> {
        let side = Side::from_signed_size(signed_size)?;
        let size = signed_size.abs();
        Some(Self {
            coin: coin.into(),
            size,
            side,
            entry_price,
            leverage,
            position_value: size * entry_price,
            unrealized_pnl,
            return_on_equity,
        })
    }

    /// Whether this observation differs from `other` in a way that counts as a
    /// position transition. Price, PnL and leverage drift do not.
    pub fn is_resized_from(&self, other: &Position) -> bool {
        self.size != other.size || self.side != other.side
    }
}

/// All open positions of one wallet at one instant, keyed by coin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionSnapshot {
    positions: BTreeMap<String, Position>,
}

impl PositionSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a position, replacing any previous entry for the same coin.
    pub fn insert(&mut self, position: Position) -> Option<Position> {
        self.positions.insert(position.coin.clone(), position)
    }

    pub fn get(&self, coin: &str) -> Option<&Position> {
        self.positions.get(coin)
    }

    pub fn contains(&self, coin: &str) -> bool {
        self.positions.contains_key(coin)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Coins in ascending order.
    pub fn coins(&self) -> impl Iterator<Item = &str> {
        self.positions.keys().map(String::as_str)
    }

    /// Positions in ascending coin order.
    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn total_unrealized_pnl(&self) -> Decimal {
        self.positions.values().map(|p| p.unrealized_pnl).sum()
    }
}

impl FromIterator<Position> for PositionSnapshot {
    fn from_iter<I: IntoIterator<Item = Position>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for position in iter {
            snapshot.insert(position);
        }
        snapshot
    }
}

impl IntoIterator for PositionSnapshot {
    type Item = Position;
    type IntoIter = std::collections::btree_map::IntoValues<String, Position>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn eth_long() -> Position {
        Position::from_signed_size("ETH", dec!(1.5), dec!(3000), dec!(10), dec!(100), dec!(0.05))
            .unwrap()
    }

    #[test]
    fn test_position_from_signed_size() {
        let short = Position::from_signed_size(
            "BTC",
            dec!(-0.5),
            dec!(90000),
            dec!(20),
            dec!(-12.5),
            dec!(-0.01),
        )
        .unwrap();

        assert_eq!(short.side, Side::Short);
        assert_eq!(short.size, dec!(0.5));
        assert_eq!(short.position_value, dec!(45000));
    }

    #[test]
    fn test_zero_size_is_absent() {
        let flat = Position::from_signed_size("SOL", dec!(0), dec!(150), dec!(5), dec!(0), dec!(0));
        assert!(flat.is_none());
    }

    #[test]
    fn test_resize_ignores_price_drift() {
        let old = eth_long();
        let mut drifted = old.clone();
        drifted.entry_price = dec!(3100);
        drifted.unrealized_pnl = dec!(-40);
        drifted.leverage = dec!(5);
        assert!(!drifted.is_resized_from(&old));

        let mut flipped = old.clone();
        flipped.side = Side::Short;
        assert!(flipped.is_resized_from(&old));
    }

    #[test]
    fn test_snapshot_keyed_by_coin() {
        let mut snapshot = PositionSnapshot::new();
        snapshot.insert(eth_long());
        let mut bigger = eth_long();
        bigger.size = dec!(3);
        let replaced = snapshot.insert(bigger);

        assert!(replaced.is_some());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("ETH").unwrap().size, dec!(3));
    }

    #[test]
    fn test_snapshot_json_round_trip_is_exact() {
        let snapshot: PositionSnapshot = vec![eth_long()].into_iter().collect();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: PositionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
