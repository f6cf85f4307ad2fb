//! Snapshot differ.
//!
//! Compares the previous and current snapshot of one wallet and reports what
//! changed, in a fixed order: opens, then closes, then updates, each group in
//! ascending coin order.

use crate::entities::fill::Fill;
use crate::entities::position::PositionSnapshot;
use crate::transition::TransitionRecord;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Produces the ordered transition records between two snapshots.
///
/// `fills` are the executions observed between the two snapshots. They only
/// feed realized-PnL attribution on closes; open/close/update detection works
/// the same with an empty slice.
pub fn diff_positions(
    wallet: &str,
    old: &PositionSnapshot,
    new: &PositionSnapshot,
    fills: &[Fill],
) -> Vec<TransitionRecord> {
    let realized = realized_pnl_by_coin(fills);
    let mut records = Vec::new();

    for position in new.iter() {
        if !old.contains(&position.coin) {
            records.push(TransitionRecord::Opened {
                coin: position.coin.clone(),
                position: position.clone(),
            });
        }
    }

    for position in old.iter() {
        if !new.contains(&position.coin) {
            records.push(TransitionRecord::Closed {
                wallet: wallet.to_string(),
                coin: position.coin.clone(),
                last_known: position.clone(),
                realized_pnl: realized.get(position.coin.as_str()).copied(),
            });
        }
    }

    for old_position in old.iter() {
        if let Some(new_position) = new.get(&old_position.coin) {
            if new_position.is_resized_from(old_position) {
                records.push(TransitionRecord::Updated {
                    coin: old_position.coin.clone(),
                    old: old_position.clone(),
                    new: new_position.clone(),
                });
            }
        }
    }

    records
}

fn realized_pnl_by_coin(fills: &[Fill]) -> HashMap<&str, Decimal> {
    let mut realized: HashMap<&str, Decimal> = HashMap::new();
    for fill in fills.iter().filter(|f| f.realizes_pnl()) {
        *realized.entry(fill.coin.as_str()).or_default() += fill.closed_pnl;
    }
    realized
}
