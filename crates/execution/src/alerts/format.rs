//! HTML message rendering for the notification sink.
//!
//! Every function returns text meant for [`Notification::html`](super::Notification::html).
//! Amounts are printed with two decimals and thousands separators, sizes as
//! reported by the venue.

use hl_watch_data::providers::AccountSummary;
use hl_watch_domain::{Position, PositionSnapshot, Side, SizeChange, TransitionRecord};
use rust_decimal::{Decimal, RoundingStrategy};
use std::time::Duration;

const LINE: &str = "━━━━━━━━━━━━━━━━━━";

/// Shortens an address to `0x1234...abcd` for messages and logs.
#[must_use]
pub fn short_wallet(wallet: &str) -> String {
    let chars: Vec<char> = wallet.chars().collect();
    if chars.len() <= 10 {
        return wallet.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Drops tags and decodes the entities produced by this module, for
/// terminals and logs.
#[must_use]
pub fn to_plain_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

fn two_decimals(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Absolute value with two decimals and comma grouping: `1234.5` → `1,234.50`.
fn grouped(value: Decimal) -> String {
    let text = two_decimals(value.abs()).to_string();
    let (int_part, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let digits = int_part.len();
    let mut out = String::with_capacity(digits + digits / 3 + 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("{out}.{frac}")
}

fn usd(value: Decimal) -> String {
    if value.is_sign_negative() && !value.is_zero() {
        format!("-${}", grouped(value))
    } else {
        format!("${}", grouped(value))
    }
}

fn pnl(value: Decimal) -> String {
    if value > Decimal::ZERO {
        format!("🟢 <b>+${}</b>", grouped(value))
    } else if value < Decimal::ZERO {
        format!("🔴 <b>-${}</b>", grouped(value))
    } else {
        "⚪ <b>$0.00</b>".to_string()
    }
}

fn pct(ratio: Decimal) -> String {
    let value = two_decimals(ratio * Decimal::ONE_HUNDRED);
    if value > Decimal::ZERO {
        format!("+{value}%")
    } else {
        format!("{value}%")
    }
}

fn side(side: Side) -> String {
    let icon = match side {
        Side::Long => "🟢",
        Side::Short => "🔴",
    };
    format!("{icon} {side}")
}

fn leverage(value: Decimal) -> Decimal {
    value.round_dp(0).normalize()
}

/// Renders any transition record.
#[must_use]
pub fn transition(wallet: &str, record: &TransitionRecord) -> String {
    match record {
        TransitionRecord::Opened { position, .. } => opened(wallet, position),
        TransitionRecord::Closed {
            coin,
            last_known,
            realized_pnl,
            ..
        } => closed(wallet, coin, last_known, *realized_pnl),
        TransitionRecord::Updated { old, new, .. } => updated(wallet, old, new),
    }
}

#[must_use]
pub fn opened(wallet: &str, position: &Position) -> String {
    let coin = escape_html(&position.coin);
    format!(
        "🟢🟢🟢 <b>POSITION OPENED</b> 🟢🟢🟢\n\
         {LINE}\n\
         👛 {wallet}\n\
         🪙 <b>{coin}</b> — {side}\n\
         📏 Size: <b>{size} {coin}</b>\n\
         💵 Entry: <b>{entry}</b>\n\
         ⚡ Leverage: <b>{leverage}x</b>\n\
         💎 Value: {value}",
        wallet = short_wallet(wallet),
        side = side(position.side),
        size = position.size.normalize(),
        entry = usd(position.entry_price),
        leverage = leverage(position.leverage),
        value = usd(position.position_value),
    )
}

/// Close message. The realized PnL line is only present when fills reported it.
#[must_use]
pub fn closed(
    wallet: &str,
    coin: &str,
    last_known: &Position,
    realized_pnl: Option<Decimal>,
) -> String {
    let coin = escape_html(coin);
    let mut lines = vec![
        "🔴🔴🔴 <b>POSITION CLOSED</b> 🔴🔴🔴".to_string(),
        LINE.to_string(),
        format!("👛 {}", short_wallet(wallet)),
        format!("🪙 <b>{coin}</b>"),
        format!("📊 Side: {} → Closed", side(last_known.side)),
        format!("💵 Entry: {}", usd(last_known.entry_price)),
        format!("📏 Size: {} {coin}", last_known.size.normalize()),
    ];
    if let Some(realized) = realized_pnl {
        lines.push(format!("💰 Realized PnL: {}", pnl(realized)));
    }
    lines.join("\n")
}

#[must_use]
pub fn updated(wallet: &str, old: &Position, new: &Position) -> String {
    let (direction, icon) = match SizeChange::between(old.size, new.size) {
        SizeChange::Increased => ("INCREASED", "📈📈📈"),
        SizeChange::Decreased => ("DECREASED", "📉📉📉"),
    };
    let coin = escape_html(&new.coin);
    format!(
        "{icon} <b>POSITION {direction}</b> {icon}\n\
         {LINE}\n\
         👛 {wallet}\n\
         🪙 <b>{coin}</b> — {side}\n\
         📏 Size: {old_size} → <b>{new_size} {coin}</b>\n\
         💵 Entry: {old_entry} → <b>{new_entry}</b>\n\
         ⚡ Leverage: <b>{leverage}x</b>\n\
         💎 Value: {value}\n\
         💰 Unrealized PnL: {upnl}",
        wallet = short_wallet(wallet),
        side = side(new.side),
        old_size = old.size.normalize(),
        new_size = new.size.normalize(),
        old_entry = usd(old.entry_price),
        new_entry = usd(new.entry_price),
        leverage = leverage(new.leverage),
        value = usd(new.position_value),
        upnl = pnl(new.unrealized_pnl),
    )
}

/// Sent once when the stream keeps failing to reconnect.
#[must_use]
pub fn connection_alert(wallet: &str, attempts: u32, next_retry: Duration) -> String {
    format!(
        "⚠️ <b>Bot Alert</b>\n\
         WebSocket disconnected for {}\n\
         Reconnecting (attempt {attempts}, next retry in {:.1}s)",
        short_wallet(wallet),
        next_retry.as_secs_f64(),
    )
}

#[must_use]
pub fn fetch_outage_alert(wallet: &str, attempts: u32, error: &str, next_retry: Duration) -> String {
    format!(
        "⚠️ <b>Bot Alert</b>\n\
         Cannot fetch positions for {}\n\
         Error: {}\n\
         Retrying (attempt {attempts}, next retry in {:.1}s)",
        short_wallet(wallet),
        escape_html(error),
        next_retry.as_secs_f64(),
    )
}

#[must_use]
pub fn crash_alert(wallet: &str, error: &str) -> String {
    format!(
        "🚨 <b>Monitor crashed</b>\n\
         👛 {}\n\
         Error: {}\n\
         Restarting...",
        short_wallet(wallet),
        escape_html(error),
    )
}

#[must_use]
pub fn startup(wallets: &[String]) -> String {
    let listed: Vec<String> = wallets.iter().map(|w| short_wallet(w)).collect();
    format!(
        "🤖 Bot started\nMonitoring: {}\nWallets: {}",
        listed.join(", "),
        wallets.len()
    )
}

/// Lists every open position with its PnL and the wallet total.
#[must_use]
pub fn position_summary(wallet: &str, snapshot: &PositionSnapshot) -> String {
    if snapshot.is_empty() {
        return format!("📊 <b>{}</b>\n😴 No open positions.", short_wallet(wallet));
    }

    let mut lines = vec![format!(
        "📊 <b>Positions — {}</b>\n{LINE}\n",
        short_wallet(wallet)
    )];
    for position in snapshot.iter() {
        let coin = escape_html(&position.coin);
        lines.push(format!(
            "🪙 <b>{coin}</b> — {}\n  \
             📏 Size: {} {coin}\n  \
             💵 Entry: {}\n  \
             ⚡ Leverage: {}x\n  \
             💎 Value: {}\n  \
             💰 PnL: {} ({})\n",
            side(position.side),
            position.size.normalize(),
            usd(position.entry_price),
            leverage(position.leverage),
            usd(position.position_value),
            pnl(position.unrealized_pnl),
            pct(position.return_on_equity),
        ));
    }
    lines.push(format!(
        "{LINE}\n💰 Total PnL: {}",
        pnl(snapshot.total_unrealized_pnl())
    ));
    lines.join("\n")
}

#[must_use]
pub fn balance(wallet: &str, summary: &AccountSummary) -> String {
    format!(
        "💰 <b>Balance — {}</b>\n\
         {LINE}\n\
         🏦 Account Value: <b>{}</b>\n\
         📊 Position Value: {}\n\
         🔒 Margin Used: {}\n\
         💸 Withdrawable: <b>{}</b>",
        short_wallet(wallet),
        usd(summary.account_value),
        usd(summary.total_notional_position),
        usd(summary.total_margin_used),
        usd(summary.withdrawable),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const WALLET: &str = "0x1234567890abcdef1234567890abcdef12345678";

    fn eth_long() -> Position {
        Position::from_signed_size("ETH", dec!(2), dec!(3000), dec!(5), dec!(120.5), dec!(0.1))
            .unwrap()
    }

    #[test]
    fn test_short_wallet() {
        assert_eq!(short_wallet(WALLET), "0x1234...5678");
        assert_eq!(short_wallet("0xabc"), "0xabc");
    }

    #[test]
    fn test_grouped_amounts() {
        assert_eq!(grouped(dec!(1234567.891)), "1,234,567.89");
        assert_eq!(grouped(dec!(999)), "999.00");
        assert_eq!(grouped(dec!(-1000.005)), "1,000.01");
        assert_eq!(usd(dec!(-42.1)), "-$42.10");
    }

    #[test]
    fn test_to_plain_text() {
        assert_eq!(
            to_plain_text("🪙 <b>&lt;X&amp;Y&gt;</b> — LONG"),
            "🪙 <X&Y> — LONG"
        );
        assert_eq!(to_plain_text(&pnl(dec!(5))), "🟢 +$5.00");
    }

    #[test]
    fn test_pnl_colors() {
        assert_eq!(pnl(dec!(250)), "🟢 <b>+$250.00</b>");
        assert_eq!(pnl(dec!(-12.345)), "🔴 <b>-$12.35</b>");
        assert_eq!(pnl(Decimal::ZERO), "⚪ <b>$0.00</b>");
    }

    #[test]
    fn test_pct() {
        assert_eq!(pct(dec!(0.1234)), "+12.34%");
        assert_eq!(pct(dec!(-0.05)), "-5.00%");
    }

    #[test]
    fn test_opened_message() {
        let text = opened(WALLET, &eth_long());
        assert!(text.contains("POSITION OPENED"));
        assert!(text.contains("0x1234...5678"));
        assert!(text.contains("🟢 LONG"));
        assert!(text.contains("Size: <b>2 ETH</b>"));
        assert!(text.contains("Entry: <b>$3,000.00</b>"));
        assert!(text.contains("Leverage: <b>5x</b>"));
        assert!(text.contains("Value: $6,000.00"));
    }

    #[test]
    fn test_closed_message_with_and_without_pnl() {
        let with_pnl = closed(WALLET, "ETH", &eth_long(), Some(dec!(250)));
        assert!(with_pnl.contains("POSITION CLOSED"));
        assert!(with_pnl.contains("Realized PnL: 🟢 <b>+$250.00</b>"));

        let without = closed(WALLET, "ETH", &eth_long(), None);
        assert!(!without.contains("Realized PnL"));
    }

    #[test]
    fn test_updated_direction() {
        let old = eth_long();
        let bigger =
            Position::from_signed_size("ETH", dec!(3), dec!(3100), dec!(5), dec!(10), dec!(0))
                .unwrap();
        assert!(updated(WALLET, &old, &bigger).contains("POSITION INCREASED"));
        assert!(updated(WALLET, &bigger, &old).contains("POSITION DECREASED"));
        assert!(updated(WALLET, &old, &bigger).contains("Size: 2 → <b>3 ETH</b>"));
    }

    #[test]
    fn test_coin_is_escaped() {
        let odd = Position::from_signed_size("<X&Y>", dec!(1), dec!(1), dec!(1), dec!(0), dec!(0))
            .unwrap();
        let text = opened(WALLET, &odd);
        assert!(text.contains("&lt;X&amp;Y&gt;"));
        assert!(!text.contains("<X&Y>"));
    }

    #[test]
    fn test_position_summary() {
        assert!(position_summary(WALLET, &PositionSnapshot::new()).contains("No open positions"));

        let snapshot: PositionSnapshot = [eth_long()].into_iter().collect();
        let text = position_summary(WALLET, &snapshot);
        assert!(text.contains("PnL: 🟢 <b>+$120.50</b> (+10.00%)"));
        assert!(text.contains("Total PnL: 🟢 <b>+$120.50</b>"));
    }

    #[test]
    fn test_alerts() {
        let alert = connection_alert(WALLET, 3, Duration::from_millis(21_500));
        assert!(alert.contains("attempt 3"));
        assert!(alert.contains("21.5s"));

        let crash = crash_alert(WALLET, "boom <eof>");
        assert!(crash.contains("0x1234...5678"));
        assert!(crash.contains("boom &lt;eof&gt;"));

        let outage = fetch_outage_alert(WALLET, 2, "status <503>", Duration::from_secs(10));
        assert!(outage.contains("Cannot fetch positions for 0x1234...5678"));
        assert!(outage.contains("status &lt;503&gt;"));
        assert!(outage.contains("attempt 2, next retry in 10.0s"));

        let started = startup(&[WALLET.to_string()]);
        assert!(started.contains("Wallets: 1"));
    }
}
