//! Classification of inbound stream messages.

use hl_watch_domain::{Fill, FillSide};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// An inbound text message, by channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    Pong,
    SubscriptionResponse,
    /// Fills from the user events channel. Empty when the event carried no fills.
    UserFills(Vec<Fill>),
    /// Any other channel, or a message without one.
    Ignored(Option<String>),
}

impl StreamMessage {
    /// Classifies a raw text message.
    ///
    /// # Errors
    /// Returns an error if the text is not JSON, or if a user event carries a
    /// malformed fill list.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let envelope: Envelope = serde_json::from_str(text)?;
        let Some(channel) = envelope.channel else {
            return Ok(StreamMessage::Ignored(None));
        };

        match channel.as_str() {
            "pong" => Ok(StreamMessage::Pong),
            "subscriptionResponse" => Ok(StreamMessage::SubscriptionResponse),
            "user" | "userEvents" => {
                if !envelope.data.is_object() {
                    return Ok(StreamMessage::UserFills(Vec::new()));
                }
                let event: UserEvent = serde_json::from_value(envelope.data)?;
                let fills = event
                    .fills
                    .unwrap_or_default()
                    .into_iter()
                    .map(Fill::from)
                    .collect();
                Ok(StreamMessage::UserFills(fills))
            }
            _ => Ok(StreamMessage::Ignored(Some(channel))),
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct UserEvent {
    #[serde(default)]
    fills: Option<Vec<WireFill>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFill {
    coin: String,
    side: String,
    sz: Decimal,
    #[serde(default)]
    px: Option<Decimal>,
    #[serde(default)]
    closed_pnl: Decimal,
}

impl From<WireFill> for Fill {
    fn from(wire: WireFill) -> Self {
        let side = match wire.side.parse::<FillSide>() {
            Ok(side) => Some(side),
            Err(e) => {
                warn!(coin = %wire.coin, error = %e, "Fill with unknown side");
                None
            }
        };
        Fill {
            coin: wire.coin,
            side,
            size: wire.sz,
            price: wire.px,
            closed_pnl: wire.closed_pnl,
        }
    }
}
