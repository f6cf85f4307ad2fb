//! User event stream client.
//!
//! One [`UserEventStream`] serves one wallet. Each connection subscribes to
//! the wallet's user events, forwards every text message to a
//! [`StreamHandler`] and keeps the subscription alive with an app-level ping
//! sent from a task whose lifetime is bound to the connection.

use super::{BackoffConfig, ReconnectBackoff, StreamError};
use crate::alerts::format::short_wallet;
use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::fmt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default websocket endpoint.
pub const DEFAULT_WS_URL: &str = "wss://api.hyperliquid.xyz/ws";

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Subscribed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Subscribed => "subscribed",
        };
        f.write_str(name)
    }
}

/// Stream client settings.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub ws_url: String,
    /// Period of the app-level ping.
    pub ping_interval: Duration,
    pub backoff: BackoffConfig,
    /// Consecutive failures after which the handler is told, once.
    pub alert_after_failures: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            ping_interval: Duration::from_secs(50),
            backoff: BackoffConfig::default(),
            alert_after_failures: 3,
        }
    }
}

/// Receiver of stream traffic.
#[async_trait]
pub trait StreamHandler: Send {
    /// Called for each inbound text message. The next message is not read
    /// until this returns.
    async fn on_message(&mut self, text: &str);

    /// Called when the consecutive failure count reaches the alert threshold.
    async fn on_connection_failing(&mut self, attempts: u32, next_retry: Duration);
}

/// Reconnecting subscription to one wallet's user events.
pub struct UserEventStream {
    wallet: String,
    config: StreamConfig,
    backoff: ReconnectBackoff,
    state: ConnectionState,
}

impl UserEventStream {
    pub fn new(wallet: impl Into<String>, config: StreamConfig) -> Self {
        let backoff = ReconnectBackoff::new(config.backoff.clone());
        Self {
            wallet: wallet.into(),
            config,
            backoff,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn backoff(&self) -> &ReconnectBackoff {
        &self.backoff
    }

    /// Subscribe request for `wallet`.
    #[must_use]
    pub fn subscribe_message(wallet: &str) -> String {
        json!({
            "method": "subscribe",
            "subscription": { "type": "userEvents", "user": wallet },
        })
        .to_string()
    }

    #[must_use]
    pub fn ping_message() -> String {
        json!({ "method": "ping" }).to_string()
    }

    /// Connects, streams and reconnects until `shutdown` is cancelled.
    pub async fn run<H: StreamHandler>(&mut self, handler: &mut H, shutdown: &CancellationToken) {
        let wallet = short_wallet(&self.wallet);

        while !shutdown.is_cancelled() {
            self.state = ConnectionState::Connecting;
            info!(wallet = %wallet, url = %self.config.ws_url, "Connecting to user event stream");

            match self.connect_and_stream(handler, shutdown).await {
                Ok(()) => info!(wallet = %wallet, "User event stream closed"),
                Err(e) => warn!(wallet = %wallet, error = %e, "User event stream failed"),
            }
            self.state = ConnectionState::Disconnected;

            if shutdown.is_cancelled() {
                break;
            }

            let wait = self.backoff.record_failure();
            let attempts = self.backoff.failures();
            info!(
                wallet = %wallet,
                attempt = attempts,
                wait_secs = wait.as_secs_f64(),
                "Reconnecting to user event stream"
            );
            if attempts == self.config.alert_after_failures {
                handler.on_connection_failing(attempts, wait).await;
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        self.state = ConnectionState::Disconnected;
        info!(wallet = %wallet, "User event stream stopped");
    }

    async fn connect_and_stream<H: StreamHandler>(
        &mut self,
        handler: &mut H,
        shutdown: &CancellationToken,
    ) -> Result<(), StreamError> {
        let wallet = short_wallet(&self.wallet);

        let (ws_stream, _response) = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            connected = connect_async(self.config.ws_url.as_str()) => connected?,
        };
        let (mut write, mut read) = ws_stream.split();

        write
            .send(Message::Text(Self::subscribe_message(&self.wallet)))
            .await?;
        self.state = ConnectionState::Subscribed;
        self.backoff.reset();
        info!(wallet = %wallet, "Subscribed to user events");

        let connection = shutdown.child_token();
        // Stops the ping task even if the handler panics or this future is dropped.
        let _ping_guard = connection.clone().drop_guard();
        let ping_handle = tokio::spawn(ping_loop(
            write,
            self.config.ping_interval,
            connection.clone(),
            wallet.clone(),
        ));

        let result = loop {
            let next = tokio::select! {
                biased;
                _ = connection.cancelled() => break Ok(()),
                next = read.next() => next,
            };

            match next {
                Some(Ok(Message::Text(text))) => handler.on_message(&text).await,
                Some(Ok(Message::Close(frame))) => {
                    info!(wallet = %wallet, frame = ?frame, "Received close frame");
                    break Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(StreamError::from(e)),
                None => break Err(StreamError::Closed),
            }
        };

        connection.cancel();
        match ping_handle.await {
            Ok(Err(e)) if result.is_ok() && !shutdown.is_cancelled() => return Err(e),
            Ok(_) => {}
            Err(e) => warn!(wallet = %wallet, error = %e, "Ping task ended abnormally"),
        }
        result
    }
}

/// Sends a ping every `period` until `connection` is cancelled or a send fails.
/// Either way the connection token is cancelled on exit.
async fn ping_loop(
    mut write: WsSink,
    period: Duration,
    connection: CancellationToken,
    wallet: String,
) -> Result<(), StreamError> {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let result = loop {
        tokio::select! {
            biased;
            _ = connection.cancelled() => break Ok(()),
            _ = ticker.tick() => {
                if let Err(e) = write.send(Message::Text(UserEventStream::ping_message())).await {
                    warn!(wallet = %wallet, error = %e, "Failed to send ping");
                    break Err(StreamError::from(e));
                }
                debug!(wallet = %wallet, "Sent ping");
            }
        }
    };

    connection.cancel();
    result
}
