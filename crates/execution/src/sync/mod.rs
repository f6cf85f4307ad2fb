//! Streaming connection to the venue's user event feed.
//!
//! Provides:
//! - Reconnect backoff with jitter
//! - Inbound message classification
//! - A websocket client with an app-level ping task bound to each connection

mod backoff;
mod messages;
mod stream_client;

pub use backoff::*;
pub use messages::*;
pub use stream_client::*;

use thiserror::Error;

/// Failure of a single streaming connection. Always followed by a reconnect.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("websocket error: {0}")]
    Connection(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("stream closed by peer")]
    Closed,
}
