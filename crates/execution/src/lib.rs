//! Live wallet monitoring.
//!
//! This crate provides the reconciliation engine:
//! - Outbound notification queue, formatting and sinks
//! - User event stream client with ping and reconnect backoff
//! - Per-wallet monitor with startup reconciliation
//! - Supervisor isolating wallet monitors from each other

/// Prelude module for convenient imports.
pub mod prelude;

/// Notification queue, formatting and delivery.
pub mod alerts;
/// Wallet monitors and their supervisor.
pub mod monitor;
/// Streaming connection to the venue.
pub mod sync;
