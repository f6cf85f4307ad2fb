//! Wallet monitor.

use super::{MonitorConfig, MonitorError};
use crate::alerts::format::{self, short_wallet};
use crate::alerts::{Notification, NotificationSender};
use crate::sync::{ReconnectBackoff, StreamHandler, StreamMessage, UserEventStream};
use async_trait::async_trait;
use hl_watch_data::{CheckpointStore, FetchError, SnapshotProvider};
use hl_watch_domain::{Fill, PositionSnapshot, TransitionRecord, diff_positions};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Dependencies shared by every wallet monitor.
#[derive(Clone)]
pub struct MonitorContext {
    pub config: Arc<MonitorConfig>,
    pub provider: Arc<dyn SnapshotProvider>,
    pub store: Arc<dyn CheckpointStore>,
    pub notifications: NotificationSender,
    pub shutdown: CancellationToken,
}

/// Position-tracking state of one wallet.
///
/// Owns the in-memory snapshot and is the [`StreamHandler`] of the wallet's
/// stream, so fill batches are processed strictly one at a time.
pub struct WalletSession {
    wallet: String,
    short: String,
    snapshot: PositionSnapshot,
    ctx: MonitorContext,
}

impl WalletSession {
    pub fn new(wallet: impl Into<String>, ctx: MonitorContext) -> Self {
        let wallet = wallet.into();
        Self {
            short: short_wallet(&wallet),
            wallet,
            snapshot: PositionSnapshot::new(),
            ctx,
        }
    }

    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    pub fn snapshot(&self) -> &PositionSnapshot {
        &self.snapshot
    }

    /// Reports changes that happened while the process was down and
    /// establishes the live baseline.
    ///
    /// A checkpoint that cannot be loaded is treated as absent. The live
    /// snapshot is persisted whether or not anything changed. An unreachable
    /// info endpoint is waited out, see [`fetch_until_available`](Self::fetch_until_available).
    ///
    /// # Errors
    /// Returns [`MonitorError::StartupFetch`] if shutdown is requested before
    /// the live snapshot could be fetched.
    pub async fn reconcile_on_startup(&mut self) -> Result<Vec<TransitionRecord>, MonitorError> {
        let checkpoint = match self.ctx.store.load(&self.wallet).await {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                error!(
                    wallet = %self.short,
                    error = %e,
                    "Failed to load checkpoint, skipping restart reconciliation"
                );
                None
            }
        };

        let live = self.fetch_until_available().await?;

        let records = match &checkpoint {
            Some(saved) => diff_positions(&self.wallet, saved, &live, &[]),
            None => {
                info!(wallet = %self.short, "No checkpoint found, starting from live state");
                Vec::new()
            }
        };
        if !records.is_empty() {
            info!(
                wallet = %self.short,
                changes = records.len(),
                "Detected position changes while offline"
            );
        }
        self.publish(&records).await;

        self.snapshot = live;
        self.persist().await;

        let held: Vec<String> = self
            .snapshot
            .iter()
            .map(|p| format!("{} {} {}", p.coin, p.side, p.size.normalize()))
            .collect();
        info!(wallet = %self.short, positions = ?held, "Monitoring wallet");
        Ok(records)
    }

    /// Re-fetches after a fill batch and reports what changed.
    ///
    /// If the fetch keeps failing the batch is dropped and the in-memory
    /// snapshot is left as it was. Nothing is reported or persisted once
    /// shutdown has been observed.
    pub async fn handle_fills(&mut self, fills: &[Fill]) -> Vec<TransitionRecord> {
        if !self.ctx.config.settle_delay.is_zero() {
            tokio::select! {
                _ = self.ctx.shutdown.cancelled() => return Vec::new(),
                _ = tokio::time::sleep(self.ctx.config.settle_delay) => {}
            }
        }

        let live = match self.fetch_with_retry().await {
            Ok(live) => live,
            Err(e) => {
                error!(
                    wallet = %self.short,
                    fills = fills.len(),
                    error = %e,
                    "Giving up on snapshot fetch, dropping fill batch"
                );
                return Vec::new();
            }
        };

        if self.ctx.shutdown.is_cancelled() {
            debug!(wallet = %self.short, "Shutdown observed, discarding fetched snapshot");
            return Vec::new();
        }

        let records = diff_positions(&self.wallet, &self.snapshot, &live, fills);
        self.publish(&records).await;
        self.snapshot = live;
        self.persist().await;
        records
    }

    /// Repeats the bounded fetch retry under the stream's reconnect backoff
    /// until a snapshot arrives. A single alert is queued when the outage
    /// reaches the stream's alert threshold.
    ///
    /// # Errors
    /// Returns [`MonitorError::StartupFetch`] with the last fetch error once
    /// shutdown is requested.
    pub async fn fetch_until_available(&self) -> Result<PositionSnapshot, MonitorError> {
        let stream = &self.ctx.config.stream;
        let mut backoff = ReconnectBackoff::new(stream.backoff.clone());

        loop {
            let error = match self.fetch_with_retry().await {
                Ok(snapshot) => {
                    if backoff.failures() > 0 {
                        info!(
                            wallet = %self.short,
                            failures = backoff.failures(),
                            "Snapshot fetch recovered"
                        );
                    }
                    return Ok(snapshot);
                }
                Err(e) => e,
            };
            if self.ctx.shutdown.is_cancelled() {
                return Err(self.startup_fetch_error(error));
            }

            let wait = backoff.record_failure();
            let attempts = backoff.failures();
            warn!(
                wallet = %self.short,
                attempt = attempts,
                wait_secs = wait.as_secs_f64(),
                error = %error,
                "Initial snapshot unavailable, backing off"
            );
            if attempts == stream.alert_after_failures {
                self.ctx
                    .notifications
                    .send(Notification::html(format::fetch_outage_alert(
                        &self.wallet,
                        attempts,
                        &error.to_string(),
                        wait,
                    )))
                    .await;
            }

            let cancelled = tokio::select! {
                _ = self.ctx.shutdown.cancelled() => true,
                _ = tokio::time::sleep(wait) => false,
            };
            if cancelled {
                return Err(self.startup_fetch_error(error));
            }
        }
    }

    fn startup_fetch_error(&self, source: FetchError) -> MonitorError {
        MonitorError::StartupFetch {
            wallet: self.wallet.clone(),
            source,
        }
    }

    async fn fetch_with_retry(&self) -> Result<PositionSnapshot, FetchError> {
        let retry = &self.ctx.config.fetch_retry;
        let attempts = retry.attempts.max(1);
        let mut delay = retry.delay;
        let mut attempt = 1;

        loop {
            match self.ctx.provider.fetch_positions(&self.wallet).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) if attempt >= attempts || self.ctx.shutdown.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(
                        wallet = %self.short,
                        attempt,
                        error = %e,
                        "Snapshot fetch failed, retrying"
                    );
                    tokio::select! {
                        _ = self.ctx.shutdown.cancelled() => return Err(e),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }

    async fn publish(&self, records: &[TransitionRecord]) {
        for record in records {
            info!(
                wallet = %self.short,
                coin = record.coin(),
                kind = record.kind(),
                "Position transition"
            );
            self.ctx
                .notifications
                .send(Notification::html(format::transition(&self.wallet, record)))
                .await;
        }
    }

    async fn persist(&self) {
        if self.ctx.shutdown.is_cancelled() {
            debug!(wallet = %self.short, "Shutdown observed, skipping checkpoint");
            return;
        }
        match self.ctx.store.save(&self.wallet, &self.snapshot).await {
            Ok(()) => debug!(
                wallet = %self.short,
                positions = self.snapshot.len(),
                "Checkpoint saved"
            ),
            Err(e) => error!(wallet = %self.short, error = %e, "Failed to save checkpoint"),
        }
    }
}

#[async_trait]
impl StreamHandler for WalletSession {
    async fn on_message(&mut self, text: &str) {
        match StreamMessage::parse(text) {
            Ok(StreamMessage::UserFills(fills)) if fills.is_empty() => {}
            Ok(StreamMessage::UserFills(fills)) => {
                info!(wallet = %self.short, fills = fills.len(), "Received fills");
                self.handle_fills(&fills).await;
            }
            Ok(StreamMessage::Pong) => debug!(wallet = %self.short, "Received pong"),
            Ok(StreamMessage::SubscriptionResponse) => {
                debug!(wallet = %self.short, "Subscription acknowledged");
            }
            Ok(StreamMessage::Ignored(channel)) => {
                debug!(wallet = %self.short, channel = ?channel, "Ignoring message");
            }
            Err(e) => warn!(wallet = %self.short, error = %e, "Skipping malformed message"),
        }
    }

    async fn on_connection_failing(&mut self, attempts: u32, next_retry: Duration) {
        warn!(
            wallet = %self.short,
            attempts,
            "User event stream keeps failing, sending alert"
        );
        self.ctx
            .notifications
            .send(Notification::html(format::connection_alert(
                &self.wallet,
                attempts,
                next_retry,
            )))
            .await;
    }
}

/// Startup reconciliation followed by the stream loop, for one wallet.
pub struct WalletMonitor {
    session: WalletSession,
    stream: UserEventStream,
}

impl WalletMonitor {
    pub fn new(wallet: impl Into<String>, ctx: MonitorContext) -> Self {
        let wallet = wallet.into();
        let stream = UserEventStream::new(wallet.clone(), ctx.config.stream.clone());
        Self {
            session: WalletSession::new(wallet, ctx),
            stream,
        }
    }

    pub fn wallet(&self) -> &str {
        self.session.wallet()
    }

    /// Runs until shutdown.
    ///
    /// # Errors
    /// Returns an error only if startup reconciliation fails for a reason
    /// other than shutdown.
    pub async fn run(mut self) -> Result<(), MonitorError> {
        let shutdown = self.session.ctx.shutdown.clone();
        if let Err(e) = self.session.reconcile_on_startup().await {
            if shutdown.is_cancelled() {
                return Ok(());
            }
            return Err(e);
        }
        self.stream.run(&mut self.session, &shutdown).await;
        Ok(())
    }
}
