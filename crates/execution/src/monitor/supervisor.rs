//! Supervision of wallet monitors.

use super::{MonitorContext, MonitorError, WalletMonitor};
use crate::alerts::format::{self, short_wallet};
use crate::alerts::{Notification, NotificationSender};
use crate::sync::{BackoffConfig, ReconnectBackoff};
use std::any::Any;
use std::future::Future;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Runs one supervised monitor per wallet.
pub struct Supervisor {
    ctx: MonitorContext,
    tasks: JoinSet<u32>,
}

impl Supervisor {
    pub fn new(ctx: MonitorContext) -> Self {
        Self {
            ctx,
            tasks: JoinSet::new(),
        }
    }

    /// Starts monitoring `wallet` in its own task.
    pub fn spawn_wallet(&mut self, wallet: impl Into<String>) {
        let wallet = wallet.into();
        let ctx = self.ctx.clone();
        let factory_wallet = wallet.clone();
        let factory_ctx = ctx.clone();
        let restart = BackoffConfig {
            base_delay: ctx.config.restart_delay,
            max_delay: ctx.config.max_restart_delay.max(ctx.config.restart_delay),
            jitter_ratio: 0.0,
        };

        self.tasks.spawn(supervise(
            wallet,
            ctx.notifications.clone(),
            ctx.shutdown.clone(),
            restart,
            move || WalletMonitor::new(factory_wallet.clone(), factory_ctx.clone()).run(),
        ));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for every supervised monitor to stop. Monitors only stop once
    /// the shutdown token is cancelled.
    pub async fn join(mut self) {
        while let Some(result) = self.tasks.join_next().await {
            match result {
                Ok(restarts) => info!(restarts, "Wallet supervisor finished"),
                Err(e) => error!(error = %e, "Wallet supervisor task failed"),
            }
        }
    }
}

/// Runs monitors produced by `factory` until one returns cleanly or shutdown
/// is cancelled. Every error or panic is logged and followed by a restart
/// under `restart` backoff. Only the first crash of a streak is alerted; a
/// run that lasted at least `restart.max_delay` ends the streak.
///
/// Returns the number of restarts.
pub async fn supervise<F, Fut>(
    wallet: String,
    notifications: NotificationSender,
    shutdown: CancellationToken,
    restart: BackoffConfig,
    mut factory: F,
) -> u32
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<(), MonitorError>> + Send + 'static,
{
    let short = short_wallet(&wallet);
    let stable_after = restart.max_delay;
    let mut backoff = ReconnectBackoff::new(restart);
    let mut restarts = 0;

    loop {
        let started = Instant::now();
        let failure = match tokio::spawn(factory()).await {
            Ok(Ok(())) => {
                info!(wallet = %short, "Wallet monitor stopped");
                return restarts;
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => describe_join_error(e),
        };

        if shutdown.is_cancelled() {
            info!(wallet = %short, error = %failure, "Wallet monitor ended during shutdown");
            return restarts;
        }

        if started.elapsed() >= stable_after {
            backoff.reset();
        }
        let wait = backoff.record_failure();
        let streak = backoff.failures();
        error!(
            wallet = %short,
            error = %failure,
            streak,
            wait_secs = wait.as_secs_f64(),
            "Wallet monitor crashed"
        );
        if streak == 1 {
            notifications
                .send(Notification::html(format::crash_alert(&wallet, &failure)))
                .await;
        } else {
            warn!(wallet = %short, streak, "Crash alert already sent for this streak");
        }

        restarts += 1;
        tokio::select! {
            _ = shutdown.cancelled() => return restarts,
            _ = tokio::time::sleep(wait) => {}
        }
        info!(wallet = %short, restarts, "Restarting wallet monitor");
    }
}

fn describe_join_error(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload: Box<dyn Any + Send> = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic".to_string()
    }
}
