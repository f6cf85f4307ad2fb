//! Command Line Interface for the Hyperliquid wallet watcher.
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{AppConfig, Requirements};
use dotenv::dotenv;
use hl_watch_data::SnapshotProvider;
use hl_watch_data::providers::HyperliquidProvider;
use hl_watch_data::repositories::Database;
use hl_watch_execution::alerts::format;
use hl_watch_execution::alerts::{
    ConsoleNotifier, Notification, NotificationDispatcher, Notifier, TelegramNotifier,
    notification_channel,
};
use hl_watch_execution::monitor::{MonitorContext, Supervisor};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const QUEUE_CAPACITY: usize = 1000;

#[derive(Parser)]
#[command(name = "hl-watch")]
#[command(about = "Hyperliquid wallet position watcher", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// SQLite checkpoint file (overrides DB_PATH)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor every configured wallet (default)
    Run {
        /// Log notifications instead of sending them to Telegram
        #[arg(long)]
        console: bool,
    },
    /// Print the open positions of every configured wallet
    Positions,
    /// Print the balance of every configured wallet
    Balance,
    /// List stored checkpoints
    Checkpoints,
    /// Forget a wallet's checkpoint so the next start skips offline reconciliation
    ClearCheckpoint {
        /// Wallet address
        wallet: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let command = cli.command.unwrap_or(Commands::Run { console: false });
    let requirements = match &command {
        Commands::Run { console } => Requirements {
            wallets: true,
            telegram: !console,
        },
        Commands::Positions | Commands::Balance => Requirements {
            wallets: true,
            telegram: false,
        },
        Commands::Checkpoints | Commands::ClearCheckpoint { .. } => Requirements {
            wallets: false,
            telegram: false,
        },
    };

    let mut config = match AppConfig::from_env(requirements) {
        Ok(config) => config,
        Err(e) => {
            for problem in &e.problems {
                error!(problem = %problem, "Configuration error");
            }
            return Err(e.into());
        }
    };
    if let Some(path) = cli.db_path {
        config.db_path = path;
    }

    match command {
        Commands::Run { console } => run(config, console).await,
        Commands::Positions => print_positions(&config).await,
        Commands::Balance => print_balances(&config).await,
        Commands::Checkpoints => print_checkpoints(&config).await,
        Commands::ClearCheckpoint { wallet } => clear_checkpoint(&config, &wallet).await,
    }
}

/// `RUST_LOG` wins over `LOG_LEVEL`; both default to `info`.
fn init_tracing(json: bool) {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .init();
    }
}

async fn open_database(config: &AppConfig) -> Result<Database> {
    let db = Database::connect(&config.db_path)
        .await
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    db.migrate().await.context("running migrations")?;
    Ok(db)
}

async fn run(config: AppConfig, console: bool) -> Result<()> {
    let db = open_database(&config).await?;
    let provider = HyperliquidProvider::new(&config.info_url)?;

    let notifier: Box<dyn Notifier> = match (&config.telegram, console) {
        (Some(telegram), false) => Box::new(TelegramNotifier::new(
            &telegram.bot_token,
            &telegram.chat_id,
        )?),
        _ => {
            info!("Notifications go to the log");
            Box::new(ConsoleNotifier)
        }
    };
    let (notifications, rx) = notification_channel(QUEUE_CAPACITY);
    let dispatcher = tokio::spawn(NotificationDispatcher::new(notifier, rx).run());

    let shutdown = CancellationToken::new();
    let ctx = MonitorContext {
        config: Arc::new(config.monitor.clone()),
        provider: Arc::new(provider),
        store: Arc::new(db.checkpoints()),
        notifications: notifications.clone(),
        shutdown: shutdown.clone(),
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        wallets = config.wallets.len(),
        db = %config.db_path.display(),
        "Starting hl-watch"
    );
    notifications
        .send(Notification::plain(format::startup(&config.wallets)))
        .await;
    drop(notifications);

    let mut supervisor = Supervisor::new(ctx);
    for wallet in &config.wallets {
        supervisor.spawn_wallet(wallet.clone());
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => warn!(error = %e, "Cannot listen for Ctrl-C, shutting down"),
    }
    shutdown.cancel();
    supervisor.join().await;

    let stats = dispatcher.await.context("notification dispatcher panicked")?;
    db.pool().close().await;
    info!(
        delivered = stats.delivered,
        failed = stats.failed,
        "hl-watch stopped"
    );
    Ok(())
}

async fn print_positions(config: &AppConfig) -> Result<()> {
    let provider = HyperliquidProvider::new(&config.info_url)?;
    for wallet in &config.wallets {
        match provider.fetch_positions(wallet).await {
            Ok(snapshot) => {
                println!(
                    "{}\n",
                    format::to_plain_text(&format::position_summary(wallet, &snapshot))
                );
            }
            Err(e) => println!("❌ {}: {e}\n", format::short_wallet(wallet)),
        }
    }
    Ok(())
}

async fn print_balances(config: &AppConfig) -> Result<()> {
    let provider = HyperliquidProvider::new(&config.info_url)?;
    for wallet in &config.wallets {
        match provider.fetch_account_summary(wallet).await {
            Ok(summary) => {
                println!(
                    "{}\n",
                    format::to_plain_text(&format::balance(wallet, &summary))
                );
            }
            Err(e) => println!("❌ {}: {e}\n", format::short_wallet(wallet)),
        }
    }
    Ok(())
}

async fn print_checkpoints(config: &AppConfig) -> Result<()> {
    let db = open_database(config).await?;
    let repository = db.checkpoints();
    let wallets = repository.wallets().await?;
    if wallets.is_empty() {
        println!("No checkpoints stored in {}", config.db_path.display());
        return Ok(());
    }

    println!("{:<44} | {:<20} | {:>9}", "Wallet", "Saved at", "Positions");
    println!("{}", "-".repeat(79));
    for wallet in wallets {
        if let Some(checkpoint) = repository.load_checkpoint(&wallet).await? {
            println!(
                "{:<44} | {:<20} | {:>9}",
                checkpoint.wallet,
                checkpoint.saved_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                checkpoint.snapshot.len()
            );
        }
    }
    Ok(())
}

async fn clear_checkpoint(config: &AppConfig, wallet: &str) -> Result<()> {
    let db = open_database(config).await?;
    if db.checkpoints().delete(wallet).await? {
        println!("🧹 Cleared checkpoint for {}", format::short_wallet(wallet));
    } else {
        println!("No checkpoint stored for {}", format::short_wallet(wallet));
    }
    Ok(())
}
