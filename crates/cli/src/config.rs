//! Application configuration, read once from the environment.

use hl_watch_data::providers::DEFAULT_INFO_URL;
use hl_watch_execution::monitor::{MonitorConfig, RetryConfig};
use hl_watch_execution::sync::{BackoffConfig, DEFAULT_WS_URL, StreamConfig};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const TOKEN_PLACEHOLDER: &str = "your_bot_token_here";
const CHAT_ID_PLACEHOLDER: &str = "your_chat_id_here";

/// Every problem found while reading the configuration.
#[derive(Error, Debug)]
#[error("invalid configuration: {}", .problems.join("; "))]
pub struct ConfigError {
    pub problems: Vec<String>,
}

/// Which settings the chosen command cannot run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirements {
    pub wallets: bool,
    pub telegram: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: String,
}

/// Immutable configuration handed to the rest of the program.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub wallets: Vec<String>,
    pub telegram: Option<TelegramSettings>,
    pub info_url: String,
    pub db_path: PathBuf,
    pub monitor: MonitorConfig,
}

impl AppConfig {
    /// Reads the process environment.
    ///
    /// # Errors
    /// Returns every missing or malformed setting at once.
    pub fn from_env(requirements: Requirements) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), requirements)
    }

    /// Reads settings through `lookup`. Blank values count as unset.
    ///
    /// # Errors
    /// Returns every missing or malformed setting at once.
    pub fn from_lookup<F>(lookup: F, requirements: Requirements) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut problems = Vec::new();

        let wallets = get("WALLET_ADDRESSES")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|w| !w.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty())
            .or_else(|| get("WALLET_ADDRESS").map(|single| vec![single]))
            .unwrap_or_default();
        if requirements.wallets && wallets.is_empty() {
            problems.push("WALLET_ADDRESS or WALLET_ADDRESSES is not set".to_string());
        }

        let bot_token = get("TELEGRAM_BOT_TOKEN").filter(|v| v != TOKEN_PLACEHOLDER);
        let chat_id = get("TELEGRAM_CHAT_ID").filter(|v| v != CHAT_ID_PLACEHOLDER);
        if requirements.telegram {
            if bot_token.is_none() {
                problems.push("TELEGRAM_BOT_TOKEN is not set".to_string());
            }
            if chat_id.is_none() {
                problems.push("TELEGRAM_CHAT_ID is not set".to_string());
            }
        }
        let telegram = match (bot_token, chat_id) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramSettings { bot_token, chat_id }),
            _ => None,
        };

        let ping_interval = seconds(&get, "PING_INTERVAL", 50.0, &mut problems);
        let base_delay = seconds(&get, "RECONNECT_BASE_DELAY", 5.0, &mut problems);
        let max_delay = seconds(&get, "RECONNECT_MAX_DELAY", 300.0, &mut problems);
        if base_delay > max_delay {
            problems.push("RECONNECT_BASE_DELAY must not exceed RECONNECT_MAX_DELAY".to_string());
        }
        let alert_after_failures: u32 = number(&get, "ALERT_AFTER_FAILURES", 3, &mut problems);
        if alert_after_failures == 0 {
            problems.push("ALERT_AFTER_FAILURES must be at least 1".to_string());
        }
        let settle_ms: u64 = number(&get, "SETTLE_DELAY_MS", 1000, &mut problems);
        let fetch_attempts: u32 = number(&get, "FETCH_RETRY_ATTEMPTS", 3, &mut problems);
        if fetch_attempts == 0 {
            problems.push("FETCH_RETRY_ATTEMPTS must be at least 1".to_string());
        }

        if !problems.is_empty() {
            return Err(ConfigError { problems });
        }

        let defaults = MonitorConfig::default();
        Ok(Self {
            wallets,
            telegram,
            info_url: get("HL_INFO_URL").unwrap_or_else(|| DEFAULT_INFO_URL.to_string()),
            db_path: PathBuf::from(get("DB_PATH").unwrap_or_else(|| "state.db".to_string())),
            monitor: MonitorConfig {
                stream: StreamConfig {
                    ws_url: get("HL_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string()),
                    ping_interval,
                    backoff: BackoffConfig {
                        base_delay,
                        max_delay,
                        ..BackoffConfig::default()
                    },
                    alert_after_failures,
                },
                settle_delay: Duration::from_millis(settle_ms),
                fetch_retry: RetryConfig {
                    attempts: fetch_attempts,
                    ..defaults.fetch_retry
                },
                ..defaults
            },
        })
    }
}

fn number<T, G>(get: &G, key: &str, default: T, problems: &mut Vec<String>) -> T
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            problems.push(format!("{key} is not a valid number: {raw}"));
            default
        }),
    }
}

/// Positive, possibly fractional, number of seconds.
fn seconds<G>(get: &G, key: &str, default: f64, problems: &mut Vec<String>) -> Duration
where
    G: Fn(&str) -> Option<String>,
{
    let value: f64 = number(get, key, default, problems);
    match Duration::try_from_secs_f64(value) {
        Ok(duration) if !duration.is_zero() => duration,
        _ => {
            problems.push(format!("{key} must be a positive number of seconds"));
            Duration::from_secs_f64(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const RUN: Requirements = Requirements {
        wallets: true,
        telegram: true,
    };

    fn load(vars: &[(&str, &str)], requirements: Requirements) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned(), requirements)
    }

    fn base_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("WALLET_ADDRESS", "0xabc"),
            ("TELEGRAM_BOT_TOKEN", "123:token"),
            ("TELEGRAM_CHAT_ID", "42"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_vars(), RUN).unwrap();
        assert_eq!(config.wallets, vec!["0xabc"]);
        assert_eq!(config.info_url, DEFAULT_INFO_URL);
        assert_eq!(config.db_path, PathBuf::from("state.db"));
        assert_eq!(config.monitor.stream.ws_url, DEFAULT_WS_URL);
        assert_eq!(config.monitor.stream.ping_interval, Duration::from_secs(50));
        assert_eq!(config.monitor.stream.backoff.base_delay, Duration::from_secs(5));
        assert_eq!(config.monitor.stream.backoff.max_delay, Duration::from_secs(300));
        assert_eq!(config.monitor.stream.alert_after_failures, 3);
        assert_eq!(config.monitor.settle_delay, Duration::from_secs(1));
        assert_eq!(config.monitor.fetch_retry.attempts, 3);
        assert_eq!(
            config.telegram,
            Some(TelegramSettings {
                bot_token: "123:token".to_string(),
                chat_id: "42".to_string(),
            })
        );
    }

    #[test]
    fn test_wallet_list_takes_precedence() {
        let mut vars = base_vars();
        vars.push(("WALLET_ADDRESSES", " 0x1 , ,0x2,"));
        let config = load(&vars, RUN).unwrap();
        assert_eq!(config.wallets, vec!["0x1", "0x2"]);
    }

    #[test]
    fn test_overrides() {
        let mut vars = base_vars();
        vars.extend([
            ("PING_INTERVAL", "20"),
            ("RECONNECT_BASE_DELAY", "0.5"),
            ("RECONNECT_MAX_DELAY", "60"),
            ("SETTLE_DELAY_MS", "250"),
            ("DB_PATH", "/tmp/watch.db"),
            ("HL_WS_URL", "ws://localhost:9000/ws"),
        ]);
        let config = load(&vars, RUN).unwrap();
        assert_eq!(config.monitor.stream.ping_interval, Duration::from_secs(20));
        assert_eq!(
            config.monitor.stream.backoff.base_delay,
            Duration::from_millis(500)
        );
        assert_eq!(config.monitor.settle_delay, Duration::from_millis(250));
        assert_eq!(config.db_path, PathBuf::from("/tmp/watch.db"));
        assert_eq!(config.monitor.stream.ws_url, "ws://localhost:9000/ws");
    }

    #[test]
    fn test_collects_every_problem() {
        let vars = [
            ("TELEGRAM_BOT_TOKEN", "your_bot_token_here"),
            ("PING_INTERVAL", "soon"),
            ("RECONNECT_BASE_DELAY", "-1"),
        ];
        let err = load(&vars, RUN).unwrap_err();
        assert_eq!(err.problems.len(), 5, "{:?}", err.problems);
        assert!(err.problems.iter().any(|p| p.contains("WALLET_ADDRESS")));
        assert!(err.problems.iter().any(|p| p.contains("TELEGRAM_BOT_TOKEN")));
        assert!(err.problems.iter().any(|p| p.contains("TELEGRAM_CHAT_ID")));
        assert!(err.problems.iter().any(|p| p.contains("PING_INTERVAL")));
        assert!(err.problems.iter().any(|p| p.contains("RECONNECT_BASE_DELAY")));
    }

    #[test]
    fn test_console_mode_does_not_need_telegram() {
        let config = load(
            &[("WALLET_ADDRESS", "0xabc")],
            Requirements {
                wallets: true,
                telegram: false,
            },
        )
        .unwrap();
        assert!(config.telegram.is_none());
    }

    #[test]
    fn test_base_delay_above_max_is_rejected() {
        let mut vars = base_vars();
        vars.extend([("RECONNECT_BASE_DELAY", "600")]);
        let err = load(&vars, RUN).unwrap_err();
        assert_eq!(err.problems.len(), 1);
    }

    #[test]
    fn test_zero_counts_are_rejected() {
        let mut vars = base_vars();
        vars.extend([("ALERT_AFTER_FAILURES", "0"), ("FETCH_RETRY_ATTEMPTS", "0")]);
        let err = load(&vars, RUN).unwrap_err();
        assert_eq!(err.problems.len(), 2, "{:?}", err.problems);
        assert!(err.problems.iter().any(|p| p.contains("ALERT_AFTER_FAILURES")));
        assert!(err.problems.iter().any(|p| p.contains("FETCH_RETRY_ATTEMPTS")));
    }
}
