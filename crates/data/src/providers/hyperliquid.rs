//! Hyperliquid info endpoint client.

use crate::SnapshotProvider;
use crate::error::FetchError;
use async_trait::async_trait;
use hl_watch_domain::{Position, PositionSnapshot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Public mainnet info endpoint.
pub const DEFAULT_INFO_URL: &str = "https://api.hyperliquid.xyz/info";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct InfoRequest<'a> {
    #[serde(rename = "type")]
    request_type: &'a str,
    user: &'a str,
}

/// Response of the `clearinghouseState` info request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearinghouseState {
    #[serde(default)]
    pub asset_positions: Vec<AssetPosition>,
    #[serde(default)]
    pub margin_summary: Option<MarginSummary>,
    #[serde(default)]
    pub withdrawable: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetPosition {
    pub position: WirePosition,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePosition {
    pub coin: String,
    pub szi: Decimal,
    #[serde(default)]
    pub entry_px: Option<Decimal>,
    #[serde(default)]
    pub leverage: Option<WireLeverage>,
    #[serde(default)]
    pub unrealized_pnl: Option<Decimal>,
    #[serde(default)]
    pub return_on_equity: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireLeverage {
    #[serde(default)]
    pub value: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginSummary {
    pub account_value: Decimal,
    pub total_ntl_pos: Decimal,
    pub total_margin_used: Decimal,
}

/// Account-level balance figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub account_value: Decimal,
    pub total_notional_position: Decimal,
    pub total_margin_used: Decimal,
    pub withdrawable: Decimal,
}

impl ClearinghouseState {
    /// Parses a raw response body.
    ///
    /// # Errors
    /// Returns [`FetchError::Decode`] if the body is not a clearinghouse state.
    pub fn from_body(body: &str) -> Result<Self, FetchError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Materializes the open positions; zero-size entries are dropped.
    pub fn to_snapshot(&self) -> PositionSnapshot {
        self.asset_positions
            .iter()
            .filter_map(|item| {
                let p = &item.position;
                Position::from_signed_size(
                    p.coin.clone(),
                    p.szi,
                    p.entry_px.unwrap_or_default(),
                    p.leverage
                        .as_ref()
                        .and_then(|l| l.value)
                        .unwrap_or_default(),
                    p.unrealized_pnl.unwrap_or_default(),
                    p.return_on_equity.unwrap_or_default(),
                )
            })
            .collect()
    }

    pub fn account_summary(&self) -> AccountSummary {
        let margin = self.margin_summary.as_ref();
        AccountSummary {
            account_value: margin.map(|m| m.account_value).unwrap_or_default(),
            total_notional_position: margin.map(|m| m.total_ntl_pos).unwrap_or_default(),
            total_margin_used: margin.map(|m| m.total_margin_used).unwrap_or_default(),
            withdrawable: self.withdrawable.unwrap_or_default(),
        }
    }
}

/// Client for the Hyperliquid `info` endpoint.
#[derive(Debug, Clone)]
pub struct HyperliquidProvider {
    client: reqwest::Client,
    info_url: String,
}

impl HyperliquidProvider {
    /// Creates a provider with its own HTTP client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(info_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, info_url))
    }

    /// Creates a provider sharing an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, info_url: impl Into<String>) -> Self {
        Self {
            client,
            info_url: info_url.into(),
        }
    }

    /// Fetches the full clearinghouse state for a wallet.
    ///
    /// # Errors
    /// Transport failures, non-success statuses and undecodable bodies.
    pub async fn fetch_clearinghouse_state(
        &self,
        wallet: &str,
    ) -> Result<ClearinghouseState, FetchError> {
        let wallet = wallet.trim();
        if wallet.is_empty() {
            return Err(FetchError::InvalidWallet);
        }

        let response = self
            .client
            .post(&self.info_url)
            .json(&InfoRequest {
                request_type: "clearinghouseState",
                user: wallet,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let state = ClearinghouseState::from_body(&body)?;
        debug!(
            wallet = wallet,
            entries = state.asset_positions.len(),
            "Fetched clearinghouse state"
        );
        Ok(state)
    }

    /// Fetches the wallet's balance figures.
    ///
    /// # Errors
    /// Same as [`HyperliquidProvider::fetch_clearinghouse_state`].
    pub async fn fetch_account_summary(&self, wallet: &str) -> Result<AccountSummary, FetchError> {
        Ok(self.fetch_clearinghouse_state(wallet).await?.account_summary())
    }
}

#[async_trait]
impl SnapshotProvider for HyperliquidProvider {
    async fn fetch_positions(&self, wallet: &str) -> Result<PositionSnapshot, FetchError> {
        Ok(self.fetch_clearinghouse_state(wallet).await?.to_snapshot())
    }
}
