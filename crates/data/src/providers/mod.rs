//! Venue data providers.

mod hyperliquid;

pub use hyperliquid::{
    AccountSummary, AssetPosition, ClearinghouseState, DEFAULT_INFO_URL, HyperliquidProvider,
    MarginSummary, WireLeverage, WirePosition,
};
