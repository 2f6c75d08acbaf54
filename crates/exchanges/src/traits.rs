//! Exchange traits defining common interfaces
//!
//! Strategies depend on [`ExchangeCapability`] only; endpoint paths, API
//! versions and signing stay inside each adapter.

use crate::binance::rate_limit::RateLimitState;
use crate::errors::Result;
use crate::types::{Candle, OrderRequest, PositionSide};
use async_trait::async_trait;
use perpbot_core::Fixed;
use serde_json::Value;

/// Capability surface of a perpetual-futures exchange
///
/// Results the exchange defines (orders, positions, account data) pass
/// through as JSON untouched. Futures are `?Send`: adapters run on a
/// thread-per-core runtime.
#[async_trait(?Send)]
pub trait ExchangeCapability {
    /// Get exchange name
    fn name(&self) -> &str;

    /// Symbols, filters and trading rules
    async fn exchange_info(&self) -> Result<Value>;

    /// Balances, margins and positions of the account
    async fn account_information(&self) -> Result<Value>;

    /// 24h rolling statistics for a symbol
    async fn statistics_ticker(&self, symbol: &str) -> Result<Value>;

    /// Place a new order
    async fn create_order(&self, order: OrderRequest) -> Result<Value>;

    /// Cancel an order by exchange id
    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<Value>;

    /// Get order status by exchange id
    async fn order(&self, symbol: &str, order_id: u64) -> Result<Value>;

    /// Get order status by client order id
    async fn order_by_client_id(&self, symbol: &str, client_order_id: &str) -> Result<Value>;

    /// Recent orders of a symbol, any status
    async fn orders(&self, symbol: &str) -> Result<Value>;

    async fn open_orders(&self, symbol: &str) -> Result<Value>;

    /// Top of the order book
    async fn book(&self, symbol: &str) -> Result<Value>;

    /// Candles for a symbol, oldest first
    async fn candles(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>>;

    async fn position(&self, symbol: &str) -> Result<Value>;

    /// Close the whole `side` position with a trigger order at `price`
    ///
    /// `stop` selects a stop-loss trigger, otherwise a take-profit trigger.
    /// Only [`PositionSide::Long`] closes with a sell; every other side buys.
    /// Raw exchange strings go through [`PositionSide::from_raw`], which
    /// keeps that rule for unrecognized text.
    async fn close_position(
        &self,
        symbol: &str,
        side: PositionSide,
        price: Fixed,
        stop: bool,
    ) -> Result<Value>;

    /// Realized PnL income history of a symbol
    async fn realized_pnl(&self, symbol: &str) -> Result<Value>;

    /// Usage counters as of the last response
    fn rate_limit(&self) -> RateLimitState;
}
