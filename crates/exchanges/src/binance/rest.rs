//! Binance USDⓈ-M futures REST client
//!
//! Every capability call follows the same path: endpoint parameters are
//! signed, sent through the transport, the rate-limit headers are folded
//! into the tracker, and the body is decoded. Non-2xx responses surface as
//! [`ExchangeError::HttpError`] with the raw body.

use crate::binance::auth::{BinanceCredentials, BinanceSigner, RECV_WINDOW_MS};
use crate::binance::rate_limit::{RateLimitState, RateLimitTracker};
use crate::errors::{ExchangeError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpTransport, MonoioHttpsClient, RequestParameters};
use crate::traits::ExchangeCapability;
use crate::types::{Candle, OrderRequest, OrderType, Payload, PositionSide};
use perpbot_core::prelude::*;
use perpbot_core::{log_error, log_order};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub const MAINNET_URL: &str = "https://fapi.binance.com";
pub const TESTNET_URL: &str = "https://testnet.binancefuture.com";

pub const PATH_V1: &str = "/fapi/v1";
pub const PATH_V2: &str = "/fapi/v2";

const API_KEY_HEADER: &str = "X-MBX-APIKEY";
const ORDERS_LIMIT: u32 = 100;
const BOOK_LIMIT: u32 = 5;
const CONTRACT_TYPE: &str = "PERPETUAL";
const REALIZED_PNL: &str = "REALIZED_PNL";

/// Binance futures configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinanceConfig {
    pub api_key: String,
    #[serde(skip_serializing)]
    pub api_secret: String,
    pub base_url: String,
    pub testnet: bool,
    pub timeout_ms: u64,
    pub recv_window_ms: u64,
    pub enable_timing: bool,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            base_url: MAINNET_URL.to_string(),
            testnet: false,
            timeout_ms: 5000,
            recv_window_ms: RECV_WINDOW_MS,
            enable_timing: true,
        }
    }
}

impl BinanceConfig {
    pub fn testnet() -> Self {
        Self {
            base_url: TESTNET_URL.to_string(),
            testnet: true,
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self.api_secret = api_secret.into();
        self
    }

    /// Take credentials from `BINANCE_API_KEY` and `BINANCE_SECRET_KEY`
    pub fn with_env_credentials(self) -> Result<Self> {
        let credentials = BinanceCredentials::from_env()?;
        Ok(self.with_credentials(credentials.api_key.clone(), credentials.secret_key()))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_recv_window_ms(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    pub fn with_timing(mut self, enable: bool) -> Self {
        self.enable_timing = enable;
        self
    }

    pub fn credentials(&self) -> BinanceCredentials {
        BinanceCredentials::new(self.api_key.clone(), self.api_secret.clone())
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ExchangeError::MissingCredentials("api_key".to_string()));
        }
        if self.api_secret.is_empty() {
            return Err(ExchangeError::MissingCredentials("api_secret".to_string()));
        }
        Url::parse(&self.base_url)?;
        if self.timeout_ms == 0 {
            return Err(ExchangeError::ConfigurationError(
                "timeout_ms must be positive".to_string(),
            ));
        }
        if self.recv_window_ms == 0 {
            return Err(ExchangeError::ConfigurationError(
                "recv_window_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Signed Binance futures client over any [`HttpTransport`]
pub struct BinanceFuturesClient<T: HttpTransport = MonoioHttpsClient> {
    config: BinanceConfig,
    signer: BinanceSigner,
    tracker: RateLimitTracker,
    transport: T,
    default_headers: Vec<(String, String)>,
}

impl BinanceFuturesClient<MonoioHttpsClient> {
    /// Create a client on the monoio HTTPS transport
    pub fn new(config: BinanceConfig) -> Result<Self> {
        config.validate()?;
        let transport =
            MonoioHttpsClient::new(&config.base_url, Duration::from_millis(config.timeout_ms))?;
        Self::with_transport(config, transport)
    }
}

impl<T: HttpTransport> BinanceFuturesClient<T> {
    pub fn with_transport(config: BinanceConfig, transport: T) -> Result<Self> {
        config.validate()?;
        let signer = BinanceSigner::new(config.credentials())?.with_recv_window(config.recv_window_ms);

        let default_headers = vec![
            (API_KEY_HEADER.to_string(), config.api_key.clone()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];

        info!("🔗 Binance futures client created");
        info!("   Base URL: {}", config.base_url);
        info!("   Testnet: {}", config.testnet);
        info!("   Timing: {}", config.enable_timing);

        Ok(Self {
            config,
            signer,
            tracker: RateLimitTracker::new(),
            transport,
            default_headers,
        })
    }

    /// Replace the clock used for request timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.signer = self.signer.with_clock(clock);
        self
    }

    pub fn config(&self) -> &BinanceConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn rate_limit_tracker(&self) -> &RateLimitTracker {
        &self.tracker
    }

    /// Sign and send one request, returning the decoded body
    ///
    /// The tracker sees every response, failed ones included.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        params: RequestParameters,
    ) -> Result<Payload> {
        let _timer = self
            .config
            .enable_timing
            .then(|| PerfTimer::start(format!("binance_{method}_{path}")));

        let query = self.signer.prepare(params)?;
        let request = HttpRequest {
            method,
            path: path.to_string(),
            query,
            headers: self.default_headers.clone(),
        };

        debug!("📡 {} {} (signed)", method, path);
        let operation = format!("{method} {path}");
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                log_error!(operation, e);
                return Err(e);
            }
        };
        self.tracker.observe(&response);

        if !response.is_success() {
            log_error!(operation, format!("HTTP {}", response.status));
            return Err(ExchangeError::HttpError(response.status, response.body));
        }

        let payload = Payload::decode(&response.body);
        if let Payload::Malformed { error, .. } = &payload {
            warn!("⚠️ {} {} returned an undecodable body: {}", method, path, error);
        }
        Ok(payload)
    }

    async fn fetch(&self, method: HttpMethod, path: &str, params: RequestParameters) -> Result<Value> {
        Ok(self.request(method, path, params).await?.into_value())
    }
}

fn v1(endpoint: &str) -> String {
    format!("{PATH_V1}/{endpoint}")
}

fn v2(endpoint: &str) -> String {
    format!("{PATH_V2}/{endpoint}")
}

fn symbol_params(symbol: &str) -> RequestParameters {
    RequestParameters::new().with("symbol", symbol)
}

/// Reshape kline rows into candles, skipping rows that do not parse
fn candles_from_value(value: Value) -> Vec<Candle> {
    let Value::Array(rows) = value else {
        warn!("⚠️ kline response is not an array");
        return Vec::new();
    };

    let mut candles = Vec::with_capacity(rows.len());
    for row in rows {
        let parsed = match row.as_array() {
            Some(fields) => Candle::from_row(fields),
            None => Err(ExchangeError::InvalidResponse(format!("kline row is not an array: {row}"))),
        };
        match parsed {
            Ok(candle) => candles.push(candle),
            Err(e) => warn!("⚠️ skipping kline row: {}", e),
        }
    }
    candles
}

#[async_trait(?Send)]
impl<T: HttpTransport> ExchangeCapability for BinanceFuturesClient<T> {
    fn name(&self) -> &str {
        "binance"
    }

    async fn exchange_info(&self) -> Result<Value> {
        self.fetch(HttpMethod::Get, &v1("exchangeInfo"), RequestParameters::new())
            .await
    }

    async fn account_information(&self) -> Result<Value> {
        self.fetch(HttpMethod::Get, &v2("account"), RequestParameters::new())
            .await
    }

    async fn statistics_ticker(&self, symbol: &str) -> Result<Value> {
        self.fetch(HttpMethod::Get, &v1("ticker/24hr"), symbol_params(symbol))
            .await
    }

    async fn create_order(&self, order: OrderRequest) -> Result<Value> {
        let detail = format!("{} {}", order.side, order.order_type);
        let symbol = order.symbol.clone();
        let params = order.into_parameters()?;

        let response = self.fetch(HttpMethod::Post, &v1("order"), params).await?;
        log_order!("PLACED", symbol, detail);
        Ok(response)
    }

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<Value> {
        let params = symbol_params(symbol).with("orderId", order_id);
        let response = self.fetch(HttpMethod::Delete, &v1("order"), params).await?;
        log_order!("CANCELED", symbol, order_id);
        Ok(response)
    }

    async fn order(&self, symbol: &str, order_id: u64) -> Result<Value> {
        let params = symbol_params(symbol).with("orderId", order_id);
        self.fetch(HttpMethod::Get, &v1("order"), params).await
    }

    async fn order_by_client_id(&self, symbol: &str, client_order_id: &str) -> Result<Value> {
        let params = symbol_params(symbol).with("origClientOrderId", client_order_id);
        self.fetch(HttpMethod::Get, &v1("order"), params).await
    }

    async fn orders(&self, symbol: &str) -> Result<Value> {
        let params = symbol_params(symbol).with("limit", ORDERS_LIMIT);
        self.fetch(HttpMethod::Get, &v1("allOrders"), params).await
    }

    async fn open_orders(&self, symbol: &str) -> Result<Value> {
        self.fetch(HttpMethod::Get, &v1("openOrders"), symbol_params(symbol))
            .await
    }

    async fn book(&self, symbol: &str) -> Result<Value> {
        let params = symbol_params(symbol).with("limit", BOOK_LIMIT);
        self.fetch(HttpMethod::Get, &v1("depth"), params).await
    }

    async fn candles(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>> {
        let params = RequestParameters::new()
            .with("pair", symbol)
            .with("contractType", CONTRACT_TYPE)
            .with("interval", interval)
            .with("limit", limit);

        let value = self
            .fetch(HttpMethod::Get, &v1("continuousKlines"), params)
            .await?;
        Ok(candles_from_value(value))
    }

    async fn position(&self, symbol: &str) -> Result<Value> {
        self.fetch(HttpMethod::Get, &v2("positionRisk"), symbol_params(symbol))
            .await
    }

    async fn close_position(
        &self,
        symbol: &str,
        side: PositionSide,
        price: Fixed,
        stop: bool,
    ) -> Result<Value> {
        let order_type = if stop {
            OrderType::StopMarket
        } else {
            OrderType::TakeProfitMarket
        };
        let order = OrderRequest::close_position(symbol, side.closing_side(), order_type, price);
        self.create_order(order).await
    }

    async fn realized_pnl(&self, symbol: &str) -> Result<Value> {
        let params = symbol_params(symbol).with("incomeType", REALIZED_PNL);
        self.fetch(HttpMethod::Get, &v1("income"), params).await
    }

    fn rate_limit(&self) -> RateLimitState {
        self.tracker.snapshot()
    }
}
