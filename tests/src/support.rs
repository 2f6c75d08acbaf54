//! Shared fixtures for the integration tests: a scripted transport and
//! sample exchange payloads.

#![allow(dead_code)]

use async_trait::async_trait;
use perpbot_exchanges::prelude::*;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

pub const TEST_API_KEY: &str = "test_api_key";
pub const TEST_SECRET_KEY: &str = "test_secret_key";
pub const FIXED_NOW_MS: u64 = 1_700_000_000_000;

/// Records every request and answers from a queue; an empty queue answers `{}`
#[derive(Default)]
pub struct ScriptedTransport {
    pub requests: RefCell<Vec<HttpRequest>>,
    responses: RefCell<VecDeque<Result<HttpResponse>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(self, body: impl Into<String>) -> Self {
        self.reply(200, body, &[])
    }

    pub fn reply(self, status: u16, body: impl Into<String>, headers: &[(&str, &str)]) -> Self {
        self.responses.borrow_mut().push_back(Ok(HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.into(),
        }));
        self
    }

    pub fn fail(self, error: ExchangeError) -> Self {
        self.responses.borrow_mut().push_back(Err(error));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests
            .borrow()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

#[async_trait(?Send)]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.borrow_mut().push(request);
        self.responses.borrow_mut().pop_front().unwrap_or_else(|| {
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: "{}".to_string(),
            })
        })
    }
}

pub fn test_config() -> BinanceConfig {
    BinanceConfig::testnet()
        .with_credentials(TEST_API_KEY, TEST_SECRET_KEY)
        .with_timing(false)
}

pub fn client_with(transport: ScriptedTransport) -> BinanceFuturesClient<ScriptedTransport> {
    BinanceFuturesClient::with_transport(test_config(), transport)
        .expect("valid test config")
        .with_clock(Arc::new(FixedClock::new(FIXED_NOW_MS)))
}

/// One continuous-kline row as the exchange sends it
pub fn kline_row(open_time: u64, open: &str, high: &str, low: &str, close: &str) -> Value {
    json!([
        open_time,
        open,
        high,
        low,
        close,
        "125.300",
        open_time + 59_999,
        "5640012.55",
        1520,
        "61.200",
        "2754812.10",
        "0"
    ])
}

pub fn sample_klines() -> Value {
    json!([
        kline_row(1_700_000_000_000, "45000.00", "45120.50", "44980.00", "45100.10"),
        kline_row(1_700_000_060_000, "45100.10", "45200.00", "45050.00", "45180.00"),
        kline_row(1_700_000_120_000, "45180.00", "45190.00", "44900.00", "44950.25"),
    ])
}

pub fn sample_position() -> Value {
    json!([{
        "symbol": "BTCUSDT",
        "positionAmt": "0.010",
        "entryPrice": "45000.0",
        "markPrice": "45180.0",
        "unRealizedProfit": "1.80000000",
        "leverage": "10",
        "positionSide": "BOTH"
    }])
}
