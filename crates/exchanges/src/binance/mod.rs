//! Binance USDⓈ-M perpetual futures integration
//!
//! [`BinanceFuturesClient`] composes the request signer, the rate-limit
//! tracker and an [`HttpTransport`](crate::http::HttpTransport) behind the
//! [`ExchangeCapability`](crate::traits::ExchangeCapability) trait.

pub mod auth;
pub mod rate_limit;
pub mod rest;

pub use auth::{BinanceCredentials, BinanceSigner, RECV_WINDOW_MS};
pub use rate_limit::{RateLimitState, RateLimitTracker};
pub use rest::{BinanceConfig, BinanceFuturesClient, MAINNET_URL, TESTNET_URL};
