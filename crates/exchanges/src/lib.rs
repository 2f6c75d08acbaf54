//! # perpbot exchange integrations
//!
//! Signed REST access to perpetual-futures exchanges, currently Binance
//! USDⓈ-M futures.
//!
//! ## Architecture
//!
//! - **monoio-based HTTPS transport** behind the [`http::HttpTransport`] trait
//! - **HMAC-SHA256 signing** over one canonical query encoding
//! - **Rate-limit tracking** from exchange response headers
//! - **Fixed-point arithmetic** for prices, quantities and trading math
//! - **Unified interface** through [`traits::ExchangeCapability`]

pub mod binance;
pub mod errors;
pub mod http;
pub mod trading_math;
pub mod traits;
pub mod types;

// Re-export main types
pub use binance::{BinanceConfig, BinanceFuturesClient};
pub use errors::{ExchangeError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, MonoioHttpsClient, RequestParameters};
pub use traits::ExchangeCapability;
pub use types::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::binance::{
        BinanceConfig, BinanceCredentials, BinanceFuturesClient, BinanceSigner, RateLimitState,
        RateLimitTracker,
    };
    pub use crate::errors::{ExchangeError, Result};
    pub use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, MonoioHttpsClient, RequestParameters};
    pub use crate::trading_math;
    pub use crate::traits::ExchangeCapability;
    pub use crate::types::*;
    pub use perpbot_core::prelude::*;
}
