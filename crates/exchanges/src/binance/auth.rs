//! Binance authentication and request signing
//!
//! Every authenticated request carries exactly one `timestamp`, one
//! `recvWindow` and one `signature`. The signature is the lowercase hex
//! HMAC-SHA256 of the canonical query over all other parameters.

use crate::errors::{ExchangeError, Result};
use crate::http::RequestParameters;
use perpbot_core::prelude::*;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Default validity window the exchange grants a signed request
pub const RECV_WINDOW_MS: u64 = 60_000;

pub const API_KEY_ENV: &str = "BINANCE_API_KEY";
pub const SECRET_KEY_ENV: &str = "BINANCE_SECRET_KEY";

/// Binance API credentials
#[derive(Clone, PartialEq, Eq)]
pub struct BinanceCredentials {
    pub api_key: String,
    secret_key: String,
}

impl BinanceCredentials {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Load credentials from `BINANCE_API_KEY` and `BINANCE_SECRET_KEY`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| ExchangeError::MissingCredentials(API_KEY_ENV.to_string()))?;
        let secret_key = std::env::var(SECRET_KEY_ENV)
            .map_err(|_| ExchangeError::MissingCredentials(SECRET_KEY_ENV.to_string()))?;

        Ok(Self::new(api_key, secret_key))
    }

    pub(crate) fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// Both halves present
    pub fn is_valid(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty()
    }
}

impl fmt::Debug for BinanceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinanceCredentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Stamps and signs request parameters
///
/// Stateless apart from the clock it reads, so one signer can serve any
/// number of concurrent requests.
pub struct BinanceSigner {
    credentials: BinanceCredentials,
    clock: Arc<dyn Clock>,
    recv_window_ms: u64,
}

impl BinanceSigner {
    /// Create a signer on the system clock; empty credentials are rejected
    pub fn new(credentials: BinanceCredentials) -> Result<Self> {
        if !credentials.is_valid() {
            return Err(ExchangeError::InvalidCredentials);
        }

        Ok(Self {
            credentials,
            clock: Arc::new(SystemClock),
            recv_window_ms: RECV_WINDOW_MS,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.credentials.api_key
    }

    pub fn recv_window_ms(&self) -> u64 {
        self.recv_window_ms
    }

    /// Add `timestamp` and `recvWindow`, then sign the canonical query
    ///
    /// Caller-supplied `timestamp`/`recvWindow` entries are overwritten.
    pub fn prepare(&self, mut params: RequestParameters) -> Result<RequestParameters> {
        let timestamp = self.clock.now_millis();
        params.insert("timestamp", timestamp);
        params.insert("recvWindow", self.recv_window_ms);

        let payload = params.canonical_query();
        let signature = self.sign_payload(&payload)?;
        params.set_signature(signature);

        debug!("🔐 Signed request at {} ({} params)", timestamp, params.len());
        Ok(params)
    }

    /// Lowercase hex HMAC-SHA256 of `payload` under the secret key
    pub fn sign_payload(&self, payload: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.credentials.secret_key.as_bytes())
            .map_err(|e| ExchangeError::SigningError(format!("HMAC setup failed: {e}")))?;

        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check a signature against `payload`
    pub fn verify(&self, payload: &str, signature: &str) -> bool {
        match self.sign_payload(payload) {
            Ok(expected) => expected == signature,
            Err(_) => false,
        }
    }
}
