//! Exchange-specific error types
//!
//! Transport failures and non-2xx responses are surfaced unchanged. The core
//! never retries; [`ExchangeError::api_code`] lets callers inspect the
//! exchange's own `{"code": .., "msg": ..}` rejection.

use thiserror::Error;

/// Result type for exchange operations
pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Exchange operation errors
#[derive(Error, Debug, Clone)]
pub enum ExchangeError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error {0}: {1}")]
    HttpError(u16, String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Signing error: {0}")]
    SigningError(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Fixed point error: {0}")]
    FixedPointError(String),
}

impl ExchangeError {
    /// Exchange error code carried in an HTTP error body, if any
    pub fn api_code(&self) -> Option<i64> {
        match self {
            Self::HttpError(_, body) => serde_json::from_str::<serde_json::Value>(body)
                .ok()?
                .get("code")?
                .as_i64(),
            _ => None,
        }
    }

    /// Exchange error message carried in an HTTP error body, if any
    pub fn api_message(&self) -> Option<String> {
        match self {
            Self::HttpError(_, body) => serde_json::from_str::<serde_json::Value>(body)
                .ok()?
                .get("msg")?
                .as_str()
                .map(str::to_string),
            _ => None,
        }
    }

    /// True for rejections caused by the key, signature or timestamp
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self.api_code().map(ErrorCode::from),
            Some(
                ErrorCode::InvalidTimestamp
                    | ErrorCode::InvalidSignature
                    | ErrorCode::RejectedMbxKey
                    | ErrorCode::InvalidApiKey
            )
        ) || matches!(self, Self::HttpError(401, _))
    }
}

impl From<perpbot_core::fixed::FixedError> for ExchangeError {
    fn from(err: perpbot_core::fixed::FixedError) -> Self {
        Self::FixedPointError(err.to_string())
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<url::ParseError> for ExchangeError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

/// Binance error codes the adapter knows by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Unknown,
    Disconnected,
    TooManyRequests,
    InvalidTimestamp,
    InvalidSignature,
    BadSymbol,
    RejectedMbxKey,
    NoSuchOrder,
    InvalidApiKey,
    InsufficientMargin,
    ReduceOnlyRejected,
}

impl From<i64> for ErrorCode {
    fn from(code: i64) -> Self {
        match code {
            -1001 => ErrorCode::Disconnected,
            -1003 => ErrorCode::TooManyRequests,
            -1021 => ErrorCode::InvalidTimestamp,
            -1022 => ErrorCode::InvalidSignature,
            -1121 => ErrorCode::BadSymbol,
            -2014 => ErrorCode::RejectedMbxKey,
            -2013 => ErrorCode::NoSuchOrder,
            -2015 => ErrorCode::InvalidApiKey,
            -2019 => ErrorCode::InsufficientMargin,
            -2022 => ErrorCode::ReduceOnlyRejected,
            _ => ErrorCode::Unknown,
        }
    }
}
