//! Rate-limit usage tracking from Binance response headers
//!
//! Binance reports request weight and order count for the current minute on
//! every response. The tracker keeps one counter per bucket.
//!
//! A reported zero resets a counter; any other report stores
//! `reported - stored`. The counters are therefore deltas between
//! consecutive observations, not per-minute totals.

use crate::http::HttpResponse;
use perpbot_core::log_rate_limit;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

/// Request weight used in the current minute
pub const USED_WEIGHT_HEADER: &str = "x-mbx-used-weight-1m";

/// Orders placed in the current minute
pub const ORDER_COUNT_HEADER: &str = "x-mbx-order-count-1m";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitState {
    pub current_request_usage: i64,
    pub current_order_usage: i64,
}

/// Thread-safe rate-limit counters, updated after every response
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    state: Mutex<RateLimitState>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one pair of reported usages into the counters
    pub fn update(&self, reported_request_usage: i64, reported_order_usage: i64) -> RateLimitState {
        let mut state = self.lock();
        state.current_request_usage = fold(state.current_request_usage, reported_request_usage);
        state.current_order_usage = fold(state.current_order_usage, reported_order_usage);

        log_rate_limit!(state.current_request_usage, state.current_order_usage);
        *state
    }

    /// Read the usage headers of `response`; absent or unparsable headers count as zero
    pub fn observe(&self, response: &HttpResponse) -> RateLimitState {
        let request_usage = header_usage(response, USED_WEIGHT_HEADER);
        let order_usage = header_usage(response, ORDER_COUNT_HEADER);
        self.update(request_usage, order_usage)
    }

    pub fn snapshot(&self) -> RateLimitState {
        *self.lock()
    }

    pub fn current_request_usage(&self) -> i64 {
        self.lock().current_request_usage
    }

    pub fn current_order_usage(&self) -> i64 {
        self.lock().current_order_usage
    }

    fn lock(&self) -> MutexGuard<'_, RateLimitState> {
        // Counters stay meaningful even if a holder panicked.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn fold(stored: i64, reported: i64) -> i64 {
    if reported == 0 {
        0
    } else {
        reported - stored
    }
}

fn header_usage(response: &HttpResponse, name: &str) -> i64 {
    response
        .header(name)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}
