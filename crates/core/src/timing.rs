//! Timestamps, clocks and latency measurement
//!
//! Exchange requests are stamped in epoch milliseconds. The [`Clock`] trait
//! lets signing and order-expiry checks run against a fixed instant in tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// High-precision timestamp type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    /// Nanoseconds since Unix epoch
    pub nanos: u64,
}

impl Timestamp {
    pub fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self {
            nanos: millis.saturating_mul(1_000_000),
        }
    }

    pub fn now() -> Self {
        Self { nanos: nanos() }
    }

    pub fn as_millis(&self) -> u64 {
        self.nanos / 1_000_000
    }

    /// Convert to chrono DateTime<Utc>
    pub fn to_datetime(&self) -> DateTime<Utc> {
        let secs = self.nanos / 1_000_000_000;
        let nsecs = (self.nanos % 1_000_000_000) as u32;
        DateTime::from_timestamp(secs as i64, nsecs).unwrap_or_else(Utc::now)
    }

    pub fn elapsed_nanos(&self) -> u64 {
        nanos().saturating_sub(self.nanos)
    }

    pub fn elapsed_micros(&self) -> u64 {
        self.elapsed_nanos() / 1_000
    }

    pub fn elapsed_millis(&self) -> u64 {
        self.elapsed_nanos() / 1_000_000
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        let nanos = dt.timestamp() as u64 * 1_000_000_000 + dt.timestamp_subsec_nanos() as u64;
        Self { nanos }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_datetime().format("%Y-%m-%d %H:%M:%S%.3f UTC"))
    }
}

/// Wall-clock nanoseconds since the Unix epoch
#[inline]
pub fn nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Wall-clock milliseconds since the Unix epoch
#[inline]
pub fn millis() -> u64 {
    nanos() / 1_000_000
}

/// Source of "now" in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// The system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        millis()
    }
}

/// A clock frozen at a settable instant
#[derive(Debug, Default)]
pub struct FixedClock {
    millis: AtomicU64,
}

impl FixedClock {
    pub fn new(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_millis: u64) {
        self.millis.fetch_add(delta_millis, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Logs how long a named operation took when dropped
pub struct PerfTimer {
    start: Timestamp,
    name: String,
}

impl PerfTimer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Timestamp::now(),
            name: name.into(),
        }
    }

    pub fn elapsed_micros(&self) -> u64 {
        self.start.elapsed_micros()
    }

    pub fn log_elapsed(&self) {
        let micros = self.elapsed_micros();
        crate::log_latency!(self.name, micros);
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        self.log_elapsed();
    }
}
