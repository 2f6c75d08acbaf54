//! # perpbot core
//!
//! Shared building blocks for the perpbot exchange adapters.
//!
//! 1. **Fixed-point arithmetic** - exact decimal money math on `rust_decimal`
//! 2. **Clocks and timing** - epoch-millisecond clocks that tests can freeze
//! 3. **Unified logging** - `tracing` with an env-filtered subscriber
//! 4. **Client order ids** - nanoid-based ids within exchange limits

pub mod fixed;
pub mod id_gen;
pub mod logging;
pub mod timing;

pub use fixed::{Fixed, FixedError};
pub use id_gen::{ClientOrderId, generate_id, generate_id_with_prefix};
pub use logging::{LogLevel, init_logging, init_logging_with_level};
pub use timing::{Clock, FixedClock, PerfTimer, SystemClock, Timestamp, millis, nanos};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixed::{Fixed, FixedError};
    pub use crate::id_gen::{ClientOrderId, generate_id, generate_id_with_prefix};
    pub use crate::logging::{LogLevel, init_logging, init_logging_with_level};
    pub use crate::timing::{Clock, FixedClock, PerfTimer, SystemClock, Timestamp, millis, nanos};

    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
}
