//! Trading helper math
//!
//! Pure functions shared by strategies regardless of exchange. All arithmetic
//! is decimal: intermediates are truncated to a fixed scale and final
//! results rounded half away from zero.

use crate::types::{Candle, CandleField};
use perpbot_core::{Fixed, millis};
use serde_json::Value;

/// Scale kept for the difference and ratio inside [`percentage`]
pub const PERCENTAGE_INTERMEDIATE_SCALE: u32 = 5;

/// Scale kept for the percent fraction inside [`calculate_profit`]
pub const PROFIT_INTERMEDIATE_SCALE: u32 = 4;

/// Scale of percentage and profit results
pub const OUTPUT_SCALE: u32 = 2;

/// Percentage change from `value1` to `value2`, relative to `value1`
///
/// Returns zero when either operand is zero, and when an intermediate
/// overflows the decimal range. `percentage(100, 90) == 10.00`.
pub fn percentage(value1: Fixed, value2: Fixed) -> Fixed {
    if value1.is_zero() || value2.is_zero() {
        return Fixed::ZERO;
    }

    value1
        .checked_sub(value2)
        .and_then(|difference| {
            difference
                .trunc_with_scale(PERCENTAGE_INTERMEDIATE_SCALE)
                .checked_div(value1)
        })
        .and_then(|ratio| {
            ratio
                .trunc_with_scale(PERCENTAGE_INTERMEDIATE_SCALE)
                .checked_mul(Fixed::HUNDRED)
        })
        .map(|result| result.round_dp(OUTPUT_SCALE))
        .unwrap_or(Fixed::ZERO)
}

/// Profit of `percentage` percent on `value`, e.g. `calculate_profit(1000, 10) == 100.00`
///
/// Zero when the product overflows.
pub fn calculate_profit(value: Fixed, percentage: Fixed) -> Fixed {
    percentage
        .checked_div(Fixed::HUNDRED)
        .map(|fraction| fraction.trunc_with_scale(PROFIT_INTERMEDIATE_SCALE))
        .and_then(|fraction| value.checked_mul(fraction))
        .map(|profit| profit.round_dp(OUTPUT_SCALE))
        .unwrap_or(Fixed::ZERO)
}

/// Format `value` with the precision of `base` (a tick or step size)
///
/// With `n` significant fractional digits in `base`, `value` is rounded to
/// `n` places. A `base` without fractional digits ceils `value` to an integer.
pub fn format_decimal(base: Fixed, value: Fixed) -> Fixed {
    match base.fractional_digits() {
        0 => value.ceil(),
        digits => value.round_dp(digits),
    }
}

/// Whether an order created at `order_time_ms` has been open for at least
/// `timeout_seconds`, measured against the wall clock
pub fn is_time_box_order(order_time_ms: u64, timeout_seconds: u64) -> bool {
    is_time_box_order_at(millis(), order_time_ms, timeout_seconds)
}

/// [`is_time_box_order`] against an explicit `now_ms`
pub fn is_time_box_order_at(now_ms: u64, order_time_ms: u64, timeout_seconds: u64) -> bool {
    now_ms.saturating_sub(order_time_ms) / 1000 >= timeout_seconds
}

/// Last element of `series` as a float, or its `key` field when given
///
/// Elements may be JSON numbers, numeric strings or objects. Anything
/// missing or non-numeric reads as `0.0`.
pub fn current_value(series: &[Value], key: Option<&str>) -> f64 {
    let Some(last) = series.last() else {
        return 0.0;
    };

    let value = match key {
        Some(key) => last.get(key).unwrap_or(&Value::Null),
        None => last,
    };

    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Last candle's `field` as a float, `0.0` when there are no candles
pub fn current_candle_value(candles: &[Candle], field: CandleField) -> f64 {
    candles
        .last()
        .map(|candle| candle.field(field).to_f64())
        .unwrap_or(0.0)
}

/// Project one field out of every candle, preserving order
pub fn candle_field(candles: &[Candle], field: CandleField) -> Vec<Fixed> {
    candles.iter().map(|candle| candle.field(field)).collect()
}

pub fn close_prices(candles: &[Candle]) -> Vec<Fixed> {
    candle_field(candles, CandleField::Close)
}

pub fn high_prices(candles: &[Candle]) -> Vec<Fixed> {
    candle_field(candles, CandleField::High)
}

pub fn low_prices(candles: &[Candle]) -> Vec<Fixed> {
    candle_field(candles, CandleField::Low)
}
