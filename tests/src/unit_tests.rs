//! Workspace unit tests: parameterized cases, properties, fixtures and
//! sequential environment tests over the pure building blocks.

mod support;

use perpbot_exchanges::prelude::*;
use perpbot_exchanges::trading_math::*;
use proptest::prelude::*;
use rstest::*;
use serial_test::serial;
use std::sync::Arc;

fn fx(s: &str) -> Fixed {
    Fixed::from_str_exact(s).unwrap()
}

// ============================================================================
// PARAMETERIZED TRADING MATH
// ============================================================================

#[cfg(test)]
mod parameterized_tests {
    use super::*;

    #[rstest]
    #[case("100", "90", "10.00")]
    #[case("0", "5", "0")]
    #[case("5", "0", "0")]
    #[case("200", "250", "-25.00")]
    #[case("45000", "45450", "-1.00")]
    #[case("3", "2", "33.33")]
    #[case("-70000000000000000000000000000", "70000000000000000000000000000", "0")]
    fn test_percentage(#[case] v1: &str, #[case] v2: &str, #[case] expected: &str) {
        assert_eq!(percentage(fx(v1), fx(v2)), fx(expected));
    }

    #[rstest]
    #[case("1000", "10", "100.00")]
    #[case("1000", "0", "0")]
    #[case("0", "10", "0")]
    #[case("1234.56", "2.5", "30.86")]
    #[case("1000", "0.00999", "0")]
    #[case("70000000000000000000000000000", "500", "0")]
    fn test_calculate_profit(#[case] value: &str, #[case] pct: &str, #[case] expected: &str) {
        assert_eq!(calculate_profit(fx(value), fx(pct)), fx(expected));
    }

    #[rstest]
    #[case("1.2345", "3.14159", "3.1416")]
    #[case("5", "3.2", "4")]
    #[case("0.00100000", "0.12345", "0.123")]
    #[case("0.5", "0.25", "0.3")]
    #[case("10", "-3.7", "-3")]
    fn test_format_decimal(#[case] base: &str, #[case] value: &str, #[case] expected: &str) {
        assert_eq!(format_decimal(fx(base), fx(value)), fx(expected));
    }

    #[rstest]
    #[case(61_000, 60, true)]
    #[case(10_000, 60, false)]
    #[case(60_000, 60, true)]
    #[case(59_999, 60, false)]
    #[case(0, 0, true)]
    fn test_time_box(#[case] age_ms: u64, #[case] timeout_s: u64, #[case] expired: bool) {
        let now = 1_700_000_000_000;
        assert_eq!(is_time_box_order_at(now, now - age_ms, timeout_s), expired);
    }

    #[rstest]
    #[case("LONG", PositionSide::Long, OrderSide::Sell)]
    #[case("SHORT", PositionSide::Short, OrderSide::Buy)]
    #[case("BOTH", PositionSide::Both, OrderSide::Buy)]
    fn test_position_side_parsing(
        #[case] raw: &str,
        #[case] side: PositionSide,
        #[case] closing: OrderSide,
    ) {
        let parsed: PositionSide = raw.parse().unwrap();
        assert_eq!(parsed, side);
        assert_eq!(parsed.closing_side(), closing);
        assert_eq!(PositionSide::from_raw(raw), side);
    }

    #[rstest]
    #[case("LONG", OrderSide::Sell)]
    #[case("SHORT", OrderSide::Buy)]
    #[case("long", OrderSide::Buy)]
    #[case("Long ", OrderSide::Buy)]
    #[case("", OrderSide::Buy)]
    #[case("HEDGE", OrderSide::Buy)]
    fn test_raw_position_side_closing(#[case] raw: &str, #[case] closing: OrderSide) {
        assert_eq!(PositionSide::from_raw(raw).closing_side(), closing);
    }
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #[test]
        fn test_percentage_with_zero_operand_is_zero(v in -1_000_000i64..1_000_000i64) {
            let v = Fixed::from_i64(v);
            prop_assert_eq!(percentage(Fixed::ZERO, v), Fixed::ZERO);
            prop_assert_eq!(percentage(v, Fixed::ZERO), Fixed::ZERO);
        }

        #[test]
        fn test_percentage_of_equal_values_is_zero(v in 1i64..10_000_000i64) {
            let v = Fixed::from_i64(v);
            prop_assert_eq!(percentage(v, v), Fixed::ZERO);
        }

        #[test]
        fn test_percentage_has_two_decimals(v1 in 1i64..1_000_000i64, v2 in 1i64..1_000_000i64) {
            let result = percentage(Fixed::from_i64(v1), Fixed::from_i64(v2));
            prop_assert!(result.fractional_digits() <= 2);
        }

        #[test]
        fn test_format_decimal_respects_base_precision(mantissa in 1i64..100_000i64, scale in 1u32..8u32, value in -1_000_000i64..1_000_000i64) {
            let base = Fixed::new(mantissa, scale);
            let formatted = format_decimal(base, Fixed::new(value, 4));
            prop_assert!(formatted.fractional_digits() <= base.fractional_digits());
        }

        #[test]
        fn test_close_prices_preserve_length(count in 0usize..50usize) {
            let rows: Vec<_> = (0..count as u64)
                .map(|i| support::kline_row(i * 60_000, "1.0", "2.0", "0.5", &format!("{}.5", i)))
                .collect();
            let candles: Vec<Candle> = rows
                .iter()
                .map(|row| Candle::from_row(row.as_array().unwrap()).unwrap())
                .collect();

            let closes = close_prices(&candles);
            prop_assert_eq!(closes.len(), candles.len());
            for (i, close) in closes.iter().enumerate() {
                prop_assert_eq!(*close, Fixed::new(i as i64 * 10 + 5, 1));
            }
        }

        #[test]
        fn test_tracker_zero_report_always_resets(a in -10_000i64..10_000i64, b in -10_000i64..10_000i64) {
            let tracker = RateLimitTracker::new();
            tracker.update(a, b);
            tracker.update(0, 0);
            prop_assert_eq!(tracker.snapshot(), RateLimitState::default());
        }

        #[test]
        fn test_prepare_deterministic_for_any_clock(now in 0u64..4_000_000_000_000u64, limit in 1u32..1000u32) {
            let signer = BinanceSigner::new(BinanceCredentials::new("k", "s"))
                .unwrap()
                .with_clock(Arc::new(FixedClock::new(now)));
            let params = RequestParameters::new().with("symbol", "BTCUSDT").with("limit", limit);

            let first = signer.prepare(params.clone()).unwrap();
            let second = signer.prepare(params).unwrap();
            prop_assert_eq!(first.to_query_string(), second.to_query_string());

            let now_text = now.to_string();
            prop_assert_eq!(first.get("timestamp"), Some(now_text.as_str()));
        }

        #[test]
        fn test_id_generation_uniqueness(count in 1..100usize) {
            let ids: std::collections::HashSet<_> = (0..count)
                .map(|_| ClientOrderId::generate())
                .collect();
            prop_assert_eq!(ids.len(), count);
        }
    }
}

// ============================================================================
// FIXTURE TESTS
// ============================================================================

#[cfg(test)]
mod fixture_tests {
    use super::*;

    /// A three-candle minute series with a fixed last close
    #[fixture]
    fn candles() -> Vec<Candle> {
        support::sample_klines()
            .as_array()
            .unwrap()
            .iter()
            .map(|row| Candle::from_row(row.as_array().unwrap()).unwrap())
            .collect()
    }

    #[rstest]
    fn test_projections_keep_order(candles: Vec<Candle>) {
        assert_eq!(
            high_prices(&candles),
            vec![fx("45120.50"), fx("45200.00"), fx("45190.00")]
        );
        assert_eq!(
            low_prices(&candles),
            vec![fx("44980.00"), fx("45050.00"), fx("44900.00")]
        );
        assert_eq!(current_candle_value(&candles, CandleField::High), 45190.0);
    }

    #[rstest]
    fn test_current_value_over_serialized_candles(candles: Vec<Candle>) {
        let series: Vec<_> = candles
            .iter()
            .map(|c| serde_json::to_value(c).unwrap())
            .collect();

        assert_eq!(current_value(&series, Some("close")), 44950.25);
        assert_eq!(current_value(&series, Some("openTime")), 1_700_000_120_000.0);
    }

    #[rstest]
    fn test_profit_target_from_entry_close(candles: Vec<Candle>) {
        let entry = candles[0].close;
        let target = entry + calculate_profit(entry, fx("1.5"));
        let tick = fx("0.10");

        assert_eq!(format_decimal(tick, target), fx("45776.6"));
    }
}

// ============================================================================
// SEQUENTIAL TESTS (process environment)
// ============================================================================

#[cfg(test)]
mod sequential_tests {
    use super::*;

    const API_KEY_ENV: &str = "BINANCE_API_KEY";
    const SECRET_KEY_ENV: &str = "BINANCE_SECRET_KEY";

    #[test]
    #[serial]
    fn test_env_credentials_loaded() {
        std::env::set_var(API_KEY_ENV, "env_key");
        std::env::set_var(SECRET_KEY_ENV, "env_secret");

        let config = BinanceConfig::testnet().with_env_credentials().unwrap();
        assert_eq!(config.api_key, "env_key");
        assert_eq!(config.api_secret, "env_secret");
        assert!(config.validate().is_ok());

        std::env::remove_var(API_KEY_ENV);
        std::env::remove_var(SECRET_KEY_ENV);
    }

    #[test]
    #[serial]
    fn test_env_credentials_missing() {
        std::env::remove_var(API_KEY_ENV);
        std::env::remove_var(SECRET_KEY_ENV);

        let result = BinanceCredentials::from_env();
        assert!(matches!(result, Err(ExchangeError::MissingCredentials(var)) if var == API_KEY_ENV));
    }

    #[test]
    #[serial]
    fn test_env_secret_missing() {
        std::env::set_var(API_KEY_ENV, "env_key");
        std::env::remove_var(SECRET_KEY_ENV);

        let result = BinanceConfig::default().with_env_credentials();
        assert!(matches!(result, Err(ExchangeError::MissingCredentials(var)) if var == SECRET_KEY_ENV));

        std::env::remove_var(API_KEY_ENV);
    }
}

// ============================================================================
// LOGGING AND TIMING
// ============================================================================

#[cfg(test)]
mod ambient_tests {
    use super::*;

    #[test]
    fn test_logging_init_is_idempotent() {
        init_logging_with_level(LogLevel::Debug);
        init_logging();
    }

    #[test]
    fn test_perf_timer_measures() {
        let timer = PerfTimer::start("unit_test_timer");
        let _ = (0..1000).map(|i| i * 2).sum::<u64>();
        assert!(timer.elapsed_micros() < 1_000_000);
    }

    #[test]
    fn test_timestamp_round_trips_to_chrono() {
        let ts = Timestamp::from_millis(1_700_000_000_000);
        assert_eq!(ts.as_millis(), 1_700_000_000_000);
        assert_eq!(ts.to_datetime().timestamp_millis(), 1_700_000_000_000);
    }
}
