//! End-to-end tests of the Binance futures client against a scripted transport
//!
//! Every test drives the real signer, tracker and decoding path; only the
//! network is replaced.

mod support;

use hmac::{Hmac, Mac};
use perpbot_exchanges::prelude::*;
use perpbot_exchanges::trading_math::{close_prices, current_candle_value, percentage};
use rstest::*;
use serde_json::json;
use sha2::Sha256;
use support::*;

// ============================================================================
// SIGNING ON THE WIRE
// ============================================================================

#[monoio::test]
async fn test_every_request_is_signed_once() {
    let client = client_with(ScriptedTransport::new());

    client.exchange_info().await.unwrap();
    client.statistics_ticker("BTCUSDT").await.unwrap();
    client.realized_pnl("BTCUSDT").await.unwrap();

    for request in client.transport().requests.borrow().iter() {
        let target = request.target();
        assert_eq!(target.matches("timestamp=").count(), 1, "{target}");
        assert_eq!(target.matches("recvWindow=").count(), 1, "{target}");
        assert_eq!(target.matches("signature=").count(), 1, "{target}");
        assert!(target.ends_with(&format!("signature={}", request.query.signature().unwrap())));
    }
}

#[monoio::test]
async fn test_signature_verifies_with_independent_hmac() {
    let client = client_with(ScriptedTransport::new());
    client.book("ETHUSDT").await.unwrap();

    let request = client.transport().last_request();
    let signed_part = request.query.canonical_query();
    assert_eq!(
        signed_part,
        format!("limit=5&recvWindow=60000&symbol=ETHUSDT&timestamp={FIXED_NOW_MS}")
    );

    let mut mac = Hmac::<Sha256>::new_from_slice(TEST_SECRET_KEY.as_bytes()).unwrap();
    mac.update(signed_part.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());
    assert_eq!(request.query.signature(), Some(expected.as_str()));
}

#[monoio::test]
async fn test_api_key_header_on_every_request() {
    let client = client_with(ScriptedTransport::new());
    client.account_information().await.unwrap();
    client.position("BTCUSDT").await.unwrap();

    for request in client.transport().requests.borrow().iter() {
        assert!(request
            .headers
            .iter()
            .any(|(name, value)| name == "X-MBX-APIKEY" && value == TEST_API_KEY));
    }
}

// ============================================================================
// ORDERS
// ============================================================================

#[rstest]
#[case(PositionSide::Long, false, "SELL", "TAKE_PROFIT_MARKET")]
#[case(PositionSide::Long, true, "SELL", "STOP_MARKET")]
#[case(PositionSide::Short, false, "BUY", "TAKE_PROFIT_MARKET")]
#[case(PositionSide::Short, true, "BUY", "STOP_MARKET")]
#[case(PositionSide::Both, true, "BUY", "STOP_MARKET")]
fn test_close_position_parameters(
    #[case] side: PositionSide,
    #[case] stop: bool,
    #[case] expected_side: &str,
    #[case] expected_type: &str,
) {
    let client = client_with(ScriptedTransport::new().ok(r#"{"orderId":7,"status":"NEW"}"#));

    let response = tokio_test::block_on(client.close_position(
        "BTCUSDT",
        side,
        Fixed::from_i64(45000),
        stop,
    ))
    .unwrap();
    assert_eq!(response["orderId"], 7);

    let request = client.transport().last_request();
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.path, "/fapi/v1/order");
    assert_eq!(request.query.get("symbol"), Some("BTCUSDT"));
    assert_eq!(request.query.get("side"), Some(expected_side));
    assert_eq!(request.query.get("type"), Some(expected_type));
    assert_eq!(request.query.get("closePosition"), Some("true"));
    assert_eq!(request.query.get("stopPrice"), Some("45000"));
}

#[monoio::test]
async fn test_limit_order_parameters() {
    let client = client_with(ScriptedTransport::new().ok(r#"{"orderId":99}"#));
    let id = ClientOrderId::generate();

    let order = OrderRequest::limit(
        "BTCUSDT",
        OrderSide::Buy,
        Fixed::from_str_exact("0.010").unwrap(),
        Fixed::from_str_exact("44000.5").unwrap(),
    )
    .position_side(PositionSide::Long)
    .client_order_id(id.clone());

    client.create_order(order).await.unwrap();

    let request = client.transport().last_request();
    assert_eq!(request.query.get("type"), Some("LIMIT"));
    assert_eq!(request.query.get("quantity"), Some("0.010"));
    assert_eq!(request.query.get("price"), Some("44000.5"));
    assert_eq!(request.query.get("timeInForce"), Some("GTC"));
    assert_eq!(request.query.get("positionSide"), Some("LONG"));
    assert_eq!(request.query.get("newClientOrderId"), Some(id.as_str()));
    assert!(!request.query.contains_key("closePosition"));
}

#[monoio::test]
async fn test_order_lookups_route_by_id_kind() {
    let client = client_with(ScriptedTransport::new());

    client.order("BTCUSDT", 123).await.unwrap();
    let by_id = client.transport().last_request();
    assert_eq!(by_id.query.get("orderId"), Some("123"));
    assert!(!by_id.query.contains_key("origClientOrderId"));

    client.order_by_client_id("BTCUSDT", "PBclient1").await.unwrap();
    let by_client = client.transport().last_request();
    assert_eq!(by_client.query.get("origClientOrderId"), Some("PBclient1"));
    assert!(!by_client.query.contains_key("orderId"));

    client.cancel_order("BTCUSDT", 123).await.unwrap();
    let cancel = client.transport().last_request();
    assert_eq!(cancel.method, HttpMethod::Delete);
    assert_eq!(cancel.query.get("orderId"), Some("123"));
}

// ============================================================================
// RATE LIMIT TRACKING
// ============================================================================

#[monoio::test]
async fn test_tracker_follows_response_headers() {
    let client = client_with(
        ScriptedTransport::new()
            .reply(200, "[]", &[("X-MBX-USED-WEIGHT-1M", "20"), ("X-MBX-ORDER-COUNT-1M", "0")])
            .reply(200, "[]", &[("X-MBX-USED-WEIGHT-1M", "25"), ("X-MBX-ORDER-COUNT-1M", "1")])
            .reply(200, "[]", &[]),
    );

    client.open_orders("BTCUSDT").await.unwrap();
    assert_eq!(client.rate_limit().current_request_usage, 20);
    assert_eq!(client.rate_limit().current_order_usage, 0);

    client.open_orders("BTCUSDT").await.unwrap();
    assert_eq!(client.rate_limit().current_request_usage, 5);
    assert_eq!(client.rate_limit().current_order_usage, 1);

    client.open_orders("BTCUSDT").await.unwrap();
    assert_eq!(client.rate_limit(), RateLimitState::default());
}

#[monoio::test]
async fn test_rejected_request_updates_tracker_and_keeps_body() {
    let body = r#"{"code":-2019,"msg":"Margin is insufficient."}"#;
    let client = client_with(ScriptedTransport::new().reply(
        400,
        body,
        &[("x-mbx-used-weight-1m", "3"), ("x-mbx-order-count-1m", "1")],
    ));

    let order = OrderRequest::market("BTCUSDT", OrderSide::Sell, Fixed::from_i64(5));
    let err = client.create_order(order).await.unwrap_err();

    match &err {
        ExchangeError::HttpError(status, raw) => {
            assert_eq!(*status, 400);
            assert_eq!(raw, body);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.api_code(), Some(-2019));
    assert!(!err.is_authentication_error());
    assert_eq!(client.rate_limit().current_order_usage, 1);
}

#[monoio::test]
async fn test_transport_failure_propagates_without_tracking() {
    let client = client_with(
        ScriptedTransport::new().fail(ExchangeError::Timeout("GET /fapi/v2/account exceeded 5000ms".into())),
    );
    client.rate_limit_tracker().update(4, 2);

    let err = client.account_information().await.unwrap_err();
    assert!(matches!(err, ExchangeError::Timeout(_)));
    assert_eq!(client.rate_limit().current_request_usage, 4);
    assert_eq!(client.rate_limit().current_order_usage, 2);
}

// ============================================================================
// DECODING
// ============================================================================

#[rstest]
#[case("")]
#[case("   ")]
#[case("null")]
#[case("<html>maintenance</html>")]
#[case("{\"truncated\":")]
fn test_undecodable_bodies_become_empty_arrays(#[case] body: &str) {
    let client = client_with(ScriptedTransport::new().ok(body));
    let orders = tokio_test::block_on(client.orders("BTCUSDT")).unwrap();
    assert_eq!(orders, json!([]));
}

#[monoio::test]
async fn test_raw_request_distinguishes_empty_from_malformed() {
    let client = client_with(ScriptedTransport::new().ok("").ok("garbage"));
    let params = || RequestParameters::new().with("symbol", "BTCUSDT");

    let empty = client
        .request(HttpMethod::Get, "/fapi/v1/openOrders", params())
        .await
        .unwrap();
    let malformed = client
        .request(HttpMethod::Get, "/fapi/v1/openOrders", params())
        .await
        .unwrap();

    assert_eq!(empty, Payload::Empty);
    assert!(malformed.is_malformed());
}

#[monoio::test]
async fn test_candles_feed_trading_math() {
    let client = client_with(ScriptedTransport::new().ok(sample_klines().to_string()));

    let candles = client.candles("BTCUSDT", "1m", 3).await.unwrap();
    assert_eq!(candles.len(), 3);

    let closes = close_prices(&candles);
    assert_eq!(closes.len(), candles.len());
    assert_eq!(closes[2], Fixed::from_str_exact("44950.25").unwrap());
    assert_eq!(current_candle_value(&candles, CandleField::Close), 44950.25);

    let change = percentage(closes[0], closes[2]);
    assert_eq!(change, Fixed::from_str_exact("0.33").unwrap());

    let request = client.transport().last_request();
    assert_eq!(request.path, "/fapi/v1/continuousKlines");
    assert_eq!(request.query.get("contractType"), Some("PERPETUAL"));
}

#[monoio::test]
async fn test_position_passes_through_verbatim() {
    let client = client_with(ScriptedTransport::new().ok(sample_position().to_string()));

    let position = client.position("BTCUSDT").await.unwrap();
    assert_eq!(position, sample_position());
    assert_eq!(client.transport().last_request().path, "/fapi/v2/positionRisk");
}

#[test]
fn test_client_rejects_missing_credentials() {
    let config = BinanceConfig::testnet();
    let result = BinanceFuturesClient::with_transport(config, ScriptedTransport::new());
    assert!(matches!(result, Err(ExchangeError::MissingCredentials(_))));
}
