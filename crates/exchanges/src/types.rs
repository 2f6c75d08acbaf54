//! Common exchange types and data structures
//!
//! Prices and quantities are [`Fixed`]; everything the core passes through
//! verbatim (orders, positions, account info) stays `serde_json::Value`.

use crate::errors::{ExchangeError, Result};
use crate::http::RequestParameters;
use perpbot_core::prelude::*;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Futures order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    Market,
    Stop,
    StopMarket,
    TakeProfit,
    TakeProfitMarket,
    TrailingStopMarket,
}

impl OrderType {
    /// Trigger-market types, the only ones allowed to carry `closePosition`
    pub fn is_trigger_market(&self) -> bool {
        matches!(self, OrderType::StopMarket | OrderType::TakeProfitMarket)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderType::Limit => "LIMIT",
            OrderType::Market => "MARKET",
            OrderType::Stop => "STOP",
            OrderType::StopMarket => "STOP_MARKET",
            OrderType::TakeProfit => "TAKE_PROFIT",
            OrderType::TakeProfitMarket => "TAKE_PROFIT_MARKET",
            OrderType::TrailingStopMarket => "TRAILING_STOP_MARKET",
        };
        f.write_str(name)
    }
}

/// Time in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    #[serde(rename = "GTC")]
    GoodTillCanceled,
    #[serde(rename = "IOC")]
    ImmediateOrCancel,
    #[serde(rename = "FOK")]
    FillOrKill,
    /// Post-only
    #[serde(rename = "GTX")]
    GoodTillCrossing,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInForce::GoodTillCanceled => write!(f, "GTC"),
            TimeInForce::ImmediateOrCancel => write!(f, "IOC"),
            TimeInForce::FillOrKill => write!(f, "FOK"),
            TimeInForce::GoodTillCrossing => write!(f, "GTX"),
        }
    }
}

/// Position side (for futures trading)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
    /// One-way mode
    Both,
}

impl PositionSide {
    /// Read an exchange `positionSide` string without failing
    ///
    /// Only an exact `LONG` or `SHORT` names a hedge side; any other text is
    /// one-way mode, which closes with a buy like every non-long side.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "LONG" => PositionSide::Long,
            "SHORT" => PositionSide::Short,
            _ => PositionSide::Both,
        }
    }

    /// Order side that reduces a position held on this side
    pub fn closing_side(&self) -> OrderSide {
        match self {
            PositionSide::Long => OrderSide::Sell,
            _ => OrderSide::Buy,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
            PositionSide::Both => write!(f, "BOTH"),
        }
    }
}

/// Strict parse of the exchange spelling; see [`PositionSide::from_raw`]
/// for the lenient reading used when closing positions
impl FromStr for PositionSide {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LONG" => Ok(PositionSide::Long),
            "SHORT" => Ok(PositionSide::Short),
            "BOTH" => Ok(PositionSide::Both),
            other => Err(ExchangeError::InvalidOrder(format!("unknown position side '{other}'"))),
        }
    }
}

/// New order request
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Option<Fixed>,
    pub price: Option<Fixed>,
    pub stop_price: Option<Fixed>,
    pub time_in_force: Option<TimeInForce>,
    pub position_side: Option<PositionSide>,
    pub reduce_only: Option<bool>,
    pub close_position: bool,
    pub client_order_id: Option<ClientOrderId>,
}

impl OrderRequest {
    pub fn new(symbol: impl Into<String>, side: OrderSide, order_type: OrderType) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type,
            quantity: None,
            price: None,
            stop_price: None,
            time_in_force: None,
            position_side: None,
            reduce_only: None,
            close_position: false,
            client_order_id: None,
        }
    }

    pub fn limit(symbol: impl Into<String>, side: OrderSide, quantity: Fixed, price: Fixed) -> Self {
        Self::new(symbol, side, OrderType::Limit)
            .quantity(quantity)
            .price(price)
    }

    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: Fixed) -> Self {
        Self::new(symbol, side, OrderType::Market).quantity(quantity)
    }

    /// Trigger order closing the whole position at `stop_price`
    pub fn close_position(
        symbol: impl Into<String>,
        side: OrderSide,
        order_type: OrderType,
        stop_price: Fixed,
    ) -> Self {
        let mut order = Self::new(symbol, side, order_type).stop_price(stop_price);
        order.close_position = true;
        order
    }

    pub fn quantity(mut self, quantity: Fixed) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn price(mut self, price: Fixed) -> Self {
        self.price = Some(price);
        self
    }

    pub fn stop_price(mut self, stop_price: Fixed) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    pub fn time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = Some(tif);
        self
    }

    pub fn position_side(mut self, side: PositionSide) -> Self {
        self.position_side = Some(side);
        self
    }

    pub fn reduce_only(mut self, reduce_only: bool) -> Self {
        self.reduce_only = Some(reduce_only);
        self
    }

    pub fn client_order_id(mut self, id: ClientOrderId) -> Self {
        self.client_order_id = Some(id);
        self
    }

    /// Reject combinations the exchange is certain to refuse
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(ExchangeError::InvalidOrder("symbol is empty".to_string()));
        }

        if self.close_position {
            if !self.order_type.is_trigger_market() {
                return Err(ExchangeError::InvalidOrder(format!(
                    "closePosition requires STOP_MARKET or TAKE_PROFIT_MARKET, got {}",
                    self.order_type
                )));
            }
            if self.stop_price.is_none() {
                return Err(ExchangeError::InvalidOrder(
                    "closePosition requires stopPrice".to_string(),
                ));
            }
            if self.quantity.is_some() {
                return Err(ExchangeError::InvalidOrder(
                    "closePosition cannot be combined with quantity".to_string(),
                ));
            }
            return Ok(());
        }

        match self.quantity {
            Some(quantity) if quantity.is_positive() => {}
            _ => {
                return Err(ExchangeError::InvalidOrder(
                    "quantity must be positive".to_string(),
                ));
            }
        }

        if matches!(self.order_type, OrderType::Limit | OrderType::Stop | OrderType::TakeProfit)
            && self.price.is_none()
        {
            return Err(ExchangeError::InvalidOrder(format!(
                "{} order requires price",
                self.order_type
            )));
        }

        Ok(())
    }

    /// Validate and render as exchange parameters
    pub fn into_parameters(self) -> Result<RequestParameters> {
        self.validate()?;

        let mut params = RequestParameters::new()
            .with("symbol", &self.symbol)
            .with("side", self.side)
            .with("type", self.order_type);

        if let Some(quantity) = self.quantity {
            params.insert("quantity", quantity);
        }
        if let Some(price) = self.price {
            params.insert("price", price);
        }
        if let Some(stop_price) = self.stop_price {
            params.insert("stopPrice", stop_price);
        }

        let time_in_force = match (self.time_in_force, self.order_type) {
            (Some(tif), _) => Some(tif),
            (None, OrderType::Limit) => Some(TimeInForce::GoodTillCanceled),
            (None, _) => None,
        };
        if let Some(tif) = time_in_force {
            params.insert("timeInForce", tif);
        }

        if let Some(position_side) = self.position_side {
            params.insert("positionSide", position_side);
        }
        if let Some(reduce_only) = self.reduce_only {
            params.insert("reduceOnly", reduce_only);
        }
        if self.close_position {
            params.insert("closePosition", true);
        }
        if let Some(id) = self.client_order_id {
            params.insert("newClientOrderId", id);
        }

        Ok(params)
    }
}

/// Candle (kline) reshaped from the exchange's positional array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub open_time: u64,
    pub open: Fixed,
    pub high: Fixed,
    pub low: Fixed,
    pub close: Fixed,
    pub volume: Fixed,
    pub close_time: u64,
    pub quote_asset_volume: Fixed,
    pub number_of_trades: u64,
    pub taker_buy_base_asset_volume: Fixed,
    pub taker_buy_quote_asset_volume: Fixed,
    pub ignore: String,
}

/// Number of positional fields in a kline row
pub const CANDLE_FIELDS: usize = 12;

impl Candle {
    /// Build a candle from one kline row:
    /// `[openTime, open, high, low, close, volume, closeTime, quoteAssetVolume,
    ///   numberOfTrades, takerBuyBaseAssetVolume, takerBuyQuoteAssetVolume, ignore]`
    pub fn from_row(row: &[Value]) -> Result<Self> {
        if row.len() < CANDLE_FIELDS {
            return Err(ExchangeError::InvalidResponse(format!(
                "kline row has {} fields, expected {CANDLE_FIELDS}",
                row.len()
            )));
        }

        Ok(Self {
            open_time: integer_field(&row[0], "openTime")?,
            open: fixed_field(&row[1], "open")?,
            high: fixed_field(&row[2], "high")?,
            low: fixed_field(&row[3], "low")?,
            close: fixed_field(&row[4], "close")?,
            volume: fixed_field(&row[5], "volume")?,
            close_time: integer_field(&row[6], "closeTime")?,
            quote_asset_volume: fixed_field(&row[7], "quoteAssetVolume")?,
            number_of_trades: integer_field(&row[8], "numberOfTrades")?,
            taker_buy_base_asset_volume: fixed_field(&row[9], "takerBuyBaseAssetVolume")?,
            taker_buy_quote_asset_volume: fixed_field(&row[10], "takerBuyQuoteAssetVolume")?,
            ignore: match &row[11] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        })
    }

    pub fn field(&self, field: CandleField) -> Fixed {
        match field {
            CandleField::Open => self.open,
            CandleField::High => self.high,
            CandleField::Low => self.low,
            CandleField::Close => self.close,
            CandleField::Volume => self.volume,
            CandleField::QuoteAssetVolume => self.quote_asset_volume,
        }
    }

    pub fn open_datetime(&self) -> DateTime<Utc> {
        Timestamp::from_millis(self.open_time).to_datetime()
    }
}

/// Numeric candle fields available for projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleField {
    Open,
    High,
    Low,
    Close,
    Volume,
    QuoteAssetVolume,
}

/// Parse a JSON number or numeric string as [`Fixed`]
pub fn fixed_from_value(value: &Value) -> Option<Fixed> {
    match value {
        Value::String(s) => Fixed::from_str_exact(s).ok(),
        Value::Number(n) => Fixed::from_str_exact(&n.to_string()).ok(),
        _ => None,
    }
}

fn fixed_field(value: &Value, name: &str) -> Result<Fixed> {
    fixed_from_value(value)
        .ok_or_else(|| ExchangeError::InvalidResponse(format!("kline {name} is not numeric: {value}")))
}

fn integer_field(value: &Value, name: &str) -> Result<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ExchangeError::InvalidResponse(format!("kline {name} is not an integer: {value}")))
}

/// Decoded response body
///
/// `Empty` and `Malformed` both collapse to an empty result in
/// [`Payload::into_value`]; match on the enum when the difference matters.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Empty,
    Malformed { error: String, body: String },
}

impl Payload {
    pub fn decode(body: &str) -> Self {
        if body.trim().is_empty() {
            return Payload::Empty;
        }
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Null) => Payload::Empty,
            Ok(value) => Payload::Json(value),
            Err(e) => Payload::Malformed {
                error: e.to_string(),
                body: body.to_string(),
            },
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Payload::Malformed { .. })
    }

    /// The decoded JSON, or an empty array when there was none
    pub fn into_value(self) -> Value {
        match self {
            Payload::Json(value) => value,
            Payload::Empty | Payload::Malformed { .. } => Value::Array(Vec::new()),
        }
    }
}
