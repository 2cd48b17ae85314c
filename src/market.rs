use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail};

pub mod binance_market;

/// Seam between the order tools and the exchange, so the OCO and TWAP loops
/// can run against a scripted implementation in tests.
pub trait Market: std::fmt::Debug + Send + Sync + 'static {
    fn place_order(&self, form: &OrderForm) -> anyhow::Result<OrderReceipt>;
    fn ticker_price(&self, symbol: &str) -> anyhow::Result<f64>;
    fn order_status(&self, symbol: &str, order_id: u64) -> anyhow::Result<OrderReceipt>;
    fn open_orders(&self, symbol: Option<&str>) -> anyhow::Result<Vec<OrderReceipt>>;
    fn cancel_order(&self, symbol: &str, order_id: u64) -> anyhow::Result<OrderReceipt>;
    fn available_balance(&self, asset: &str) -> anyhow::Result<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl FromStr for Side {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            _ => Err(anyhow!("side must be BUY or SELL")),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit,
    /// Stop-limit: triggers at the stop price, rests at the limit price.
    Stop,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::Stop => "STOP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    Gtc,
    Ioc,
    Fok,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Gtc => "GTC",
            TimeInForce::Ioc => "IOC",
            TimeInForce::Fok => "FOK",
        }
    }
}

/// Upper-cases and checks the symbol the way the exchange expects it.
pub fn validate_symbol(symbol: &str) -> anyhow::Result<String> {
    let symbol = symbol.to_ascii_uppercase();
    if symbol.len() < 6 || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        bail!("invalid symbol: {symbol}");
    }
    Ok(symbol)
}

fn validate_positive(name: &str, value: f64) -> anyhow::Result<()> {
    if value <= 0.0 || !value.is_finite() {
        bail!("{name} must be positive");
    }
    Ok(())
}

/// A validated order request. Constructors reject bad input so anything that
/// reaches the wire already passed the checks.
#[derive(Debug, Clone)]
pub struct OrderForm {
    symbol: String,
    side: Side,
    order_type: OrderType,
    quantity: f64,
    price: Option<f64>,
    stop_price: Option<f64>,
    time_in_force: Option<TimeInForce>,
    client_order_id: String,
}

impl OrderForm {
    pub fn market(symbol: &str, side: Side, quantity: f64) -> anyhow::Result<Self> {
        let symbol = validate_symbol(symbol)?;
        validate_positive("quantity", quantity)?;
        Ok(Self {
            symbol,
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            stop_price: None,
            time_in_force: None,
            client_order_id: new_client_order_id(),
        })
    }

    pub fn limit(symbol: &str, side: Side, quantity: f64, price: f64) -> anyhow::Result<Self> {
        validate_positive("price", price)?;
        let mut form = Self::market(symbol, side, quantity)?;
        form.order_type = OrderType::Limit;
        form.price = Some(price);
        form.time_in_force = Some(TimeInForce::Gtc);
        Ok(form)
    }

    pub fn stop(
        symbol: &str,
        side: Side,
        quantity: f64,
        stop_price: f64,
        limit_price: f64,
    ) -> anyhow::Result<Self> {
        validate_positive("stop price", stop_price)?;
        let mut form = Self::limit(symbol, side, quantity, limit_price)?;
        form.order_type = OrderType::Stop;
        form.stop_price = Some(stop_price);
        Ok(form)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
    pub fn side(&self) -> Side {
        self.side
    }
    pub fn order_type(&self) -> OrderType {
        self.order_type
    }
    pub fn quantity(&self) -> f64 {
        self.quantity
    }
    pub fn price(&self) -> Option<f64> {
        self.price
    }
    pub fn stop_price(&self) -> Option<f64> {
        self.stop_price
    }
    pub fn time_in_force(&self) -> Option<TimeInForce> {
        self.time_in_force
    }
    pub fn client_order_id(&self) -> &str {
        &self.client_order_id
    }
}

fn new_client_order_id() -> String {
    let tag: String = std::iter::repeat_with(fastrand::alphanumeric)
        .take(20)
        .collect();
    format!("cli_{tag}")
}

/// Order state after the exchange accepted a request, with the decimal
/// strings already parsed.
#[derive(Debug, Clone)]
pub struct OrderReceipt {
    pub order_id: u64,
    pub client_order_id: String,
    pub symbol: String,
    pub side: String,
    pub status: String,
    pub order_type: String,
    pub price: f64,
    pub avg_price: f64,
    pub orig_qty: f64,
    pub executed_qty: f64,
    pub stop_price: f64,
    pub update_time: u64,
}

impl OrderReceipt {
    pub fn is_filled(&self) -> bool {
        self.status == "FILLED"
    }

    /// Filled or otherwise off the book.
    pub fn is_closed(&self) -> bool {
        matches!(
            self.status.as_str(),
            "FILLED" | "CANCELED" | "REJECTED" | "EXPIRED"
        )
    }
}
