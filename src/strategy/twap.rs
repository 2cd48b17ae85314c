//! Time-weighted average price execution: split one quantity into timed
//! chunks and submit them sequentially with a sleep between submissions.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail};
use tracing::{error, info, warn};

use crate::market::{validate_symbol, Market, OrderForm, OrderReceipt, Side};
use crate::utils::round_dp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkOrderType {
    #[default]
    Market,
    /// Limit chunks rest just through the ticker, 0.1% above it for buys and
    /// 0.1% below for sells.
    Limit,
}

impl FromStr for ChunkOrderType {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MARKET" => Ok(ChunkOrderType::Market),
            "LIMIT" => Ok(ChunkOrderType::Limit),
            _ => Err(anyhow!("order type must be MARKET or LIMIT")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TwapParams {
    symbol: String,
    side: Side,
    quantity: f64,
    duration_minutes: u64,
    interval_seconds: u64,
    order_type: ChunkOrderType,
}

impl TwapParams {
    pub fn new(
        symbol: &str,
        side: Side,
        quantity: f64,
        duration_minutes: u64,
        interval_seconds: u64,
        order_type: ChunkOrderType,
    ) -> anyhow::Result<Self> {
        let symbol = validate_symbol(symbol)?;
        if quantity <= 0.0 || !quantity.is_finite() {
            bail!("total quantity must be positive");
        }
        if duration_minutes == 0 {
            bail!("duration must be positive");
        }
        if interval_seconds == 0 {
            bail!("interval must be positive");
        }
        if interval_seconds >= duration_minutes.saturating_mul(60) {
            bail!("interval must be less than the total duration");
        }
        let params = Self {
            symbol,
            side,
            quantity,
            duration_minutes,
            interval_seconds,
            order_type,
        };
        if params.num_orders() < 2 {
            bail!("duration and interval must allow for at least 2 orders");
        }
        info!(
            "TWAP validation passed: {} orders over {} minutes",
            params.num_orders(),
            duration_minutes
        );
        Ok(params)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
    pub fn side(&self) -> Side {
        self.side
    }
    pub fn quantity(&self) -> f64 {
        self.quantity
    }
    pub fn num_orders(&self) -> usize {
        (self.duration_minutes.saturating_mul(60) / self.interval_seconds) as usize
    }
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// Chunk sizes for each submission. The first `num_orders - 1` chunks ride
    /// a deterministic ±5% ramp around the even split so the sizes are not
    /// all identical; whatever is left after rounding becomes the last chunk.
    pub fn chunks(&self) -> Vec<f64> {
        let num_orders = self.num_orders();
        let base = self.quantity / num_orders as f64;
        let mut chunks = Vec::with_capacity(num_orders);
        let mut remaining = self.quantity;
        for i in 0..num_orders - 1 {
            let variation = base * 0.1 * (0.5 - (i % 10) as f64 / 10.0);
            let chunk = round_dp((base + variation).min(remaining), 6);
            chunks.push(chunk);
            remaining -= chunk;
        }
        let last = round_dp(remaining, 6);
        if last > 0.0 {
            chunks.push(last);
        }
        chunks
    }
}

#[derive(Debug, Clone)]
pub struct TwapSummary {
    pub symbol: String,
    pub side: Side,
    pub planned_orders: usize,
    pub orders_placed: usize,
    pub requested_qty: f64,
    pub executed_qty: f64,
    pub elapsed: Duration,
}

impl fmt::Display for TwapSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TWAP {} {}: executed {}/{} in {}/{} orders over {:.1}s",
            self.side.as_str(),
            self.symbol,
            self.executed_qty,
            self.requested_qty,
            self.orders_placed,
            self.planned_orders,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Submits one order per chunk, sleeping `pause` between submissions but not
/// after the last one. A failed chunk is logged and skipped. Raising `stop`
/// ends the run at the next chunk boundary.
pub fn execute_twap<M: Market>(
    market: &M,
    params: &TwapParams,
    pause: Duration,
    stop: &AtomicBool,
) -> TwapSummary {
    let chunks = params.chunks();
    let started = Instant::now();
    let mut orders_placed = 0;
    let mut executed_qty = 0.0;
    info!(
        "starting TWAP execution: {} {} {} over {} min",
        params.side.as_str(),
        params.quantity,
        params.symbol,
        params.duration_minutes
    );
    for (i, &chunk) in chunks.iter().enumerate() {
        if stop.load(Relaxed) {
            warn!("TWAP execution stopped after {orders_placed} orders");
            break;
        }
        match place_chunk(market, params, chunk) {
            Ok(receipt) => {
                orders_placed += 1;
                executed_qty += receipt.executed_qty;
                info!(
                    "TWAP order {}/{} placed: id {} status {} qty {}",
                    i + 1,
                    chunks.len(),
                    receipt.order_id,
                    receipt.status,
                    chunk
                );
            }
            Err(e) => {
                error!("TWAP order {}/{} failed: {e:#}", i + 1, chunks.len());
            }
        }
        if i + 1 < chunks.len() {
            std::thread::sleep(pause);
        }
    }
    let summary = TwapSummary {
        symbol: params.symbol.clone(),
        side: params.side,
        planned_orders: chunks.len(),
        orders_placed,
        requested_qty: params.quantity,
        executed_qty,
        elapsed: started.elapsed(),
    };
    info!("TWAP execution completed: {summary}");
    summary
}

fn place_chunk<M: Market>(
    market: &M,
    params: &TwapParams,
    quantity: f64,
) -> anyhow::Result<OrderReceipt> {
    let form = match params.order_type {
        ChunkOrderType::Market => OrderForm::market(&params.symbol, params.side, quantity)?,
        ChunkOrderType::Limit => {
            let current = market.ticker_price(&params.symbol)?;
            let price = match params.side {
                Side::Buy => current * 1.001,
                Side::Sell => current * 0.999,
            };
            OrderForm::limit(&params.symbol, params.side, quantity, price)?
        }
    };
    market.place_order(&form)
}
