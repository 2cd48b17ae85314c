//! One-cancels-the-other emulation. USDT-M futures has no native OCO list
//! endpoint, so the pair is two independent orders plus a poll loop that
//! cancels the survivor once one leg fills.

use std::time::Duration;

use anyhow::{bail, Context};
use tracing::{error, info, warn};

use crate::market::{validate_symbol, Market, OrderForm, OrderReceipt, Side};

#[derive(Debug, Clone)]
pub struct OcoParams {
    symbol: String,
    side: Side,
    quantity: f64,
    price: f64,
    stop_price: f64,
    stop_limit_price: f64,
}

impl OcoParams {
    pub fn new(
        symbol: &str,
        side: Side,
        quantity: f64,
        price: f64,
        stop_price: f64,
        stop_limit_price: f64,
    ) -> anyhow::Result<Self> {
        let symbol = validate_symbol(symbol)?;
        if quantity <= 0.0 || !quantity.is_finite() {
            bail!("quantity must be positive");
        }
        if price <= 0.0 || stop_price <= 0.0 || stop_limit_price <= 0.0 {
            bail!("all prices must be positive");
        }
        match side {
            Side::Sell => {
                if price <= stop_price {
                    bail!("for SELL OCO the limit price must be higher than the stop price");
                }
                if stop_limit_price >= stop_price {
                    bail!("for SELL OCO the stop limit price must be lower than the stop price");
                }
            }
            Side::Buy => {
                if price >= stop_price {
                    bail!("for BUY OCO the limit price must be lower than the stop price");
                }
                if stop_limit_price <= stop_price {
                    bail!("for BUY OCO the stop limit price must be higher than the stop price");
                }
            }
        }
        Ok(Self {
            symbol,
            side,
            quantity,
            price,
            stop_price,
            stop_limit_price,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

#[derive(Debug, Clone)]
pub struct OcoPair {
    /// Synthetic id, the exchange never sees it.
    pub list_id: String,
    pub take_profit: OrderReceipt,
    pub stop_loss: OrderReceipt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcoOutcome {
    /// One leg filled; the sibling was cancelled unless it was already gone.
    Executed { filled: u64, canceled: Option<u64> },
    /// Both legs left the book without a fill.
    Closed,
}

/// Places the take-profit limit leg, then the stop-loss leg. If the second
/// placement fails the first order stays on the book, there is no atomicity
/// to fall back on.
pub fn place_oco<M: Market>(market: &M, params: &OcoParams) -> anyhow::Result<OcoPair> {
    info!(
        "attempting OCO pair: {} {} {} limit {} stop {} stop limit {}",
        params.side.as_str(),
        params.quantity,
        params.symbol,
        params.price,
        params.stop_price,
        params.stop_limit_price
    );
    let form = OrderForm::limit(&params.symbol, params.side, params.quantity, params.price)?;
    let take_profit = market
        .place_order(&form)
        .context("take profit leg failed")?;
    info!("take profit order placed: {}", take_profit.order_id);

    let form = OrderForm::stop(
        &params.symbol,
        params.side,
        params.quantity,
        params.stop_price,
        params.stop_limit_price,
    )?;
    let stop_loss = match market.place_order(&form) {
        Ok(receipt) => receipt,
        Err(e) => {
            error!(
                "stop loss leg failed, take profit order {} is still open",
                take_profit.order_id
            );
            return Err(e.context("stop loss leg failed"));
        }
    };
    info!("stop loss order placed: {}", stop_loss.order_id);

    let list_id = format!("OCO_{}_{}", take_profit.order_id, stop_loss.order_id);
    info!("OCO pair {list_id} created");
    Ok(OcoPair {
        list_id,
        take_profit,
        stop_loss,
    })
}

/// Polls both legs until one fills, then cancels the other. Ends early when
/// both legs leave the book without a fill. There is no timeout; killing the
/// process is the only other way out.
pub fn monitor_oco<M: Market>(
    market: &M,
    pair: &OcoPair,
    poll: Duration,
) -> anyhow::Result<OcoOutcome> {
    let symbol = &pair.take_profit.symbol;
    let legs = [pair.take_profit.order_id, pair.stop_loss.order_id];
    loop {
        let mut open = 0;
        for id in legs {
            let status = market
                .order_status(symbol, id)
                .with_context(|| format!("querying order {id} failed"))?;
            if status.is_filled() {
                info!(
                    "order {id} filled: {} @ avg {}",
                    status.executed_qty, status.avg_price
                );
                let other = if id == legs[0] { legs[1] } else { legs[0] };
                let canceled = match market.cancel_order(symbol, other) {
                    Ok(_) => {
                        info!("cancelled order {other}");
                        Some(other)
                    }
                    Err(e) => {
                        warn!("could not cancel order {other}: {e:#}");
                        None
                    }
                };
                return Ok(OcoOutcome::Executed {
                    filled: id,
                    canceled,
                });
            }
            if !status.is_closed() {
                open += 1;
            }
        }
        if open == 0 {
            warn!("both OCO legs closed without a fill");
            return Ok(OcoOutcome::Closed);
        }
        std::thread::sleep(poll);
    }
}
