use anyhow::{anyhow, Context};
use tracing::info;

use crate::binance_futures::{model::OrderResponse, BinanceKeys, FuturesRest};

use super::{Market, OrderForm, OrderReceipt};

#[derive(Debug)]
pub struct BinanceMarket {
    rest: FuturesRest,
}

impl BinanceMarket {
    pub fn new(keys: BinanceKeys, live: bool) -> anyhow::Result<Self> {
        let rest = FuturesRest::new(keys, live)?;
        info!("futures client ready, base url {}", rest.base());
        Ok(Self { rest })
    }
}

fn order_params(form: &OrderForm) -> Vec<(String, String)> {
    let mut params = vec![
        ("symbol".to_string(), form.symbol().to_string()),
        ("side".to_string(), form.side().as_str().to_string()),
        ("type".to_string(), form.order_type().as_str().to_string()),
        ("quantity".to_string(), form.quantity().to_string()),
        (
            "newClientOrderId".to_string(),
            form.client_order_id().to_string(),
        ),
    ];
    if let Some(tif) = form.time_in_force() {
        params.push(("timeInForce".to_string(), tif.as_str().to_string()));
    }
    if let Some(price) = form.price() {
        params.push(("price".to_string(), price.to_string()));
    }
    if let Some(stop_price) = form.stop_price() {
        params.push(("stopPrice".to_string(), stop_price.to_string()));
    }
    params
}

fn num(s: &str) -> f64 {
    s.parse().unwrap_or_default()
}

impl From<OrderResponse> for OrderReceipt {
    fn from(o: OrderResponse) -> Self {
        Self {
            order_id: o.order_id,
            client_order_id: o.client_order_id,
            symbol: o.symbol,
            side: o.side,
            status: o.status,
            order_type: o.order_type,
            price: num(&o.price),
            avg_price: num(&o.avg_price),
            orig_qty: num(&o.orig_qty),
            executed_qty: num(&o.executed_qty),
            stop_price: num(&o.stop_price),
            update_time: o.update_time,
        }
    }
}

impl Market for BinanceMarket {
    fn place_order(&self, form: &OrderForm) -> anyhow::Result<OrderReceipt> {
        let response = self.rest.place_order(order_params(form)).with_context(|| {
            format!(
                "{} {} order for {} failed",
                form.side().as_str(),
                form.order_type().as_str(),
                form.symbol()
            )
        })?;
        Ok(response.into())
    }

    fn ticker_price(&self, symbol: &str) -> anyhow::Result<f64> {
        let ticker = self.rest.ticker_price(symbol)?;
        ticker
            .price
            .parse()
            .map_err(|_| anyhow!("bad ticker price for {symbol}: {}", ticker.price))
    }

    fn order_status(&self, symbol: &str, order_id: u64) -> anyhow::Result<OrderReceipt> {
        Ok(self.rest.query_order(symbol, order_id)?.into())
    }

    fn open_orders(&self, symbol: Option<&str>) -> anyhow::Result<Vec<OrderReceipt>> {
        let orders = self.rest.open_orders(symbol)?;
        Ok(orders.into_iter().map(OrderReceipt::from).collect())
    }

    fn cancel_order(&self, symbol: &str, order_id: u64) -> anyhow::Result<OrderReceipt> {
        Ok(self.rest.cancel_order(symbol, order_id)?.into())
    }

    fn available_balance(&self, asset: &str) -> anyhow::Result<f64> {
        let balances = self.rest.balances()?;
        let Some(row) = balances.into_iter().find(|b| b.asset == asset) else {
            return Ok(0.0);
        };
        row.available_balance
            .parse()
            .map_err(|_| anyhow!("bad balance for {asset}: {}", row.available_balance))
    }
}
