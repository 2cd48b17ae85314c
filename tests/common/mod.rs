#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::sync::Mutex;

use anyhow::{anyhow, bail};
use futbot::market::{Market, OrderForm, OrderReceipt, OrderType};

/// In-memory exchange double. Market orders fill immediately at the ticker;
/// resting orders report whatever status script was set for them, with the
/// last scripted status repeating.
#[derive(Debug)]
pub struct ScriptedMarket {
    pub ticker: f64,
    pub placed: Mutex<Vec<(u64, OrderForm)>>,
    pub canceled: Mutex<Vec<u64>>,
    pub statuses: Mutex<HashMap<u64, Vec<&'static str>>>,
    /// 1-based placement attempts that should be rejected.
    pub fail_on: Vec<usize>,
    pub fail_cancels: bool,
    pub next_id: AtomicU64,
    pub place_count: AtomicU64,
}

impl Default for ScriptedMarket {
    fn default() -> Self {
        Self {
            ticker: 50000.0,
            placed: Mutex::new(Vec::new()),
            canceled: Mutex::new(Vec::new()),
            statuses: Mutex::new(HashMap::new()),
            fail_on: Vec::new(),
            fail_cancels: false,
            next_id: AtomicU64::new(100),
            place_count: AtomicU64::new(0),
        }
    }
}

impl ScriptedMarket {
    pub fn script(&self, order_id: u64, statuses: &[&'static str]) {
        self.statuses
            .lock()
            .unwrap()
            .insert(order_id, statuses.to_vec());
    }

    fn form_for(&self, order_id: u64) -> anyhow::Result<OrderForm> {
        self.placed
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| *id == order_id)
            .map(|(_, form)| form.clone())
            .ok_or_else(|| anyhow!("exchange error -2013: order does not exist"))
    }

    fn receipt(&self, form: &OrderForm, order_id: u64, status: &str) -> OrderReceipt {
        let filled = status == "FILLED";
        OrderReceipt {
            order_id,
            client_order_id: form.client_order_id().to_string(),
            symbol: form.symbol().to_string(),
            side: form.side().as_str().to_string(),
            status: status.to_string(),
            order_type: form.order_type().as_str().to_string(),
            price: form.price().unwrap_or_default(),
            avg_price: if filled {
                form.price().unwrap_or(self.ticker)
            } else {
                0.0
            },
            orig_qty: form.quantity(),
            executed_qty: if filled { form.quantity() } else { 0.0 },
            stop_price: form.stop_price().unwrap_or_default(),
            update_time: 0,
        }
    }
}

impl Market for ScriptedMarket {
    fn place_order(&self, form: &OrderForm) -> anyhow::Result<OrderReceipt> {
        let attempt = self.place_count.fetch_add(1, Relaxed) as usize + 1;
        if self.fail_on.contains(&attempt) {
            bail!("exchange error -2019: margin is insufficient");
        }
        let id = self.next_id.fetch_add(1, Relaxed);
        self.placed.lock().unwrap().push((id, form.clone()));
        let status = if form.order_type() == OrderType::Market {
            "FILLED"
        } else {
            "NEW"
        };
        Ok(self.receipt(form, id, status))
    }

    fn ticker_price(&self, _symbol: &str) -> anyhow::Result<f64> {
        Ok(self.ticker)
    }

    fn order_status(&self, _symbol: &str, order_id: u64) -> anyhow::Result<OrderReceipt> {
        let form = self.form_for(order_id)?;
        let mut statuses = self.statuses.lock().unwrap();
        let status = match statuses.get_mut(&order_id) {
            Some(script) if script.len() > 1 => script.remove(0),
            Some(script) => script[0],
            None => "NEW",
        };
        Ok(self.receipt(&form, order_id, status))
    }

    fn open_orders(&self, symbol: Option<&str>) -> anyhow::Result<Vec<OrderReceipt>> {
        let placed = self.placed.lock().unwrap();
        Ok(placed
            .iter()
            .filter(|(_, form)| symbol.map_or(true, |s| form.symbol() == s))
            .map(|(id, form)| self.receipt(form, *id, "NEW"))
            .collect())
    }

    fn cancel_order(&self, _symbol: &str, order_id: u64) -> anyhow::Result<OrderReceipt> {
        if self.fail_cancels {
            bail!("exchange error -2011: unknown order sent");
        }
        let form = self.form_for(order_id)?;
        self.canceled.lock().unwrap().push(order_id);
        self.statuses
            .lock()
            .unwrap()
            .insert(order_id, vec!["CANCELED"]);
        Ok(self.receipt(&form, order_id, "CANCELED"))
    }

    fn available_balance(&self, _asset: &str) -> anyhow::Result<f64> {
        Ok(1000.0)
    }
}
