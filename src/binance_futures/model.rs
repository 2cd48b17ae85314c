use serde::Deserialize;

/// Latest price for a symbol, `GET /fapi/v1/ticker/price`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerPrice {
    pub symbol: String,
    pub price: String,
    #[serde(default)]
    pub time: u64,
}

/// One wallet row of `GET /fapi/v2/balance`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBalance {
    pub asset: String,
    pub balance: String,
    pub available_balance: String,
}

/// Order state as returned by place, query and cancel calls on
/// `/fapi/v1/order` and by `/fapi/v1/openOrders`. Decimal fields arrive as
/// strings and stay strings here; `avgPrice` is absent from cancel responses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: u64,
    pub client_order_id: String,
    pub symbol: String,
    pub status: String,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(default)]
    pub time_in_force: String,
    pub price: String,
    #[serde(default)]
    pub avg_price: String,
    pub orig_qty: String,
    pub executed_qty: String,
    #[serde(default)]
    pub stop_price: String,
    #[serde(default)]
    pub update_time: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_response_decodes_without_avg_price() {
        // shape of a DELETE /fapi/v1/order response
        let body = r#"{
            "clientOrderId": "cli_x1", "cumQty": "0", "cumQuote": "0",
            "executedQty": "0", "orderId": 283194212, "origQty": "11",
            "origType": "LIMIT", "price": "51000", "reduceOnly": false,
            "side": "SELL", "positionSide": "BOTH", "status": "CANCELED",
            "stopPrice": "0", "closePosition": false, "symbol": "BTCUSDT",
            "timeInForce": "GTC", "type": "LIMIT",
            "updateTime": 1571110484038
        }"#;
        let order: OrderResponse = serde_json::from_str(body).unwrap();
        assert_eq!(order.order_id, 283194212);
        assert_eq!(order.status, "CANCELED");
        assert_eq!(order.avg_price, "");
        assert_eq!(order.order_type, "LIMIT");
    }

    #[test]
    fn ticker_price_decodes() {
        let body = r#"{"symbol": "BTCUSDT", "price": "50123.40", "time": 1712042629058}"#;
        let ticker: TickerPrice = serde_json::from_str(body).unwrap();
        assert_eq!(ticker.price, "50123.40");
    }
}
