use std::time::Duration;

use anyhow::{anyhow, Context};
use hmac::{Hmac, Mac};
use reqwest::{blocking::Client, Method};
use serde::{de::DeserializeOwned, Deserialize};
use sha2::Sha256;
use time::OffsetDateTime;

use crate::error::ApiError;

pub mod model;

use model::{AssetBalance, OrderResponse, TickerPrice};

pub const MAINNET_API: &str = "https://fapi.binance.com";
pub const TESTNET_API: &str = "https://testnet.binancefuture.com";

const RECV_WINDOW_MS: u64 = 10000;
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Deserialize)]
pub struct BinanceKeys {
    pub api_key: String,
    pub secret_key: String,
}
impl BinanceKeys {
    pub fn value_parse(path: &str) -> anyhow::Result<Self> {
        let c = std::fs::read_to_string(path)?;
        let val: Self = toml::from_str(&c)?;
        Ok(val)
    }

    /// CLI flags win, then `BINANCE_API_KEY`/`BINANCE_API_SECRET`, then the
    /// keys file.
    pub fn resolve(
        api_key: Option<String>,
        secret_key: Option<String>,
        path: &str,
    ) -> anyhow::Result<Self> {
        match (api_key, secret_key) {
            (Some(api_key), Some(secret_key)) => Ok(Self {
                api_key,
                secret_key,
            }),
            (None, None) => {
                if let (Ok(api_key), Ok(secret_key)) = (
                    std::env::var("BINANCE_API_KEY"),
                    std::env::var("BINANCE_API_SECRET"),
                ) {
                    return Ok(Self {
                        api_key,
                        secret_key,
                    });
                }
                Self::value_parse(path)
                    .with_context(|| format!("no credentials given and keys file {path} unusable"))
            }
            _ => Err(anyhow!("--api-key and --api-secret must be given together")),
        }
    }
}
opaque_debug::implement!(BinanceKeys);

/// Signed REST client for the USDT-M futures API.
pub struct FuturesRest {
    client: Client,
    base: String,
    keys: BinanceKeys,
    recv_window: u64,
}
opaque_debug::implement!(FuturesRest);

impl FuturesRest {
    pub fn new(keys: BinanceKeys, live: bool) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("building http client failed")?;
        let base = if live { MAINNET_API } else { TESTNET_API };
        Ok(Self {
            client,
            base: base.to_string(),
            keys,
            recv_window: RECV_WINDOW_MS,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn ticker_price(&self, symbol: &str) -> anyhow::Result<TickerPrice> {
        self.public_get(
            "/fapi/v1/ticker/price",
            vec![("symbol".to_string(), symbol.to_string())],
        )
    }

    pub fn balances(&self) -> anyhow::Result<Vec<AssetBalance>> {
        self.send(Method::GET, "/fapi/v2/balance", Vec::new())
    }

    pub fn place_order(&self, params: Vec<(String, String)>) -> anyhow::Result<OrderResponse> {
        self.send(Method::POST, "/fapi/v1/order", params)
    }

    pub fn query_order(&self, symbol: &str, order_id: u64) -> anyhow::Result<OrderResponse> {
        self.send(
            Method::GET,
            "/fapi/v1/order",
            vec![
                ("symbol".to_string(), symbol.to_string()),
                ("orderId".to_string(), order_id.to_string()),
            ],
        )
    }

    pub fn open_orders(&self, symbol: Option<&str>) -> anyhow::Result<Vec<OrderResponse>> {
        let mut params = Vec::new();
        if let Some(symbol) = symbol {
            params.push(("symbol".to_string(), symbol.to_string()));
        }
        self.send(Method::GET, "/fapi/v1/openOrders", params)
    }

    pub fn cancel_order(&self, symbol: &str, order_id: u64) -> anyhow::Result<OrderResponse> {
        self.send(
            Method::DELETE,
            "/fapi/v1/order",
            vec![
                ("symbol".to_string(), symbol.to_string()),
                ("orderId".to_string(), order_id.to_string()),
            ],
        )
    }

    /// Appends recvWindow, timestamp and the HMAC-SHA256 signature the signed
    /// endpoints require.
    fn signed_query(&self, mut params: Vec<(String, String)>) -> anyhow::Result<String> {
        params.push(("recvWindow".to_string(), self.recv_window.to_string()));
        params.push(("timestamp".to_string(), timestamp_ms().to_string()));
        let query = serde_urlencoded::to_string(&params)?;
        let signature = signature(&self.keys.secret_key, &query)?;
        Ok(format!("{query}&signature={signature}"))
    }

    fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: Vec<(String, String)>,
    ) -> anyhow::Result<T> {
        let query = self.signed_query(params)?;
        let url = format!("{}{}?{}", self.base, path, query);
        let response = self
            .client
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.keys.api_key)
            .send()
            .with_context(|| format!("request to {path} failed"))?;
        decode(path, response)
    }

    fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> anyhow::Result<T> {
        let query = serde_urlencoded::to_string(&params)?;
        let url = format!("{}{}?{}", self.base, path, query);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("request to {path} failed"))?;
        decode(path, response)
    }
}

fn signature(secret: &str, query: &str) -> anyhow::Result<String> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| anyhow!("invalid secret key"))?;
    mac.update(query.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn timestamp_ms() -> u64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64
}

fn decode<T: DeserializeOwned>(
    path: &str,
    response: reqwest::blocking::Response,
) -> anyhow::Result<T> {
    let status = response.status();
    let body = response
        .text()
        .with_context(|| format!("reading {path} response"))?;
    if !status.is_success() {
        let err = serde_json::from_str::<ApiError>(&body).unwrap_or(ApiError {
            code: status.as_u16() as i64,
            msg: body,
        });
        return Err(err.into());
    }
    serde_json::from_str(&body).with_context(|| format!("decoding {path} response"))
}
