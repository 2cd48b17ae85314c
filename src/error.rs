use serde::Deserialize;
use thiserror::Error;

/// Error payload returned by the exchange on a non-2xx response.
#[derive(Error, Debug, Clone, Deserialize)]
#[error("exchange error {code}: {msg}")]
pub struct ApiError {
    pub code: i64,
    pub msg: String,
}
