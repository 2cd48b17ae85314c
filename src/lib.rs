pub mod binance_futures;
pub mod error;
pub mod market;
pub mod sentiment;
pub mod strategy;

pub mod utils;
pub use utils::{init_log, stdout_logger};
