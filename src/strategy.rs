//! Multi-order execution strategies built on top of [`crate::market::Market`].

pub mod oco;
pub mod twap;
