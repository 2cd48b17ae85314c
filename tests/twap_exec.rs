mod common;

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use common::ScriptedMarket;
use futbot::market::{OrderType, Side};
use futbot::strategy::twap::{execute_twap, ChunkOrderType, TwapParams};

fn params(order_type: ChunkOrderType) -> TwapParams {
    TwapParams::new("BTCUSDT", Side::Buy, 10.0, 5, 60, order_type).unwrap()
}

#[test]
fn every_chunk_is_submitted() {
    futbot::stdout_logger();
    let market = ScriptedMarket::default();
    let stop = AtomicBool::new(false);
    let summary = execute_twap(&market, &params(ChunkOrderType::Market), Duration::ZERO, &stop);

    assert_eq!(summary.planned_orders, 5);
    assert_eq!(summary.orders_placed, 5);
    assert!((summary.executed_qty - 10.0).abs() < 1e-6);

    let placed = market.placed.lock().unwrap();
    assert_eq!(placed.len(), 5);
    for (_, form) in placed.iter() {
        assert_eq!(form.order_type(), OrderType::Market);
    }
}

#[test]
fn limit_chunks_ride_the_ticker() {
    let market = ScriptedMarket {
        ticker: 50000.0,
        ..Default::default()
    };
    let stop = AtomicBool::new(false);
    execute_twap(&market, &params(ChunkOrderType::Limit), Duration::ZERO, &stop);

    let placed = market.placed.lock().unwrap();
    assert_eq!(placed.len(), 5);
    for (_, form) in placed.iter() {
        assert_eq!(form.order_type(), OrderType::Limit);
        // buys rest 0.1% above the current price
        let price = form.price().unwrap();
        assert!((price - 50050.0).abs() < 1e-6);
    }
}

#[test]
fn sell_limit_chunks_rest_below_the_ticker() {
    let market = ScriptedMarket {
        ticker: 50000.0,
        ..Default::default()
    };
    let params =
        TwapParams::new("BTCUSDT", Side::Sell, 10.0, 5, 60, ChunkOrderType::Limit).unwrap();
    let stop = AtomicBool::new(false);
    execute_twap(&market, &params, Duration::ZERO, &stop);

    let placed = market.placed.lock().unwrap();
    let price = placed[0].1.price().unwrap();
    assert!((price - 49950.0).abs() < 1e-6);
}

#[test]
fn rejected_chunk_is_skipped_not_fatal() {
    let market = ScriptedMarket {
        fail_on: vec![2],
        ..Default::default()
    };
    let stop = AtomicBool::new(false);
    let summary = execute_twap(&market, &params(ChunkOrderType::Market), Duration::ZERO, &stop);

    assert_eq!(summary.planned_orders, 5);
    assert_eq!(summary.orders_placed, 4);
    assert_eq!(market.placed.lock().unwrap().len(), 4);
    assert!(summary.executed_qty < summary.requested_qty);
}

#[test]
fn raised_stop_flag_halts_the_run() {
    let market = ScriptedMarket::default();
    let stop = AtomicBool::new(true);
    let summary = execute_twap(&market, &params(ChunkOrderType::Market), Duration::ZERO, &stop);

    assert_eq!(summary.orders_placed, 0);
    assert_eq!(summary.planned_orders, 5);
    assert!(market.placed.lock().unwrap().is_empty());
}
