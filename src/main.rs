use std::sync::atomic::AtomicBool;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use futbot::binance_futures::BinanceKeys;
use futbot::market::binance_market::BinanceMarket;
use futbot::market::{Market, OrderForm, Side};
use futbot::sentiment;
use futbot::strategy::oco::{monitor_oco, place_oco, OcoOutcome, OcoParams};
use futbot::strategy::twap::{execute_twap, ChunkOrderType, TwapParams};
use futbot::utils::price_deviation;

#[derive(Parser)]
#[command(name = "futbot")]
#[command(about = "Binance USDT-M futures order tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API key (overrides the environment and the keys file)
    #[arg(long)]
    api_key: Option<String>,

    /// API secret (overrides the environment and the keys file)
    #[arg(long)]
    api_secret: Option<String>,

    /// Keys file path
    #[arg(long, default_value = "config/binance_keys.toml")]
    keys: String,

    /// Trade on the production exchange instead of the testnet
    #[arg(long)]
    live: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Place a market order
    Market {
        /// Trading symbol (e.g. BTCUSDT)
        symbol: String,
        /// BUY or SELL
        side: String,
        quantity: f64,
    },
    /// Place a limit order
    Limit {
        symbol: String,
        /// BUY or SELL
        side: String,
        quantity: f64,
        price: f64,
        /// List the open orders for the symbol afterwards
        #[arg(long)]
        check_orders: bool,
    },
    /// Place a take-profit/stop-loss pair, then cancel the survivor on fill
    Oco {
        symbol: String,
        /// BUY or SELL
        side: String,
        quantity: f64,
        /// Take profit limit price
        price: f64,
        /// Stop trigger price
        stop_price: f64,
        /// Stop limit price
        stop_limit_price: f64,
        /// Seconds between status polls
        #[arg(long, default_value_t = 5)]
        poll_secs: u64,
        /// Leave both legs on the book and exit without monitoring
        #[arg(long)]
        detach: bool,
    },
    /// Work a quantity in timed chunks
    Twap {
        symbol: String,
        /// BUY or SELL
        side: String,
        /// Total quantity to execute
        quantity: f64,
        duration_minutes: u64,
        /// Seconds between chunk orders
        interval_seconds: u64,
        /// MARKET or LIMIT chunks
        #[arg(long, default_value = "MARKET")]
        order_type: String,
    },
    /// Fear & greed index analysis
    Sentiment {
        /// Read the dataset from a JSON file
        #[arg(long)]
        data_file: Option<String>,
        /// Fetch the dataset from a URL
        #[arg(long)]
        data_url: Option<String>,
        /// Print the full report
        #[arg(long)]
        report: bool,
        /// Print only the trading recommendation
        #[arg(long)]
        recommendation: bool,
        /// Emit JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let guard = futbot::init_log("bot.log");
    if let Err(e) = run(cli) {
        error!("{e:#}");
        // flush the file writer before the abnormal exit
        drop(guard);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        command,
        api_key,
        api_secret,
        keys,
        live,
    } = cli;
    match command {
        Commands::Market {
            symbol,
            side,
            quantity,
        } => {
            let market = connect(api_key, api_secret, &keys, live)?;
            place_market_order(&market, &symbol, &side, quantity)
        }
        Commands::Limit {
            symbol,
            side,
            quantity,
            price,
            check_orders,
        } => {
            let market = connect(api_key, api_secret, &keys, live)?;
            place_limit_order(&market, &symbol, &side, quantity, price, check_orders)
        }
        Commands::Oco {
            symbol,
            side,
            quantity,
            price,
            stop_price,
            stop_limit_price,
            poll_secs,
            detach,
        } => {
            let market = connect(api_key, api_secret, &keys, live)?;
            run_oco(
                &market,
                &symbol,
                &side,
                quantity,
                price,
                stop_price,
                stop_limit_price,
                poll_secs,
                detach,
            )
        }
        Commands::Twap {
            symbol,
            side,
            quantity,
            duration_minutes,
            interval_seconds,
            order_type,
        } => {
            let market = connect(api_key, api_secret, &keys, live)?;
            run_twap(
                &market,
                &symbol,
                &side,
                quantity,
                duration_minutes,
                interval_seconds,
                &order_type,
            )
        }
        Commands::Sentiment {
            data_file,
            data_url,
            report,
            recommendation,
            json,
        } => run_sentiment(
            data_file.as_deref(),
            data_url.as_deref(),
            report,
            recommendation,
            json,
        ),
    }
}

fn connect(
    api_key: Option<String>,
    api_secret: Option<String>,
    keys_path: &str,
    live: bool,
) -> anyhow::Result<BinanceMarket> {
    let keys = BinanceKeys::resolve(api_key, api_secret, keys_path)?;
    BinanceMarket::new(keys, live)
}

/// Best effort; a missing balance is worth a warning, not an abort.
fn check_balance(market: &impl Market) {
    match market.available_balance("USDT") {
        Ok(balance) if balance > 0.0 => info!("available USDT balance: {balance}"),
        Ok(_) => warn!("no available USDT balance"),
        Err(e) => warn!("balance check failed: {e:#}"),
    }
}

fn place_market_order(
    market: &impl Market,
    symbol: &str,
    side: &str,
    quantity: f64,
) -> anyhow::Result<()> {
    let side: Side = side.parse()?;
    let form = OrderForm::market(symbol, side, quantity)?;
    check_balance(market);
    info!(
        "placing market order: {} {} {}",
        side.as_str(),
        quantity,
        form.symbol()
    );
    let receipt = market.place_order(&form)?;
    info!(
        "market order {}: status {} executed {} @ avg {}",
        receipt.order_id, receipt.status, receipt.executed_qty, receipt.avg_price
    );
    println!(
        "order {} {} {} qty {} status {} avg price {}",
        receipt.order_id,
        receipt.side,
        receipt.symbol,
        receipt.orig_qty,
        receipt.status,
        receipt.avg_price
    );
    Ok(())
}

fn place_limit_order(
    market: &impl Market,
    symbol: &str,
    side: &str,
    quantity: f64,
    price: f64,
    check_orders: bool,
) -> anyhow::Result<()> {
    let side: Side = side.parse()?;
    let form = OrderForm::limit(symbol, side, quantity, price)?;
    check_balance(market);
    match market.ticker_price(form.symbol()) {
        Ok(current) => {
            let deviation = price_deviation(price, current);
            if deviation > 0.1 {
                warn!(
                    "limit price {price} is {:.1}% away from the current price {current}",
                    deviation * 100.0
                );
            }
        }
        Err(e) => warn!("could not fetch the current price: {e:#}"),
    }
    info!(
        "placing limit order: {} {} {} @ {}",
        side.as_str(),
        quantity,
        form.symbol(),
        price
    );
    let receipt = market.place_order(&form)?;
    info!(
        "limit order {}: status {} price {}",
        receipt.order_id, receipt.status, receipt.price
    );
    println!(
        "order {} {} {} qty {} @ {} status {}",
        receipt.order_id,
        receipt.side,
        receipt.symbol,
        receipt.orig_qty,
        receipt.price,
        receipt.status
    );
    if check_orders {
        match market.open_orders(Some(form.symbol())) {
            Ok(orders) => {
                println!("{} open orders on {}", orders.len(), form.symbol());
                for o in orders {
                    println!(
                        "  {} {} {} qty {} @ {}",
                        o.order_id, o.side, o.order_type, o.orig_qty, o.price
                    );
                }
            }
            Err(e) => warn!("could not list open orders: {e:#}"),
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_oco(
    market: &impl Market,
    symbol: &str,
    side: &str,
    quantity: f64,
    price: f64,
    stop_price: f64,
    stop_limit_price: f64,
    poll_secs: u64,
    detach: bool,
) -> anyhow::Result<()> {
    let side: Side = side.parse()?;
    let params = OcoParams::new(symbol, side, quantity, price, stop_price, stop_limit_price)?;
    check_balance(market);
    let pair = place_oco(market, &params)?;
    println!(
        "OCO pair {} on {}: take profit order {} stop loss order {}",
        pair.list_id,
        params.symbol(),
        pair.take_profit.order_id,
        pair.stop_loss.order_id
    );
    if detach {
        info!("leaving both OCO legs on the book");
        return Ok(());
    }
    match monitor_oco(market, &pair, Duration::from_secs(poll_secs))? {
        OcoOutcome::Executed { filled, canceled } => match canceled {
            Some(id) => println!("order {filled} filled, order {id} cancelled"),
            None => println!("order {filled} filled, the other leg was already off the book"),
        },
        OcoOutcome::Closed => println!("both legs closed without a fill"),
    }
    Ok(())
}

fn run_twap(
    market: &impl Market,
    symbol: &str,
    side: &str,
    quantity: f64,
    duration_minutes: u64,
    interval_seconds: u64,
    order_type: &str,
) -> anyhow::Result<()> {
    let side: Side = side.parse()?;
    let order_type: ChunkOrderType = order_type.parse()?;
    let params = TwapParams::new(
        symbol,
        side,
        quantity,
        duration_minutes,
        interval_seconds,
        order_type,
    )?;
    check_balance(market);
    println!(
        "TWAP plan: {} {} {} in {} orders, one every {}s",
        params.side().as_str(),
        params.quantity(),
        params.symbol(),
        params.num_orders(),
        interval_seconds
    );
    let stop = AtomicBool::new(false);
    let summary = execute_twap(market, &params, params.interval(), &stop);
    println!("{summary}");
    Ok(())
}

fn run_sentiment(
    data_file: Option<&str>,
    data_url: Option<&str>,
    full_report: bool,
    recommendation_only: bool,
    json: bool,
) -> anyhow::Result<()> {
    let data = match (data_file, data_url) {
        (Some(path), _) => sentiment::load_from_file(path)?,
        (None, Some(url)) => sentiment::load_from_url(url)?,
        (None, None) => {
            info!("using the bundled sample dataset");
            sentiment::sample_data()
        }
    };
    if full_report {
        let report = sentiment::report(&data);
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }
        println!("market sentiment report ({})", report.timestamp);
        println!(
            "index {} ({})",
            report.current_sentiment.index, report.current_sentiment.classification
        );
        let rec = &report.trading_recommendation;
        println!(
            "recommendation: {} (confidence {}, risk {})",
            rec.action, rec.confidence, rec.risk_level
        );
        println!("  {}", rec.reason);
        if let Some(trend) = &report.trend_analysis {
            println!(
                "trend over {} points: {} ({} -> {}, {:+.2}%)",
                trend.period_days, trend.trend, trend.start_value, trend.end_value,
                trend.change_percent
            );
        }
    } else if recommendation_only {
        let rec = sentiment::recommendation(data.current_index);
        if json {
            println!("{}", serde_json::to_string_pretty(&rec)?);
            return Ok(());
        }
        println!(
            "recommendation: {} (confidence {}, risk {})",
            rec.action, rec.confidence, rec.risk_level
        );
        println!("  {}", rec.reason);
    } else {
        let current = sentiment::current_sentiment(&data);
        if json {
            println!("{}", serde_json::to_string_pretty(&current)?);
            return Ok(());
        }
        println!("index {} ({})", current.index, current.classification);
    }
    Ok(())
}
