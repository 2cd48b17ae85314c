use time::{macros::format_description, OffsetDateTime, UtcOffset};

struct Timer;
impl tracing_subscriber::fmt::time::FormatTime for Timer {
    fn format_time(
        &self,
        w: &mut tracing_subscriber::fmt::format::Writer<'_>,
    ) -> std::fmt::Result {
        let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        let now = local_now();
        write!(w, "{}", now.format(format).map_err(|_| std::fmt::Error)?)
    }
}

/// Appends to `file_name` in the working directory and mirrors every line to
/// stdout. The returned guard must stay alive until the process exits or the
/// tail of the log is lost.
pub fn init_log(file_name: &str) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing::Level;
    use tracing_subscriber::fmt::writer::MakeWriterExt;
    use tracing_subscriber::FmtSubscriber;

    let file_appender = tracing_appender::rolling::never(".", file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(non_blocking.and(std::io::stdout))
        .with_target(true)
        .with_timer(Timer)
        .with_ansi(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
    guard
}

pub fn stdout_logger() {
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_timer(Timer)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

pub fn local_now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    match UtcOffset::current_local_offset() {
        Ok(offset) => now.to_offset(offset),
        Err(_) => now,
    }
}

pub fn timestamp() -> String {
    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    local_now().format(format).unwrap_or_default()
}

/// Round to `dp` decimal places.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    let factor = 10f64.powi(dp as i32);
    (value * factor).round() / factor
}

/// Relative distance of `price` from `market_price`.
pub fn price_deviation(price: f64, market_price: f64) -> f64 {
    (price - market_price).abs() / market_price
}
