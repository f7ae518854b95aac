mod scrape;

use core::time::Duration;
use std::path::PathBuf;

use ocscr::{chain::ChainRequest, config};

#[derive(clap::Parser)]
#[command(about = "Polls the NSE option chain and appends both ends of it to a CSV sheet")]
struct Args {
    #[arg(short, long, default_value = config::SYMBOL)]
    symbol: String,
    /// Dropdown label, e.g. 29-Feb-2026
    #[arg(short, long, default_value = config::EXPIRY)]
    expiry: String,
    /// Rows taken from each end of the table
    #[arg(short = 'n', long, default_value_t = config::ROWS)]
    rows: usize,
    #[arg(short, long, value_name = "file", default_value = config::OUTPUT)]
    output: PathBuf,
    /// Seconds between the end of one fetch and the start of the next
    #[arg(short, long, value_name = "seconds", default_value_t = config::FETCH_INTERVAL.as_secs())]
    interval: u64,
    /// Show the browser window
    #[arg(long)]
    headed: bool,
    /// Fetch once and exit
    #[arg(long)]
    once: bool,
}

impl Args {
    fn request(&self) -> ChainRequest {
        ChainRequest {
            symbol: self.symbol.as_str().into(),
            expiry: self.expiry.as_str().into(),
            rows: self.rows,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;

    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();

    let interval = Duration::from_secs(args.interval);
    if interval < config::MIN_FETCH_INTERVAL {
        tracing::warn!(
            target: "main",
            "interval {interval:?} is below {:?}, expect throttling",
            config::MIN_FETCH_INTERVAL,
        );
    }

    let ctx = scrape::Context::new(args.request(), !args.headed)?;

    tracing::info!(
        target: "main",
        "\x1b[1;36mNSE option chain scraper started\x1b[0m: {} @ {}, {} rows per end -> {}",
        ctx.request.symbol,
        ctx.request.expiry,
        ctx.request.rows,
        args.output.display(),
    );

    loop {
        tracing::info!(target: "main", "fetching at {}", chrono::Local::now().format("%H:%M:%S"));

        let rows = scrape::work(&ctx).await;
        let saved = ocscr::sink::append_rows(&args.output, &rows)?;
        tracing::info!(target: "main", "\x1b[36msaved {saved} rows\x1b[0m");

        if args.once {
            break Ok(());
        }

        tracing::info!(target: "main", "waiting {}s ...", interval.as_secs());
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn no_flags_means_built_in_defaults() {
        let args = Args::try_parse_from(["nse-option-chain"]).unwrap();

        assert_eq!(args.symbol, config::SYMBOL);
        assert_eq!(args.expiry, config::EXPIRY);
        assert_eq!(args.rows, config::ROWS);
        assert_eq!(args.output, PathBuf::from(config::OUTPUT));
        assert_eq!(args.interval, 300);
        assert!(!args.headed);
        assert!(!args.once);
    }

    #[test]
    fn flags_override_the_request() {
        let args = Args::try_parse_from([
            "nse-option-chain",
            "--symbol",
            "BANKNIFTY",
            "-e",
            "26-Feb-2026",
            "-n",
            "3",
            "--once",
        ])
        .unwrap();

        let request = args.request();
        assert_eq!(request.symbol, "BANKNIFTY");
        assert_eq!(request.expiry, "26-Feb-2026");
        assert_eq!(request.rows, 3);
        assert!(args.once);
    }

    #[test]
    fn rows_must_be_a_number() {
        assert!(Args::try_parse_from(["nse-option-chain", "-n", "five"]).is_err());
    }
}
