use clap::{Args, Parser, Subcommand};
use macd_screener::analysis::{self, NewsOptions, ScreenOptions, SummaryOptions, TickerSource};
use macd_screener::storage_utils::{AppConfig, AsyncStorageManager};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "macd-screener")]
#[command(about = "Screen tickers for MACD/RSI signals and headline sentiment", long_about = None)]
struct Cli {
    /// Storage directory (defaults to `storage/` next to the executable)
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flag tickers whose MACD stayed above its signal line
    Screen(ScreenArgs),
    /// Score recent headlines and show the most positive and negative tickers
    Sentiment(NewsArgs),
    /// Collect recent analyst price-target changes
    Targets(NewsArgs),
    /// Five-number summary of closing prices per ticker
    Summary(PriceArgs),
}

#[derive(Args, Clone, Default)]
struct TickerArgs {
    /// Comma-separated symbols, e.g. "AAPL,MSFT"
    #[arg(short, long)]
    tickers: Option<String>,

    /// Add every S&P 500 constituent (used when no symbols are given)
    #[arg(long)]
    sp500: bool,
}

impl From<TickerArgs> for TickerSource {
    fn from(args: TickerArgs) -> Self {
        Self {
            typed: args.tickers,
            sp500: args.sp500,
        }
    }
}

#[derive(Args, Clone, Default)]
struct PriceArgs {
    #[command(flatten)]
    tickers: TickerArgs,

    /// History to download, e.g. 1mo, 3mo, 6mo, 1y
    #[arg(short, long)]
    period: Option<String>,

    /// Bar size, e.g. 1d, 1h
    #[arg(short, long)]
    interval: Option<String>,

    /// Concurrent requests
    #[arg(short, long)]
    workers: Option<usize>,

    /// Spreadsheet path
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Clone, Default)]
struct ScreenArgs {
    #[command(flatten)]
    prices: PriceArgs,

    /// Sessions MACD must stay above the signal line
    #[arg(long)]
    lookback: Option<usize>,

    #[arg(long)]
    rsi_period: Option<usize>,

    /// Write every screened ticker, not only flagged ones
    #[arg(long)]
    all: bool,

    /// Join the average headline sentiment of flagged tickers
    #[arg(long)]
    with_sentiment: bool,

    /// Reuse the prices saved by the previous run instead of downloading
    #[arg(long)]
    cached: bool,
}

#[derive(Args, Clone, Default)]
struct NewsArgs {
    #[command(flatten)]
    tickers: TickerArgs,

    /// Headlines kept per ticker
    #[arg(long)]
    headlines: Option<usize>,

    /// Price-target window in days
    #[arg(long, value_parser = clap::value_parser!(i64).range(0..=36_500))]
    days: Option<i64>,

    /// Concurrent requests
    #[arg(short, long)]
    workers: Option<usize>,

    /// Spreadsheet path
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl PriceArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(period) = &self.period {
            config.prices.period = period.clone();
        }
        if let Some(interval) = &self.interval {
            config.prices.interval = interval.clone();
        }
        if let Some(workers) = self.workers {
            config.fetch.workers = workers;
        }
    }
}

impl ScreenArgs {
    fn apply(&self, config: &mut AppConfig) {
        self.prices.apply(config);
        if let Some(lookback) = self.lookback {
            config.indicators.lookback = lookback;
        }
        if let Some(period) = self.rsi_period {
            config.indicators.rsi_period = period;
        }
    }
}

impl NewsArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(headlines) = self.headlines {
            config.news.headlines_per_ticker = headlines;
        }
        if let Some(days) = self.days {
            config.news.target_window_days = days;
        }
        if let Some(workers) = self.workers {
            config.news.workers = workers;
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let storage = match cli.storage {
        Some(dir) => AsyncStorageManager::new(dir).await?,
        None => AsyncStorageManager::new_relative("storage").await?,
    };
    let mut config = storage.load_or_init_config().await?;

    match cli.command {
        Commands::Screen(args) => {
            args.apply(&mut config);
            analysis::validate_price_config(&config)?;
            let opts = ScreenOptions {
                tickers: args.prices.tickers.into(),
                include_all: args.all,
                with_sentiment: args.with_sentiment,
                cached: args.cached,
                output: args.prices.output,
            };
            analysis::run_screen(&config, &storage, opts).await
        }
        Commands::Sentiment(args) => {
            args.apply(&mut config);
            let opts = NewsOptions {
                tickers: args.tickers.into(),
                output: args.output,
            };
            analysis::run_sentiment(&config, &storage, opts).await
        }
        Commands::Targets(args) => {
            args.apply(&mut config);
            let opts = NewsOptions {
                tickers: args.tickers.into(),
                output: args.output,
            };
            analysis::run_targets(&config, &storage, opts).await
        }
        Commands::Summary(args) => {
            args.apply(&mut config);
            analysis::validate_price_config(&config)?;
            let opts = SummaryOptions {
                tickers: args.tickers.into(),
                output: args.output,
            };
            analysis::run_summary(&config, &storage, opts).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_screen_flags_override_config() {
        let cli = Cli::parse_from([
            "macd-screener", "screen", "-t", "aapl,msft", "--period", "6mo", "--lookback", "5", "--all",
        ]);
        let Commands::Screen(args) = cli.command else {
            panic!("expected screen");
        };
        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.prices.period, "6mo");
        assert_eq!(config.prices.interval, "1d");
        assert_eq!(config.indicators.lookback, 5);
        assert!(args.all);
        assert_eq!(args.prices.tickers.tickers.as_deref(), Some("aapl,msft"));
    }

    #[test]
    fn test_news_flags_override_config() {
        let cli = Cli::parse_from(["macd-screener", "targets", "--sp500", "--days", "14", "-w", "3"]);
        let Commands::Targets(args) = cli.command else {
            panic!("expected targets");
        };
        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.news.target_window_days, 14);
        assert_eq!(config.news.workers, 3);
        assert_eq!(config.news.headlines_per_ticker, 2);
        assert!(args.tickers.sp500);
    }

    #[test]
    fn test_days_out_of_range_rejected() {
        assert!(Cli::try_parse_from(["macd-screener", "targets", "--days", "100000000"]).is_err());
        assert!(Cli::try_parse_from(["macd-screener", "targets", "--days=-1"]).is_err());
        assert!(Cli::try_parse_from(["macd-screener", "targets", "--days", "365"]).is_ok());
    }
}
