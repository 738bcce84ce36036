use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use profit_search::prices::{fetch_daily_closes, generate_prices, load_prices_from_cache};
use profit_search::{InvestmentQuery, PriceSeries, SearchConfig, SearchError, MAX_HORIZON};

const DEFAULT_CONFIG: &str = "profit_search.json";

#[derive(Parser, Debug)]
#[command(name = "profit-search", about = "Estimate the best profit reachable by trading one stock")]
struct Args {
    /// Request in plain words, e.g. "I have $200 and 3 shares of TCS, what can I make in 4 days?"
    #[arg(required = true)]
    message: Vec<String>,

    #[arg(long, default_value = DEFAULT_CONFIG)]
    config: String,

    /// Recorded price cache; overrides `cache_file` from the config
    #[arg(long)]
    prices_file: Option<String>,

    /// Fetch daily closes from Yahoo Finance when no cached series is found
    #[arg(long)]
    fetch: bool,

    /// First day of the fetched series (YYYY-MM-DD); defaults to 60 days ago
    #[arg(long)]
    start_date: Option<String>,

    /// Seed of the synthetic series used when no real prices are available
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long)]
    ratio: Option<f64>,

    #[arg(long)]
    exhaustive: bool,

    /// Print the full search report as JSON
    #[arg(long)]
    json: bool,
}

async fn resolve_prices(
    args: &Args,
    config: &SearchConfig,
    ticker: &str,
    horizon: usize,
) -> Result<PriceSeries, SearchError> {
    if let Some(path) = &args.prices_file {
        return load_prices_from_cache(path, ticker);
    }

    if Path::new(&config.cache_file).exists() {
        match load_prices_from_cache(&config.cache_file, ticker) {
            Ok(prices) => return Ok(prices),
            Err(e) => warn!(error = %e, "cached prices unusable"),
        }
    }

    if args.fetch {
        let start_date = match &args.start_date {
            Some(d) => d.clone(),
            None => (chrono::Local::now().date_naive() - chrono::Duration::days(60))
                .format("%Y-%m-%d")
                .to_string(),
        };
        return fetch_daily_closes(ticker, &start_date, horizon).await;
    }

    info!(seed = args.seed, "no recorded prices, using synthetic series");
    Ok(generate_prices(args.seed, horizon))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = SearchConfig::load(&args.config);
    if let Some(ratio) = args.ratio {
        config.acceptable_ratio = ratio;
    }
    config.exhaustive |= args.exhaustive;

    let query = InvestmentQuery::from_message(&args.message.join(" "))?;
    let horizon = query.horizon_days.unwrap_or(config.horizon).min(MAX_HORIZON);
    info!(
        ticker = %query.ticker,
        amount = query.amount,
        shares = query.shares,
        horizon,
        "request parsed"
    );

    let prices = resolve_prices(&args, &config, &query.ticker, horizon).await?;

    let (amount, shares) = (query.amount, query.shares);
    let search_config = config.clone();
    let result = tokio::task::spawn_blocking(move || {
        profit_search::run(&prices, amount, shares, horizon, &search_config)
    })
    .await?;

    let report = match result {
        Ok(report) => report,
        Err(e @ SearchError::NodeBudgetExceeded { .. }) => {
            eprintln!(
                "Too many possible trades to explore over {} days with {:.2}. Try a shorter period, a smaller amount, or raise max_nodes in {}.",
                horizon, amount, args.config
            );
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Best profit for {} over {} days: {:.2}",
            query.ticker, report.horizon, report.outcome.best_profit
        );
    }

    Ok(())
}
