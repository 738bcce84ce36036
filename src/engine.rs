//! Entry points that validate raw input, build the state tree and search it.

use serde::Serialize;
use tracing::info;

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::prices::PriceSeries;
use crate::searcher::SearchOutcome;

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub horizon: usize,
    pub node_count: usize,
    /// `null` in JSON when the search is exhaustive.
    pub acceptable_profit: f64,
    #[serde(flatten)]
    pub outcome: SearchOutcome,
}

/// Best profit reachable within `horizon` days, stopping early once a state
/// reaches `initial_amount * (1 + acceptable_ratio)`.
pub fn compute_max_profit(
    prices: &[f64],
    initial_amount: f64,
    initial_shares: i64,
    horizon: i64,
    acceptable_ratio: f64,
) -> Result<f64> {
    if horizon < 0 {
        return Err(SearchError::invalid(format!("horizon must not be negative, got {}", horizon)));
    }
    if initial_shares < 0 {
        return Err(SearchError::invalid(format!(
            "initial shares must not be negative, got {}",
            initial_shares
        )));
    }
    let prices = PriceSeries::new(prices.to_vec())?;
    let config = SearchConfig { acceptable_ratio, ..SearchConfig::default() };

    let report = run(&prices, initial_amount, initial_shares as u64, horizon as usize, &config)?;
    Ok(report.outcome.best_profit)
}

pub fn run(
    prices: &PriceSeries,
    initial_amount: f64,
    initial_shares: u64,
    horizon: usize,
    config: &SearchConfig,
) -> Result<SearchReport> {
    let searcher = config.searcher()?;
    let tree = config.builder().build(prices, initial_amount, initial_shares, horizon)?;
    let outcome = searcher.search(&tree, initial_amount);

    info!(
        horizon = tree.horizon(),
        nodes = tree.len(),
        best_profit = outcome.best_profit,
        early_exit = outcome.early_exit,
        "search complete"
    );

    Ok(SearchReport {
        horizon: tree.horizon(),
        node_count: tree.len(),
        acceptable_profit: searcher.acceptable_profit(initial_amount),
        outcome,
    })
}
