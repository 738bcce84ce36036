//! Daily price series and the sources they come from
//!
//! This module handles:
//! - Validating a price series before it reaches the state builder
//! - Loading recorded series from a JSON cache file
//! - Fetching daily closes from the Yahoo Finance chart API
//! - Generating a seeded synthetic series for offline runs

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::ops::Index;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Result, SearchError};

// Band of the synthetic generator, matching the placeholder prices of the chat bot
const SYNTHETIC_FLOOR: f64 = 20.0;
const SYNTHETIC_SPREAD: f64 = 20.0;

/// Ordered daily prices, day 0 first. Every price is finite and non-negative.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Vec<f64>")]
pub struct PriceSeries(Vec<f64>);

impl PriceSeries {
    pub fn new(prices: Vec<f64>) -> Result<Self> {
        if prices.is_empty() {
            return Err(SearchError::invalid("price series is empty"));
        }
        if let Some((day, price)) = prices
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p < 0.0)
        {
            return Err(SearchError::invalid(format!(
                "price on day {} must be a non-negative number, got {}",
                day, price
            )));
        }
        Ok(PriceSeries(prices))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Keep the first `days` prices.
    pub fn truncated(mut self, days: usize) -> Self {
        self.0.truncate(days.max(1));
        self
    }
}

impl TryFrom<Vec<f64>> for PriceSeries {
    type Error = SearchError;

    fn try_from(prices: Vec<f64>) -> Result<Self> {
        PriceSeries::new(prices)
    }
}

impl Index<usize> for PriceSeries {
    type Output = f64;

    fn index(&self, day: usize) -> &f64 {
        &self.0[day]
    }
}

/// Deterministic stand-in for a real price feed: `horizon + 1` prices in [20, 40).
pub fn generate_prices(seed: u64, horizon: usize) -> PriceSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let prices = (0..=horizon)
        .map(|_| SYNTHETIC_FLOOR + rng.gen::<f64>() * SYNTHETIC_SPREAD)
        .collect();
    PriceSeries(prices)
}

#[derive(Debug, Deserialize)]
struct PriceCache {
    #[serde(default)]
    generated_at: Option<String>,
    series: HashMap<String, PriceSeries>,
}

/// Load the recorded series for `ticker` from a cache file shaped like
/// `{ "generated_at": "...", "series": { "TCS": [101.5, 102.0, ...] } }`.
/// Ticker lookup ignores case.
pub fn load_prices_from_cache(cache_file: &str, ticker: &str) -> Result<PriceSeries> {
    let contents = fs::read_to_string(cache_file).map_err(|e| {
        SearchError::PriceSource(format!("Failed to read cache file '{}': {}", cache_file, e))
    })?;
    let cache: PriceCache = serde_json::from_str(&contents)?;

    debug!(
        cache_file,
        tickers = cache.series.len(),
        generated_at = cache.generated_at.as_deref().unwrap_or("unknown"),
        "loaded price cache"
    );

    cache
        .series
        .into_iter()
        .find(|(t, _)| t.eq_ignore_ascii_case(ticker))
        .map(|(_, series)| series)
        .ok_or_else(|| {
            SearchError::PriceSource(format!("No cached prices for {} in '{}'", ticker, cache_file))
        })
}

/// Fetch `horizon + 1` daily closes for `ticker` starting at `start_date` (YYYY-MM-DD).
pub async fn fetch_daily_closes(ticker: &str, start_date: &str, horizon: usize) -> Result<PriceSeries> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let start = chrono::NaiveDate::parse_from_str(start_date, "%Y-%m-%d")?;
    // Weekends and holidays: ask for twice the calendar span plus a week
    let end = start + chrono::Duration::days(horizon as i64 * 2 + 7);
    let start_timestamp = midnight_timestamp(start)?;
    let end_timestamp = midnight_timestamp(end)?;

    let url = format!(
        "https://query1.finance.yahoo.com/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
        ticker, start_timestamp, end_timestamp
    );
    info!(ticker, start_date, horizon, "fetching daily closes");

    let resp = client.get(&url).send().await?.error_for_status()?;
    let json: Value = resp.json().await?;

    let closes = extract_close_prices(&json)
        .ok_or_else(|| SearchError::PriceSource(format!("No close prices in response for {}", ticker)))?;
    if closes.len() < horizon + 1 {
        return Err(SearchError::PriceSource(format!(
            "Only {} closes available for {} from {}, need {}",
            closes.len(),
            ticker,
            start_date,
            horizon + 1
        )));
    }

    Ok(PriceSeries::new(closes)?.truncated(horizon + 1))
}

fn midnight_timestamp(date: chrono::NaiveDate) -> Result<i64> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| SearchError::PriceSource(format!("Invalid date {}", date)))
}

/// Extract close prices from a Yahoo Finance chart response, skipping null closes.
fn extract_close_prices(json: &Value) -> Option<Vec<f64>> {
    let result = json["chart"]["result"].as_array()?.first()?;
    let quotes = result["indicators"]["quote"].as_array()?.first()?;
    let closes = quotes["close"].as_array()?;

    Some(closes.iter().filter_map(|v| v.as_f64()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_empty_and_negative_series() {
        assert!(matches!(PriceSeries::new(vec![]), Err(SearchError::InvalidInput(_))));
        assert!(matches!(
            PriceSeries::new(vec![1.0, -2.0]),
            Err(SearchError::InvalidInput(_))
        ));
        assert!(PriceSeries::new(vec![1.0, f64::NAN]).is_err());
        assert!(PriceSeries::new(vec![0.0, 3.5]).is_ok());
    }

    #[test]
    fn generator_is_deterministic_and_banded() {
        let a = generate_prices(42, 30);
        let b = generate_prices(42, 30);

        assert_eq!(a, b);
        assert_eq!(a.len(), 31);
        assert!(a.as_slice().iter().all(|p| (20.0..40.0).contains(p)));
        assert_ne!(a, generate_prices(43, 30));
    }

    #[test]
    fn loads_series_from_cache_file() {
        let path = std::env::temp_dir().join(format!("profit_search_cache_{}.json", std::process::id()));
        let body = json!({
            "generated_at": "2026-10-01",
            "series": { "TCS": [10.0, 11.0, 12.5], "INFY": [5.0] }
        });
        fs::write(&path, body.to_string()).unwrap();
        let path = path.to_str().unwrap();

        let series = load_prices_from_cache(path, "tcs").unwrap();
        assert_eq!(series.as_slice(), &[10.0, 11.0, 12.5]);
        assert!(matches!(
            load_prices_from_cache(path, "WIPRO"),
            Err(SearchError::PriceSource(_))
        ));

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn cache_with_invalid_prices_fails_to_parse() {
        let path = std::env::temp_dir().join(format!("profit_search_bad_{}.json", std::process::id()));
        fs::write(&path, r#"{"series": {"TCS": []}}"#).unwrap();
        let path = path.to_str().unwrap();

        assert!(matches!(load_prices_from_cache(path, "TCS"), Err(SearchError::Json(_))));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_cache_file_is_a_price_source_error() {
        assert!(matches!(
            load_prices_from_cache("/nonexistent/prices.json", "TCS"),
            Err(SearchError::PriceSource(_))
        ));
    }

    #[test]
    fn extracts_closes_and_skips_nulls() {
        let body = json!({
            "chart": { "result": [ {
                "indicators": { "quote": [ { "close": [101.0, null, 103.5, 99.25] } ] }
            } ] }
        });
        assert_eq!(extract_close_prices(&body), Some(vec![101.0, 103.5, 99.25]));
        assert_eq!(extract_close_prices(&json!({ "chart": { "result": [] } })), None);
    }

    #[test]
    fn truncation_keeps_the_leading_days() {
        let series = PriceSeries::new(vec![1.0, 2.0, 3.0, 4.0]).unwrap().truncated(2);
        assert_eq!(series.as_slice(), &[1.0, 2.0]);
    }

    #[tokio::test]
    async fn fetch_rejects_malformed_start_date() {
        let err = fetch_daily_closes("TCS", "19-10-2026", 5).await.unwrap_err();
        assert!(matches!(err, SearchError::Date(_)));
    }
}
