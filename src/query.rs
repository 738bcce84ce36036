use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, SearchError};

pub const DEFAULT_TICKER: &str = "TCS";
pub const DEFAULT_AMOUNT: f64 = 500.0;
pub const DEFAULT_SHARES: u64 = 0;

static AMOUNT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"\$\s*([0-9][0-9,]*(?:\.[0-9]+)?)",
        r"([0-9][0-9,]*(?:\.[0-9]+)?)\s*(?:dollars|usd|rupees|inr|rs\b)",
        r"(?:budget|cash|amount|invest)\w*\s+(?:of|is)?\s*([0-9][0-9,]*(?:\.[0-9]+)?)",
    ])
});
static SHARES_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9][0-9,]*)\s+(?:shares|stocks)").expect("valid regex"));
static TICKER_AFTER_OF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:shares?|stocks?)\s+(?:of|in)\s+([A-Za-z][A-Za-z.]{0,9})").expect("valid regex")
});
static TICKER_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Z]{2,5})\b").expect("valid regex"));
static DAYS_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*days?").expect("valid regex"));
static WEEKS_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*weeks?").expect("valid regex"));
static GOAL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:by|until|till|before)\s+(\d{4}-\d{2}-\d{2})").expect("valid regex"));

// Upper-case words that are never tickers
const NOT_TICKERS: &[&str] = &["USD", "INR", "RS", "AM", "PM", "OK"];
// Words that follow "shares of" / "shares in" without naming a stock
const NOT_TICKER_WORDS: &[&str] = &[
    "my", "your", "our", "his", "her", "their", "the", "a", "an", "this", "that", "it", "them",
    "total", "all", "each", "every", "some", "any", "stock", "stocks", "company", "account",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).expect("valid regex")).collect()
}

/// What the user asked for, extracted from a free-text request such as
/// "I have $500 and 10 shares of TCS, what can I make in 5 days?"
#[derive(Debug, Clone, PartialEq)]
pub struct InvestmentQuery {
    pub ticker: String,
    pub amount: f64,
    pub shares: u64,
    /// `None` when the request names no period; the configured horizon applies.
    pub horizon_days: Option<usize>,
}

impl InvestmentQuery {
    pub fn from_message(message: &str) -> Result<Self> {
        Self::from_message_on(message, chrono::Local::now().date_naive())
    }

    /// Parse `message` with `today` as the reference for goal dates.
    pub fn from_message_on(message: &str, today: NaiveDate) -> Result<Self> {
        let message = message.trim();
        if message.is_empty() {
            return Err(SearchError::Query("empty request".to_string()));
        }
        let lower = message.to_lowercase();

        let amount = AMOUNT_PATTERNS
            .iter()
            .find_map(|re| extract_number::<f64>(&lower, re))
            .unwrap_or(DEFAULT_AMOUNT);

        let shares = extract_number::<u64>(&lower, &SHARES_PATTERN).unwrap_or(DEFAULT_SHARES);

        let ticker = Self::extract_ticker(message).unwrap_or_else(|| DEFAULT_TICKER.to_string());

        let horizon_days = match GOAL_DATE.captures(&lower).and_then(|c| c.get(1)) {
            Some(m) => {
                let goal = NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d")?;
                let days = (goal - today).num_days();
                if days < 0 {
                    return Err(SearchError::Query(format!("goal date {} is in the past", goal)));
                }
                Some(days as usize)
            }
            None => period_days(&lower)?,
        };

        Ok(InvestmentQuery { ticker, amount, shares, horizon_days })
    }

    fn extract_ticker(message: &str) -> Option<String> {
        let named = TICKER_AFTER_OF
            .captures(message)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|t| !NOT_TICKER_WORDS.contains(&t.to_lowercase().as_str()));
        if let Some(t) = named {
            return Some(t.to_uppercase());
        }
        TICKER_TOKEN
            .captures_iter(message)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .find(|t| !NOT_TICKERS.contains(t))
            .map(str::to_string)
    }
}

/// Length of a "N days" / "N weeks" / "a month" period, if the request names one.
fn period_days(lower: &str) -> Result<Option<usize>> {
    if let Some(days) = extract_number::<usize>(lower, &DAYS_PATTERN) {
        return Ok(Some(days));
    }
    if let Some(weeks) = extract_number::<usize>(lower, &WEEKS_PATTERN) {
        return weeks
            .checked_mul(7)
            .map(Some)
            .ok_or_else(|| SearchError::Query(format!("a period of {} weeks is too long", weeks)));
    }
    if lower.contains("a month") {
        return Ok(Some(30));
    }
    Ok(lower.contains("a week").then_some(7))
}

fn extract_number<T: std::str::FromStr>(text: &str, re: &Regex) -> Option<T> {
    re.captures(text)?.get(1)?.as_str().replace(',', "").parse().ok()
}
