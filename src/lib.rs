//! Finite-horizon profit search over buy/sell portfolio states.
//!
//! [`StateSpaceBuilder`] enumerates every portfolio reachable from an initial
//! cash amount and share count over a daily price series, and
//! [`ProfitSearcher`] walks the resulting tree breadth-first until a state
//! reaches the acceptable profit or the tree is exhausted.

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod prices;
pub mod query;
pub mod searcher;
pub mod state;

pub use builder::{StateSpaceBuilder, MAX_HORIZON};
pub use config::SearchConfig;
pub use engine::{compute_max_profit, run, SearchReport};
pub use error::{Result, SearchError};
pub use prices::{generate_prices, PriceSeries};
pub use query::InvestmentQuery;
pub use searcher::{ProfitSearcher, SearchOutcome, DEFAULT_ACCEPTABLE_RATIO};
pub use state::{Action, BuyBound, PortfolioState, StateTree};
