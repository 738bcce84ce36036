use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{debug, warn};

use crate::builder::StateSpaceBuilder;
use crate::error::Result;
use crate::searcher::{ProfitSearcher, DEFAULT_ACCEPTABLE_RATIO};
use crate::state::BuyBound;

pub const DEFAULT_MAX_NODES: usize = 2_000_000;
/// Days searched when a request names no period. Trees grow by up to
/// `cash / price` children per node, so longer defaults overrun the node budget.
pub const DEFAULT_HORIZON: usize = 3;
pub const DEFAULT_CACHE_FILE: &str = "prices_cache.json";

/// Search settings, read from a JSON file. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Used when the request names no period.
    pub horizon: usize,
    pub acceptable_ratio: f64,
    /// Ignore the acceptable ratio and search the whole tree.
    pub exhaustive: bool,
    pub buy_bound: BuyBound,
    /// `null` removes the node budget.
    pub max_nodes: Option<usize>,
    pub cache_file: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            horizon: DEFAULT_HORIZON,
            acceptable_ratio: DEFAULT_ACCEPTABLE_RATIO,
            exhaustive: false,
            buy_bound: BuyBound::default(),
            max_nodes: Some(DEFAULT_MAX_NODES),
            cache_file: DEFAULT_CACHE_FILE.to_string(),
        }
    }
}

impl SearchConfig {
    /// Load a config from `path`. If missing or invalid, returns the defaults.
    pub fn load(path: &str) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => match serde_json::from_str::<SearchConfig>(&s) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path, error = %e, "could not parse config file, using defaults");
                    SearchConfig::default()
                }
            },
            Err(_) => {
                debug!(path, "no config file, using defaults");
                SearchConfig::default()
            }
        }
    }

    pub fn effective_ratio(&self) -> f64 {
        if self.exhaustive {
            f64::INFINITY
        } else {
            self.acceptable_ratio
        }
    }

    pub fn builder(&self) -> StateSpaceBuilder {
        StateSpaceBuilder::new()
            .with_buy_bound(self.buy_bound)
            .with_max_nodes(self.max_nodes)
    }

    pub fn searcher(&self) -> Result<ProfitSearcher> {
        ProfitSearcher::new(self.effective_ratio())
    }
}
