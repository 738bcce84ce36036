use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::error::{Result, SearchError};
use crate::state::{NodeId, StateTree};

/// Profit of 50% over the initial amount is good enough.
pub const DEFAULT_ACCEPTABLE_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub best_profit: f64,
    /// True when a state met the acceptable profit and ended the search.
    pub early_exit: bool,
    /// Nodes taken off the work queue.
    pub expanded: usize,
    pub deepest_expanded_day: usize,
}

/// Breadth-first satisficing search over a state tree.
#[derive(Debug, Clone, Copy)]
pub struct ProfitSearcher {
    acceptable_ratio: f64,
}

impl Default for ProfitSearcher {
    fn default() -> Self {
        ProfitSearcher { acceptable_ratio: DEFAULT_ACCEPTABLE_RATIO }
    }
}

impl ProfitSearcher {
    /// `acceptable_ratio` may be infinite, which disables the early exit.
    pub fn new(acceptable_ratio: f64) -> Result<Self> {
        if acceptable_ratio.is_nan() || acceptable_ratio < 0.0 {
            return Err(SearchError::invalid(format!(
                "acceptable ratio must be a non-negative number, got {}",
                acceptable_ratio
            )));
        }
        Ok(ProfitSearcher { acceptable_ratio })
    }

    pub fn exhaustive() -> Self {
        ProfitSearcher { acceptable_ratio: f64::INFINITY }
    }

    pub fn acceptable_profit(&self, initial_amount: f64) -> f64 {
        if self.acceptable_ratio.is_infinite() {
            return f64::INFINITY;
        }
        initial_amount * (1.0 + self.acceptable_ratio)
    }

    pub fn search(&self, tree: &StateTree, initial_amount: f64) -> SearchOutcome {
        let acceptable = self.acceptable_profit(initial_amount);
        let mut outcome = SearchOutcome {
            best_profit: 0.0,
            early_exit: false,
            expanded: 0,
            deepest_expanded_day: 0,
        };
        let mut queue: VecDeque<NodeId> = VecDeque::from([StateTree::ROOT]);

        while let Some(id) = queue.pop_front() {
            outcome.expanded += 1;
            outcome.deepest_expanded_day = outcome.deepest_expanded_day.max(tree.node(id).day);

            for child_id in tree.child_ids(id) {
                let child = tree.node(child_id);
                if child.profit >= acceptable {
                    info!(
                        profit = child.profit,
                        acceptable,
                        day = child.day,
                        "acceptable profit reached"
                    );
                    outcome.best_profit = child.profit;
                    outcome.early_exit = true;
                    return outcome;
                }
                if child.profit > outcome.best_profit {
                    outcome.best_profit = child.profit;
                }
                queue.push_back(child_id);
            }
        }

        debug!(best = outcome.best_profit, expanded = outcome.expanded, "search exhausted tree");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StateSpaceBuilder;
    use crate::prices::PriceSeries;

    fn tree(prices: &[f64], amount: f64, shares: u64, horizon: usize) -> StateTree {
        StateSpaceBuilder::new()
            .build(&PriceSeries::new(prices.to_vec()).unwrap(), amount, shares, horizon)
            .unwrap()
    }

    #[test]
    fn stops_at_first_state_meeting_threshold() {
        // profit reaches 150 on day 2, then collapses on day 3
        let t = tree(&[10.0, 20.0, 160.0, 5.0], 100.0, 1, 3);
        let outcome = ProfitSearcher::default().search(&t, 100.0);

        assert_eq!(outcome.best_profit, 150.0);
        assert!(outcome.early_exit);
        assert_eq!(outcome.expanded, 2);
        assert!(outcome.deepest_expanded_day <= 1);
    }

    #[test]
    fn reports_best_profit_seen_when_threshold_is_never_met() {
        let t = tree(&[10.0, 12.0, 11.0], 20.0, 1, 2);
        let outcome = ProfitSearcher::default().search(&t, 20.0);

        assert_eq!(outcome.best_profit, 2.0);
        assert!(!outcome.early_exit);
        assert_eq!(outcome.expanded, t.len());
    }

    #[test]
    fn losing_series_reports_zero() {
        let t = tree(&[10.0, 9.0, 8.0], 20.0, 1, 2);
        assert_eq!(ProfitSearcher::default().search(&t, 20.0).best_profit, 0.0);
    }

    #[test]
    fn root_only_tree_yields_zero() {
        let t = tree(&[10.0], 100.0, 5, 0);
        let outcome = ProfitSearcher::default().search(&t, 100.0);

        assert_eq!(outcome.best_profit, 0.0);
        assert_eq!(outcome.expanded, 1);
    }

    #[test]
    fn exhaustive_search_visits_every_node() {
        let t = tree(&[10.0, 20.0, 160.0, 5.0], 100.0, 1, 3);
        let outcome = ProfitSearcher::exhaustive().search(&t, 100.0);

        assert!(!outcome.early_exit);
        assert_eq!(outcome.expanded, t.len());
        assert_eq!(outcome.best_profit, 150.0);
    }

    #[test]
    fn zero_ratio_accepts_any_profit_covering_the_amount() {
        let searcher = ProfitSearcher::new(0.0).unwrap();
        assert_eq!(searcher.acceptable_profit(100.0), 100.0);
        assert_eq!(ProfitSearcher::exhaustive().acceptable_profit(0.0), f64::INFINITY);
    }

    #[test]
    fn invalid_ratio_is_rejected() {
        assert!(ProfitSearcher::new(-0.1).is_err());
        assert!(ProfitSearcher::new(f64::NAN).is_err());
        assert!(ProfitSearcher::new(f64::INFINITY).is_ok());
    }
}
