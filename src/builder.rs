//! Level-order construction of the portfolio state tree.

use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::error::{Result, SearchError};
use crate::prices::PriceSeries;
use crate::state::{BuyBound, NodeId, PortfolioState, StateTree};

/// Longest horizon a tree is ever built for, in days.
pub const MAX_HORIZON: usize = 30;

#[derive(Debug, Clone, Default)]
pub struct StateSpaceBuilder {
    buy_bound: BuyBound,
    max_nodes: Option<usize>,
}

impl StateSpaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buy_bound(mut self, buy_bound: BuyBound) -> Self {
        self.buy_bound = buy_bound;
        self
    }

    /// Abort construction once the tree would hold more than `max_nodes` nodes.
    pub fn with_max_nodes(mut self, max_nodes: Option<usize>) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn build(
        &self,
        prices: &PriceSeries,
        initial_amount: f64,
        initial_shares: u64,
        horizon: usize,
    ) -> Result<StateTree> {
        let horizon = clamp_horizon(horizon);

        if !initial_amount.is_finite() || initial_amount < 0.0 {
            return Err(SearchError::invalid(format!(
                "initial amount must be a non-negative number, got {}",
                initial_amount
            )));
        }
        if prices.len() < horizon + 1 {
            return Err(SearchError::invalid(format!(
                "a {}-day horizon needs {} prices, got {}",
                horizon,
                horizon + 1,
                prices.len()
            )));
        }
        if let Some(limit) = self.max_nodes {
            if limit == 0 {
                return Err(SearchError::NodeBudgetExceeded { limit });
            }
        }

        let mut nodes = vec![PortfolioState::root(prices[0], initial_amount, initial_shares)];
        let mut queue: VecDeque<NodeId> = VecDeque::from([StateTree::ROOT]);
        let mut children = Vec::new();
        let mut level = 0;
        let mut level_width = 0;

        while let Some(id) = queue.pop_front() {
            let day = nodes[id].day;
            if day != level {
                debug!(day = level, nodes = level_width, "state tree level complete");
                level = day;
                level_width = 0;
            }
            level_width += 1;

            if day >= horizon {
                continue;
            }

            children.clear();
            let room = self.max_nodes.map(|limit| limit - nodes.len());
            self.expand(&nodes[id], prices[day + 1], room, &mut children)?;

            let first = nodes.len();
            nodes.append(&mut children);
            let end = nodes.len();
            nodes[id].children = first..end;
            queue.extend(first..end);
        }
        debug!(day = level, nodes = level_width, "state tree level complete");
        debug!(total = nodes.len(), horizon, "state tree built");

        Ok(StateTree::from_nodes(nodes, horizon))
    }

    /// Applies Buy(0..buy_limit) then Sell(0..shares) to `state`.
    fn expand(
        &self,
        state: &PortfolioState,
        next_price: f64,
        room: Option<usize>,
        out: &mut Vec<PortfolioState>,
    ) -> Result<()> {
        let buy_limit = self.buy_bound.buy_limit(state.cash, state.price, next_price);
        let buys = (0..buy_limit).filter_map(|k| state.buy(k, next_price));
        let sells = (0..state.shares).filter_map(|k| state.sell(k, next_price));

        for child in buys.chain(sells) {
            if let (Some(room), Some(limit)) = (room, self.max_nodes) {
                if out.len() >= room {
                    return Err(SearchError::NodeBudgetExceeded { limit });
                }
            }
            out.push(child);
        }
        Ok(())
    }
}

pub fn clamp_horizon(horizon: usize) -> usize {
    if horizon > MAX_HORIZON {
        warn!(requested = horizon, max = MAX_HORIZON, "horizon clamped");
        MAX_HORIZON
    } else {
        horizon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Action;

    fn series(prices: &[f64]) -> PriceSeries {
        PriceSeries::new(prices.to_vec()).unwrap()
    }

    #[test]
    fn root_matches_initial_portfolio() {
        let tree = StateSpaceBuilder::new()
            .build(&series(&[10.0, 11.0, 12.0]), 30.0, 2, 2)
            .unwrap();
        let root = tree.root();

        assert_eq!(root.day, 0);
        assert_eq!(root.profit, 0.0);
        assert_eq!(root.cash, 30.0);
        assert_eq!(root.shares, 2);
        assert_eq!(root.price, 10.0);
        assert_eq!(root.action, None);
    }

    #[test]
    fn children_are_buys_then_sells_in_ascending_quantity() {
        // 25 cash at a next price of 10 affords Buy(0) and Buy(1); one share gives Sell(0)
        let tree = StateSpaceBuilder::new()
            .build(&series(&[10.0, 10.0]), 25.0, 1, 1)
            .unwrap();
        let actions: Vec<_> = tree
            .children(StateTree::ROOT)
            .iter()
            .map(|c| c.action.unwrap())
            .collect();

        assert_eq!(actions, vec![Action::Buy(0), Action::Buy(1), Action::Sell(0)]);
    }

    #[test]
    fn every_node_respects_day_cash_and_share_invariants() {
        let tree = StateSpaceBuilder::new()
            .build(&series(&[5.0, 4.0, 6.0, 5.0]), 12.0, 2, 3)
            .unwrap();

        for id in 0..tree.len() {
            let node = tree.node(id);
            assert!(node.cash >= 0.0);
            assert!(node.day <= 3);
            if node.day == 3 {
                assert!(node.is_leaf());
            }
            for child in tree.children(id) {
                assert_eq!(child.day, node.day + 1);
            }
        }
    }

    #[test]
    fn nodes_are_stored_in_level_order() {
        let tree = StateSpaceBuilder::new()
            .build(&series(&[5.0, 4.0, 6.0, 5.0]), 12.0, 2, 3)
            .unwrap();
        let days: Vec<_> = tree.iter().map(|n| n.day).collect();
        let mut sorted = days.clone();
        sorted.sort();

        assert_eq!(days, sorted);
    }

    #[test]
    fn zero_horizon_builds_root_only() {
        let tree = StateSpaceBuilder::new()
            .build(&series(&[10.0]), 100.0, 3, 0)
            .unwrap();

        assert_eq!(tree.len(), 1);
        assert!(tree.root().is_leaf());
    }

    #[test]
    fn horizon_is_clamped_to_thirty_days() {
        let prices = series(&[1.0; 40]);
        // no cash and no shares, so the root is a leaf
        let tree = StateSpaceBuilder::new().build(&prices, 0.0, 0, 35).unwrap();
        assert_eq!(tree.horizon(), MAX_HORIZON);

        let short = series(&[1.0; 20]);
        assert!(StateSpaceBuilder::new().build(&short, 0.0, 0, 35).is_err());
    }

    #[test]
    fn undersized_price_series_is_rejected() {
        let err = StateSpaceBuilder::new()
            .build(&series(&[10.0, 11.0]), 10.0, 0, 2)
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidInput(_)));
    }

    #[test]
    fn negative_amount_is_rejected() {
        let err = StateSpaceBuilder::new()
            .build(&series(&[10.0, 11.0]), -1.0, 0, 1)
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidInput(_)));
    }

    #[test]
    fn current_price_bound_enumerates_fewer_buys_when_price_falls() {
        let prices = series(&[50.0, 25.0]);
        let next = StateSpaceBuilder::new().build(&prices, 100.0, 0, 1).unwrap();
        let current = StateSpaceBuilder::new()
            .with_buy_bound(BuyBound::CurrentPrice)
            .build(&prices, 100.0, 0, 1)
            .unwrap();

        assert_eq!(next.root().child_count(), 4);
        assert_eq!(current.root().child_count(), 2);
    }

    #[test]
    fn current_price_bound_rejects_unaffordable_buys_when_price_rises() {
        // bound: floor(100 / 25) = 4 candidates; at 50 only Buy(0..=2) fit in 100 cash
        let prices = series(&[25.0, 50.0]);
        let current = StateSpaceBuilder::new()
            .with_buy_bound(BuyBound::CurrentPrice)
            .build(&prices, 100.0, 0, 1)
            .unwrap();
        let next = StateSpaceBuilder::new().build(&prices, 100.0, 0, 1).unwrap();

        let actions: Vec<_> = current
            .children(StateTree::ROOT)
            .iter()
            .map(|c| c.action.unwrap())
            .collect();
        assert_eq!(actions, vec![Action::Buy(0), Action::Buy(1), Action::Buy(2)]);
        assert_eq!(next.root().child_count(), 2);
    }

    #[test]
    fn node_budget_aborts_construction() {
        let prices = series(&[1.0, 1.0, 1.0, 1.0]);
        let err = StateSpaceBuilder::new()
            .with_max_nodes(Some(50))
            .build(&prices, 10.0, 0, 3)
            .unwrap_err();

        assert!(matches!(err, SearchError::NodeBudgetExceeded { limit: 50 }));
    }

    #[test]
    fn node_budget_admits_trees_that_fit() {
        let prices = series(&[10.0, 10.0]);
        let tree = StateSpaceBuilder::new()
            .with_max_nodes(Some(4))
            .build(&prices, 25.0, 1, 1)
            .unwrap();

        assert_eq!(tree.len(), 4);
    }
}
