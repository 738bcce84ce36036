//! Portfolio states and the buy/sell production rules that connect them.
//!
//! A state tree is stored as an arena in level order: the root is node 0 and
//! the children of every node occupy one contiguous range of ids.

use serde::{Deserialize, Serialize};
use std::ops::Range;

pub type NodeId = usize;

/// The transition that produced a state from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy(u64),
    Sell(u64),
}

/// Which price bounds the number of Buy actions enumerated at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyBound {
    /// `floor(cash / next_price)`: every enumerated purchase is affordable.
    #[default]
    NextPrice,
    /// `floor(cash / price)`: enumerated purchases that cost more than the
    /// available cash at the next day's price are rejected.
    CurrentPrice,
}

impl BuyBound {
    pub fn buy_limit(self, cash: f64, price: f64, next_price: f64) -> u64 {
        let bound_price = match self {
            BuyBound::NextPrice => next_price,
            BuyBound::CurrentPrice => price,
        };
        if bound_price <= 0.0 {
            return 0;
        }
        (cash / bound_price).floor() as u64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub price: f64,
    pub day: usize,
    pub cash: f64,
    pub shares: u64,
    /// Cumulative profit since day 0. Grows by the price move on every
    /// transition, whatever the quantity held or traded.
    pub profit: f64,
    /// `None` for the root.
    pub action: Option<Action>,
    pub(crate) children: Range<NodeId>,
}

impl PortfolioState {
    pub fn root(price: f64, cash: f64, shares: u64) -> Self {
        PortfolioState {
            price,
            day: 0,
            cash,
            shares,
            profit: 0.0,
            action: None,
            children: 0..0,
        }
    }

    /// Buy(k): spend `k * next_price` of cash on `k` shares.
    /// Returns `None` when the purchase would overdraw the cash.
    pub fn buy(&self, k: u64, next_price: f64) -> Option<Self> {
        let cash = self.cash - k as f64 * next_price;
        if cash < 0.0 {
            return None;
        }
        let shares = self.shares.checked_add(k)?;
        Some(self.successor(Action::Buy(k), next_price, cash, shares))
    }

    /// Sell(k): turn `k` held shares into cash at `next_price`.
    /// Returns `None` when fewer than `k` shares are held.
    pub fn sell(&self, k: u64, next_price: f64) -> Option<Self> {
        if k > self.shares {
            return None;
        }
        let cash = self.cash + k as f64 * next_price;
        Some(self.successor(Action::Sell(k), next_price, cash, self.shares - k))
    }

    fn successor(&self, action: Action, next_price: f64, cash: f64, shares: u64) -> Self {
        PortfolioState {
            price: next_price,
            day: self.day + 1,
            cash,
            shares,
            profit: self.profit + (next_price - self.price),
            action: Some(action),
            children: 0..0,
        }
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Immutable tree of reachable portfolio states.
#[derive(Debug, Clone)]
pub struct StateTree {
    nodes: Vec<PortfolioState>,
    horizon: usize,
}

impl StateTree {
    pub(crate) fn from_nodes(nodes: Vec<PortfolioState>, horizon: usize) -> Self {
        debug_assert!(!nodes.is_empty(), "a state tree always has a root");
        StateTree { nodes, horizon }
    }

    pub const ROOT: NodeId = 0;

    pub fn root(&self) -> &PortfolioState {
        &self.nodes[Self::ROOT]
    }

    pub fn node(&self, id: NodeId) -> &PortfolioState {
        &self.nodes[id]
    }

    pub fn child_ids(&self, id: NodeId) -> Range<NodeId> {
        self.nodes[id].children.clone()
    }

    pub fn children(&self, id: NodeId) -> &[PortfolioState] {
        &self.nodes[self.child_ids(id)]
    }

    /// Depth of the tree, i.e. the day of its deepest possible leaves.
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PortfolioState> {
        self.nodes.iter()
    }
}
