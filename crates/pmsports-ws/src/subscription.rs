//! Subscription set tracking.
//!
//! Holds the market identifiers the feed should be subscribed to. Entries are
//! never removed. Iteration order is insertion order, which is also the order
//! subscribe requests go out on the wire.

use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Debug, Default)]
struct SetInner {
    order: Vec<String>,
    members: HashSet<String>,
}

/// Insertion-ordered set of market identifiers, safe to share across tasks.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    inner: RwLock<SetInner>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a market identifier. Returns `false` if it was already present.
    pub fn insert(&self, market: impl Into<String>) -> bool {
        let market = market.into();
        let mut inner = self.inner.write();
        if !inner.members.insert(market.clone()) {
            return false;
        }
        inner.order.push(market);
        true
    }

    /// Insert many identifiers under one lock. Returns how many were new.
    pub fn extend<I, S>(&self, markets: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.inner.write();
        let mut added = 0;
        for market in markets {
            let market = market.into();
            if inner.members.insert(market.clone()) {
                inner.order.push(market);
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, market: &str) -> bool {
        self.inner.read().members.contains(market)
    }

    /// Copy of the identifiers in iteration order.
    pub fn snapshot(&self) -> Vec<String> {
        self.inner.read().order.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
