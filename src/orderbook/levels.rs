//! Per-side sorted price levels.
//!
//! A [`LevelStore`] keeps one side of one market's book in a `BTreeMap`
//! keyed by price. The map gives O(log n) upserts and a sorted view for
//! free; the store's [`BookSide`] decides which end of the map is the most
//! competitive.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Price, PriceLevel, Quantity};

/// Which side of the book a level rests on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookSide {
    /// Buy interest; higher prices are more competitive
    Bid,
    /// Sell interest; lower prices are more competitive
    Ask,
}

impl BookSide {
    /// Whether `price` is at or better than `limit` on this side
    #[inline]
    pub fn at_or_better(self, price: Price, limit: Price) -> bool {
        match self {
            BookSide::Bid => price >= limit,
            BookSide::Ask => price <= limit,
        }
    }
}

/// Sorted collection of price levels for one side of a book.
///
/// Invariant: no stored level has quantity 0, and prices are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelStore {
    side: BookSide,
    levels: BTreeMap<Price, Quantity>,
}

impl LevelStore {
    /// Create an empty store for `side`
    #[must_use]
    pub fn new(side: BookSide) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    /// The side this store represents
    #[must_use]
    pub const fn side(&self) -> BookSide {
        self.side
    }

    /// Set the quantity resting at `price`.
    ///
    /// A zero quantity removes the level; removing an absent level is a no-op.
    pub fn upsert(&mut self, price: Price, quantity: Quantity) {
        if quantity == 0 {
            self.levels.remove(&price);
        } else {
            self.levels.insert(price, quantity);
        }
    }

    /// Replace every level with `levels`.
    ///
    /// Entries sharing a price are merged into one level holding their
    /// combined quantity; zero quantities are skipped.
    pub fn replace(&mut self, levels: impl IntoIterator<Item = PriceLevel>) {
        self.levels.clear();
        for level in levels.into_iter().filter(|l| l.quantity > 0) {
            let resting = self.levels.entry(level.price).or_insert(0);
            *resting = resting.saturating_add(level.quantity);
        }
    }

    /// Quantity resting at `price`, if any
    #[must_use]
    pub fn get(&self, price: Price) -> Option<Quantity> {
        self.levels.get(&price).copied()
    }

    /// Most competitive price, or `None` when empty
    #[must_use]
    pub fn best(&self) -> Option<PriceLevel> {
        let entry = match self.side {
            BookSide::Bid => self.levels.last_key_value(),
            BookSide::Ask => self.levels.first_key_value(),
        };
        entry.map(|(&price, &quantity)| PriceLevel::new(price, quantity))
    }

    /// Levels in competitiveness order (best first)
    pub fn iter(&self) -> Box<dyn Iterator<Item = PriceLevel> + '_> {
        let levels = self.levels.iter().map(|(&p, &q)| PriceLevel::new(p, q));
        match self.side {
            BookSide::Bid => Box::new(levels.rev()),
            BookSide::Ask => Box::new(levels),
        }
    }

    /// Copy of the levels in competitiveness order
    #[must_use]
    pub fn levels(&self) -> Vec<PriceLevel> {
        self.iter().collect()
    }

    /// Total quantity priced at or better than `limit`.
    ///
    /// Walks from the best level and stops at the first level worse than
    /// the limit.
    #[must_use]
    pub fn depth_at_or_better(&self, limit: Price) -> Quantity {
        let side = self.side;
        self.iter()
            .take_while(|level| side.at_or_better(level.price, limit))
            .fold(0, |total: Quantity, level| total.saturating_add(level.quantity))
    }

    /// Sum of all resting quantity
    #[must_use]
    pub fn total_quantity(&self) -> Quantity {
        self.levels
            .values()
            .fold(0, |total: Quantity, &q| total.saturating_add(q))
    }

    /// Number of price levels
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the store has no levels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Remove every level
    pub fn clear(&mut self) {
        self.levels.clear();
    }
}
