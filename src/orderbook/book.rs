//! Core orderbook data structure.
//!
//! An [`Orderbook`] holds the Yes-contract bid and ask ladders for one market
//! as two [`LevelStore`]s:
//!
//! - O(log n) insertion, deletion, and lookup
//! - O(1) access to best bid/ask
//! - Ordered iteration for depth-of-book queries

use crate::types::order::Side;
use crate::types::{now_ms, Price, PriceLevel, Quantity, TimestampMs};

use super::levels::{BookSide, LevelStore};

/// Orderbook for a single Kalshi market.
///
/// # Design Decisions
///
/// 1. **Integer prices**: Prices are stored as `u8` cents, avoiding
///    floating-point arithmetic and enabling exact comparisons.
///
/// 2. **Overwrite semantics**: Snapshots and deltas both carry absolute
///    quantities, so replaying the same delta is harmless.
///
/// 3. **Derived No side**: The price to buy No is `100 - best Yes bid`. It is
///    computed on every read and never stored.
///
/// # Thread Safety
///
/// This struct is `Send + Sync` but not internally synchronized. The
/// [`BookCache`](super::BookCache) wraps each book in a `parking_lot::RwLock`.
#[derive(Debug, Clone)]
pub struct Orderbook {
    /// Market ticker
    market_ticker: String,

    /// Yes bids, best = highest
    bids: LevelStore,

    /// Yes asks, best = lowest
    asks: LevelStore,

    /// Wall-clock time of the last snapshot or delta (0 = never updated)
    last_update_ms: TimestampMs,
}

impl Orderbook {
    /// Create a new empty orderbook for the given market
    #[must_use]
    pub fn new(market_ticker: impl Into<String>) -> Self {
        Self {
            market_ticker: market_ticker.into(),
            bids: LevelStore::new(BookSide::Bid),
            asks: LevelStore::new(BookSide::Ask),
            last_update_ms: 0,
        }
    }

    /// Get the market ticker
    #[must_use]
    pub fn market_ticker(&self) -> &str {
        &self.market_ticker
    }

    /// When the book last changed, in Unix milliseconds
    #[must_use]
    pub const fn last_update_ms(&self) -> TimestampMs {
        self.last_update_ms
    }

    fn side_mut(&mut self, side: BookSide) -> &mut LevelStore {
        match side {
            BookSide::Bid => &mut self.bids,
            BookSide::Ask => &mut self.asks,
        }
    }

    fn side(&self, side: BookSide) -> &LevelStore {
        match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        }
    }

    /// Replace both sides of the book.
    pub fn apply_snapshot(
        &mut self,
        bids: impl IntoIterator<Item = PriceLevel>,
        asks: impl IntoIterator<Item = PriceLevel>,
    ) {
        self.bids.replace(bids);
        self.asks.replace(asks);
        self.last_update_ms = now_ms();
    }

    /// Fold `changes` into one side, in order.
    ///
    /// Each change sets the absolute quantity at its price; 0 removes it.
    pub fn apply_delta(&mut self, side: BookSide, changes: impl IntoIterator<Item = PriceLevel>) {
        let store = self.side_mut(side);
        for change in changes {
            store.upsert(change.price, change.quantity);
        }
        self.last_update_ms = now_ms();
    }

    /// Set a price level directly. A quantity of 0 removes the level.
    pub fn set_level(&mut self, side: BookSide, price: Price, quantity: Quantity) {
        self.side_mut(side).upsert(price, quantity);
    }

    /// Get the best bid (highest yes bid)
    #[must_use]
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.best()
    }

    /// Get the best ask (lowest yes ask)
    #[must_use]
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.best()
    }

    /// Price to buy the No contract: `100 - best Yes bid`
    #[must_use]
    pub fn no_ask(&self) -> Option<Price> {
        self.best_bid().map(|level| Side::complement(level.price))
    }

    /// No-contract ask ladder derived from the Yes bids, ascending
    #[must_use]
    pub fn no_asks(&self) -> Vec<PriceLevel> {
        self.bids
            .iter()
            .map(|level| PriceLevel::new(Side::complement(level.price), level.quantity))
            .collect()
    }

    /// Contracts available on `side` at or better than `limit`.
    ///
    /// For asks this counts levels priced `<= limit`, for bids `>= limit`.
    #[must_use]
    pub fn depth_at_or_better(&self, side: BookSide, limit: Price) -> Quantity {
        self.side(side).depth_at_or_better(limit)
    }

    /// Get the mid price
    ///
    /// Returns the average of best bid and best ask, or `None` if either is missing.
    #[must_use]
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((f64::from(bid.price) + f64::from(ask.price)) / 2.0),
            _ => None,
        }
    }

    /// Get the spread in cents
    #[must_use]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price.saturating_sub(bid.price)),
            _ => None,
        }
    }

    /// Check if the book is crossed (best bid >= best ask)
    ///
    /// This shouldn't happen in a healthy market but is useful for validation.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }

    /// All bid levels, sorted by price descending (best first)
    #[must_use]
    pub fn bids(&self) -> Vec<PriceLevel> {
        self.bids.levels()
    }

    /// All ask levels, sorted by price ascending (best first)
    #[must_use]
    pub fn asks(&self) -> Vec<PriceLevel> {
        self.asks.levels()
    }

    /// Check if the orderbook is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Get the number of price levels as `(bids, asks)`
    #[must_use]
    pub fn num_levels(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }
}
