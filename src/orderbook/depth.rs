//! Read-only depth queries over the [`BookCache`].
//!
//! [`DepthView`] is what pricing, bet sizing and the momentum bot hold. It
//! cannot mutate books, and every No-contract figure it reports is derived
//! from the current Yes bids at read time.

use std::sync::Arc;

use serde::Serialize;

use crate::types::order::Side;
use crate::types::{Price, PriceLevel, Quantity};

use super::cache::BookCache;
use super::levels::BookSide;

/// Top-of-book summary for one market
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketQuote {
    /// Market ticker
    pub ticker: String,
    /// Whether the book has been seeded by a snapshot
    pub live: bool,
    /// Best Yes bid
    pub yes_bid: Option<PriceLevel>,
    /// Best Yes ask
    pub yes_ask: Option<PriceLevel>,
    /// Best No ask (`100 - yes_bid`, same quantity)
    pub no_ask: Option<PriceLevel>,
    /// Contracts on the Yes ask side in total
    pub yes_ask_depth: Quantity,
    /// Contracts on the derived No ask side in total
    pub no_ask_depth: Quantity,
}

impl MarketQuote {
    /// Midpoint of the Yes bid and ask in cents
    pub fn yes_mid(&self) -> Option<f64> {
        match (self.yes_bid, self.yes_ask) {
            (Some(bid), Some(ask)) => Some((f64::from(bid.price) + f64::from(ask.price)) / 2.0),
            _ => None,
        }
    }

    /// Price to buy `side`, if the book shows one
    pub fn ask_for(&self, side: Side) -> Option<PriceLevel> {
        match side {
            Side::Yes => self.yes_ask,
            Side::No => self.no_ask,
        }
    }
}

/// Cheap, cloneable read handle over a [`BookCache`]
#[derive(Debug, Clone)]
pub struct DepthView {
    cache: Arc<BookCache>,
}

impl DepthView {
    /// Wrap a shared cache
    pub fn new(cache: Arc<BookCache>) -> Self {
        Self { cache }
    }

    /// Best Yes bid
    pub fn best_bid(&self, ticker: &str) -> Option<PriceLevel> {
        self.cache.best_bid(ticker)
    }

    /// Best Yes ask
    pub fn best_ask(&self, ticker: &str) -> Option<PriceLevel> {
        self.cache.best_ask(ticker)
    }

    /// Price to buy No: `100 - best Yes bid`
    pub fn no_ask(&self, ticker: &str) -> Option<Price> {
        self.best_bid(ticker).map(|bid| Side::complement(bid.price))
    }

    /// Yes asks, ascending
    pub fn asks(&self, ticker: &str) -> Vec<PriceLevel> {
        self.cache.asks(ticker)
    }

    /// No asks derived from the Yes bids, ascending
    pub fn no_asks(&self, ticker: &str) -> Vec<PriceLevel> {
        self.cache
            .read_live(ticker, |book| book.no_asks())
            .unwrap_or_default()
    }

    /// Yes contracts purchasable at or below `max_price`
    pub fn available_contracts(&self, ticker: &str, max_price: Price) -> Quantity {
        self.cache.available_contracts(ticker, max_price)
    }

    /// No contracts purchasable at or below `max_price`.
    ///
    /// Buying No at `p` matches Yes bids at `100 - p` or higher.
    pub fn available_no_contracts(&self, ticker: &str, max_price: Price) -> Quantity {
        self.cache
            .read_live(ticker, |book| {
                book.depth_at_or_better(BookSide::Bid, Side::complement(max_price))
            })
            .unwrap_or(0)
    }

    /// Contracts of `side` purchasable at or below `max_price`
    pub fn available_for(&self, ticker: &str, side: Side, max_price: Price) -> Quantity {
        match side {
            Side::Yes => self.available_contracts(ticker, max_price),
            Side::No => self.available_no_contracts(ticker, max_price),
        }
    }

    /// Top-of-book summary, read under a single lock.
    ///
    /// `live` is `false` with every figure empty unless the book has had
    /// its first snapshot.
    pub fn quote(&self, ticker: &str) -> MarketQuote {
        let quote = self.cache.read_live(ticker, |book| {
            let yes_bid = book.best_bid();
            let yes_ask = book.best_ask();
            let asks = book.asks();
            let bids = book.bids();
            MarketQuote {
                ticker: ticker.to_string(),
                live: true,
                yes_bid,
                yes_ask,
                no_ask: yes_bid.map(|bid| PriceLevel::new(Side::complement(bid.price), bid.quantity)),
                yes_ask_depth: total(&asks),
                no_ask_depth: total(&bids),
            }
        });

        quote.unwrap_or_else(|| MarketQuote {
            ticker: ticker.to_string(),
            live: false,
            yes_bid: None,
            yes_ask: None,
            no_ask: None,
            yes_ask_depth: 0,
            no_ask_depth: 0,
        })
    }
}

fn total(levels: &[PriceLevel]) -> Quantity {
    levels
        .iter()
        .fold(0, |sum: Quantity, level| sum.saturating_add(level.quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::testing::{book, StaticSource};
    use crate::types::messages::SidePayload;

    async fn view_with(bids: Vec<[u64; 2]>, asks: Vec<[u64; 2]>) -> (Arc<BookCache>, DepthView) {
        let source = StaticSource::new().with_book("LAL", book(bids, asks));
        let cache = Arc::new(BookCache::new(Arc::new(source)));
        cache.subscribe("LAL").await;
        let view = DepthView::new(cache.clone());
        (cache, view)
    }

    #[tokio::test]
    async fn test_no_ask_is_complement_of_best_bid() {
        let (cache, view) = view_with(vec![[45, 10]], vec![[47, 3]]).await;
        assert_eq!(view.no_ask("LAL"), Some(55));

        cache.apply_delta(
            "LAL",
            &SidePayload {
                bids: vec![[50, 2]],
                asks: vec![],
            },
        );
        assert_eq!(view.no_ask("LAL"), Some(50));

        cache.apply_delta(
            "LAL",
            &SidePayload {
                bids: vec![[50, 0], [45, 0]],
                asks: vec![],
            },
        );
        assert_eq!(view.no_ask("LAL"), None);
    }

    #[tokio::test]
    async fn test_no_side_depth() {
        let (_cache, view) = view_with(vec![[45, 10], [42, 5], [30, 50]], vec![]).await;

        assert_eq!(
            view.no_asks("LAL"),
            vec![
                PriceLevel::new(55, 10),
                PriceLevel::new(58, 5),
                PriceLevel::new(70, 50)
            ]
        );
        // No at <= 58 crosses Yes bids at >= 42
        assert_eq!(view.available_no_contracts("LAL", 58), 15);
        assert_eq!(view.available_for("LAL", Side::No, 54), 0);
    }

    #[tokio::test]
    async fn test_quote() {
        let (_cache, view) = view_with(vec![[45, 10], [44, 1]], vec![[47, 3], [49, 7]]).await;
        let quote = view.quote("LAL");

        assert!(quote.live);
        assert_eq!(quote.yes_ask, Some(PriceLevel::new(47, 3)));
        assert_eq!(quote.no_ask, Some(PriceLevel::new(55, 10)));
        assert_eq!(quote.yes_ask_depth, 10);
        assert_eq!(quote.no_ask_depth, 11);
        assert_eq!(quote.yes_mid(), Some(46.0));
        assert_eq!(quote.ask_for(Side::No).map(|l| l.price), Some(55));
    }

    #[tokio::test]
    async fn test_quote_for_unknown_market_is_empty() {
        let (_cache, view) = view_with(vec![], vec![]).await;
        let quote = view.quote("UNKNOWN");

        assert!(!quote.live);
        assert_eq!(quote.yes_bid, None);
        assert_eq!(quote.yes_mid(), None);
        assert_eq!(view.available_contracts("UNKNOWN", 99), 0);
        assert!(view.no_asks("UNKNOWN").is_empty());
    }

    #[tokio::test]
    async fn test_quote_while_subscribing_is_not_live() {
        let cache = Arc::new(BookCache::new(Arc::new(StaticSource::new())));
        cache.subscribe("LAL").await;
        cache.apply_delta(
            "LAL",
            &SidePayload {
                bids: vec![[45, 10]],
                asks: vec![],
            },
        );

        let quote = DepthView::new(cache).quote("LAL");
        assert!(!quote.live);
        assert_eq!(quote.yes_bid, None);
        assert_eq!(quote.no_ask_depth, 0);
    }
}
