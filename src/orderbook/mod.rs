//! Real-time orderbook cache.
//!
//! This module keeps a consistent, low-latency view of per-market depth by
//! combining an authoritative REST snapshot with the streaming delta feed:
//!
//! - [`levels`] - one side of a book, sorted by price
//! - [`book`] - [`Orderbook`], both sides of one market
//! - [`cache`] - [`BookCache`], every subscribed market and its state
//! - [`feed`] - [`BookFeed`], the reconnecting stream that updates the cache
//! - [`depth`] - [`DepthView`], the read-only handle consumers hold
//!
//! # Example
//!
//! ```rust
//! use kalshi_fast_trader::orderbook::{BookSide, Orderbook};
//! use kalshi_fast_trader::types::PriceLevel;
//!
//! let mut book = Orderbook::new("KXNBAGAME-25JAN15LALBOS-LAL");
//!
//! book.apply_snapshot(vec![PriceLevel::new(45, 10)], vec![PriceLevel::new(47, 5)]);
//! book.apply_delta(BookSide::Ask, vec![PriceLevel::new(46, 2)]);
//!
//! assert_eq!(book.best_ask(), Some(PriceLevel::new(46, 2)));
//! assert_eq!(book.no_ask(), Some(55));
//! ```

pub mod book;
pub mod cache;
pub mod depth;
pub mod feed;
pub mod levels;

#[cfg(test)]
pub(crate) mod testing;

pub use book::Orderbook;
pub use cache::{BookCache, BookState, SnapshotSource};
pub use depth::{DepthView, MarketQuote};
pub use feed::{BookFeed, Connector, FeedStats, FeedStream};
pub use levels::{BookSide, LevelStore};
