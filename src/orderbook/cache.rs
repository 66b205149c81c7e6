//! Registry of live orderbooks keyed by market ticker.
//!
//! This module provides [`BookCache`], the single owner of every [`Orderbook`]
//! in the process. Books are seeded from a REST snapshot when a ticker is
//! first subscribed and then kept current by the streaming feed.
//!
//! # Design
//!
//! The registry is a `parking_lot::RwLock` around a map of per-book
//! `RwLock`s. Registering a ticker takes the outer write lock briefly;
//! applying a message takes the outer read lock plus one book's write lock,
//! so updates to different markets never block each other and readers only
//! wait for the single message being applied to their book.
//!
//! # State
//!
//! Each ticker moves `Unsubscribed -> Subscribing -> Live`. Reads return
//! nothing until the ticker is `Live`, which happens on the first successful
//! snapshot from either REST or the feed.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::types::messages::{BookPayload, FeedMessage, SidePayload};
use crate::types::{Price, PriceLevel, Quantity};

use super::levels::BookSide;
use super::Orderbook;

/// Source of authoritative orderbook snapshots.
///
/// Implemented by [`RestClient`](crate::client::RestClient); tests plug in
/// canned books.
pub trait SnapshotSource: Send + Sync {
    /// Fetch the full book for `ticker`
    fn fetch_orderbook<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, Result<BookPayload, Error>>;
}

/// Subscription state of a ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookState {
    /// Never requested
    Unsubscribed,
    /// Registered, waiting for the first snapshot
    Subscribing,
    /// Seeded by a snapshot and receiving updates
    Live,
}

#[derive(Debug)]
struct BookEntry {
    book: Orderbook,
    state: BookState,
}

/// Thread-safe cache of orderbooks for every subscribed market.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use kalshi_fast_trader::{Config, orderbook::BookCache};
/// use kalshi_fast_trader::client::RestClient;
///
/// # async fn example() -> kalshi_fast_trader::Result<()> {
/// let rest = Arc::new(RestClient::new(&Config::from_env()?)?);
/// let cache = Arc::new(BookCache::new(rest));
///
/// cache.subscribe("KXNBAGAME-25JAN15LALBOS-LAL").await;
///
/// if let Some(ask) = cache.best_ask("KXNBAGAME-25JAN15LALBOS-LAL") {
///     println!("Yes ask: {} x {}", ask.price, ask.quantity);
/// }
/// # Ok(())
/// # }
/// ```
pub struct BookCache {
    books: RwLock<FxHashMap<String, RwLock<BookEntry>>>,
    source: Arc<dyn SnapshotSource>,
    /// Tickers registered since the feed last drained them
    pending: Mutex<Vec<String>>,
    added: Notify,
}

impl std::fmt::Debug for BookCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookCache")
            .field("markets", &self.len())
            .finish_non_exhaustive()
    }
}

impl BookCache {
    /// Create an empty cache that seeds new books from `source`
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            books: RwLock::new(FxHashMap::default()),
            source,
            pending: Mutex::new(Vec::new()),
            added: Notify::new(),
        }
    }

    /// Start tracking `ticker` and seed it from a REST snapshot.
    ///
    /// Returns `false` without doing anything if the ticker is already
    /// registered. A failed fetch is logged and leaves the ticker in
    /// [`BookState::Subscribing`] with an empty book; use [`resync`] to retry.
    /// The running feed is woken so it can subscribe the ticker on the live
    /// connection.
    ///
    /// [`resync`]: BookCache::resync
    pub async fn subscribe(&self, ticker: &str) -> bool {
        if !self.register(ticker) {
            return false;
        }
        info!(ticker = %ticker, "subscribed market");

        self.pending.lock().push(ticker.to_string());
        self.added.notify_one();

        if let Err(e) = self.seed(ticker).await {
            warn!(ticker = %ticker, error = %e, "initial snapshot failed, waiting for feed");
        }
        true
    }

    /// Re-fetch the REST snapshot for a registered ticker.
    ///
    /// Returns `Ok(false)` for a ticker that was never subscribed.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the cached book is left untouched.
    pub async fn resync(&self, ticker: &str) -> Result<bool, Error> {
        if !self.books.read().contains_key(ticker) {
            return Ok(false);
        }
        self.seed(ticker).await?;
        Ok(true)
    }

    fn register(&self, ticker: &str) -> bool {
        let mut books = self.books.write();
        if books.contains_key(ticker) {
            return false;
        }
        books.insert(
            ticker.to_string(),
            RwLock::new(BookEntry {
                book: Orderbook::new(ticker),
                state: BookState::Subscribing,
            }),
        );
        true
    }

    async fn seed(&self, ticker: &str) -> Result<(), Error> {
        let payload = self.source.fetch_orderbook(ticker).await?;
        self.apply_snapshot(ticker, &payload);
        debug!(ticker = %ticker, "seeded book from REST snapshot");
        Ok(())
    }

    /// Apply one decoded feed message.
    ///
    /// Returns `true` if a tracked book changed. Messages for tickers that
    /// were never subscribed are ignored.
    pub(crate) fn apply_message(&self, message: &FeedMessage) -> bool {
        match message {
            FeedMessage::OrderbookSnapshot(msg) => {
                self.apply_snapshot(&msg.market_ticker, &msg.orderbook)
            }
            FeedMessage::OrderbookDelta(msg) => match &msg.yes {
                Some(changes) => self.apply_delta(&msg.market_ticker, changes),
                None => false,
            },
            _ => false,
        }
    }

    /// Replace a tracked book and mark it live
    pub(crate) fn apply_snapshot(&self, ticker: &str, payload: &BookPayload) -> bool {
        let books = self.books.read();
        let Some(entry) = books.get(ticker) else {
            debug!(ticker = %ticker, "ignoring snapshot for untracked market");
            return false;
        };

        let mut entry = entry.write();
        entry
            .book
            .apply_snapshot(payload.yes.bid_levels(), payload.yes.ask_levels());
        if entry.state != BookState::Live {
            info!(ticker = %ticker, "book is live");
        }
        entry.state = BookState::Live;
        true
    }

    /// Fold both sides of a delta into a tracked book.
    ///
    /// Deltas reaching a book that is still waiting for its snapshot are
    /// applied anyway; the snapshot will overwrite them.
    pub(crate) fn apply_delta(&self, ticker: &str, changes: &SidePayload) -> bool {
        let books = self.books.read();
        let Some(entry) = books.get(ticker) else {
            debug!(ticker = %ticker, "ignoring delta for untracked market");
            return false;
        };

        let mut entry = entry.write();
        entry.book.apply_delta(BookSide::Bid, changes.bid_levels());
        entry.book.apply_delta(BookSide::Ask, changes.ask_levels());
        true
    }

    /// Run `f` against a live book
    pub(crate) fn read_live<T>(&self, ticker: &str, f: impl FnOnce(&Orderbook) -> T) -> Option<T> {
        let books = self.books.read();
        let entry = books.get(ticker)?.read();
        (entry.state == BookState::Live).then(|| f(&entry.book))
    }

    /// Best (lowest) Yes ask, or `None` for an unknown or not-yet-live market
    pub fn best_ask(&self, ticker: &str) -> Option<PriceLevel> {
        self.read_live(ticker, Orderbook::best_ask).flatten()
    }

    /// Best (highest) Yes bid, or `None` for an unknown or not-yet-live market
    pub fn best_bid(&self, ticker: &str) -> Option<PriceLevel> {
        self.read_live(ticker, Orderbook::best_bid).flatten()
    }

    /// Yes ask levels in ascending price order
    pub fn asks(&self, ticker: &str) -> Vec<PriceLevel> {
        self.read_live(ticker, Orderbook::asks).unwrap_or_default()
    }

    /// Yes bid levels in descending price order
    pub fn bids(&self, ticker: &str) -> Vec<PriceLevel> {
        self.read_live(ticker, Orderbook::bids).unwrap_or_default()
    }

    /// Contracts purchasable at or below `max_price` on the Yes ask side
    pub fn available_contracts(&self, ticker: &str, max_price: Price) -> Quantity {
        self.read_live(ticker, |book| {
            book.depth_at_or_better(BookSide::Ask, max_price)
        })
        .unwrap_or(0)
    }

    /// Copy of a live book
    pub fn get_orderbook(&self, ticker: &str) -> Option<Orderbook> {
        self.read_live(ticker, Orderbook::clone)
    }

    /// Current subscription state of `ticker`
    pub fn state(&self, ticker: &str) -> BookState {
        self.books
            .read()
            .get(ticker)
            .map_or(BookState::Unsubscribed, |entry| entry.read().state)
    }

    /// Every registered ticker
    pub fn tickers(&self) -> Vec<String> {
        self.books.read().keys().cloned().collect()
    }

    /// Registered tickers still waiting for their first snapshot
    pub fn markets_needing_snapshot(&self) -> Vec<String> {
        self.books
            .read()
            .iter()
            .filter(|(_, entry)| entry.read().state == BookState::Subscribing)
            .map(|(ticker, _)| ticker.clone())
            .collect()
    }

    /// Number of registered tickers
    pub fn len(&self) -> usize {
        self.books.read().len()
    }

    /// Whether no ticker has been subscribed
    pub fn is_empty(&self) -> bool {
        self.books.read().is_empty()
    }

    /// Take the tickers registered since the last call
    pub(crate) fn take_pending(&self) -> Vec<String> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Resolves after the next [`subscribe`](BookCache::subscribe) registers
    /// a ticker, or immediately if one happened since the last wakeup
    pub(crate) fn subscription_added(&self) -> Notified<'_> {
        self.added.notified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::testing::{book, StaticSource};
    use crate::types::messages::OrderbookDeltaMsg;

    fn delta(ticker: &str, bids: Vec<[u64; 2]>, asks: Vec<[u64; 2]>) -> FeedMessage {
        FeedMessage::OrderbookDelta(OrderbookDeltaMsg {
            market_ticker: ticker.to_string(),
            yes: Some(SidePayload { bids, asks }),
        })
    }

    #[tokio::test]
    async fn test_subscribe_seeds_from_rest() {
        let source = StaticSource::new().with_book("LAL", book(vec![[45, 10]], vec![[47, 5]]));
        let cache = BookCache::new(Arc::new(source));

        assert!(cache.subscribe("LAL").await);
        assert_eq!(cache.state("LAL"), BookState::Live);
        assert_eq!(cache.best_ask("LAL"), Some(PriceLevel::new(47, 5)));
        assert_eq!(cache.best_bid("LAL"), Some(PriceLevel::new(45, 10)));
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let source = Arc::new(StaticSource::new().with_book("LAL", BookPayload::default()));
        let cache = BookCache::new(source.clone());

        assert!(cache.subscribe("LAL").await);
        assert!(!cache.subscribe("LAL").await);
        assert_eq!(cache.len(), 1);
        assert_eq!(source.fetches(), 1);
        assert_eq!(cache.take_pending(), vec!["LAL".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_ticker_subscribing() {
        let cache = BookCache::new(Arc::new(StaticSource::new()));

        assert!(cache.subscribe("BOS").await);
        assert_eq!(cache.state("BOS"), BookState::Subscribing);
        assert_eq!(cache.markets_needing_snapshot(), vec!["BOS".to_string()]);
        assert_eq!(cache.best_ask("BOS"), None);
        assert!(cache.asks("BOS").is_empty());
        assert_eq!(cache.available_contracts("BOS", 99), 0);
    }

    #[tokio::test]
    async fn test_reads_gated_until_snapshot() {
        let cache = BookCache::new(Arc::new(StaticSource::new()));
        cache.subscribe("BOS").await;

        // Applied but invisible until a snapshot arrives
        assert!(cache.apply_message(&delta("BOS", vec![], vec![[60, 4]])));
        assert_eq!(cache.best_ask("BOS"), None);

        cache.apply_snapshot("BOS", &book(vec![], vec![[61, 1]]));
        assert_eq!(cache.state("BOS"), BookState::Live);
        assert_eq!(cache.asks("BOS"), vec![PriceLevel::new(61, 1)]);
    }

    #[tokio::test]
    async fn test_delta_updates_live_book() {
        let source = StaticSource::new().with_book("LAL", book(vec![[45, 10]], vec![[58, 10]]));
        let cache = BookCache::new(Arc::new(source));
        cache.subscribe("LAL").await;

        cache.apply_message(&delta("LAL", vec![[45, 0]], vec![[59, 5], [61, 100]]));

        assert_eq!(cache.best_bid("LAL"), None);
        assert_eq!(cache.available_contracts("LAL", 60), 15);
        assert_eq!(
            cache.asks("LAL"),
            vec![
                PriceLevel::new(58, 10),
                PriceLevel::new(59, 5),
                PriceLevel::new(61, 100)
            ]
        );
    }

    #[tokio::test]
    async fn test_untracked_ticker_is_ignored() {
        let cache = BookCache::new(Arc::new(StaticSource::new()));

        assert!(!cache.apply_message(&delta("NOPE", vec![[50, 1]], vec![])));
        assert!(!cache.apply_snapshot("NOPE", &book(vec![[50, 1]], vec![])));
        assert!(cache.is_empty());
        assert_eq!(cache.state("NOPE"), BookState::Unsubscribed);
        assert_eq!(cache.best_bid("NOPE"), None);
    }

    #[tokio::test]
    async fn test_resync_retries_fetch() {
        let source = Arc::new(StaticSource::new());
        let cache = BookCache::new(source.clone());
        cache.subscribe("LAL").await;
        assert_eq!(cache.state("LAL"), BookState::Subscribing);

        source.set_book("LAL", book(vec![[40, 2]], vec![]));
        assert!(cache.resync("LAL").await.unwrap());
        assert_eq!(cache.state("LAL"), BookState::Live);

        assert!(!cache.resync("UNKNOWN").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_message_kinds_are_ignored() {
        let cache = BookCache::new(Arc::new(StaticSource::new()));
        cache.subscribe("LAL").await;
        assert!(!cache.apply_message(&FeedMessage::Unknown));
    }
}
