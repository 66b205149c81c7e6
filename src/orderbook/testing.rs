//! In-memory fakes shared by the orderbook tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{ApiError, Error};
use crate::types::messages::{BookPayload, SidePayload};

use super::SnapshotSource;

/// Build a book payload from raw `[price, quantity]` pairs
pub(crate) fn book(bids: Vec<[u64; 2]>, asks: Vec<[u64; 2]>) -> BookPayload {
    BookPayload {
        yes: SidePayload { bids, asks },
    }
}

/// Serves canned books; unknown tickers fail with a 404
#[derive(Default)]
pub(crate) struct StaticSource {
    books: Mutex<FxHashMap<String, BookPayload>>,
    fetches: AtomicUsize,
}

impl StaticSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_book(self, ticker: &str, payload: BookPayload) -> Self {
        self.set_book(ticker, payload);
        self
    }

    pub(crate) fn set_book(&self, ticker: &str, payload: BookPayload) {
        self.books.lock().insert(ticker.to_string(), payload);
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl SnapshotSource for StaticSource {
    fn fetch_orderbook<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, Result<BookPayload, Error>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let result = self
            .books
            .lock()
            .get(ticker)
            .cloned()
            .ok_or_else(|| Error::Api(ApiError::new(404, format!("no market {}", ticker))));
        Box::pin(async move { result })
    }
}
