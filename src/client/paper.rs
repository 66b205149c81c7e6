//! Paper trading: generated books and locally filled orders.
//!
//! [`PaperExchange`] stands in for the REST API when
//! [`Config::paper_trading`] is on. Each market gets a random but stable
//! book the first time it is fetched, and every order is filled on the spot
//! without leaving the process.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rand::Rng;
use rustc_hash::FxHashMap;
use tracing::info;

use crate::bot::OrderSink;
use crate::client::RestClient;
use crate::config::Config;
use crate::error::Error;
use crate::orderbook::SnapshotSource;
use crate::types::messages::{BookPayload, SidePayload};
use crate::types::order::{CreateOrderRequest, Order, OrderStatus};
use crate::types::MAX_PRICE;

const LEVELS: usize = 10;

/// In-process exchange for demos and dry runs
#[derive(Debug, Default)]
pub struct PaperExchange {
    books: Mutex<FxHashMap<String, BookPayload>>,
    orders: Mutex<Vec<Order>>,
}

impl PaperExchange {
    /// Create an exchange with no books and no orders
    pub fn new() -> Self {
        Self::default()
    }

    /// The book served for `ticker`, generating it on first use
    pub fn book(&self, ticker: &str) -> BookPayload {
        self.books
            .lock()
            .entry(ticker.to_string())
            .or_insert_with(generate_book)
            .clone()
    }

    /// Every order filled so far, oldest first
    pub fn orders(&self) -> Vec<Order> {
        self.orders.lock().clone()
    }

    fn fill(&self, request: &CreateOrderRequest) -> Order {
        let order = Order {
            order_id: format!("{:08x}", rand::random::<u32>()),
            client_order_id: request.client_order_id.clone(),
            ticker: request.ticker.clone(),
            status: OrderStatus::Executed,
            side: request.side,
            yes_price: request.yes_price,
            no_price: request.no_price,
            created_time: None,
        };
        info!(
            ticker = %order.ticker,
            side = ?order.side,
            count = request.count,
            order_id = %order.order_id,
            "paper order filled"
        );
        self.orders.lock().push(order.clone());
        order
    }
}

/// Ten ask levels climbing 1-3 cents from a random start, with bids below
fn generate_book() -> BookPayload {
    let mut rng = rand::thread_rng();
    let best_ask: u64 = rng.gen_range(30..=70);

    let mut asks = Vec::with_capacity(LEVELS);
    let mut price = best_ask;
    for _ in 0..LEVELS {
        if price >= u64::from(MAX_PRICE) {
            break;
        }
        asks.push([price, rng.gen_range(5..=150)]);
        price += rng.gen_range(1..=3);
    }

    let mut bids = Vec::with_capacity(LEVELS);
    let mut price = best_ask - rng.gen_range(1..=3);
    for _ in 0..LEVELS {
        if price == 0 {
            break;
        }
        bids.push([price, rng.gen_range(5..=150)]);
        price = price.saturating_sub(rng.gen_range(1..=3));
    }

    BookPayload {
        yes: SidePayload { bids, asks },
    }
}

impl SnapshotSource for PaperExchange {
    fn fetch_orderbook<'a>(&'a self, ticker: &'a str) -> BoxFuture<'a, Result<BookPayload, Error>> {
        let book = self.book(ticker);
        Box::pin(async move { Ok(book) })
    }
}

impl OrderSink for PaperExchange {
    fn submit<'a>(&'a self, order: &'a CreateOrderRequest) -> BoxFuture<'a, Result<Order, Error>> {
        let filled = self.fill(order);
        Box::pin(async move { Ok(filled) })
    }
}

/// Where books come from and where orders go
#[derive(Clone)]
pub struct Backend {
    /// Snapshot source for the book cache
    pub snapshots: Arc<dyn SnapshotSource>,
    /// Destination for bets and bot orders
    pub orders: Arc<dyn OrderSink>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}

impl Backend {
    /// The REST API, or a [`PaperExchange`] when paper trading is on
    ///
    /// # Errors
    ///
    /// Returns an error if the REST client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        if config.paper_trading() {
            info!("paper trading enabled, no orders reach the exchange");
            let paper = Arc::new(PaperExchange::new());
            return Ok(Self {
                snapshots: paper.clone(),
                orders: paper,
            });
        }

        let rest = Arc::new(RestClient::new(config)?);
        Ok(Self {
            snapshots: rest.clone(),
            orders: rest,
        })
    }
}
