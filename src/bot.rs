//! Momentum-following trading bot.
//!
//! The bot samples each watched market from the [`DepthView`] on a fixed
//! interval, keeps a rolling window of Yes prices, and asks a
//! [`MomentumPolicy`] whether to trade. Orders are sized by what the cached
//! book can fill at the configured price cap and handed to an [`OrderSink`].
//!
//! The bot never fetches prices itself; the book cache is its only input.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::BotConfig;
use crate::error::Error;
use crate::orderbook::{DepthView, MarketQuote};
use crate::types::order::{Action, CreateOrderRequest, Order, Side};
use crate::types::{now_ms, TimestampMs};

/// Destination for orders
///
/// Implemented by [`RestClient`](crate::client::RestClient).
pub trait OrderSink: Send + Sync {
    /// Submit an order to the exchange
    fn submit<'a>(&'a self, order: &'a CreateOrderRequest) -> BoxFuture<'a, Result<Order, Error>>;
}

/// One observation of a market's Yes price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSample {
    /// When the sample was taken, Unix milliseconds
    pub at_ms: TimestampMs,
    /// Yes mid if both sides are quoted, otherwise the best Yes ask
    pub price: f64,
}

impl PriceSample {
    /// Sample a quote, or `None` if it has no usable Yes price
    pub fn from_quote(quote: &MarketQuote) -> Option<Self> {
        let price = quote
            .yes_mid()
            .or_else(|| quote.yes_ask.map(|ask| f64::from(ask.price)))?;
        Some(Self {
            at_ms: now_ms(),
            price,
        })
    }
}

/// Bounded window of recent samples, oldest first
#[derive(Debug, Clone)]
pub struct PriceHistory {
    samples: VecDeque<PriceSample>,
    capacity: usize,
}

impl PriceHistory {
    /// Empty history holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, dropping the oldest once full
    pub fn push(&mut self, sample: PriceSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Whether the window holds `capacity` samples
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Number of samples held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are held
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Newest price minus oldest price, in cents
    pub fn change(&self) -> Option<f64> {
        let first = self.samples.front()?;
        let last = self.samples.back()?;
        Some(last.price - first.price)
    }

    /// Forget every sample
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// What a policy wants to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Buy the given contract
    Buy(Side),
    /// Do nothing
    Hold,
}

/// Trading decision over a market's recent prices
pub trait MomentumPolicy: Send + Sync {
    /// Decide based on `history`
    fn decide(&self, history: &PriceHistory) -> Signal;
}

/// Buy Yes after a rise of at least `threshold_cents` across a full
/// window, buy No after an equal fall
#[derive(Debug, Clone, Copy)]
pub struct ThresholdPolicy {
    /// Minimum move in cents
    pub threshold_cents: f64,
}

impl ThresholdPolicy {
    /// Policy with the given threshold
    pub fn new(threshold_cents: f64) -> Self {
        Self { threshold_cents }
    }
}

impl MomentumPolicy for ThresholdPolicy {
    fn decide(&self, history: &PriceHistory) -> Signal {
        if !history.is_full() {
            return Signal::Hold;
        }
        match history.change() {
            Some(change) if change >= self.threshold_cents => Signal::Buy(Side::Yes),
            Some(change) if change <= -self.threshold_cents => Signal::Buy(Side::No),
            _ => Signal::Hold,
        }
    }
}

/// Counters describing bot activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BotStats {
    /// Completed sampling rounds
    pub polls: u64,
    /// Buy signals raised by the policy
    pub signals: u64,
    /// Orders accepted by the sink
    pub orders_submitted: u64,
    /// Orders the sink rejected
    pub orders_failed: u64,
    /// Signals dropped for cooldown, price cap or empty book
    pub signals_skipped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    polls: AtomicU64,
    signals: AtomicU64,
    orders_submitted: AtomicU64,
    orders_failed: AtomicU64,
    signals_skipped: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> BotStats {
        BotStats {
            polls: self.polls.load(Ordering::Relaxed),
            signals: self.signals.load(Ordering::Relaxed),
            orders_submitted: self.orders_submitted.load(Ordering::Relaxed),
            orders_failed: self.orders_failed.load(Ordering::Relaxed),
            signals_skipped: self.signals_skipped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
struct MarketState {
    history: Option<PriceHistory>,
    last_trade: Option<Instant>,
}

struct BotCore {
    depth: DepthView,
    sink: Arc<dyn OrderSink>,
    policy: Arc<dyn MomentumPolicy>,
    config: BotConfig,
    markets: Mutex<FxHashMap<String, MarketState>>,
    counters: Counters,
}

impl BotCore {
    async fn poll(&self) {
        for ticker in &self.config.tickers {
            if let Some(order) = self.evaluate(ticker) {
                self.submit(ticker, order).await;
            }
        }
        Counters::bump(&self.counters.polls);
    }

    /// Record a sample and build an order if the policy fires
    fn evaluate(&self, ticker: &str) -> Option<CreateOrderRequest> {
        let quote = self.depth.quote(ticker);
        if !quote.live {
            debug!(ticker = %ticker, "book not live yet");
            return None;
        }
        let sample = PriceSample::from_quote(&quote)?;

        let mut markets = self.markets.lock();
        let state = markets.entry(ticker.to_string()).or_default();
        let history = state
            .history
            .get_or_insert_with(|| PriceHistory::new(self.config.window));
        history.push(sample);

        let Signal::Buy(side) = self.policy.decide(history) else {
            return None;
        };
        Counters::bump(&self.counters.signals);

        if let Some(last) = state.last_trade {
            if last.elapsed() < self.config.cooldown {
                debug!(ticker = %ticker, "signal during cooldown");
                Counters::bump(&self.counters.signals_skipped);
                return None;
            }
        }

        let max_price = self.config.max_price;
        match quote.ask_for(side) {
            Some(ask) if ask.price <= max_price => {}
            ask => {
                debug!(ticker = %ticker, ?side, ?ask, max_price, "best ask above cap");
                Counters::bump(&self.counters.signals_skipped);
                return None;
            }
        }

        let available = self.depth.available_for(ticker, side, max_price);
        let count = available.min(self.config.order_size);
        if count == 0 {
            Counters::bump(&self.counters.signals_skipped);
            return None;
        }

        state.last_trade = Some(Instant::now());
        Some(
            CreateOrderRequest::limit(ticker, side, Action::Buy, count, max_price)
                .with_client_order_id(format!("momentum-{:016x}", rand::random::<u64>())),
        )
    }

    async fn submit(&self, ticker: &str, order: CreateOrderRequest) {
        info!(
            ticker = %ticker,
            side = ?order.side,
            count = order.count,
            max_price = self.config.max_price,
            "momentum order"
        );
        match self.sink.submit(&order).await {
            Ok(placed) => {
                Counters::bump(&self.counters.orders_submitted);
                info!(ticker = %ticker, order_id = %placed.order_id, status = ?placed.status, "order accepted");
            }
            Err(e) => {
                Counters::bump(&self.counters.orders_failed);
                warn!(ticker = %ticker, error = %e, "order rejected");
            }
        }
    }
}

/// Periodic momentum trader reading from the book cache
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use kalshi_fast_trader::bot::MomentumBot;
/// use kalshi_fast_trader::client::RestClient;
/// use kalshi_fast_trader::config::BotConfig;
/// use kalshi_fast_trader::orderbook::{BookCache, DepthView};
/// use kalshi_fast_trader::Config;
///
/// # async fn example() -> kalshi_fast_trader::Result<()> {
/// let rest = Arc::new(RestClient::new(&Config::from_env()?)?);
/// let cache = Arc::new(BookCache::new(rest.clone()));
/// let ticker = "KXNBAGAME-25JAN15LALBOS-LAL".to_string();
/// cache.subscribe(&ticker).await;
///
/// let bot = MomentumBot::new(DepthView::new(cache), rest, BotConfig::new(vec![ticker]));
/// bot.start();
/// # Ok(())
/// # }
/// ```
pub struct MomentumBot {
    core: Arc<BotCore>,
    running: Arc<AtomicBool>,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for MomentumBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MomentumBot")
            .field("running", &self.is_running())
            .field("config", &self.core.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl MomentumBot {
    /// Bot using [`ThresholdPolicy`] with the configured threshold
    pub fn new(depth: DepthView, sink: Arc<dyn OrderSink>, config: BotConfig) -> Self {
        let policy = Arc::new(ThresholdPolicy::new(config.threshold_cents));
        Self::with_policy(depth, sink, policy, config)
    }

    /// Bot with a custom decision policy
    pub fn with_policy(
        depth: DepthView,
        sink: Arc<dyn OrderSink>,
        policy: Arc<dyn MomentumPolicy>,
        config: BotConfig,
    ) -> Self {
        Self {
            core: Arc::new(BotCore {
                depth,
                sink,
                policy,
                config,
                markets: Mutex::new(FxHashMap::default()),
                counters: Counters::default(),
            }),
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Run one sampling round immediately
    pub async fn poll_once(&self) {
        self.core.poll().await;
    }

    /// Spawn the polling loop. Calling this while running does nothing.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        let core = self.core.clone();
        let running = self.running.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(core.config.poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = rx.changed() => break,
                    _ = interval.tick() => core.poll().await,
                }
            }
            running.store(false, Ordering::SeqCst);
        });

        *self.shutdown.lock() = Some(tx);
        *self.task.lock() = Some(task);
        info!(markets = self.core.config.tickers.len(), "momentum bot started");
    }

    /// Stop the polling loop and wait for it to exit
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(true);
        }

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "momentum bot task panicked");
            }
            info!("momentum bot stopped");
        }
    }

    /// Whether the polling loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Activity counters
    pub fn stats(&self) -> BotStats {
        self.core.counters.snapshot()
    }

    /// Recent samples for `ticker`
    pub fn history(&self, ticker: &str) -> Option<PriceHistory> {
        self.core
            .markets
            .lock()
            .get(ticker)
            .and_then(|state| state.history.clone())
    }
}
