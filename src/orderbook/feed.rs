//! Long-lived streaming connection that keeps the [`BookCache`] current.
//!
//! [`BookFeed`] owns one logical connection to the exchange. While running it:
//!
//! - connects through a [`Connector`] (fresh auth headers per attempt)
//! - subscribes every ticker registered in the cache
//! - applies `orderbook_snapshot` and `orderbook_delta` messages
//! - subscribes tickers added to the cache while connected
//! - on any transport failure, waits the reconnect delay and starts over
//!
//! Cached books are never cleared on disconnect; readers keep seeing the last
//! known state until the new connection's snapshots arrive.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ReconnectConfig;
use crate::error::Error;
use crate::types::messages::FeedMessage;

use super::cache::BookCache;

/// An established streaming session
pub trait FeedStream: Send {
    /// Subscribe `tickers` to the orderbook channel, returning the command id
    fn subscribe<'a>(&'a mut self, tickers: &'a [String]) -> BoxFuture<'a, Result<u64, Error>>;

    /// Next text frame, or `None` once the server has gone away
    fn next_frame(&mut self) -> BoxFuture<'_, Option<Result<String, Error>>>;
}

/// Opens streaming sessions
pub trait Connector: Send + Sync {
    /// Open a new authenticated session
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn FeedStream>, Error>>;
}

/// Counters describing feed activity since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    /// Connection attempts, successful or not
    pub connection_attempts: u64,
    /// Sessions that were established
    pub connections: u64,
    /// Messages that changed a tracked book
    pub messages_applied: u64,
    /// Well-formed messages with nothing to apply
    pub messages_ignored: u64,
    /// Frames that failed to decode
    pub messages_skipped: u64,
    /// Connection attempts and sessions lost to a transport error
    pub transport_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    connection_attempts: AtomicU64,
    connections: AtomicU64,
    messages_applied: AtomicU64,
    messages_ignored: AtomicU64,
    messages_skipped: AtomicU64,
    transport_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> FeedStats {
        FeedStats {
            connection_attempts: self.connection_attempts.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
            messages_applied: self.messages_applied.load(Ordering::Relaxed),
            messages_ignored: self.messages_ignored.load(Ordering::Relaxed),
            messages_skipped: self.messages_skipped.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
        }
    }
}

/// Background task feeding the book cache from the exchange stream.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use kalshi_fast_trader::Config;
/// use kalshi_fast_trader::client::{KalshiConnector, RestClient};
/// use kalshi_fast_trader::config::ReconnectConfig;
/// use kalshi_fast_trader::orderbook::{BookCache, BookFeed};
///
/// # async fn example() -> kalshi_fast_trader::Result<()> {
/// let config = Config::from_env()?;
/// let cache = Arc::new(BookCache::new(Arc::new(RestClient::new(&config)?)));
/// let feed = BookFeed::new(
///     cache.clone(),
///     Arc::new(KalshiConnector::new(&config)?),
///     ReconnectConfig::default(),
/// );
///
/// feed.start();
/// cache.subscribe("KXNBAGAME-25JAN15LALBOS-LAL").await;
/// // ...
/// feed.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct BookFeed {
    cache: Arc<BookCache>,
    connector: Arc<dyn Connector>,
    reconnect: ReconnectConfig,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for BookFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookFeed")
            .field("running", &self.is_running())
            .field("reconnect", &self.reconnect)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl BookFeed {
    /// Create a stopped feed
    pub fn new(
        cache: Arc<BookCache>,
        connector: Arc<dyn Connector>,
        reconnect: ReconnectConfig,
    ) -> Self {
        Self {
            cache,
            connector,
            reconnect,
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
            shutdown: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Spawn the connection loop. Calling this while running does nothing.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("feed already running");
            return;
        }

        let (tx, rx) = watch::channel(false);
        let worker = Worker {
            cache: self.cache.clone(),
            connector: self.connector.clone(),
            reconnect: self.reconnect.clone(),
            running: self.running.clone(),
            counters: self.counters.clone(),
        };

        *self.shutdown.lock() = Some(tx);
        *self.task.lock() = Some(tokio::spawn(worker.run(rx)));
        info!("feed started");
    }

    /// Signal the loop to exit and wait for it.
    ///
    /// The loop notices the signal while connecting, while waiting for a
    /// frame and while sleeping between attempts.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(true);
        }

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "feed task panicked");
            }
            info!("feed stopped");
        }
    }

    /// Whether the loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Activity counters
    pub fn stats(&self) -> FeedStats {
        self.counters.snapshot()
    }
}

enum SessionEnd {
    Shutdown,
    Failed(Error),
}

struct Worker {
    cache: Arc<BookCache>,
    connector: Arc<dyn Connector>,
    reconnect: ReconnectConfig,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl Worker {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut failures: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            Counters::bump(&self.counters.connection_attempts);
            let connected = tokio::select! {
                _ = shutdown.changed() => break,
                result = self.connector.connect() => result,
            };

            match connected {
                Ok(mut stream) => {
                    failures = 0;
                    Counters::bump(&self.counters.connections);
                    info!("feed connected");

                    match self.session(stream.as_mut(), &mut shutdown).await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Failed(e) => self.record_failure("feed disconnected", &e),
                    }
                }
                Err(e) => self.record_failure("feed connection failed", &e),
            }

            failures = failures.saturating_add(1);
            if self.reconnect.exhausted(failures) {
                error!(failures, "feed giving up after repeated failures");
                break;
            }

            let delay = self.reconnect.delay_for_attempt(failures - 1);
            debug!(delay_ms = delay.as_millis() as u64, "waiting before reconnect");
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.running.store(false, Ordering::SeqCst);
        debug!("feed loop exited");
    }

    async fn session(
        &self,
        stream: &mut dyn FeedStream,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        // The full ticker set goes out below, so anything pending is covered
        self.cache.take_pending();
        let tickers = self.cache.tickers();
        if !tickers.is_empty() {
            match stream.subscribe(&tickers).await {
                Ok(id) => info!(id, markets = tickers.len(), "subscribed orderbooks"),
                Err(e) => return SessionEnd::Failed(e),
            }
        }

        loop {
            tokio::select! {
                _ = shutdown.changed() => return SessionEnd::Shutdown,
                _ = self.cache.subscription_added() => {
                    let added = self.cache.take_pending();
                    if added.is_empty() {
                        continue;
                    }
                    match stream.subscribe(&added).await {
                        Ok(id) => info!(id, markets = ?added, "subscribed new orderbooks"),
                        Err(e) => return SessionEnd::Failed(e),
                    }
                }
                frame = stream.next_frame() => match frame {
                    Some(Ok(text)) => self.dispatch(&text),
                    Some(Err(e)) => return SessionEnd::Failed(e),
                    None => return SessionEnd::Failed(Error::ConnectionClosed),
                },
            }
        }
    }

    fn record_failure(&self, what: &str, e: &Error) {
        if e.is_transport() {
            Counters::bump(&self.counters.transport_failures);
            warn!(kind = ?e.kind(), error = %e, "{}", what);
        } else {
            error!(kind = ?e.kind(), error = %e, "{}", what);
        }
    }

    fn dispatch(&self, text: &str) {
        let message = match serde_json::from_str::<FeedMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                let e = Error::from(e);
                Counters::bump(&self.counters.messages_skipped);
                warn!(kind = ?e.kind(), error = %e, "skipping malformed feed message");
                return;
            }
        };

        match &message {
            FeedMessage::Error(err) => {
                warn!(id = ?err.id, msg = ?err.msg, "feed reported an error");
            }
            FeedMessage::Subscribed(ack) => debug!(id = ?ack.id, "subscription confirmed"),
            _ => {}
        }

        if self.cache.apply_message(&message) {
            Counters::bump(&self.counters.messages_applied);
        } else {
            Counters::bump(&self.counters.messages_ignored);
        }
    }
}
