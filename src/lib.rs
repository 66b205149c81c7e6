//! # kalshi-fast-trader
//!
//! Backend for a [Kalshi](https://kalshi.com) sports trading dashboard.
//!
//! ## Features
//!
//! - **Orderbook Cache** - REST snapshots merged with the streaming delta feed
//! - **Reconnecting Feed** - one WebSocket for every tracked market, resubscribed on reconnect
//! - **Depth Queries** - best prices, derived No asks and fillable contracts without a network call
//! - **Games** - pair the two team markets of a matchup and plan bets against the cache
//! - **Momentum Bot** - trades on price moves observed through the cache
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kalshi_fast_trader::Config;
//! use kalshi_fast_trader::client::{KalshiConnector, RestClient};
//! use kalshi_fast_trader::config::ReconnectConfig;
//! use kalshi_fast_trader::orderbook::{BookCache, BookFeed, DepthView};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kalshi_fast_trader::Error> {
//!     let config = Config::from_env()?;
//!     let rest = Arc::new(RestClient::new(&config)?);
//!     let cache = Arc::new(BookCache::new(rest));
//!
//!     let feed = BookFeed::new(
//!         cache.clone(),
//!         Arc::new(KalshiConnector::new(&config)?),
//!         ReconnectConfig::default(),
//!     );
//!     feed.start();
//!
//!     let ticker = "KXNBAGAME-25JAN15LALBOS-LAL";
//!     cache.subscribe(ticker).await;
//!
//!     let depth = DepthView::new(cache);
//!     println!("{} Yes contracts at or below 60c", depth.available_contracts(ticker, 60));
//!
//!     feed.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Price Representation
//!
//! Prices are whole cents from 1 to 99. A Yes bid at `p` is equivalent to a
//! No ask at `100 - p`, so the cache only stores the Yes side of each book.
//!
//! ## Architecture
//!
//! - [`client`] - REST and WebSocket clients for API communication
//! - [`types`] - Request/response and feed message types
//! - [`orderbook`] - Book cache, feed connection and depth queries
//! - [`games`] - Game registry and bet planning
//! - [`bot`] - Momentum trading bot
//! - [`config`] - Configuration and credentials management
//! - [`error`] - Error types for the crate
//!
//! ## Performance
//!
//! - Integer prices and quantities, no floating point on the book path
//! - `FxHashMap` for faster hashing of short ticker keys
//! - `parking_lot` locks, one per book, so markets never contend
//! - `BTreeMap` for sorted price levels

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod bot;
pub mod client;
pub mod config;
pub mod error;
pub mod games;
pub mod orderbook;
pub mod types;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use error::{Error, ErrorKind};

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = Config::new("test-key", "test-private-key");
        assert_eq!(config.api_key_id(), "test-key");
        assert!(config.validate().is_ok());

        let bad = config.with_websocket_url("https://example.com/ws");
        assert!(matches!(bad.validate(), Err(Error::Config(_))));
    }
}
