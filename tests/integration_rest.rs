//! Integration tests for the REST API.
//!
//! These tests run against Kalshi's demo API.
//!
//! # Setup
//!
//! 1. Create a demo account at https://demo.kalshi.com
//! 2. Generate API credentials in the dashboard
//! 3. Set environment variables:
//!    - KALSHI_API_KEY: Your API key ID
//!    - KALSHI_PRIVATE_KEY_PATH: Path to your private key PEM file
//!    - KALSHI_TICKER: An open market ticker
//!
//! # Running
//!
//! ```bash
//! KALSHI_API_KEY=your-key KALSHI_PRIVATE_KEY_PATH=./private_key.pem \
//!     KALSHI_TICKER=SOME-TICKER cargo test --test integration_rest
//! ```

use std::sync::Arc;

use kalshi_fast_trader::client::RestClient;
use kalshi_fast_trader::config::Environment;
use kalshi_fast_trader::games::{BetRequest, GameRegistry, GameSide, Leg};
use kalshi_fast_trader::orderbook::{BookCache, BookState, DepthView};
use kalshi_fast_trader::types::{Action, CreateOrderRequest, Side};
use kalshi_fast_trader::{Config, Error};

/// Helper to create a client and test ticker from environment variables
fn create_client() -> Option<(RestClient, String)> {
    let api_key = std::env::var("KALSHI_API_KEY").ok()?;
    let key_path = std::env::var("KALSHI_PRIVATE_KEY_PATH").ok()?;
    let private_key = std::fs::read_to_string(&key_path).ok()?;
    let ticker = std::env::var("KALSHI_TICKER").ok()?;

    let config = Config::new(api_key, private_key).with_environment(Environment::Demo);

    Some((RestClient::new(&config).ok()?, ticker))
}

/// Skip test if credentials not available
macro_rules! require_client {
    () => {
        match create_client() {
            Some(c) => c,
            None => {
                eprintln!("Skipping test: KALSHI_API_KEY, KALSHI_PRIVATE_KEY_PATH and KALSHI_TICKER not set");
                return;
            }
        }
    };
}

#[tokio::test]
async fn test_get_orderbook() {
    let (client, ticker) = require_client!();

    let book = client.get_orderbook(&ticker).await;
    assert!(book.is_ok(), "Failed to get orderbook: {:?}", book);

    let book = book.unwrap();
    println!(
        "{}: {} yes bid levels, {} yes ask levels",
        ticker,
        book.yes.bids.len(),
        book.yes.asks.len()
    );
    for level in book.yes.bid_levels() {
        assert!((1..=99).contains(&level.price), "bid price out of range: {:?}", level);
    }
}

#[tokio::test]
async fn test_unknown_market_is_api_error() {
    let (client, _) = require_client!();

    match client.get_orderbook("NO-SUCH-MARKET-XYZ").await {
        Err(Error::Api(err)) => println!("API error as expected: {:?}", err),
        other => println!("Unexpected response for unknown market: {:?}", other),
    }
}

#[tokio::test]
async fn test_get_balance_and_positions() {
    let (client, _) = require_client!();

    let balance = client.get_balance().await;
    assert!(balance.is_ok(), "Failed to get balance: {:?}", balance);
    println!("Balance: {:?}", balance.unwrap());

    let positions = client.get_positions().await;
    assert!(positions.is_ok(), "Failed to get positions: {:?}", positions);
    println!("{} market positions", positions.unwrap().market_positions.len());
}

#[tokio::test]
async fn test_cache_seeds_from_rest() {
    let (client, ticker) = require_client!();

    let cache = Arc::new(BookCache::new(Arc::new(client)));
    assert!(cache.subscribe(&ticker).await);
    assert_eq!(cache.state(&ticker), BookState::Live);

    let depth = DepthView::new(cache);
    let quote = depth.quote(&ticker);
    println!("Quote: {:?}", quote);

    if let (Some(bid), Some(no_ask)) = (quote.yes_bid, quote.no_ask) {
        assert_eq!(bid.price + no_ask.price, 100);
    }
    assert_eq!(depth.available_contracts(&ticker, 99), quote.yes_ask_depth);
}

#[tokio::test]
async fn test_game_quote_and_plan() {
    let (client, ticker) = require_client!();

    let cache = Arc::new(BookCache::new(Arc::new(client)));
    let games = GameRegistry::new(cache);
    let game = games
        .create(
            "Demo matchup",
            GameSide::new(&ticker, "Home", 5, 60),
            GameSide::new(&ticker, "Away", 5, 60),
        )
        .await;

    let quote = games.quote(&game.id).expect("game exists");
    println!("Game quote: {:?}", quote);

    let plan = games.plan_bet(&game.id, Leg::A, &BetRequest::new(5, 60));
    assert!(plan.is_ok(), "Failed to plan bet: {:?}", plan);
    println!("Plan: {:?}", plan.unwrap());

    assert!(games.delete(&game.id).is_ok());
}

#[tokio::test]
#[ignore] // Don't run by default - places real orders
async fn test_create_and_cancel_order() {
    let (client, ticker) = require_client!();

    // Buy 1 Yes contract at 1 cent, far below any realistic ask
    let order = CreateOrderRequest::limit(&ticker, Side::Yes, Action::Buy, 1, 1)
        .with_client_order_id(format!("it-{:08x}", rand_suffix()));

    let created = client.create_order(&order).await;
    assert!(created.is_ok(), "Failed to create order: {:?}", created);

    let created = created.unwrap();
    println!("Created order: {} ({:?})", created.order_id, created.status);

    let cancelled = client.cancel_order(&created.order_id).await;
    assert!(cancelled.is_ok(), "Failed to cancel order: {:?}", cancelled);
}

fn rand_suffix() -> u32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0)
}
