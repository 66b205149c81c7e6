//! Live orderbook cache - keeps books for the given markets and prints quotes
//!
//! Usage:
//!   KALSHI_API_KEY=xxx KALSHI_PRIVATE_KEY_PATH=path/to/key.pem cargo run --example live_books -- TICKER [TICKER...]
//!
//! Optional:
//!   KALSHI_ENV=demo  # Use demo environment (default: production)
//!   BOT=1            # Also run the momentum bot on the given markets
//!   DEMO_MODE=1      # Paper trading: generated books, orders filled locally, no feed

use std::sync::Arc;
use std::time::Duration;

use kalshi_fast_trader::bot::MomentumBot;
use kalshi_fast_trader::client::{Backend, KalshiConnector};
use kalshi_fast_trader::config::{BotConfig, ReconnectConfig};
use kalshi_fast_trader::orderbook::{BookCache, BookFeed, DepthView, MarketQuote};
use kalshi_fast_trader::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kalshi_fast_trader=info".parse()?),
        )
        .init();

    let tickers: Vec<String> = std::env::args().skip(1).collect();
    if tickers.is_empty() {
        return Err("usage: live_books TICKER [TICKER...]".into());
    }

    let config = Config::from_env()?;
    config.validate()?;
    println!("=== Kalshi Live Books ({:?}) ===\n", config.environment());

    let backend = Backend::from_config(&config)?;
    let cache = Arc::new(BookCache::new(backend.snapshots.clone()));
    let feed = if config.paper_trading() {
        None
    } else {
        let feed = BookFeed::new(
            cache.clone(),
            Arc::new(KalshiConnector::new(&config)?),
            ReconnectConfig::default(),
        );
        feed.start();
        Some(feed)
    };

    for ticker in &tickers {
        cache.subscribe(ticker).await;
        println!("Subscribed {} ({:?})", ticker, cache.state(ticker));
    }

    let depth = DepthView::new(cache.clone());
    let bot = std::env::var("BOT").is_ok().then(|| {
        let bot = MomentumBot::new(depth.clone(), backend.orders.clone(), BotConfig::new(tickers.clone()));
        bot.start();
        bot
    });

    println!("\n(Press Ctrl+C to stop)\n");
    let mut interval = tokio::time::interval(Duration::from_secs(2));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = interval.tick() => {
                for ticker in &tickers {
                    print_quote(&depth.quote(ticker));
                }
                if let Some(stats) = feed.as_ref().map(BookFeed::stats) {
                    println!(
                        "--- {} applied, {} ignored, {} skipped, {} connections, {} transport failures ---\n",
                        stats.messages_applied,
                        stats.messages_ignored,
                        stats.messages_skipped,
                        stats.connections,
                        stats.transport_failures
                    );
                }
            }
        }
    }

    if let Some(bot) = bot {
        bot.stop().await;
        println!("Bot: {:?}", bot.stats());
    }
    if let Some(feed) = feed {
        feed.stop().await;
    }
    println!("\nStopped");
    Ok(())
}

fn print_quote(quote: &MarketQuote) {
    if !quote.live {
        println!("{:<40} waiting for snapshot", quote.ticker);
        return;
    }

    let fmt = |level: Option<kalshi_fast_trader::types::PriceLevel>| {
        level
            .map(|l| format!("{}c x {}", l.price, l.quantity))
            .unwrap_or_else(|| "-".to_string())
    };
    println!(
        "{:<40} YES bid {:>12} | YES ask {:>12} | NO ask {:>12} | depth {} / {}",
        quote.ticker,
        fmt(quote.yes_bid),
        fmt(quote.yes_ask),
        fmt(quote.no_ask),
        quote.yes_ask_depth,
        quote.no_ask_depth
    );
}
