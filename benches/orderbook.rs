//! Benchmarks for orderbook operations.
//!
//! Run with: `cargo bench`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use futures_util::future::BoxFuture;
use kalshi_fast_trader::error::Error;
use kalshi_fast_trader::orderbook::{BookCache, BookSide, DepthView, LevelStore, Orderbook, SnapshotSource};
use kalshi_fast_trader::types::messages::{BookPayload, SidePayload};
use kalshi_fast_trader::types::order::Side;
use kalshi_fast_trader::types::PriceLevel;

/// Serves the same deep book for every ticker
struct DeepBook;

impl SnapshotSource for DeepBook {
    fn fetch_orderbook<'a>(&'a self, _ticker: &'a str) -> BoxFuture<'a, Result<BookPayload, Error>> {
        let bids = (1..50u64).map(|p| [p, 100 * p]).collect();
        let asks = (51..100u64).map(|p| [p, 100 * (100 - p)]).collect();
        Box::pin(async move {
            Ok(BookPayload {
                yes: SidePayload { bids, asks },
            })
        })
    }
}

fn populated(size: usize) -> Orderbook {
    let mut book = Orderbook::new("BENCH");
    for i in 1..=size {
        let price = (i % 49 + 1) as u8;
        book.set_level(BookSide::Bid, price, 100);
        book.set_level(BookSide::Ask, 100 - price, 100);
    }
    book
}

fn bench_orderbook_delta(c: &mut Criterion) {
    let mut group = c.benchmark_group("orderbook_delta");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut book = populated(size);

            b.iter(|| {
                // Typical delta: one level changes, one disappears
                book.apply_delta(
                    black_box(BookSide::Bid),
                    [PriceLevel::new(45, 10), PriceLevel::new(44, 0)],
                );
                book.set_level(BookSide::Bid, 44, 100);
            });
        });
    }

    group.finish();
}

fn bench_orderbook_snapshot(c: &mut Criterion) {
    let bids: Vec<PriceLevel> = (1..50).map(|p| PriceLevel::new(p, 100)).collect();
    let asks: Vec<PriceLevel> = (51..100).map(|p| PriceLevel::new(p, 100)).collect();
    let mut book = Orderbook::new("BENCH");

    c.bench_function("orderbook_snapshot", |b| {
        b.iter(|| {
            book.apply_snapshot(black_box(bids.clone()), black_box(asks.clone()));
        });
    });
}

fn bench_orderbook_reads(c: &mut Criterion) {
    let book = populated(100);

    c.bench_function("orderbook_best_bid", |b| {
        b.iter(|| black_box(book.best_bid()));
    });
    c.bench_function("orderbook_no_ask", |b| {
        b.iter(|| black_box(book.no_ask()));
    });
    c.bench_function("orderbook_spread", |b| {
        b.iter(|| black_box(book.spread()));
    });
}

fn bench_level_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_depth_at_or_better");

    for limit in [55u8, 75, 99].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(limit), limit, |b, &limit| {
            let mut asks = LevelStore::new(BookSide::Ask);
            asks.replace((51..100).map(|p| PriceLevel::new(p, 100)));

            b.iter(|| black_box(asks.depth_at_or_better(black_box(limit))));
        });
    }

    group.finish();
}

fn bench_cache_reads(c: &mut Criterion) {
    let cache = Arc::new(BookCache::new(Arc::new(DeepBook)));
    for i in 0..50 {
        tokio_test::block_on(cache.subscribe(&format!("BENCH-{}", i)));
    }
    let depth = DepthView::new(cache);

    c.bench_function("cache_best_ask", |b| {
        b.iter(|| black_box(depth.best_ask(black_box("BENCH-25"))));
    });
    c.bench_function("cache_available_contracts", |b| {
        b.iter(|| black_box(depth.available_for(black_box("BENCH-25"), Side::No, 60)));
    });
    c.bench_function("cache_quote", |b| {
        b.iter(|| black_box(depth.quote(black_box("BENCH-25"))));
    });
}

criterion_group!(
    benches,
    bench_orderbook_delta,
    bench_orderbook_snapshot,
    bench_orderbook_reads,
    bench_level_depth,
    bench_cache_reads
);
criterion_main!(benches);
