use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::runtime::Runtime;

use farmlink_catalog::{NewProduct, Product};
use farmlink_core::{Money, OrderId, ProductId, Quantity, UserId};
use farmlink_infra::{
    FulfillmentSequencer, InMemoryMarketStore, MarketStore, OrderDraft, OrderLine, StockLedger,
};
use farmlink_inventory::{StockChangeCommand, StockChangeKind};

fn qty(n: i64) -> Quantity {
    Quantity::new(Decimal::from(n)).unwrap()
}

fn seed_listing(
    rt: &Runtime,
    store: &Arc<InMemoryMarketStore>,
    farmer: UserId,
    stock: i64,
) -> ProductId {
    let product = Product::create(
        NewProduct {
            farmer_id: farmer,
            name: "Bench Crop".to_string(),
            description: None,
            unit: "kg".to_string(),
            price: Money::new(Decimal::from(3)).unwrap(),
            initial_stock: qty(stock),
            low_stock_threshold: Quantity::ZERO,
            harvested_at: None,
            expires_at: None,
        },
        Utc::now(),
    )
    .unwrap();
    rt.block_on(store.insert_product(&product)).unwrap();
    product.id
}

fn bench_change_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("stock_change_latency");
    group.sample_size(1000);

    // Every iteration appends a log entry, so the history grows as the
    // measurement runs, the same way a long-lived listing's would.
    group.bench_function("restock_single_listing", |b| {
        let rt = Runtime::new().unwrap();
        let store = Arc::new(InMemoryMarketStore::new());
        let ledger = StockLedger::new(store.clone());
        let farmer = UserId::new();
        let product = seed_listing(&rt, &store, farmer, 1);

        b.iter(|| {
            rt.block_on(ledger.apply_change(StockChangeCommand::manual(
                product,
                StockChangeKind::In,
                qty(black_box(1)),
                None,
                farmer,
                Utc::now(),
            )))
            .unwrap();
        });
    });

    group.bench_function("reserve_release_cycle", |b| {
        let rt = Runtime::new().unwrap();
        let store = Arc::new(InMemoryMarketStore::new());
        let ledger = StockLedger::new(store.clone());
        let farmer = UserId::new();
        let product = seed_listing(&rt, &store, farmer, 1_000_000);
        let order = OrderId::new();
        let buyer = UserId::new();

        b.iter(|| {
            rt.block_on(async {
                ledger.reserve(product, qty(1), order, buyer).await.unwrap();
                ledger.release(product, qty(1), order, buyer).await.unwrap();
            });
        });
    });

    group.finish();
}

fn bench_history_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_page_reads");

    for entry_count in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("page_of_20", entry_count),
            entry_count,
            |b, &count| {
                let rt = Runtime::new().unwrap();
                let store = Arc::new(InMemoryMarketStore::new());
                let ledger = StockLedger::new(store.clone());
                let farmer = UserId::new();
                let product = seed_listing(&rt, &store, farmer, 1);

                rt.block_on(async {
                    for _ in 0..count {
                        ledger
                            .apply_change(StockChangeCommand::manual(
                                product,
                                StockChangeKind::In,
                                qty(1),
                                None,
                                farmer,
                                Utc::now(),
                            ))
                            .await
                            .unwrap();
                    }
                });

                b.iter(|| {
                    black_box(rt.block_on(ledger.inventory_history(product, 20, 0)).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_checkout_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("checkout_throughput");

    for line_count in [1, 4, 8].iter() {
        group.throughput(Throughput::Elements(*line_count as u64));
        group.bench_with_input(
            BenchmarkId::new("place_order", line_count),
            line_count,
            |b, &count| {
                let rt = Runtime::new().unwrap();
                let store = Arc::new(InMemoryMarketStore::new());
                let sequencer = FulfillmentSequencer::new(store.clone());
                let farmer = UserId::new();
                let products: Vec<ProductId> = (0..count)
                    .map(|_| seed_listing(&rt, &store, farmer, 100_000_000))
                    .collect();
                let buyer = UserId::new();

                b.iter(|| {
                    let draft = OrderDraft {
                        lines: products
                            .iter()
                            .map(|&product_id| OrderLine {
                                product_id,
                                quantity: qty(1),
                            })
                            .collect(),
                    };
                    black_box(rt.block_on(sequencer.place_order(buyer, draft)).unwrap());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_change_latency,
    bench_history_reads,
    bench_checkout_throughput
);
criterion_main!(benches);
