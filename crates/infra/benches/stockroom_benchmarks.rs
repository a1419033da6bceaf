use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use stockroom_core::{Actor, OrderId, OrderProductId, Role, UserId};
use stockroom_infra::StockroomConfig;
use stockroom_infra::event_store::{EventStore, InMemoryEventStore};
use stockroom_infra::external::{
    InMemoryMediaStore, InMemoryNotifier, InMemoryOrderGateway, InMemoryUserDirectory,
};
use stockroom_infra::projections::InventoryCatalogProjection;
use stockroom_infra::read_model::InMemoryReadModelStore;
use stockroom_infra::repository::RecordRepository;
use stockroom_infra::services::{
    Collaborators, InventoryService, NewRecord, NewVariant, ReceiveRequest, ReceiveTarget,
    TransactionRequest,
};
use stockroom_inventory::{
    InventoryId, InventoryItem, InventoryItemId, ProductDetails, SplitPlan, TransactionType,
    Variant,
};
use stockroom_orders::{OrderProduct, ProductStatus, rollup};

fn items(variants: usize) -> Vec<InventoryItem> {
    (0..variants)
        .map(|n| {
            InventoryItem::new(
                InventoryItemId::generate(),
                Variant::new(format!("V{n}")),
                7 + (n as i64 * 13) % 50,
            )
        })
        .collect()
}

fn bench_split_planner(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_planner");

    for variants in [2usize, 10, 100] {
        let items = items(variants);
        let total: i64 = items.iter().map(|i| i.expected_quantity()).sum();
        group.throughput(Throughput::Elements(variants as u64));
        group.bench_with_input(BenchmarkId::new("compute", variants), &items, |b, items| {
            b.iter(|| SplitPlan::compute(black_box(items), black_box(total / 3)))
        });
    }

    group.finish();
}

fn bench_order_rollup(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_rollup");
    let statuses = ProductStatus::ALL;

    for lines in [1usize, 10, 200] {
        let order_id = OrderId::new();
        let products: Vec<OrderProduct> = (0..lines)
            .map(|n| OrderProduct {
                id: OrderProductId::new(),
                order_id,
                product_name: format!("Line {n}"),
                product_status: statuses[n % statuses.len()].as_str().to_string(),
                deleted: n % 17 == 0,
                inventory_record_id: None,
                warehouse_received_at: None,
            })
            .collect();
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(BenchmarkId::new("rollup", lines), &products, |b, products| {
            b.iter(|| rollup(black_box(products)))
        });
    }

    group.finish();
}

type Service = InventoryService<
    Arc<InMemoryEventStore>,
    Arc<InMemoryReadModelStore<InventoryId, stockroom_infra::projections::CatalogEntry>>,
>;

fn service_with_history(transactions: usize) -> (Service, Arc<InMemoryEventStore>, InventoryId) {
    let store = Arc::new(InMemoryEventStore::new());
    let service = InventoryService::new(
        store.clone(),
        Arc::new(InMemoryReadModelStore::new()),
        Collaborators {
            media: Arc::new(InMemoryMediaStore::new()),
            notifier: Arc::new(InMemoryNotifier::new()),
            users: Arc::new(InMemoryUserDirectory::new()),
            orders: Arc::new(InMemoryOrderGateway::new()),
        },
        StockroomConfig::default().with_notify_on_arrival(false),
    )
    .unwrap();
    let actor = Actor::new(UserId::new(), "Bench", Role::Warehouse);

    let record = service
        .register(
            NewRecord {
                details: ProductDetails {
                    product_name: "Bench hoodie".to_string(),
                    ..ProductDetails::default()
                },
                variants: vec![NewVariant {
                    variant: Variant::new("M"),
                    quantity: 0,
                }],
            },
            &actor,
        )
        .unwrap();
    let record_id = record.id_typed();
    let item_id = record.items()[0].id();
    service
        .receive(
            ReceiveRequest {
                target: ReceiveTarget::Persisted(record_id),
                rack_location: "A-01".to_string(),
                verified_variants: Default::default(),
                photos: vec![],
            },
            &actor,
        )
        .unwrap();

    for _ in 0..transactions {
        service
            .record_transaction(
                TransactionRequest {
                    record_id,
                    item_id,
                    transaction_type: TransactionType::Restock,
                    quantity: 1,
                    counterpart_name: None,
                    notes: None,
                },
                &actor,
            )
            .unwrap();
    }

    (service, store, record_id)
}

fn bench_record_rehydration(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_rehydration");

    for transactions in [10usize, 100, 1000] {
        let (_service, store, record_id) = service_with_history(transactions);
        let repo = RecordRepository::new(store);
        group.throughput(Throughput::Elements(transactions as u64));
        group.bench_with_input(
            BenchmarkId::new("load", transactions),
            &record_id,
            |b, record_id| b.iter(|| repo.load(black_box(*record_id)).unwrap()),
        );
    }

    group.finish();
}

fn bench_catalog_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_rebuild");

    for transactions in [100usize, 1000] {
        let (_service, store, _) = service_with_history(transactions);
        let events = store.load_all().unwrap();
        group.throughput(Throughput::Elements(events.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("rebuild_from_scratch", events.len()),
            &events,
            |b, events| {
                b.iter(|| {
                    let catalog = InventoryCatalogProjection::new(InMemoryReadModelStore::new());
                    catalog.rebuild_from_scratch(events.clone()).unwrap();
                    black_box(catalog.list().len())
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_split_planner,
    bench_order_rollup,
    bench_record_rehydration,
    bench_catalog_rebuild
);
criterion_main!(benches);
