//! Performance benchmarks for entity store operations

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};

use spendwise::schema::register_default_models;
use spendwise::storage::parse_filter;
use spendwise::sync::{DataSync, MemoryRemoteStore, MemorySettings};
use spendwise::{EntityStore, Filter, Migrator, Record, SchemaRegistry, SqlEngine, SqliteEngine};

fn setup() -> (Arc<dyn SqlEngine>, Arc<SchemaRegistry>) {
    let engine: Arc<dyn SqlEngine> = Arc::new(SqliteEngine::open_in_memory().unwrap());
    let registry = Arc::new(SchemaRegistry::new());
    register_default_models(&registry).unwrap();
    Migrator::new(engine.clone()).migrate_all(&registry, true);
    (engine, registry)
}

fn item(i: usize) -> Record {
    match json!({
        "listId": format!("list-{}", i % 10),
        "name": format!("Item {}", i),
        "price": (i % 100) as f64 * 1000.0,
        "details": "benchmark",
        "date": "2024-01-01T00:00:00.000Z",
    }) {
        Value::Object(record) => record,
        _ => unreachable!(),
    }
}

fn item_store(engine: &Arc<dyn SqlEngine>, registry: &SchemaRegistry) -> EntityStore {
    EntityStore::for_entity(engine.clone(), registry, "SpendItem").unwrap()
}

fn bench_insert(c: &mut Criterion) {
    let (engine, registry) = setup();
    let store = item_store(&engine, &registry);

    let mut group = c.benchmark_group("insert");
    group.throughput(Throughput::Elements(1));
    group.bench_function("insert_one", |b| {
        let mut i = 0;
        b.iter(|| {
            i += 1;
            store.insert_one(black_box(item(i))).unwrap()
        })
    });

    for size in [100, 1000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("insert_many", size), &size, |b, &size| {
            b.iter(|| {
                let records: Vec<Record> = (0..size).map(item).collect();
                store.insert_many(black_box(records)).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_find(c: &mut Criterion) {
    let (engine, registry) = setup();
    let store = item_store(&engine, &registry);
    store
        .insert_many((0..5000).map(item).collect())
        .unwrap();

    let mut group = c.benchmark_group("find");
    let filters = [
        ("all", json!({})),
        ("equality", json!({"listId": "list-3"})),
        ("range", json!({"price": {"$gte": 10000, "$lt": 20000}})),
        ("pattern", json!({"name": {"$regex": "^Item 42"}})),
    ];
    for (name, filter) in filters {
        let filter = parse_filter(&filter).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &filter, |b, filter| {
            b.iter(|| store.find(black_box(filter)).unwrap())
        });
    }
    group.bench_function("count", |b| b.iter(|| store.count(&Filter::new()).unwrap()));
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let filter = parse_filter(&json!({
        "status": "Active",
        "price": {"$gt": 10000, "$lte": 500000},
        "listId": {"$in": ["a", "b", "c", "d"]},
        "name": {"$or": [{"$regex": "^Co"}, {"$regex": "tea$"}]},
    }))
    .unwrap();

    c.bench_function("filter_compile", |b| {
        b.iter(|| black_box(&filter).compile().unwrap())
    });
}

fn bench_export(c: &mut Criterion) {
    let (engine, registry) = setup();
    item_store(&engine, &registry)
        .insert_many((0..2000).map(item).collect())
        .unwrap();
    let sync = DataSync::new(
        engine,
        registry,
        Arc::new(MemoryRemoteStore::new()),
        Arc::new(MemorySettings::default()),
    );

    let mut group = c.benchmark_group("export");
    group.bench_function("export_all", |b| b.iter(|| sync.export_all().unwrap()));
    let document = sync.export_all().unwrap();
    group.bench_function("gzip", |b| b.iter(|| document.to_gzip().unwrap()));
    group.finish();
}

criterion_group!(benches, bench_insert, bench_find, bench_compile, bench_export);
criterion_main!(benches);
