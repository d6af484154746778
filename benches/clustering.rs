use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tabpipe::store::TableStore;
use tabpipe::types::{DataType, Field, Schema, Table, Value};

fn synthetic_table(rows: usize) -> Table {
    let regions = ["east", "west", "north", "south"];
    let cities = ["Boston", "Denver", "Fargo", "Miami", "Austin"];

    let schema = Schema::new(vec![
        Field::new("region", DataType::Utf8),
        Field::new("city", DataType::Utf8),
        Field::new("price", DataType::Int64),
    ]);
    let rows = (0..rows)
        .map(|i| {
            vec![
                Value::Utf8(regions[i % regions.len()].to_string()),
                Value::Utf8(cities[i % cities.len()].to_string()),
                Value::Int64(i as i64),
            ]
        })
        .collect();
    Table::new(schema, rows)
}

fn bench_clustering(c: &mut Criterion) {
    let table = synthetic_table(10_000);

    c.bench_function("create_clusters 10k rows", |b| {
        b.iter(|| {
            let mut store = TableStore::from_table(table.clone());
            black_box(store.create_clusters("region").unwrap().len())
        })
    });

    c.bench_function("create_sub_clusters 10k rows", |b| {
        b.iter(|| {
            let mut store = TableStore::from_table(table.clone());
            store.create_sub_clusters("region", "city").unwrap();
            black_box(store.sub_cluster_index("region", "city").unwrap().len())
        })
    });
}

criterion_group!(benches, bench_clustering);
criterion_main!(benches);
