//! Benchmarks for event application and stats projection.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use liveview::{
    reconcile, BoundedOrderedStore, ChangeEvent, FilterPredicate, RawRow, RequestAdapter,
    StatsProjector,
};
use serde_json::json;

fn row(id: u64, status: &str, at: i64) -> RawRow {
    json!({
        "id": format!("r-{id}"),
        "title": "benchmark request",
        "site_id": "s1",
        "status": status,
        "created_at": at,
    })
    .as_object()
    .unwrap()
    .clone()
}

fn make_events(count: u64, id_space: u64) -> Vec<ChangeEvent> {
    (0..count)
        .map(|i| {
            let id = i % id_space;
            match i % 3 {
                0 => ChangeEvent::insert(row(id, "open", i as i64)).unwrap(),
                1 => ChangeEvent::update(row(id, "in_progress", i as i64)).unwrap(),
                _ => ChangeEvent::delete_id(format!("r-{id}").as_str().into()),
            }
        })
        .collect()
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_events");
    let predicate = FilterPredicate::new()
        .eq("site_id", "s1")
        .statuses("status", ["open", "in_progress"]);
    let events = make_events(1000, 600);

    for capacity in [100, 500] {
        group.bench_with_input(
            BenchmarkId::new("capacity", capacity),
            &capacity,
            |b, &capacity| {
                b.iter(|| {
                    let mut store = BoundedOrderedStore::new(capacity);
                    for event in &events {
                        black_box(
                            reconcile::apply(&mut store, &RequestAdapter, &predicate, event)
                                .unwrap(),
                        );
                    }
                    store.commit()
                });
            },
        );
    }

    group.finish();
}

fn bench_project(c: &mut Criterion) {
    let mut store = BoundedOrderedStore::new(500);
    let predicate = FilterPredicate::new();
    for event in make_events(500, 500) {
        reconcile::apply(&mut store, &RequestAdapter, &predicate, &event).unwrap();
    }
    let data = store.commit();

    c.bench_function("project_stats_500", |b| {
        b.iter(|| black_box(RequestAdapter.project(&data)));
    });
}

criterion_group!(benches, bench_apply, bench_project);
criterion_main!(benches);
