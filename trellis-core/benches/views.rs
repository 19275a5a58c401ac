//! Benchmarks for view evaluation: cached hits, unrelated updates, and
//! updates on the read path.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use trellis_core::{Key, ModelDefinition, Store, Value};

/// A store whose `todos` model holds `n` items and a separate `filter` field.
fn todo_store(n: usize) -> Store {
    let items = Value::array((0..n).map(|i| Value::object([("done", Value::from(i % 2 == 0))])));
    let state = Value::object([("items", items), ("filter", Value::from("all"))]);

    let store = Store::new();
    let model = ModelDefinition::new("todos", state).view("done_count", |state, _, _, _| {
        let done = state
            .get("items")
            .iter()
            .filter(|item| item.get("done").as_bool().unwrap_or(false))
            .count();
        Ok(Value::from(done as i64))
    });
    if let Err(err) = store.add_model(model) {
        panic!("bench model rejected: {err}");
    }
    store
}

fn call(store: &Store) -> Value {
    match store.view("todos", "done_count", None) {
        Ok(value) => value,
        Err(err) => panic!("view failed: {err}"),
    }
}

fn bench_cached_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_hit");

    for n in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let store = todo_store(n);
            call(&store);
            b.iter(|| black_box(call(&store)));
        });
    }

    group.finish();
}

/// Update a field the view never reads, then call the view.
fn bench_unrelated_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("unrelated_update");
    let path = [Key::from("filter")];

    for n in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let store = todo_store(n);
            call(&store);
            let mut flip = false;
            b.iter(|| {
                flip = !flip;
                let filter = if flip { "done" } else { "all" };
                let _ = store.set_in("todos", &path, Value::from(filter));
                black_box(call(&store))
            });
        });
    }

    group.finish();
}

/// Toggle one item, which forces a full recompute.
fn bench_read_path_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_path_update");

    for n in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let store = todo_store(n);
            call(&store);
            let path = [Key::from("items"), Key::from(n / 2), Key::from("done")];
            let mut done = false;
            b.iter(|| {
                done = !done;
                let _ = store.set_in("todos", &path, Value::from(done));
                black_box(call(&store))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cached_hit, bench_unrelated_update, bench_read_path_update);
criterion_main!(benches);
