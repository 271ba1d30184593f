use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ruta::command::{CreateIndexes, IndexOptions, Namespace, Renderable};
use ruta::selection::{ReadPreference, ServerSelector, TagSet};
use ruta::{Member, ServerRole, TopologyKind, TopologySnapshot};
use serde_json::{json, Value};
use std::time::Duration;

/// Replica set with one primary and `size - 1` secondaries spread over three data centers
fn create_replica_set(size: usize) -> TopologySnapshot {
    let dcs = ["east", "west", "north"];
    let members = (0..size)
        .map(|i| {
            let role = if i == 0 { ServerRole::Primary } else { ServerRole::Secondary };
            Member::new(
                format!("10.0.{}.{}", i / 250, i % 250),
                27017,
                role,
                Duration::from_micros(2_000 + (i as u64 * 739) % 40_000),
            )
            .with_tags([("dc", dcs[i % dcs.len()])])
        })
        .collect();
    TopologySnapshot::new(TopologyKind::ReplicaSet, members).unwrap()
}

fn bench_selection(c: &mut Criterion) {
    let selector = ServerSelector::default();
    let west: TagSet = [("dc", "west")].into_iter().collect();
    let preferences = [
        ("primary", ReadPreference::primary()),
        ("nearest", ReadPreference::nearest()),
        (
            "secondary_tagged",
            ReadPreference::secondary()
                .with_tag_sets(vec![[("dc", "south")].into_iter().collect(), west])
                .unwrap(),
        ),
    ];

    let mut group = c.benchmark_group("select");
    for size in [3usize, 7, 50].iter() {
        let snapshot = create_replica_set(*size);
        for (name, preference) in preferences.iter() {
            group.bench_with_input(BenchmarkId::new(*name, size), &snapshot, |b, snapshot| {
                b.iter(|| black_box(selector.select(black_box(snapshot), preference).len()));
            });
        }
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let namespace: Namespace = "test.test_coll".parse().unwrap();
    let key = match json!({ "foo": 1, "bar": -1 }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    let command = CreateIndexes::single(namespace, key, "foo_1_bar_-1", IndexOptions::unique());

    c.bench_function("render_create_indexes", |b| {
        b.iter(|| black_box(command.render().unwrap()));
    });
}

criterion_group!(benches, bench_selection, bench_render);
criterion_main!(benches);
