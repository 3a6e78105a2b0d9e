//! Benchmarks for flood dissemination

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use concord_core::PeerId;
use concord_diffusion::{Discard, DisseminationEngine, Topology};
use concord_test::TopologyGenerator;

fn bench_flood_path(c: &mut Criterion) {
    let ids = TopologyGenerator::peer_ids(1_000);
    let topology = Topology::path(&ids).unwrap();
    let mut engine = DisseminationEngine::new(topology, Discard);

    c.bench_function("flood_path_1000", |b| {
        b.iter(|| engine.originate(black_box(PeerId::new(1)), ()).unwrap())
    });
}

fn bench_flood_connected(c: &mut Criterion) {
    let mut group = c.benchmark_group("flood_connected");

    for &n in &[100usize, 1_000, 5_000] {
        let topology = TopologyGenerator::with_seed(42).connected(n, n * 2).unwrap();
        let mut engine = DisseminationEngine::new(topology, Discard);

        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| engine.originate(black_box(PeerId::new(1)), ()).unwrap())
        });
    }

    group.finish();
}

fn bench_flood_mesh(c: &mut Criterion) {
    let ids = TopologyGenerator::peer_ids(64);
    let mut engine = DisseminationEngine::new(Topology::mesh(&ids).unwrap(), Discard);

    c.bench_function("flood_mesh_64", |b| {
        b.iter(|| engine.originate(black_box(PeerId::new(1)), ()).unwrap())
    });
}

criterion_group!(benches, bench_flood_path, bench_flood_connected, bench_flood_mesh);
criterion_main!(benches);
