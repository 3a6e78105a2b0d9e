//! Benchmarks for ring token circulation

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use concord_core::PeerId;
use concord_ring::{AbsorbAtOrigin, HighestCandidate, IgnoreAbsorptions, RingCoordinator};
use concord_test::TopologyGenerator;

fn bench_single_lap(c: &mut Criterion) {
    let ring = TopologyGenerator::with_seed(1).ring(1_000).unwrap();
    let start = ring.peers()[0];
    let mut coord = RingCoordinator::new(ring, AbsorbAtOrigin, IgnoreAbsorptions);

    c.bench_function("ring_single_lap_1000", |b| {
        b.iter(|| coord.initiate(black_box(start), 0u64).unwrap())
    });
}

fn bench_everyone_highest_candidate(c: &mut Criterion) {
    let ring = TopologyGenerator::with_seed(1).ring(100).unwrap();
    let starts: Vec<(PeerId, u64)> = ring.peers().iter().map(|&p| (p, p.0)).collect();
    let rule = HighestCandidate::new(|peer: PeerId| peer.0);
    let mut coord = RingCoordinator::new(ring, rule, IgnoreAbsorptions);

    c.bench_function("ring_everyone_highest_100", |b| {
        b.iter(|| coord.initiate_all(black_box(starts.iter().copied())).unwrap())
    });
}

criterion_group!(benches, bench_single_lap, bench_everyone_highest_candidate);
criterion_main!(benches);
