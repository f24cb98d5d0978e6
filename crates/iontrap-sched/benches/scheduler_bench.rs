//! Benchmarks for the schedulers
//!
//! Run with: cargo bench -p iontrap-sched

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use iontrap_ir::{DependencyGraph, GateApplication, QubitId, workload::qft_native};
use iontrap_lattice::TrapLattice;
use iontrap_sched::{
    GreedyConfig, GreedyRouter, OptimalConfig, OptimalScheduler, Scheduler, verify,
};

/// Benchmark the greedy router on the QFT workload
fn bench_greedy_qft(c: &mut Criterion) {
    let mut group = c.benchmark_group("greedy_qft");
    let trap = TrapLattice::penning();

    for num_qubits in &[4usize, 8, 12] {
        let graph = DependencyGraph::from_sequence(*num_qubits, &qft_native(*num_qubits)).unwrap();
        for k in &[1usize, 2] {
            let router = GreedyRouter::new(GreedyConfig::default().with_max_active_interactions(*k));
            group.bench_with_input(
                BenchmarkId::new(format!("k{k}"), num_qubits),
                &graph,
                |b, graph| {
                    b.iter(|| router.build(black_box(graph), &trap).unwrap());
                },
            );
        }
    }

    group.finish();
}

/// Benchmark schedule verification
fn bench_verify(c: &mut Criterion) {
    let trap = TrapLattice::penning();
    let graph = DependencyGraph::from_sequence(12, &qft_native(12)).unwrap();
    let schedule = GreedyRouter::default().build(&graph, &trap).unwrap();

    c.bench_function("verify_qft12", |b| {
        b.iter(|| verify(black_box(&schedule), &graph, &trap).unwrap());
    });
}

/// Benchmark the MILP scheduler on a small instance
fn bench_optimal_line(c: &mut Criterion) {
    let trap = TrapLattice::line(3);
    let sequence = vec![GateApplication::ms(QubitId(0), QubitId(1), 0.5).unwrap()];
    let graph = DependencyGraph::from_sequence(2, &sequence).unwrap();
    let scheduler = OptimalScheduler::new(OptimalConfig::default().with_horizon(8));

    let mut group = c.benchmark_group("optimal");
    group.sample_size(10);
    group.bench_function("line3_single_ms", |b| {
        b.iter(|| scheduler.build(black_box(&graph), &trap).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_greedy_qft, bench_verify, bench_optimal_line);
criterion_main!(benches);
