//! Property tests: every greedy schedule passes verification.

use std::ops::Range;

use proptest::prelude::*;

use iontrap_ir::{DependencyGraph, GateApplication, QubitId};
use iontrap_lattice::{Lattice, NodeKind, TrapLattice};
use iontrap_sched::{GreedyConfig, GreedyRouter, Scheduler, verify};

fn assert_routes(num_qubits: usize, seq: &[GateApplication], bound: usize) {
    let trap = TrapLattice::penning();
    let graph = DependencyGraph::from_sequence(num_qubits, seq).unwrap();
    let router = GreedyRouter::new(GreedyConfig::default().with_max_active_interactions(bound));
    let schedule = router.build(&graph, &trap).unwrap();

    let report = verify(&schedule, &graph, &trap).unwrap();
    assert_eq!(report.fired_gates, graph.num_units());
    assert!(schedule.final_positions().iter().all(|&n| trap.kind(n) == NodeKind::Idle));
}

/// Strategy: a random native sequence over `num_qubits` qubits.
fn arb_sequence(num_qubits: u32, len: Range<usize>) -> impl Strategy<Value = Vec<GateApplication>> {
    let gate = (0..3u8, 0..num_qubits, 0..num_qubits, -4i32..=4).prop_map(
        move |(kind, a, b, quarter)| {
            let angle = f64::from(quarter) / 4.0;
            match kind {
                0 => GateApplication::rx(QubitId(a), angle),
                1 => GateApplication::ry(QubitId(a), angle),
                _ => {
                    let b = if a == b { (b + 1) % num_qubits } else { b };
                    GateApplication::ms(QubitId(a), QubitId(b), angle).unwrap()
                }
            }
        },
    );
    prop::collection::vec(gate, len)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_greedy_schedules_verify(seq in arb_sequence(4, 0..12)) {
        let trap = TrapLattice::penning();
        let graph = DependencyGraph::from_sequence(4, &seq).unwrap();
        let schedule = GreedyRouter::default().build(&graph, &trap).unwrap();

        let report = verify(&schedule, &graph, &trap).unwrap();
        prop_assert_eq!(report.fired_gates, graph.num_units());
        for &node in schedule.final_positions() {
            prop_assert_eq!(trap.kind(node), NodeKind::Idle);
        }
    }

    #[test]
    fn test_parallel_interactions_verify(seq in arb_sequence(4, 0..12)) {
        let trap = TrapLattice::penning();
        let graph = DependencyGraph::from_sequence(4, &seq).unwrap();
        let router = GreedyRouter::new(GreedyConfig::default().with_max_active_interactions(2));
        let schedule = router.build(&graph, &trap).unwrap();
        prop_assert!(verify(&schedule, &graph, &trap).is_ok());
    }

    /// Rebuilding the same graph gives the same schedule.
    #[test]
    fn test_greedy_is_deterministic(seq in arb_sequence(3, 0..8)) {
        let trap = TrapLattice::penning();
        let graph = DependencyGraph::from_sequence(3, &seq).unwrap();
        let router = GreedyRouter::default();
        prop_assert_eq!(
            router.build(&graph, &trap).unwrap(),
            router.build(&graph, &trap).unwrap()
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Eight carriers on the Penning trap contend for the same corridors.
    #[test]
    fn test_crowded_trap_schedules_verify(seq in arb_sequence(8, 20..41), bound in 1usize..=4) {
        assert_routes(8, &seq, bound);
    }
}

#[test]
fn test_parking_carrier_clears_interaction_route() {
    let seq = [
        GateApplication::ms(QubitId(6), QubitId(7), 0.5).unwrap(),
        GateApplication::ms(QubitId(3), QubitId(0), 0.5).unwrap(),
        GateApplication::rx(QubitId(3), 0.5),
        GateApplication::ms(QubitId(3), QubitId(4), 0.5).unwrap(),
        GateApplication::rx(QubitId(3), 0.5),
        GateApplication::ms(QubitId(5), QubitId(6), 0.5).unwrap(),
    ];
    for bound in 1..=4 {
        assert_routes(8, &seq, bound);
    }
}
