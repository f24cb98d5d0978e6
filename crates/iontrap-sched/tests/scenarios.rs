//! Scenario tests run against both strategies through the shared trait.

use iontrap_ir::{DependencyGraph, GateApplication, GateId, GateKind, IrError, QubitId};
use iontrap_lattice::{Lattice, NodeKind, TrapLattice};
use iontrap_sched::{
    GreedyRouter, OptimalConfig, OptimalScheduler, Schedule, Scheduler, verify,
};

fn strategies() -> Vec<Box<dyn Scheduler>> {
    vec![
        Box::new(GreedyRouter::default()),
        Box::new(OptimalScheduler::new(OptimalConfig::default().with_horizon(16))),
    ]
}

fn run_all(graph: &DependencyGraph, trap: &TrapLattice) -> Vec<(String, Schedule)> {
    strategies()
        .into_iter()
        .map(|scheduler| {
            let schedule = scheduler
                .build(graph, trap)
                .unwrap_or_else(|e| panic!("{} failed: {e}", scheduler.name()));
            verify(&schedule, graph, trap)
                .unwrap_or_else(|e| panic!("{} produced an invalid schedule: {e}", scheduler.name()));
            (scheduler.name().to_string(), schedule)
        })
        .collect()
}

#[test]
fn test_single_rotation() {
    let trap = TrapLattice::line(5);
    let graph = DependencyGraph::from_sequence(1, &[GateApplication::rx(QubitId(0), 0.5)]).unwrap();

    for (name, schedule) in run_all(&graph, &trap) {
        assert!(schedule.len() >= 2, "{name}");
        assert_eq!(schedule.positions().len(), schedule.events().len(), "{name}");
        assert_eq!(schedule.fired_gates(), 1, "{name}");
        assert_eq!(
            trap.kind(schedule.final_positions()[0]),
            NodeKind::Idle,
            "{name}"
        );
    }
}

#[test]
fn test_single_interaction() {
    let trap = TrapLattice::line(5);
    let graph = DependencyGraph::from_sequence(
        2,
        &[GateApplication::ms(QubitId(0), QubitId(1), 0.5).unwrap()],
    )
    .unwrap();

    for (name, schedule) in run_all(&graph, &trap) {
        assert_eq!(schedule.fired_gates(), 1, "{name}");
        let event = &schedule.events()[schedule.step_of(GateId(0)).unwrap()][0];
        assert_eq!(event.kind, GateKind::Ms);

        let fired = schedule.step_of(GateId(0)).unwrap();
        let hub = schedule.positions()[fired][0];
        assert_eq!(trap.kind(hub), NodeKind::Interaction, "{name}");
        assert_eq!(schedule.positions()[fired][1], hub, "{name}");
        assert_eq!(schedule.positions()[fired + 1], vec![hub, hub], "{name}");

        // Each carrier leaves the hub onto a standard node.
        for q in 0..2 {
            let left = schedule.positions()[fired + 1..]
                .iter()
                .map(|step| step[q])
                .find(|&node| node != hub)
                .unwrap();
            assert_eq!(trap.kind(left), NodeKind::Standard, "{name}");
        }

        let last = schedule.final_positions();
        assert_ne!(last[0], last[1], "{name}");
        assert!(last.iter().all(|&n| trap.kind(n) == NodeKind::Idle), "{name}");
    }
}

#[test]
fn test_independent_rotations_fire_in_the_same_step() {
    let trap = TrapLattice::line(5);
    let graph = DependencyGraph::from_sequence(
        2,
        &[
            GateApplication::rx(QubitId(0), 0.5),
            GateApplication::ry(QubitId(1), 0.5),
        ],
    )
    .unwrap();

    for (name, schedule) in run_all(&graph, &trap) {
        assert_eq!(
            schedule.step_of(GateId(0)),
            schedule.step_of(GateId(1)),
            "{name}"
        );
    }
}

#[test]
fn test_dependency_chain_across_an_interaction() {
    let trap = TrapLattice::line(5);
    let graph = DependencyGraph::from_sequence(
        2,
        &[
            GateApplication::rx(QubitId(0), 0.5),
            GateApplication::ms(QubitId(0), QubitId(1), 0.25).unwrap(),
            GateApplication::ry(QubitId(1), 1.0),
        ],
    )
    .unwrap();

    let results = run_all(&graph, &trap);
    for (name, schedule) in &results {
        let rx = schedule.step_of(GateId(0)).unwrap();
        let ms = schedule.step_of(GateId(1)).unwrap();
        let ry = schedule.step_of(GateId(3)).unwrap();
        assert!(rx < ms, "{name}");
        assert!(ms + 2 <= ry, "{name}");
    }

    let greedy = &results[0].1;
    let optimal = &results[1].1;
    assert!(optimal.makespan() <= greedy.makespan());
}

#[test]
fn test_rotation_tagged_with_two_qubits_fails() {
    let err = GateApplication::new(GateKind::Rx, 0.5, &[QubitId(0), QubitId(1)]).unwrap_err();
    assert!(matches!(
        err,
        IrError::QubitCountMismatch {
            expected: 1,
            got: 2,
            ..
        }
    ));
}

#[test]
fn test_qft_on_penning_trap() {
    let trap = TrapLattice::penning();
    let graph = DependencyGraph::from_sequence(4, &iontrap_ir::workload::qft_native(4)).unwrap();
    let schedule = GreedyRouter::default().build(&graph, &trap).unwrap();
    let report = verify(&schedule, &graph, &trap).unwrap();
    assert_eq!(report.fired_gates, graph.num_units());
    assert!(
        schedule
            .final_positions()
            .iter()
            .all(|&n| trap.kind(n) == NodeKind::Idle)
    );
}
