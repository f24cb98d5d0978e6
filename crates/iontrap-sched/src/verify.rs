//! Schedule verification.
//!
//! Checks a schedule produced by either strategy against the physical and
//! ordering constraints of the trap: carriers hop at most one edge per step
//! and never swap, nodes respect their capacity, gates fire where they are
//! allowed to, every logical gate fires exactly once, and dependent gates
//! fire only after their predecessors have completed.

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use iontrap_ir::{DependencyGraph, GateId, GateKind};
use iontrap_lattice::{Lattice, NodeId, NodeKind};

use crate::error::{SchedError, SchedResult};
use crate::schedule::Schedule;

/// Summary of a verified schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// Number of time steps.
    pub steps: usize,
    /// Step at which the last gate completes.
    pub makespan: usize,
    /// Number of gate events.
    pub fired_gates: usize,
    /// Total carrier moves.
    pub total_hops: usize,
}

fn violation(message: String) -> SchedError {
    SchedError::Verification(message)
}

/// Verify `schedule` against `graph` and `lattice`.
pub fn verify(
    schedule: &Schedule,
    graph: &DependencyGraph,
    lattice: &dyn Lattice,
) -> SchedResult<VerificationReport> {
    let positions = schedule.positions();
    if positions.len() != schedule.events().len() {
        return Err(violation(format!(
            "{} position steps but {} event steps",
            positions.len(),
            schedule.events().len()
        )));
    }

    check_positions(schedule, graph.num_qubits(), lattice)?;
    let fired = check_events(schedule, graph, lattice)?;
    check_capacity(schedule, lattice)?;
    check_dependencies(graph, &fired)?;

    let report = VerificationReport {
        steps: schedule.len(),
        makespan: schedule.makespan(),
        fired_gates: schedule.fired_gates(),
        total_hops: schedule.total_hops(),
    };
    debug!(
        "Verified schedule: {} steps, makespan {}, {} gates, {} hops",
        report.steps, report.makespan, report.fired_gates, report.total_hops
    );
    Ok(report)
}

/// Every step places every carrier on a known node, moves are single hops
/// and no two carriers exchange the endpoints of an edge.
fn check_positions(schedule: &Schedule, num_qubits: usize, lattice: &dyn Lattice) -> SchedResult<()> {
    for step in schedule.steps() {
        if step.positions.len() != num_qubits {
            return Err(violation(format!(
                "Step {} places {} carriers, expected {num_qubits}",
                step.index,
                step.positions.len()
            )));
        }
        if let Some(node) = step.positions.iter().find(|n| n.index() >= lattice.node_count()) {
            return Err(violation(format!("Step {}: unknown node {node}", step.index)));
        }
    }

    for (t, pair) in schedule.positions().windows(2).enumerate() {
        let (before, after) = (&pair[0], &pair[1]);
        let mut moves: FxHashMap<(NodeId, NodeId), usize> = FxHashMap::default();
        for (q, (&from, &to)) in before.iter().zip(after).enumerate() {
            if from == to {
                continue;
            }
            if !lattice.is_adjacent(from, to) {
                return Err(violation(format!(
                    "q{q} jumps from {from} to {to} between steps {t} and {}",
                    t + 1
                )));
            }
            if let Some(&other) = moves.get(&(to, from)) {
                return Err(violation(format!(
                    "q{q} and q{other} swap across {from}-{to} between steps {t} and {}",
                    t + 1
                )));
            }
            moves.insert((from, to), q);
        }
    }
    Ok(())
}

/// Every logical gate fires exactly once and at a node that allows it.
/// Returns the firing step of each unit.
fn check_events(
    schedule: &Schedule,
    graph: &DependencyGraph,
    lattice: &dyn Lattice,
) -> SchedResult<FxHashMap<GateId, usize>> {
    let positions = schedule.positions();
    let mut fired: FxHashMap<GateId, usize> = FxHashMap::default();

    for step in schedule.steps() {
        for event in step.events {
            let t = step.index;
            let gate = graph.try_gate(event.gate)?;
            if !graph.is_primary(gate.id) {
                return Err(violation(format!(
                    "Step {t}: {} is not the primary half of its interaction",
                    gate.id
                )));
            }
            if event.kind != gate.kind || event.operands != gate.operands {
                return Err(violation(format!("Step {t}: event does not match {gate}")));
            }
            if let Some(first) = fired.insert(gate.id, t) {
                return Err(violation(format!(
                    "{} fired at steps {first} and {t}",
                    gate.id
                )));
            }

            let qubits = event.qubits();
            match event.kind {
                GateKind::Rx | GateKind::Ry => {
                    let node = step.positions[qubits[0].index()];
                    if lattice.kind(node) != NodeKind::Standard {
                        return Err(violation(format!(
                            "Step {t}: {} fired on non-standard node {node}",
                            gate.id
                        )));
                    }
                }
                GateKind::Ms => {
                    let (a, b) = (qubits[0].index(), qubits[1].index());
                    let node = step.positions[a];
                    let held = |s: usize| {
                        positions
                            .get(s)
                            .is_some_and(|p| p[a] == node && p[b] == node)
                    };
                    if lattice.kind(node) != NodeKind::Interaction || !held(t) || !held(t + 1) {
                        return Err(violation(format!(
                            "Step {t}: {} needs both carriers on one interaction node for two steps",
                            gate.id
                        )));
                    }
                }
            }
        }
    }

    if let Some(missing) = graph.units().find(|gate| !fired.contains_key(&gate.id)) {
        return Err(violation(format!("{missing} never fired")));
    }
    Ok(fired)
}

/// Standard and idle nodes hold one carrier. An interaction node holds two
/// only while they are the pair of an interaction that fires there.
///
/// The licence covers the whole run of consecutive steps the pair spends
/// together on the node, as long as the run contains a firing step and the
/// step after it. A pair may therefore arrive together and wait before
/// firing, which the greedy router does on its arrival step. The MILP only
/// admits the pair on the firing step and the one after, so its schedules
/// pass this check as a special case.
fn check_capacity(schedule: &Schedule, lattice: &dyn Lattice) -> SchedResult<()> {
    let positions = schedule.positions();

    // (low qubit, high qubit, node) -> firing steps
    let mut firings: FxHashMap<(usize, usize, NodeId), Vec<usize>> = FxHashMap::default();
    for step in schedule.steps() {
        for event in step.events.iter().filter(|e| e.kind == GateKind::Ms) {
            let qubits = event.qubits();
            let (a, b) = (qubits[0].index(), qubits[1].index());
            let node = step.positions[a];
            firings
                .entry((a.min(b), a.max(b), node))
                .or_default()
                .push(step.index);
        }
    }

    for step in schedule.steps() {
        let mut occupants: FxHashMap<NodeId, Vec<usize>> = FxHashMap::default();
        for (q, &node) in step.positions.iter().enumerate() {
            occupants.entry(node).or_default().push(q);
        }

        for (node, carriers) in occupants {
            let capacity = lattice.kind(node).interaction_capacity();
            if carriers.len() > capacity {
                return Err(violation(format!(
                    "Step {}: {} carriers on {node} ({:?})",
                    step.index,
                    carriers.len(),
                    lattice.kind(node)
                )));
            }
            if carriers.len() < 2 {
                continue;
            }

            let (a, b) = (carriers[0], carriers[1]);
            let together = |s: usize| positions[s][a] == node && positions[s][b] == node;
            let mut start = step.index;
            while start > 0 && together(start - 1) {
                start -= 1;
            }
            let mut end = step.index;
            while end + 1 < positions.len() && together(end + 1) {
                end += 1;
            }

            let licensed = firings
                .get(&(a, b, node))
                .is_some_and(|steps| steps.iter().any(|&e| start <= e && e < end));
            if !licensed {
                return Err(violation(format!(
                    "Step {}: q{a} and q{b} share {node} without an interaction firing there",
                    step.index
                )));
            }
        }
    }

    Ok(())
}

/// A unit fires only after every predecessor unit has completed.
fn check_dependencies(graph: &DependencyGraph, fired: &FxHashMap<GateId, usize>) -> SchedResult<()> {
    for gate in graph.units() {
        let Some(&step) = fired.get(&gate.id) else {
            continue;
        };
        for pred in graph.unit_predecessors(gate.id) {
            let Some(&pred_step) = fired.get(&pred) else {
                continue;
            };
            let done = pred_step + graph[pred].kind.duration();
            if step < done {
                return Err(violation(format!(
                    "{} fires at step {step} before {pred} completes at step {done}",
                    gate.id
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ScheduledGate;
    use iontrap_ir::{GateApplication, QubitId};
    use iontrap_lattice::{Site, TrapLattice};

    fn rotation_graph() -> DependencyGraph {
        DependencyGraph::from_sequence(1, &[GateApplication::rx(QubitId(0), 0.5)]).unwrap()
    }

    #[test]
    fn test_accepts_rotation_schedule() {
        let trap = TrapLattice::line(3);
        let graph = rotation_graph();
        let idle = trap.idle_at(Site::new(0, 0)).unwrap();
        let standard = trap.node_at(Site::new(0, 0)).unwrap();

        let mut schedule = Schedule::new();
        schedule.push_step(vec![idle], vec![]);
        schedule.push_step(vec![standard], vec![]);
        schedule.push_step(vec![standard], vec![ScheduledGate::from_gate(&graph[GateId(0)])]);
        schedule.push_step(vec![idle], vec![]);

        let report = verify(&schedule, &graph, &trap).unwrap();
        assert_eq!(report.steps, 4);
        assert_eq!(report.makespan, 3);
        assert_eq!(report.total_hops, 2);
    }

    #[test]
    fn test_rejects_rotation_on_idle_node() {
        let trap = TrapLattice::line(3);
        let graph = rotation_graph();
        let idle = trap.idle_at(Site::new(0, 0)).unwrap();

        let mut schedule = Schedule::new();
        schedule.push_step(vec![idle], vec![ScheduledGate::from_gate(&graph[GateId(0)])]);
        assert!(matches!(
            verify(&schedule, &graph, &trap),
            Err(SchedError::Verification(_))
        ));
    }

    #[test]
    fn test_rejects_missing_gate_and_jumps() {
        let trap = TrapLattice::line(3);
        let graph = rotation_graph();
        let left = trap.idle_at(Site::new(0, 0)).unwrap();
        let right = trap.idle_at(Site::new(0, 2)).unwrap();

        let mut schedule = Schedule::new();
        schedule.push_step(vec![left], vec![]);
        let err = verify(&schedule, &graph, &trap).unwrap_err();
        assert!(err.to_string().contains("never fired"));

        schedule.push_step(vec![right], vec![]);
        let err = verify(&schedule, &graph, &trap).unwrap_err();
        assert!(err.to_string().contains("jumps"));
    }

    #[test]
    fn test_rejects_swap() {
        let trap = TrapLattice::line(3);
        let graph = DependencyGraph::from_sequence(2, &[]).unwrap();
        let (a, b) = (
            trap.node_at(Site::new(0, 0)).unwrap(),
            trap.idle_at(Site::new(0, 0)).unwrap(),
        );
        let mut schedule = Schedule::new();
        schedule.push_step(vec![a, b], vec![]);
        schedule.push_step(vec![b, a], vec![]);
        let err = verify(&schedule, &graph, &trap).unwrap_err();
        assert!(err.to_string().contains("swap"));
    }

    #[test]
    fn test_rejects_interaction_cut_short() {
        let trap = TrapLattice::line(3);
        let graph =
            DependencyGraph::from_sequence(2, &[GateApplication::ms(QubitId(0), QubitId(1), 0.5).unwrap()])
                .unwrap();
        let hub = trap.node_at(Site::new(0, 1)).unwrap();
        let left = trap.node_at(Site::new(0, 0)).unwrap();
        let right = trap.node_at(Site::new(0, 2)).unwrap();

        let mut schedule = Schedule::new();
        schedule.push_step(vec![left, hub], vec![]);
        schedule.push_step(vec![hub, hub], vec![ScheduledGate::from_gate(&graph[GateId(0)])]);
        schedule.push_step(vec![left, right], vec![]);
        let err = verify(&schedule, &graph, &trap).unwrap_err();
        assert!(err.to_string().contains("two steps"));
    }

    #[test]
    fn test_colocation_run_around_firing() {
        let trap = TrapLattice::line(3);
        let graph =
            DependencyGraph::from_sequence(2, &[GateApplication::ms(QubitId(0), QubitId(1), 0.5).unwrap()])
                .unwrap();
        let hub = trap.node_at(Site::new(0, 1)).unwrap();
        let left = trap.node_at(Site::new(0, 0)).unwrap();
        let right = trap.node_at(Site::new(0, 2)).unwrap();
        let event = ScheduledGate::from_gate(&graph[GateId(0)]);

        // Arrive together, fire on the next step, hold, leave.
        let mut schedule = Schedule::new();
        schedule.push_step(vec![left, right], vec![]);
        schedule.push_step(vec![hub, hub], vec![]);
        schedule.push_step(vec![hub, hub], vec![event]);
        schedule.push_step(vec![hub, hub], vec![]);
        schedule.push_step(vec![left, right], vec![]);
        assert!(verify(&schedule, &graph, &trap).is_ok());

        // Meeting again with nothing firing is not licensed.
        schedule.push_step(vec![hub, hub], vec![]);
        let err = verify(&schedule, &graph, &trap).unwrap_err();
        assert!(err.to_string().contains("without an interaction firing"));
    }
}
