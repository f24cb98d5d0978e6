//! Makespan-optimal scheduler.
//!
//! The whole schedule is one mixed-integer program over a fixed horizon
//! (see [`model`]), solved with the pure-Rust `microlp` backend of `good_lp`.
//! A solve runs on a worker thread; when the wall-clock budget expires the
//! attempt is reported as a timeout and the worker is told to stop. An
//! infeasible horizon is retried with a longer one while the configuration
//! allows it.
//!
//! The worker checks its stop flag between model-building stages and right
//! before handing the model to `microlp`, which cannot be interrupted. A
//! worker already inside the solver keeps its core busy until `microlp`
//! returns, and its result is dropped.

mod model;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use good_lp::ResolutionError;
use rustc_hash::FxHashMap;
use tracing::{info, instrument, warn};

use iontrap_ir::{DependencyGraph, GateId};
use iontrap_lattice::Lattice;

use crate::carrier::initial_positions;
use crate::config::OptimalConfig;
use crate::error::{SchedError, SchedResult};
use crate::schedule::{Schedule, ScheduledGate};
use crate::scheduler::Scheduler;

use self::model::{Instance, Unit};

/// Result of an optimal solve.
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    /// A makespan-optimal schedule within the horizon.
    Solved(Schedule),
    /// No schedule fits within the largest horizon tried.
    Infeasible {
        /// Largest horizon tried.
        horizon: usize,
    },
    /// The solver did not finish within its budget.
    ///
    /// The worker thread is signalled to stop but may still be inside
    /// `microlp`, in which case it runs on in the background until the solve
    /// returns.
    Timeout {
        /// Horizon being solved.
        horizon: usize,
        /// Wall-clock budget.
        budget: Duration,
    },
}

impl SolveOutcome {
    /// The schedule, if one was found.
    pub fn schedule(&self) -> Option<&Schedule> {
        match self {
            SolveOutcome::Solved(schedule) => Some(schedule),
            SolveOutcome::Infeasible { .. } | SolveOutcome::Timeout { .. } => None,
        }
    }
}

/// Makespan-optimal MILP scheduler.
///
/// Each horizon is solved on its own thread. On timeout the thread is
/// detached rather than joined; see [`SolveOutcome::Timeout`].
#[derive(Debug, Clone, Default)]
pub struct OptimalScheduler {
    config: OptimalConfig,
}

enum Attempt {
    Solved(Schedule),
    Infeasible,
    Timeout,
}

impl OptimalScheduler {
    /// Create a scheduler with the given configuration.
    pub fn new(config: OptimalConfig) -> Self {
        Self { config }
    }

    /// The scheduler configuration.
    pub fn config(&self) -> &OptimalConfig {
        &self.config
    }

    /// Solve, reporting infeasibility and timeouts as outcomes.
    #[instrument(skip(self, graph, lattice))]
    pub fn solve(&self, graph: &DependencyGraph, lattice: &dyn Lattice) -> SchedResult<SolveOutcome> {
        self.config.validate()?;
        let homes = initial_positions(lattice, graph.num_qubits(), self.config.homes.as_deref())?;
        let units = units(graph);
        let budget = self.config.time_budget();

        let mut horizon = self.config.horizon;
        for h in self.config.horizons() {
            horizon = h;
            let instance = Instance::new(lattice, homes.clone(), units.clone(), h);
            let started = Instant::now();
            match attempt(instance, budget)? {
                Attempt::Solved(schedule) => {
                    info!(
                        "Optimal schedule at horizon {h}: makespan {}, {} steps, solved in {:?}",
                        schedule.makespan(),
                        schedule.len(),
                        started.elapsed()
                    );
                    return Ok(SolveOutcome::Solved(schedule));
                }
                Attempt::Infeasible => {
                    info!("Horizon {h} infeasible after {:?}", started.elapsed());
                }
                Attempt::Timeout => {
                    warn!("Solver exceeded {budget:?} at horizon {h}");
                    return Ok(SolveOutcome::Timeout { horizon: h, budget });
                }
            }
        }
        Ok(SolveOutcome::Infeasible { horizon })
    }
}

impl Scheduler for OptimalScheduler {
    fn name(&self) -> &str {
        "optimal"
    }

    fn build(&self, graph: &DependencyGraph, lattice: &dyn Lattice) -> SchedResult<Schedule> {
        match self.solve(graph, lattice)? {
            SolveOutcome::Solved(schedule) => Ok(schedule),
            SolveOutcome::Infeasible { horizon } => Err(SchedError::Infeasible { horizon }),
            SolveOutcome::Timeout { horizon, budget } => {
                Err(SchedError::SolverTimeout { horizon, budget })
            }
        }
    }
}

/// Run one solve on a worker thread, waiting at most `budget`.
fn attempt(instance: Instance, budget: Duration) -> SchedResult<Attempt> {
    let horizon = instance.horizon;
    let (tx, rx) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let worker_cancel = Arc::clone(&cancel);
    thread::Builder::new()
        .name(format!("milp-h{horizon}"))
        .spawn(move || {
            // The receiver is gone once the budget has expired.
            let _ = tx.send(model::solve(&instance, &worker_cancel));
        })
        .map_err(|e| SchedError::Solver(format!("failed to spawn solver thread: {e}")))?;

    let received = rx.recv_timeout(budget);
    if received.is_err() {
        cancel.store(true, Ordering::Relaxed);
    }
    match received {
        Ok(Ok(schedule)) => Ok(Attempt::Solved(schedule)),
        Ok(Err(ResolutionError::Infeasible)) => Ok(Attempt::Infeasible),
        Ok(Err(e)) => Err(SchedError::Solver(e.to_string())),
        Err(mpsc::RecvTimeoutError::Timeout) => Ok(Attempt::Timeout),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(SchedError::Solver("solver thread exited without a result".into()))
        }
    }
}

/// Logical gates in topological order with predecessor indices.
fn units(graph: &DependencyGraph) -> Vec<Unit> {
    let ids: Vec<GateId> = graph.units().map(|gate| gate.id).collect();
    let index: FxHashMap<GateId, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    ids.iter()
        .map(|&id| {
            let gate = &graph[id];
            Unit {
                event: ScheduledGate::from_gate(gate),
                qubits: gate.operands.qubits().iter().map(|q| q.index()).collect(),
                duration: gate.kind.duration(),
                predecessors: graph
                    .unit_predecessors(id)
                    .iter()
                    .filter_map(|pred| index.get(pred).copied())
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use iontrap_ir::{GateApplication, QubitId};
    use iontrap_lattice::{NodeKind, Site, TrapLattice};

    use crate::verify::verify;

    #[test]
    fn test_single_rotation_is_optimal() {
        let trap = TrapLattice::line(3);
        let graph =
            DependencyGraph::from_sequence(1, &[GateApplication::rx(QubitId(0), 0.5)]).unwrap();
        let scheduler = OptimalScheduler::new(OptimalConfig::default().with_horizon(4));
        let schedule = scheduler.build(&graph, &trap).unwrap();

        // idle -> standard and fire on arrival
        assert_eq!(schedule.makespan(), 2);
        assert_eq!(schedule.step_of(GateId(0)), Some(1));
        assert_eq!(trap.kind(schedule.final_positions()[0]), NodeKind::Idle);
        verify(&schedule, &graph, &trap).unwrap();
    }

    #[test]
    fn test_interaction_on_line() {
        let trap = TrapLattice::line(3);
        let graph = DependencyGraph::from_sequence(
            2,
            &[GateApplication::ms(QubitId(0), QubitId(1), 0.5).unwrap()],
        )
        .unwrap();
        let scheduler = OptimalScheduler::new(OptimalConfig::default().with_horizon(8));
        let schedule = scheduler.build(&graph, &trap).unwrap();

        // Both carriers are two hops from the hub and may enter it together.
        let hub = trap.node_at(Site::new(0, 1)).unwrap();
        let fired = schedule.step_of(GateId(0)).unwrap();
        assert_eq!(fired, 2);
        assert_eq!(schedule.makespan(), 4);
        assert_eq!(schedule.positions()[fired], vec![hub, hub]);
        verify(&schedule, &graph, &trap).unwrap();
    }

    #[test]
    fn test_short_horizon_is_infeasible() {
        let trap = TrapLattice::line(3);
        let graph = DependencyGraph::from_sequence(
            2,
            &[GateApplication::ms(QubitId(0), QubitId(1), 0.5).unwrap()],
        )
        .unwrap();
        let scheduler = OptimalScheduler::new(OptimalConfig::default().with_horizon(3));
        let outcome = scheduler.solve(&graph, &trap).unwrap();
        assert!(matches!(outcome, SolveOutcome::Infeasible { horizon: 3 }));
        assert!(matches!(
            scheduler.build(&graph, &trap),
            Err(SchedError::Infeasible { horizon: 3 })
        ));
    }

    #[test]
    fn test_horizon_grows_until_feasible() {
        let trap = TrapLattice::line(3);
        let graph = DependencyGraph::from_sequence(
            2,
            &[GateApplication::ms(QubitId(0), QubitId(1), 0.5).unwrap()],
        )
        .unwrap();
        let config = OptimalConfig::default()
            .with_horizon(3)
            .with_max_horizon(9)
            .with_horizon_step(3);
        let outcome = OptimalScheduler::new(config).solve(&graph, &trap).unwrap();
        let schedule = outcome.schedule().unwrap();
        assert_eq!(schedule.makespan(), 4);
        assert!(schedule.len() <= 6);
    }

    #[test]
    fn test_budget_expiry_is_a_timeout() {
        // Eight carriers on the Penning trap take far longer than a millisecond
        // just to build the model.
        let trap = TrapLattice::penning();
        let graph = DependencyGraph::from_sequence(
            8,
            &[GateApplication::ms(QubitId(0), QubitId(7), 0.5).unwrap()],
        )
        .unwrap();
        let config = OptimalConfig::default()
            .with_horizon(10)
            .with_time_budget(Duration::from_millis(1));
        let scheduler = OptimalScheduler::new(config);

        let outcome = scheduler.solve(&graph, &trap).unwrap();
        assert!(matches!(outcome, SolveOutcome::Timeout { horizon: 10, .. }));
        assert!(outcome.schedule().is_none());
        assert!(matches!(
            scheduler.build(&graph, &trap),
            Err(SchedError::SolverTimeout { horizon: 10, .. })
        ));
    }
}
