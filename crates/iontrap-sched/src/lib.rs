//! Shuttling and execution schedulers for trapped-ion lattices
//!
//! This crate turns a [`DependencyGraph`](iontrap_ir::DependencyGraph) into a
//! time-indexed [`Schedule`]: where every carrier sits at each step and which
//! gates fire at that step.
//!
//! # Strategies
//!
//! Both strategies implement [`Scheduler`]:
//!
//! - [`GreedyRouter`]: an online step-by-step simulation with a bounded
//!   number of interactions in flight
//! - [`OptimalScheduler`]: a makespan-optimal mixed-integer program over a
//!   bounded horizon, solved with `good_lp`
//!
//! Any schedule can be checked with [`verify`].
//!
//! # Example
//!
//! ```rust
//! use iontrap_ir::{DependencyGraph, GateApplication, QubitId};
//! use iontrap_lattice::TrapLattice;
//! use iontrap_sched::{GreedyRouter, Scheduler, verify};
//!
//! let graph = DependencyGraph::from_sequence(
//!     2,
//!     &[
//!         GateApplication::rx(QubitId(0), 0.5),
//!         GateApplication::ms(QubitId(0), QubitId(1), 0.25).unwrap(),
//!     ],
//! )
//! .unwrap();
//! let trap = TrapLattice::penning();
//!
//! let schedule = GreedyRouter::default().build(&graph, &trap).unwrap();
//! let report = verify(&schedule, &graph, &trap).unwrap();
//! assert_eq!(report.fired_gates, 2);
//! ```

pub mod carrier;
pub mod config;
pub mod error;
pub mod greedy;
pub mod optimal;
pub mod schedule;
pub mod scheduler;
pub mod verify;

pub use carrier::{Carrier, initial_positions};
pub use config::{GreedyConfig, OptimalConfig, SchedulerConfig, Strategy};
pub use error::{SchedError, SchedResult};
pub use greedy::GreedyRouter;
pub use optimal::{OptimalScheduler, SolveOutcome};
pub use schedule::{Schedule, ScheduledGate, Step};
pub use scheduler::{Scheduler, scheduler_for};
pub use verify::{VerificationReport, verify};
