//! Trapped-ion native gate IR
//!
//! This crate holds the input side of the shuttling compiler: the native gate
//! set of the trap, per-qubit gate streams, and the gate dependency graph
//! consumed by the schedulers in `iontrap-sched`.
//!
//! # Core Components
//!
//! - **Gates**: [`GateKind`] (RX, RY, MS), [`GateApplication`] for stream
//!   entries and [`Gate`] for graph descriptors
//! - **Streams**: [`GateStream`], one ordered list per qubit, with
//!   redundant-rotation folding
//! - **Dependency graph**: [`DependencyGraph`], per-qubit chains, paired
//!   interaction halves and a deterministic topological order
//! - **Workloads**: [`workload::qft_native`]
//!
//! # Example
//!
//! ```rust
//! use iontrap_ir::{DependencyGraph, GateApplication, QubitId};
//!
//! let q0 = QubitId(0);
//! let q1 = QubitId(1);
//! let sequence = vec![
//!     GateApplication::rx(q0, 0.5),
//!     GateApplication::rx(q0, -0.5), // folds away
//!     GateApplication::ms(q0, q1, 0.25).unwrap(),
//!     GateApplication::ry(q1, 1.0),
//! ];
//!
//! let graph = DependencyGraph::from_sequence(2, &sequence).unwrap();
//! assert_eq!(graph.len(), 3); // two MS halves + RY
//! assert_eq!(graph.num_units(), 2);
//! ```

pub mod dag;
pub mod error;
pub mod gate;
pub mod qubit;
pub mod stream;
pub mod workload;

pub use dag::DependencyGraph;
pub use error::{IrError, IrResult};
pub use gate::{Gate, GateApplication, GateId, GateKind, Operands, PairId};
pub use qubit::QubitId;
pub use stream::GateStream;
