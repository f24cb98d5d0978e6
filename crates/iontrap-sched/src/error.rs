//! Error handling for the schedulers.

use std::time::Duration;

use thiserror::Error;

use iontrap_ir::{GateId, IrError, QubitId};
use iontrap_lattice::{LatticeError, NodeId};

/// Result type for scheduler operations.
pub type SchedResult<T> = Result<T, SchedError>;

/// Errors that can occur while building a schedule.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchedError {
    /// Malformed gate input.
    #[error("IR error: {0}")]
    Ir(#[from] IrError),

    /// Lattice construction or lookup failure.
    #[error("Lattice error: {0}")]
    Lattice(#[from] LatticeError),

    /// The carriers of an interaction are not on the same node when it fires.
    #[error("Interaction {gate}: {first} at {first_node} and {second} at {second_node} are not colocated")]
    ColocationMismatch {
        /// Primary id of the interaction.
        gate: GateId,
        /// First operand.
        first: QubitId,
        /// Node of the first operand.
        first_node: NodeId,
        /// Second operand.
        second: QubitId,
        /// Node of the second operand.
        second_node: NodeId,
    },

    /// No route exists between two nodes.
    #[error("No path from {from} to {to}")]
    NoPath {
        /// Start node.
        from: NodeId,
        /// Destination node.
        to: NodeId,
    },

    /// The lattice has fewer idle nodes than qubits.
    #[error("Lattice has {available} idle nodes, {required} qubits need a home")]
    NotEnoughHomes {
        /// Qubits to place.
        required: usize,
        /// Idle nodes available.
        available: usize,
    },

    /// An explicit home is unusable.
    #[error("Invalid home {node} for {qubit}: {reason}")]
    InvalidHome {
        /// Qubit being placed.
        qubit: QubitId,
        /// Requested node.
        node: NodeId,
        /// Why the node was rejected.
        reason: String,
    },

    /// The greedy router ran past its step bound.
    #[error("Step limit {limit} exceeded with {remaining} gates unscheduled")]
    StepLimitExceeded {
        /// Configured bound.
        limit: usize,
        /// Logical gates not yet finished.
        remaining: usize,
    },

    /// No schedule fits within the horizon.
    #[error("No schedule fits within horizon {horizon}")]
    Infeasible {
        /// Horizon tried last.
        horizon: usize,
    },

    /// The solver ran out of wall-clock time.
    #[error("Solver found no schedule within {budget:?} at horizon {horizon}")]
    SolverTimeout {
        /// Horizon being solved.
        horizon: usize,
        /// Wall-clock budget.
        budget: Duration,
    },

    /// Other solver failure.
    #[error("Solver error: {0}")]
    Solver(String),

    /// A schedule violates a physical or ordering constraint.
    #[error("Schedule verification failed: {0}")]
    Verification(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
