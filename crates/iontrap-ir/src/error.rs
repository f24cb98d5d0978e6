//! Error types for the IR crate.

use thiserror::Error;

use crate::gate::{GateId, GateKind};
use crate::qubit::QubitId;

/// Errors that can occur while building gates and dependency graphs.
///
/// All of these describe malformed input. They are fatal and never retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Gate kind requires a different number of qubits.
    #[error("Gate '{kind}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Kind of the gate.
        kind: GateKind,
        /// Expected number of qubits.
        expected: usize,
        /// Actual number of qubits provided.
        got: usize,
    },

    /// Both qubits of an interaction are the same.
    #[error("Duplicate qubit {qubit} in interaction")]
    DuplicateQubit {
        /// The duplicated qubit.
        qubit: QubitId,
    },

    /// Qubit index beyond the number of qubits in the stream.
    #[error("Qubit {qubit} out of range (stream has {num_qubits} qubits)")]
    QubitOutOfRange {
        /// The offending qubit.
        qubit: QubitId,
        /// Number of qubits in the stream.
        num_qubits: usize,
    },

    /// An entry was filed under a qubit it does not act on.
    #[error("Gate '{kind}' filed under {qubit} does not act on it")]
    MisfiledGate {
        /// Kind of the misfiled gate.
        kind: GateKind,
        /// The qubit list it was found in.
        qubit: QubitId,
    },

    /// One half of an interaction has no matching half on the partner qubit.
    #[error("Interaction between {qubit} and {partner} has no matching half on {partner}")]
    UnpairedInteraction {
        /// Qubit whose list holds the unmatched half.
        qubit: QubitId,
        /// Partner qubit missing the matching half.
        partner: QubitId,
    },

    /// The two halves of an interaction disagree on the angle.
    #[error("Interaction between {first} and {second} has mismatching angles {angle_a} and {angle_b}")]
    InteractionAngleMismatch {
        /// First qubit.
        first: QubitId,
        /// Second qubit.
        second: QubitId,
        /// Angle recorded on the first qubit.
        angle_a: f64,
        /// Angle recorded on the second qubit.
        angle_b: f64,
    },

    /// Topological sort could not emit every gate.
    #[error("Cyclic dependency graph: emitted {emitted} of {total} gates")]
    CyclicGraph {
        /// Number of gates emitted before the sort stalled.
        emitted: usize,
        /// Total number of gates.
        total: usize,
    },

    /// Gate id not present in the graph.
    #[error("Unknown gate {0}")]
    UnknownGate(GateId),
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
