//! Native gate types.
//!
//! The native basis of the trap has two single-qubit rotations (about X and
//! Y) and one two-qubit Mølmer–Sørensen interaction. A [`GateApplication`] is
//! one entry of the input gate stream; a [`Gate`] is the descriptor stored in
//! the dependency graph arena.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{IrError, IrResult};
use crate::qubit::QubitId;

/// Index of a gate descriptor in the dependency graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GateId(pub u32);

impl GateId {
    /// The id as an arena index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Tag shared by the two halves of one interaction instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairId(pub u32);

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ms{}", self.0)
    }
}

/// Kind of a native gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateKind {
    /// Rotation about the X axis.
    #[serde(rename = "RX")]
    Rx,
    /// Rotation about the Y axis.
    #[serde(rename = "RY")]
    Ry,
    /// Two-qubit Mølmer–Sørensen interaction.
    #[serde(rename = "MS")]
    Ms,
}

impl GateKind {
    /// Number of qubits this kind acts on.
    #[inline]
    pub fn num_qubits(self) -> usize {
        match self {
            GateKind::Rx | GateKind::Ry => 1,
            GateKind::Ms => 2,
        }
    }

    /// Check if this is a single-qubit rotation.
    #[inline]
    pub fn is_rotation(self) -> bool {
        !self.is_interaction()
    }

    /// Check if this is the two-qubit interaction.
    #[inline]
    pub fn is_interaction(self) -> bool {
        matches!(self, GateKind::Ms)
    }

    /// Number of time steps the gate occupies its carriers.
    #[inline]
    pub fn duration(self) -> usize {
        match self {
            GateKind::Rx | GateKind::Ry => 1,
            GateKind::Ms => 2,
        }
    }

    /// Name of the gate.
    pub fn name(self) -> &'static str {
        match self {
            GateKind::Rx => "RX",
            GateKind::Ry => "RY",
            GateKind::Ms => "MS",
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Qubits a gate acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operands {
    /// A single qubit (rotations).
    Single(QubitId),
    /// Two distinct qubits (interactions).
    Pair(QubitId, QubitId),
}

impl Operands {
    /// Validate a qubit list against the arity of a gate kind.
    pub fn for_kind(kind: GateKind, qubits: &[QubitId]) -> IrResult<Self> {
        match (kind.num_qubits(), qubits) {
            (1, &[q]) => Ok(Operands::Single(q)),
            (2, &[a, b]) if a == b => Err(IrError::DuplicateQubit { qubit: a }),
            (2, &[a, b]) => Ok(Operands::Pair(a, b)),
            (expected, _) => Err(IrError::QubitCountMismatch {
                kind,
                expected,
                got: qubits.len(),
            }),
        }
    }

    /// The qubits as a slice-like vector.
    pub fn qubits(&self) -> Vec<QubitId> {
        match *self {
            Operands::Single(q) => vec![q],
            Operands::Pair(a, b) => vec![a, b],
        }
    }

    /// Check if the operands include a qubit.
    pub fn contains(&self, qubit: QubitId) -> bool {
        match *self {
            Operands::Single(q) => q == qubit,
            Operands::Pair(a, b) => a == qubit || b == qubit,
        }
    }

    /// The other qubit of a pair.
    pub fn partner_of(&self, qubit: QubitId) -> Option<QubitId> {
        match *self {
            Operands::Pair(a, b) if a == qubit => Some(b),
            Operands::Pair(a, b) if b == qubit => Some(a),
            _ => None,
        }
    }

    /// Largest qubit index referenced.
    pub fn max_qubit(&self) -> QubitId {
        match *self {
            Operands::Single(q) => q,
            Operands::Pair(a, b) => a.max(b),
        }
    }
}

impl fmt::Display for Operands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operands::Single(q) => write!(f, "{q}"),
            Operands::Pair(a, b) => write!(f, "{a}, {b}"),
        }
    }
}

/// One entry of the input gate stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateApplication {
    /// Gate kind.
    pub kind: GateKind,
    /// Rotation or interaction angle.
    pub angle: f64,
    /// Qubits acted on.
    pub operands: Operands,
}

impl GateApplication {
    /// Create an application, validating the qubit arity.
    pub fn new(kind: GateKind, angle: f64, qubits: &[QubitId]) -> IrResult<Self> {
        Ok(Self {
            kind,
            angle,
            operands: Operands::for_kind(kind, qubits)?,
        })
    }

    /// X rotation on one qubit.
    pub fn rx(qubit: QubitId, angle: f64) -> Self {
        Self {
            kind: GateKind::Rx,
            angle,
            operands: Operands::Single(qubit),
        }
    }

    /// Y rotation on one qubit.
    pub fn ry(qubit: QubitId, angle: f64) -> Self {
        Self {
            kind: GateKind::Ry,
            angle,
            operands: Operands::Single(qubit),
        }
    }

    /// Interaction between two distinct qubits.
    pub fn ms(first: QubitId, second: QubitId, angle: f64) -> IrResult<Self> {
        Self::new(GateKind::Ms, angle, &[first, second])
    }
}

impl fmt::Display for GateApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}) {}", self.kind, self.angle, self.operands)
    }
}

/// A gate descriptor in the dependency graph.
///
/// Interactions are represented by two descriptors, one filed in each
/// participant's chain. Both carry the same [`PairId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// Arena index.
    pub id: GateId,
    /// Gate kind.
    pub kind: GateKind,
    /// Qubits acted on.
    pub operands: Operands,
    /// Angle (summed for folded rotation runs).
    pub angle: f64,
    /// Pairing tag for interaction halves.
    pub pair: Option<PairId>,
    /// Qubit whose chain this descriptor belongs to.
    pub chain: QubitId,
    pub(crate) predecessors: Vec<GateId>,
    pub(crate) successors: Vec<GateId>,
}

impl Gate {
    /// Create a descriptor, validating the qubit arity.
    pub fn new(id: GateId, kind: GateKind, qubits: &[QubitId], angle: f64) -> IrResult<Self> {
        let operands = Operands::for_kind(kind, qubits)?;
        Ok(Self {
            id,
            kind,
            operands,
            angle,
            pair: None,
            chain: qubits[0],
            predecessors: Vec::new(),
            successors: Vec::new(),
        })
    }

    /// Dependency-graph predecessors.
    pub fn predecessors(&self) -> &[GateId] {
        &self.predecessors
    }

    /// Dependency-graph successors.
    pub fn successors(&self) -> &[GateId] {
        &self.successors
    }

    /// Check if this is one half of an interaction.
    #[inline]
    pub fn is_interaction(&self) -> bool {
        self.kind.is_interaction()
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}({}) {}", self.id, self.kind, self.angle, self.operands)
    }
}
