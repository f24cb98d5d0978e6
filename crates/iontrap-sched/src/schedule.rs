//! Time-indexed schedule of carrier positions and gate events.

use serde::Serialize;

use iontrap_ir::{Gate, GateId, GateKind, Operands, PairId, QubitId};
use iontrap_lattice::NodeId;

/// A gate firing recorded at one time step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledGate {
    /// Primary id of the logical gate.
    pub gate: GateId,
    /// Gate kind.
    pub kind: GateKind,
    /// Rotation or interaction angle.
    pub angle: f64,
    /// Qubits acted on.
    pub operands: Operands,
    /// Pairing tag for interactions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair: Option<PairId>,
}

impl ScheduledGate {
    /// Event for a logical gate, named by the given descriptor.
    pub fn from_gate(gate: &Gate) -> Self {
        Self {
            gate: gate.id,
            kind: gate.kind,
            angle: gate.angle,
            operands: gate.operands,
            pair: gate.pair,
        }
    }

    /// Qubits acted on.
    pub fn qubits(&self) -> Vec<QubitId> {
        self.operands.qubits()
    }
}

/// Positions and events of one time step.
#[derive(Debug, Clone, Copy)]
pub struct Step<'a> {
    /// Step index.
    pub index: usize,
    /// Node of each carrier, indexed by qubit.
    pub positions: &'a [NodeId],
    /// Gates fired at this step.
    pub events: &'a [ScheduledGate],
}

/// Schedule produced by either strategy.
///
/// `positions[t][q]` is the node of qubit `q`'s carrier after step `t`, and
/// `events[t]` lists the gates fired at step `t`. Both sequences always have
/// the same length. Step 0 holds the initial placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schedule {
    positions: Vec<Vec<NodeId>>,
    events: Vec<Vec<ScheduledGate>>,
}

impl Schedule {
    /// Create an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one step.
    pub fn push_step(&mut self, positions: Vec<NodeId>, events: Vec<ScheduledGate>) {
        self.positions.push(positions);
        self.events.push(events);
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if no step has been recorded.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of carriers.
    pub fn num_carriers(&self) -> usize {
        self.positions.first().map_or(0, Vec::len)
    }

    /// Position history.
    pub fn positions(&self) -> &[Vec<NodeId>] {
        &self.positions
    }

    /// Event history.
    pub fn events(&self) -> &[Vec<ScheduledGate>] {
        &self.events
    }

    /// One step.
    pub fn step(&self, index: usize) -> Option<Step<'_>> {
        Some(Step {
            index,
            positions: self.positions.get(index)?,
            events: self.events.get(index)?,
        })
    }

    /// Iterate over steps.
    pub fn steps(&self) -> impl Iterator<Item = Step<'_>> + '_ {
        self.positions
            .iter()
            .zip(&self.events)
            .enumerate()
            .map(|(index, (positions, events))| Step {
                index,
                positions,
                events,
            })
    }

    /// Final positions.
    pub fn final_positions(&self) -> &[NodeId] {
        self.positions.last().map_or(&[], Vec::as_slice)
    }

    /// Step at which the last gate completes, or 0 without gates.
    pub fn makespan(&self) -> usize {
        self.steps()
            .flat_map(|step| {
                step.events
                    .iter()
                    .map(move |event| step.index + event.kind.duration())
            })
            .max()
            .unwrap_or(0)
    }

    /// Number of recorded gate events.
    pub fn fired_gates(&self) -> usize {
        self.events.iter().map(Vec::len).sum()
    }

    /// Step at which a logical gate fired.
    pub fn step_of(&self, gate: GateId) -> Option<usize> {
        self.events
            .iter()
            .position(|events| events.iter().any(|event| event.gate == gate))
    }

    /// Total number of carrier moves.
    pub fn total_hops(&self) -> usize {
        self.positions
            .windows(2)
            .map(|pair| {
                pair[0]
                    .iter()
                    .zip(&pair[1])
                    .filter(|(before, after)| before != after)
                    .count()
            })
            .sum()
    }
}
