//! Gate dependency graph.
//!
//! Gates live in an arena indexed by [`GateId`]; predecessor and successor
//! sets are id lists. Each qubit's gates form a simple chain. An interaction
//! contributes one descriptor to each participant's chain, and the two halves
//! share a [`PairId`]. No edge joins the halves: schedulers treat a pair as
//! one logical unit named by its primary (lower) id.
//!
//! ## Topological order
//!
//! The order is computed with Kahn's algorithm over logical units (a pair's
//! in-degree is the sum over both halves) and ties are broken by ascending id,
//! so the order is deterministic and both halves of a pair are adjacent in it.
//! A pairing that no schedule can honour, such as three qubits whose
//! interactions are listed in rotating order, shows up as a cycle.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::ops::Index;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{IrError, IrResult};
use crate::gate::{Gate, GateApplication, GateId, PairId};
use crate::qubit::QubitId;
use crate::stream::GateStream;

/// Directed acyclic graph of gate descriptors plus one topological order.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Arena of descriptors, `gates[i].id == GateId(i)`.
    gates: Vec<Gate>,
    /// Deterministic topological order (a permutation of ids).
    order: Vec<GateId>,
    /// Per-qubit chains of descriptor ids.
    chains: Vec<Vec<GateId>>,
    /// Other half of each interaction descriptor.
    partners: FxHashMap<GateId, GateId>,
}

impl DependencyGraph {
    /// Build the graph from a per-qubit gate stream.
    ///
    /// Folds redundant rotations, links each qubit's chain, pairs interaction
    /// halves and computes the topological order.
    pub fn build(stream: &GateStream) -> IrResult<Self> {
        let folded = stream.folded();

        // Assign ids in tick order so they interleave across qubits.
        let mut slots: Vec<(u32, usize, usize)> = folded
            .iter()
            .enumerate()
            .flat_map(|(qubit, list)| {
                list.iter()
                    .enumerate()
                    .map(move |(pos, entry)| (entry.tick, qubit, pos))
            })
            .collect();
        slots.sort_unstable();

        let mut chains: Vec<Vec<GateId>> = folded
            .iter()
            .map(|list| vec![GateId(0); list.len()])
            .collect();
        let mut gates = Vec::with_capacity(slots.len());
        for (index, &(_, qubit, pos)) in slots.iter().enumerate() {
            let id = GateId(index as u32);
            let app = folded[qubit][pos].app;
            let mut gate = Gate::new(id, app.kind, &app.operands.qubits(), app.angle)?;
            gate.chain = QubitId(qubit as u32);
            gates.push(gate);
            chains[qubit][pos] = id;
        }

        for chain in &chains {
            for window in chain.windows(2) {
                let (from, to) = (window[0], window[1]);
                gates[from.index()].successors.push(to);
                gates[to.index()].predecessors.push(from);
            }
        }

        let partners = pair_interactions(&mut gates, &chains)?;
        let order = topological_order(&gates, &partners)?;

        debug!(
            "Built dependency graph: {} entries folded to {} gates, {} interaction pairs",
            stream.len(),
            gates.len(),
            partners.len() / 2
        );

        Ok(Self {
            gates,
            order,
            chains,
            partners,
        })
    }

    /// Build the graph from a flat chronological sequence.
    pub fn from_sequence(num_qubits: usize, sequence: &[GateApplication]) -> IrResult<Self> {
        Self::build(&GateStream::from_sequence(num_qubits, sequence)?)
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.chains.len()
    }

    /// Number of gate descriptors (interaction halves counted separately).
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// Check if the graph has no gates.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// All descriptors indexed by id.
    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Look up a descriptor.
    pub fn get(&self, id: GateId) -> Option<&Gate> {
        self.gates.get(id.index())
    }

    /// Look up a descriptor, failing on unknown ids.
    pub fn try_gate(&self, id: GateId) -> IrResult<&Gate> {
        self.get(id).ok_or(IrError::UnknownGate(id))
    }

    /// The topological order.
    pub fn order(&self) -> &[GateId] {
        &self.order
    }

    /// Descriptor ids in one qubit's chain.
    pub fn chain(&self, qubit: QubitId) -> &[GateId] {
        self.chains.get(qubit.index()).map_or(&[], Vec::as_slice)
    }

    /// Other half of an interaction descriptor.
    pub fn partner(&self, id: GateId) -> Option<GateId> {
        self.partners.get(&id).copied()
    }

    /// The id naming the logical unit a descriptor belongs to.
    pub fn primary(&self, id: GateId) -> GateId {
        self.partner(id).map_or(id, |partner| partner.min(id))
    }

    /// Check if the descriptor names its logical unit.
    pub fn is_primary(&self, id: GateId) -> bool {
        self.primary(id) == id
    }

    /// Logical units in topological order.
    pub fn units(&self) -> impl Iterator<Item = &Gate> + '_ {
        self.order
            .iter()
            .filter(|&&id| self.is_primary(id))
            .map(|&id| &self.gates[id.index()])
    }

    /// Number of logical units.
    pub fn num_units(&self) -> usize {
        self.gates.len() - self.partners.len() / 2
    }

    /// Primaries of the units that must finish before `id`'s unit.
    pub fn unit_predecessors(&self, id: GateId) -> Vec<GateId> {
        self.unit_neighbours(id, |gate| gate.predecessors())
    }

    /// Primaries of the units that wait on `id`'s unit.
    pub fn unit_successors(&self, id: GateId) -> Vec<GateId> {
        self.unit_neighbours(id, |gate| gate.successors())
    }

    fn unit_neighbours<'a>(&'a self, id: GateId, edges: impl Fn(&'a Gate) -> &'a [GateId]) -> Vec<GateId> {
        let mut found: Vec<GateId> = self
            .halves(id)
            .flat_map(|half| edges(&self.gates[half.index()]))
            .map(|&other| self.primary(other))
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Descriptors belonging to `id`'s unit, primary first.
    pub fn halves(&self, id: GateId) -> impl Iterator<Item = GateId> + '_ {
        let primary = self.primary(id);
        std::iter::once(primary).chain(self.partner(primary))
    }

    /// One qubit's chain mapped to logical units.
    pub fn unit_chain(&self, qubit: QubitId) -> Vec<GateId> {
        self.chain(qubit).iter().map(|&id| self.primary(id)).collect()
    }

    /// Qubits acted on by `id`'s unit.
    pub fn unit_qubits(&self, id: GateId) -> Vec<QubitId> {
        self.get(self.primary(id))
            .map(|gate| gate.operands.qubits())
            .unwrap_or_default()
    }

    /// Pairing tag of a unit, if it is an interaction.
    pub fn pair_of(&self, id: GateId) -> Option<PairId> {
        self.get(id).and_then(|gate| gate.pair)
    }
}

impl Index<GateId> for DependencyGraph {
    type Output = Gate;

    fn index(&self, id: GateId) -> &Gate {
        &self.gates[id.index()]
    }
}

/// Match the k-th interaction of `a` with `b` to the k-th of `b` with `a`.
#[allow(clippy::float_cmp)]
fn pair_interactions(
    gates: &mut [Gate],
    chains: &[Vec<GateId>],
) -> IrResult<FxHashMap<GateId, GateId>> {
    let mut halves: FxHashMap<(QubitId, QubitId, usize), GateId> = FxHashMap::default();
    let mut seen: FxHashMap<(QubitId, QubitId), usize> = FxHashMap::default();

    for (qubit, chain) in chains.iter().enumerate() {
        let qubit = QubitId(qubit as u32);
        for &id in chain {
            if let Some(partner) = gates[id.index()].operands.partner_of(qubit) {
                let count = seen.entry((qubit, partner)).or_insert(0);
                halves.insert((qubit, partner, *count), id);
                *count += 1;
            }
        }
    }

    let mut matched: Vec<(GateId, GateId)> = Vec::with_capacity(halves.len() / 2);
    for (&(qubit, partner, k), &id) in &halves {
        let Some(&other) = halves.get(&(partner, qubit, k)) else {
            return Err(IrError::UnpairedInteraction { qubit, partner });
        };
        if id < other {
            let (angle_a, angle_b) = (gates[id.index()].angle, gates[other.index()].angle);
            if angle_a != angle_b {
                return Err(IrError::InteractionAngleMismatch {
                    first: qubit,
                    second: partner,
                    angle_a,
                    angle_b,
                });
            }
            matched.push((id, other));
        }
    }
    matched.sort_unstable();

    let mut partners = FxHashMap::default();
    for (index, &(primary, secondary)) in matched.iter().enumerate() {
        let pair = Some(PairId(index as u32));
        gates[primary.index()].pair = pair;
        gates[secondary.index()].pair = pair;
        // Both halves report the primary's operand order.
        gates[secondary.index()].operands = gates[primary.index()].operands;
        partners.insert(primary, secondary);
        partners.insert(secondary, primary);
    }
    Ok(partners)
}

/// Kahn's algorithm over logical units with ascending-id tie-breaking.
fn topological_order(gates: &[Gate], partners: &FxHashMap<GateId, GateId>) -> IrResult<Vec<GateId>> {
    let primary = |id: GateId| partners.get(&id).map_or(id, |&p| p.min(id));

    let mut in_degree = vec![0usize; gates.len()];
    for gate in gates {
        in_degree[primary(gate.id).index()] += gate.predecessors.len();
    }

    let mut ready: BinaryHeap<Reverse<GateId>> = gates
        .iter()
        .filter(|gate| primary(gate.id) == gate.id && in_degree[gate.id.index()] == 0)
        .map(|gate| Reverse(gate.id))
        .collect();

    let mut order = Vec::with_capacity(gates.len());
    while let Some(Reverse(unit)) = ready.pop() {
        let members = std::iter::once(unit).chain(partners.get(&unit).copied());
        for member in members {
            order.push(member);
            for &succ in &gates[member.index()].successors {
                let target = primary(succ);
                in_degree[target.index()] -= 1;
                if in_degree[target.index()] == 0 {
                    ready.push(Reverse(target));
                }
            }
        }
    }

    if order.len() < gates.len() {
        return Err(IrError::CyclicGraph {
            emitted: order.len(),
            total: gates.len(),
        });
    }
    Ok(order)
}
