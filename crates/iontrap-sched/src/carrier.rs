//! Carrier state and initial placement.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use iontrap_ir::QubitId;
use iontrap_lattice::{Lattice, NodeId, NodeKind};

use crate::error::{SchedError, SchedResult};

/// One ion carrying one qubit.
#[derive(Debug, Clone)]
pub struct Carrier {
    /// Qubit held by this carrier.
    pub qubit: QubitId,
    /// Current node.
    pub node: NodeId,
    /// Resting on an idle node.
    pub idle: bool,
    /// Committed to a gate during the current step.
    pub busy: bool,
    /// Nodes still to traverse, next hop first.
    pub path: VecDeque<NodeId>,
    /// Consecutive steps the next hop was blocked.
    pub stalled: usize,
}

impl Carrier {
    /// Create a carrier resting at `node`.
    pub fn new(qubit: QubitId, node: NodeId, lattice: &dyn Lattice) -> Self {
        Self {
            qubit,
            node,
            idle: lattice.kind(node) == NodeKind::Idle,
            busy: false,
            path: VecDeque::new(),
            stalled: 0,
        }
    }

    /// Replace the path. `route` starts at the current node.
    pub fn set_route(&mut self, route: &[NodeId]) {
        self.path = route.iter().skip(1).copied().collect();
        self.stalled = 0;
    }

    /// Drop any remaining path.
    pub fn clear_path(&mut self) {
        self.path.clear();
        self.stalled = 0;
    }

    /// Next hop along the path.
    pub fn next_hop(&self) -> Option<NodeId> {
        self.path.front().copied()
    }

    /// Final node of the path.
    pub fn destination(&self) -> Option<NodeId> {
        self.path.back().copied()
    }

    /// Move one hop.
    pub fn move_to(&mut self, node: NodeId, lattice: &dyn Lattice) {
        if self.path.front() == Some(&node) {
            self.path.pop_front();
        }
        self.node = node;
        self.idle = lattice.kind(node) == NodeKind::Idle;
        self.stalled = 0;
    }
}

/// Initial node for each of `num_qubits` carriers.
///
/// Without explicit homes, qubit `i` starts on the `i`-th idle node in id
/// order. Explicit homes must be distinct, known, non-interaction nodes.
pub fn initial_positions(
    lattice: &dyn Lattice,
    num_qubits: usize,
    homes: Option<&[NodeId]>,
) -> SchedResult<Vec<NodeId>> {
    let Some(homes) = homes else {
        let idle = lattice.idle_nodes();
        if idle.len() < num_qubits {
            return Err(SchedError::NotEnoughHomes {
                required: num_qubits,
                available: idle.len(),
            });
        }
        return Ok(idle.into_iter().take(num_qubits).collect());
    };

    if homes.len() != num_qubits {
        return Err(SchedError::Config(format!(
            "{} homes given for {} qubits",
            homes.len(),
            num_qubits
        )));
    }

    let mut taken = FxHashSet::default();
    for (index, &node) in homes.iter().enumerate() {
        let qubit = QubitId(index as u32);
        let reason = match lattice.node(node) {
            None => Some("unknown node"),
            Some(info) if info.kind == NodeKind::Interaction => Some("interaction node"),
            Some(_) if taken.contains(&node) => Some("already taken"),
            Some(_) => None,
        };
        taken.insert(node);
        if let Some(reason) = reason {
            return Err(SchedError::InvalidHome {
                qubit,
                node,
                reason: reason.to_string(),
            });
        }
    }
    Ok(homes.to_vec())
}
