//! Property tests for the dependency graph builder.

use proptest::prelude::*;

use iontrap_ir::{DependencyGraph, GateApplication, GateId, GateKind, IrError, QubitId};

/// Strategy: a random native sequence over `num_qubits` qubits.
fn arb_sequence(num_qubits: u32) -> impl Strategy<Value = Vec<GateApplication>> {
    let gate = (0..3u8, 0..num_qubits, 0..num_qubits, -4i32..=4).prop_map(
        move |(kind, a, b, quarter)| {
            let angle = f64::from(quarter) / 4.0;
            match kind {
                0 => GateApplication::rx(QubitId(a), angle),
                1 => GateApplication::ry(QubitId(a), angle),
                _ => {
                    let b = if a == b { (b + 1) % num_qubits } else { b };
                    GateApplication::ms(QubitId(a), QubitId(b), angle).unwrap()
                }
            }
        },
    );
    prop::collection::vec(gate, 0..24)
}

fn position(order: &[GateId]) -> Vec<usize> {
    let mut pos = vec![0; order.len()];
    for (i, id) in order.iter().enumerate() {
        pos[id.index()] = i;
    }
    pos
}

proptest! {
    /// The order is a permutation consistent with every edge, and the two
    /// halves of every interaction are adjacent in it.
    #[test]
    fn test_order_is_topological(seq in arb_sequence(4)) {
        let graph = DependencyGraph::from_sequence(4, &seq).unwrap();
        let order = graph.order();
        prop_assert_eq!(order.len(), graph.len());

        let pos = position(order);
        for gate in graph.gates() {
            for succ in gate.successors() {
                prop_assert!(pos[gate.id.index()] < pos[succ.index()]);
            }
            if let Some(partner) = graph.partner(gate.id) {
                prop_assert_eq!(pos[gate.id.index()].abs_diff(pos[partner.index()]), 1);
                prop_assert_eq!(graph[partner].pair, gate.pair);
            }
        }
    }

    /// Every qubit's descriptors form a simple chain.
    #[test]
    fn test_chains_are_simple(seq in arb_sequence(3)) {
        let graph = DependencyGraph::from_sequence(3, &seq).unwrap();
        for gate in graph.gates() {
            prop_assert!(gate.predecessors().len() <= 1);
            prop_assert!(gate.successors().len() <= 1);
            prop_assert!(gate.operands.contains(gate.chain));
        }
        let total: usize = (0..3).map(|q| graph.chain(QubitId(q)).len()).sum();
        prop_assert_eq!(total, graph.len());
    }

    /// A same-axis run folds to its exact sum, or disappears when it sums to zero.
    #[test]
    fn test_single_axis_run_folds_to_sum(quarters in prop::collection::vec(-4i32..=4, 1..10)) {
        let seq: Vec<GateApplication> = quarters
            .iter()
            .map(|&k| GateApplication::ry(QubitId(0), f64::from(k) / 4.0))
            .collect();
        let sum: f64 = quarters.iter().map(|&k| f64::from(k) / 4.0).sum();

        let graph = DependencyGraph::from_sequence(1, &seq).unwrap();
        if sum == 0.0 {
            prop_assert!(graph.is_empty());
        } else {
            prop_assert_eq!(graph.len(), 1);
            prop_assert_eq!(graph[GateId(0)].angle, sum);
            prop_assert_eq!(graph[GateId(0)].kind, GateKind::Ry);
        }
    }
}

#[test]
fn test_rotation_tagged_with_two_qubits_is_rejected() {
    let err = GateApplication::new(GateKind::Ry, 1.0, &[QubitId(0), QubitId(1)]).unwrap_err();
    assert!(matches!(err, IrError::QubitCountMismatch { got: 2, .. }));
}

#[test]
fn test_graph_serializes_gates() {
    let graph = DependencyGraph::from_sequence(
        2,
        &[GateApplication::ms(QubitId(0), QubitId(1), 0.5).unwrap()],
    )
    .unwrap();
    let json = serde_json::to_string(graph.gates()).unwrap();
    assert!(json.contains("\"MS\""));
}
