//! Per-qubit gate streams and redundant-rotation folding.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::GateApplication;
use crate::qubit::QubitId;

/// An entry of a qubit's list, tagged with the tick used to order gate ids.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct StreamEntry {
    pub(crate) app: GateApplication,
    pub(crate) tick: u32,
}

/// The input of the dependency graph builder: one temporally ordered list of
/// gate applications per qubit.
///
/// Interactions appear in the lists of both participants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateStream {
    lists: Vec<Vec<StreamEntry>>,
}

impl GateStream {
    /// Create an empty stream over `num_qubits` qubits.
    pub fn new(num_qubits: usize) -> Self {
        Self {
            lists: vec![Vec::new(); num_qubits],
        }
    }

    /// Build a stream from explicit per-qubit lists.
    ///
    /// List `i` holds the gates of qubit `i`; every entry must act on it.
    pub fn from_per_qubit(lists: Vec<Vec<GateApplication>>) -> IrResult<Self> {
        let mut stream = Self::new(lists.len());
        for (qubit, list) in lists.into_iter().enumerate() {
            let qubit = QubitId(qubit as u32);
            for app in list {
                stream.push(qubit, app)?;
            }
        }
        Ok(stream)
    }

    /// Distribute a flat chronological sequence into per-qubit lists.
    ///
    /// Interactions are filed under both qubits. The sequence position is
    /// kept so that gate ids interleave across qubits in sequence order.
    pub fn from_sequence(num_qubits: usize, sequence: &[GateApplication]) -> IrResult<Self> {
        let mut stream = Self::new(num_qubits);
        for (tick, app) in sequence.iter().enumerate() {
            stream.check_range(app)?;
            for qubit in app.operands.qubits() {
                stream.lists[qubit.index()].push(StreamEntry {
                    app: *app,
                    tick: tick as u32,
                });
            }
        }
        Ok(stream)
    }

    /// Append a gate application to a qubit's list.
    pub fn push(&mut self, qubit: QubitId, app: GateApplication) -> IrResult<()> {
        let num_qubits = self.num_qubits();
        if qubit.index() >= num_qubits {
            return Err(IrError::QubitOutOfRange { qubit, num_qubits });
        }
        self.check_range(&app)?;
        if !app.operands.contains(qubit) {
            return Err(IrError::MisfiledGate {
                kind: app.kind,
                qubit,
            });
        }
        let list = &mut self.lists[qubit.index()];
        let tick = list.len() as u32;
        list.push(StreamEntry { app, tick });
        Ok(())
    }

    fn check_range(&self, app: &GateApplication) -> IrResult<()> {
        let qubit = app.operands.max_qubit();
        if qubit.index() >= self.num_qubits() {
            return Err(IrError::QubitOutOfRange {
                qubit,
                num_qubits: self.num_qubits(),
            });
        }
        Ok(())
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.lists.len()
    }

    /// Total number of entries over all lists.
    pub fn len(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    /// Check if every list is empty.
    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(Vec::is_empty)
    }

    /// The gate applications of one qubit, in order.
    pub fn list(&self, qubit: QubitId) -> impl Iterator<Item = &GateApplication> + '_ {
        self.lists
            .get(qubit.index())
            .into_iter()
            .flatten()
            .map(|entry| &entry.app)
    }

    /// One qubit's list after redundant-rotation folding.
    pub fn folded_list(&self, qubit: QubitId) -> Vec<GateApplication> {
        self.lists
            .get(qubit.index())
            .map(|list| fold_rotations(list).into_iter().map(|e| e.app).collect())
            .unwrap_or_default()
    }

    pub(crate) fn folded(&self) -> Vec<Vec<StreamEntry>> {
        self.lists.iter().map(|list| fold_rotations(list)).collect()
    }
}

/// Merge consecutive same-axis rotations by summing their angles.
///
/// A run whose accumulated angle is exactly zero is dropped. The test is an
/// exact comparison; callers wanting approximate cancellation must round the
/// angles first. Dropping a run can make the rotations around it adjacent, in
/// which case they merge as well. Interactions are never merged and separate
/// runs.
#[allow(clippy::float_cmp)]
fn fold_rotations(list: &[StreamEntry]) -> Vec<StreamEntry> {
    let mut folded: Vec<StreamEntry> = Vec::with_capacity(list.len());
    for entry in list {
        if entry.app.kind.is_rotation() {
            if let Some(top) = folded.last_mut() {
                if top.app.kind == entry.app.kind {
                    top.app.angle += entry.app.angle;
                    if top.app.angle == 0.0 {
                        folded.pop();
                    }
                    continue;
                }
            }
            if entry.app.angle == 0.0 {
                continue;
            }
        }
        folded.push(*entry);
    }
    folded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::GateKind;

    fn q(i: u32) -> QubitId {
        QubitId(i)
    }

    #[test]
    fn test_fold_sums_same_axis_run() {
        let stream = GateStream::from_per_qubit(vec![vec![
            GateApplication::rx(q(0), 0.25),
            GateApplication::rx(q(0), 0.5),
            GateApplication::ry(q(0), 1.0),
        ]])
        .unwrap();

        let folded = stream.folded_list(q(0));
        assert_eq!(folded.len(), 2);
        assert_eq!(folded[0].kind, GateKind::Rx);
        assert_eq!(folded[0].angle, 0.75);
        assert_eq!(folded[1].kind, GateKind::Ry);
    }

    #[test]
    fn test_fold_drops_zero_sum_run() {
        let stream = GateStream::from_per_qubit(vec![vec![
            GateApplication::ry(q(0), 0.5),
            GateApplication::ry(q(0), -0.25),
            GateApplication::ry(q(0), -0.25),
        ]])
        .unwrap();

        assert!(stream.folded_list(q(0)).is_empty());
    }

    #[test]
    fn test_fold_is_exact_not_approximate() {
        let stream = GateStream::from_per_qubit(vec![vec![
            GateApplication::rx(q(0), 0.1),
            GateApplication::rx(q(0), -0.1 + 1e-12),
        ]])
        .unwrap();

        assert_eq!(stream.folded_list(q(0)).len(), 1);
    }

    #[test]
    fn test_interaction_separates_runs() {
        let ms = GateApplication::ms(q(0), q(1), 0.5).unwrap();
        let stream = GateStream::from_per_qubit(vec![
            vec![
                GateApplication::rx(q(0), 1.0),
                ms,
                GateApplication::rx(q(0), -1.0),
            ],
            vec![ms],
        ])
        .unwrap();

        assert_eq!(stream.folded_list(q(0)).len(), 3);
    }

    #[test]
    fn test_cancelled_run_joins_neighbours() {
        let stream = GateStream::from_per_qubit(vec![vec![
            GateApplication::rx(q(0), 1.0),
            GateApplication::ry(q(0), 0.5),
            GateApplication::ry(q(0), -0.5),
            GateApplication::rx(q(0), 2.0),
        ]])
        .unwrap();

        let folded = stream.folded_list(q(0));
        assert_eq!(folded.len(), 1);
        assert_eq!(folded[0].angle, 3.0);
    }

    #[test]
    fn test_from_sequence_files_interactions_twice() {
        let seq = vec![
            GateApplication::rx(q(0), 1.0),
            GateApplication::ms(q(0), q(2), 0.5).unwrap(),
        ];
        let stream = GateStream::from_sequence(3, &seq).unwrap();
        assert_eq!(stream.list(q(0)).count(), 2);
        assert_eq!(stream.list(q(1)).count(), 0);
        assert_eq!(stream.list(q(2)).count(), 1);
        assert_eq!(stream.len(), 3);
    }

    #[test]
    fn test_misfiled_and_out_of_range() {
        let mut stream = GateStream::new(2);
        let err = stream.push(q(0), GateApplication::rx(q(1), 1.0)).unwrap_err();
        assert!(matches!(err, IrError::MisfiledGate { .. }));

        let err = stream.push(q(5), GateApplication::rx(q(5), 1.0)).unwrap_err();
        assert!(matches!(err, IrError::QubitOutOfRange { .. }));

        let seq = vec![GateApplication::ms(q(0), q(3), 1.0).unwrap()];
        let err = GateStream::from_sequence(2, &seq).unwrap_err();
        assert!(matches!(err, IrError::QubitOutOfRange { .. }));
    }
}
