//! Native-basis workload generators.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::gate::{GateApplication, GateKind, Operands};
use crate::qubit::QubitId;

/// The n-qubit quantum Fourier transform as a flat RX/RY/MS sequence.
///
/// Hadamard is RX(π) then RY(π/2). Each controlled phase CP(φ) becomes
/// RZ(−φ/2) on both qubits (RY(π/2), RX, RY(−π/2)), a Hadamard on the
/// target, MS(φ), and a second Hadamard on the target.
pub fn qft_native(num_qubits: usize) -> Vec<GateApplication> {
    let mut sequence = Vec::new();
    let hadamard = |seq: &mut Vec<GateApplication>, qubit: QubitId| {
        seq.push(GateApplication::rx(qubit, PI));
        seq.push(GateApplication::ry(qubit, FRAC_PI_2));
    };
    let rz = |seq: &mut Vec<GateApplication>, qubit: QubitId, phi: f64| {
        seq.push(GateApplication::ry(qubit, FRAC_PI_2));
        seq.push(GateApplication::rx(qubit, phi));
        seq.push(GateApplication::ry(qubit, -FRAC_PI_2));
    };

    for target in 0..num_qubits {
        let target_q = QubitId(target as u32);
        hadamard(&mut sequence, target_q);

        for control in target + 1..num_qubits {
            let control_q = QubitId(control as u32);
            let phi = PI / 2f64.powi((control - target) as i32);

            rz(&mut sequence, control_q, -phi / 2.0);
            rz(&mut sequence, target_q, -phi / 2.0);
            hadamard(&mut sequence, target_q);
            sequence.push(GateApplication {
                kind: GateKind::Ms,
                angle: phi,
                operands: Operands::Pair(control_q, target_q),
            });
            hadamard(&mut sequence, target_q);
        }
    }
    sequence
}
