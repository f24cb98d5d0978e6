//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use iontrap_ir::{GateApplication, workload};
use iontrap_lattice::{TrapLattice, TrapSpec};
use iontrap_sched::SchedulerConfig;

/// A flat gate sequence read from JSON.
#[derive(Debug, Deserialize)]
struct SequenceFile {
    /// Qubit count. Defaults to one past the largest qubit referenced.
    #[serde(default)]
    num_qubits: Option<usize>,
    gates: Vec<GateApplication>,
}

fn read(path: &str) -> Result<String> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))
}

/// Parse a gate sequence, re-checking each entry's arity.
pub fn parse_sequence(source: &str) -> Result<(usize, Vec<GateApplication>)> {
    let file: SequenceFile =
        serde_json::from_str(source).map_err(|e| anyhow::anyhow!("Parse error: {e}"))?;

    let gates = file
        .gates
        .iter()
        .map(|app| GateApplication::new(app.kind, app.angle, &app.operands.qubits()))
        .collect::<Result<Vec<_>, _>>()?;

    let referenced = gates
        .iter()
        .map(|app| app.operands.max_qubit().index() + 1)
        .max()
        .unwrap_or(0);
    let num_qubits = file.num_qubits.unwrap_or(referenced);
    if num_qubits < referenced {
        anyhow::bail!("num_qubits is {num_qubits} but the sequence references {referenced} qubits");
    }
    Ok((num_qubits, gates))
}

/// Load a gate sequence from a JSON file.
pub fn load_sequence(path: &str) -> Result<(usize, Vec<GateApplication>)> {
    parse_sequence(&read(path)?).with_context(|| format!("Invalid sequence in {path}"))
}

/// Build a named workload.
pub fn build_workload(name: &str, num_qubits: usize) -> Result<Vec<GateApplication>> {
    match name.to_lowercase().as_str() {
        "qft" => Ok(workload::qft_native(num_qubits)),
        other => anyhow::bail!("Unknown workload: '{other}'. Available: qft"),
    }
}

/// Load a scheduler configuration from YAML, or the defaults.
pub fn load_config(path: Option<&str>) -> Result<SchedulerConfig> {
    let Some(path) = path else {
        return Ok(SchedulerConfig::default());
    };
    serde_yaml_ng::from_str(&read(path)?).with_context(|| format!("Invalid configuration in {path}"))
}

/// Load a trap description from JSON, or the Penning trap.
pub fn load_trap(path: Option<&str>) -> Result<TrapLattice> {
    let Some(path) = path else {
        return Ok(TrapLattice::penning());
    };
    let spec: TrapSpec = serde_json::from_str(&read(path)?)
        .with_context(|| format!("Invalid trap description in {path}"))?;
    Ok(spec.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use iontrap_ir::{GateKind, QubitId};

    #[test]
    fn test_parse_sequence_infers_qubits() {
        let source = r#"{"gates": [
            {"kind": "RX", "angle": 0.5, "operands": 0},
            {"kind": "MS", "angle": 0.25, "operands": [0, 2]}
        ]}"#;
        let (n, gates) = parse_sequence(source).unwrap();
        assert_eq!(n, 3);
        assert_eq!(gates.len(), 2);
        assert_eq!(gates[1].kind, GateKind::Ms);
        assert!(gates[1].operands.contains(QubitId(2)));
    }

    #[test]
    fn test_parse_sequence_rejects_bad_arity() {
        let source = r#"{"gates": [{"kind": "RX", "angle": 0.5, "operands": [0, 1]}]}"#;
        let err = parse_sequence(source).unwrap_err();
        assert!(err.to_string().contains("requires 1 qubits"));
    }

    #[test]
    fn test_parse_sequence_rejects_small_qubit_count() {
        let source = r#"{"num_qubits": 1, "gates": [{"kind": "MS", "angle": 0.5, "operands": [0, 1]}]}"#;
        assert!(parse_sequence(source).is_err());
    }

    #[test]
    fn test_unknown_workload() {
        assert!(build_workload("QFT", 3).is_ok());
        let err = build_workload("grover", 3).unwrap_err();
        assert!(err.to_string().contains("Unknown workload"));
    }

    #[test]
    fn test_missing_files() {
        assert!(load_sequence("/nonexistent/seq.json").is_err());
        assert!(load_config(Some("/nonexistent/cfg.yaml")).is_err());
        assert!(load_config(None).is_ok());
        assert!(load_trap(None).is_ok());
    }
}
