//! Lattice command implementation.

use anyhow::Result;
use console::style;

use iontrap_lattice::{Lattice, NodeKind};

use super::common::load_trap;

/// Execute the lattice command.
pub fn execute(trap: Option<&str>) -> Result<()> {
    let lattice = load_trap(trap)?;

    println!(
        "{} {}x{} trap: {} nodes, {} edges, {} interaction sites",
        style("→").cyan().bold(),
        lattice.rows(),
        lattice.cols(),
        lattice.node_count(),
        lattice.edge_count(),
        lattice.interaction_nodes().len()
    );
    println!("  {:>5}  {:<12}  {:<12}  neighbours", "node", "site", "kind");

    for id in lattice.nodes() {
        let Some(node) = lattice.node(id) else {
            continue;
        };
        let kind = match node.kind {
            NodeKind::Standard => style("standard").dim(),
            NodeKind::Idle => style("idle").dim(),
            NodeKind::Interaction => style("interaction").yellow(),
        };
        let neighbors = lattice
            .neighbors(id)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "  {:>5}  {:<12}  {:<12}  {}",
            id.to_string(),
            node.site.to_string(),
            kind,
            neighbors
        );
    }
    Ok(())
}
