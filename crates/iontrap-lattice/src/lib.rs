//! Trap lattice topology
//!
//! A trap is a grid of sites connected to their right and down neighbours.
//! Sites are either *standard* (transport, single-qubit rotations) or
//! *interaction* (two carriers meet for an MS gate). Every standard site has
//! an *idle* twin where a carrier parks while it has no work.
//!
//! Schedulers consume lattices through the [`Lattice`] trait, which gives
//! node types, sorted adjacency, idle twins and a deterministic BFS.
//!
//! # Example
//!
//! ```rust
//! use iontrap_lattice::{Lattice, NodeKind, Site, TrapLattice};
//!
//! let trap = TrapLattice::penning();
//! assert_eq!(trap.interaction_nodes().len(), 6);
//!
//! let hub = trap.node_at(Site::new(1, 1)).unwrap();
//! assert_eq!(trap.kind(hub), NodeKind::Interaction);
//! assert!(trap.idle_twin(hub).is_none());
//! ```

pub mod error;
pub mod lattice;
pub mod node;
pub mod trap;

pub use error::{LatticeError, LatticeResult};
pub use lattice::Lattice;
pub use node::{LatticeNode, NodeId, NodeKind, Site};
pub use trap::{PENNING_INTERACTION_SITES, TrapLattice, TrapSpec};
