//! Error types for lattice construction.

use thiserror::Error;

use crate::node::{NodeId, Site};

/// Errors that can occur while building or querying a lattice.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LatticeError {
    /// Site lies outside the grid.
    #[error("Site {site} outside {rows}x{cols} grid")]
    SiteOutOfBounds {
        /// The offending site.
        site: Site,
        /// Grid rows.
        rows: u32,
        /// Grid columns.
        cols: u32,
    },

    /// Interaction site listed twice.
    #[error("Duplicate interaction site {0}")]
    DuplicateSite(Site),

    /// Node id not present in the lattice.
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),
}

/// Result type for lattice operations.
pub type LatticeResult<T> = Result<T, LatticeError>;
