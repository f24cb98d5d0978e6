//! Lattice node types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense index of a node in a lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The id as a vector index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Grid coordinate of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Site {
    /// Row index.
    pub row: u32,
    /// Column index.
    pub col: u32,
}

impl Site {
    /// Create a site.
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Type of a lattice node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Regular transport site; rotations fire here.
    Standard,
    /// Parking site paired with exactly one standard node.
    Idle,
    /// Site where two carriers may meet for an interaction.
    Interaction,
}

impl NodeKind {
    /// Number of carriers the node holds outside an interaction.
    #[inline]
    pub fn base_capacity(self) -> usize {
        1
    }

    /// Number of carriers the node may hold while an interaction uses it.
    #[inline]
    pub fn interaction_capacity(self) -> usize {
        match self {
            NodeKind::Interaction => 2,
            NodeKind::Standard | NodeKind::Idle => 1,
        }
    }
}

/// Weight of a lattice node: its site and type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LatticeNode {
    /// Grid coordinate.
    pub site: Site,
    /// Node type.
    pub kind: NodeKind,
}

impl fmt::Display for LatticeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NodeKind::Idle => write!(f, "({}, {}, idle)", self.site.row, self.site.col),
            NodeKind::Standard | NodeKind::Interaction => write!(f, "{}", self.site),
        }
    }
}
