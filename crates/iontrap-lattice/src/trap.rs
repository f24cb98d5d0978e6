//! Grid trap lattice.
//!
//! ## Layout
//!
//! Every grid site is either an interaction site or a standard site. Each
//! standard site also owns an idle node one edge away, where a carrier parks
//! when it has nothing to do. Interaction sites have no idle twin. Lattice
//! neighbours (right and down) are joined by edges.
//!
//! ## Performance
//!
//! Sorted adjacency lists and the idle-twin table are computed once on
//! construction, so neighbour and twin queries do not touch the petgraph
//! structure.

use petgraph::graph::{NodeIndex, UnGraph};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{LatticeError, LatticeResult};
use crate::lattice::Lattice;
use crate::node::{LatticeNode, NodeId, NodeKind, Site};

/// Interaction sites of the 5x7 Penning trap.
pub const PENNING_INTERACTION_SITES: [Site; 6] = [
    Site::new(1, 1),
    Site::new(1, 3),
    Site::new(3, 1),
    Site::new(3, 3),
    Site::new(1, 5),
    Site::new(3, 5),
];

/// Serializable description of a grid trap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapSpec {
    /// Grid rows.
    pub rows: u32,
    /// Grid columns.
    pub cols: u32,
    /// Sites that are interaction nodes.
    pub interaction_sites: Vec<Site>,
}

impl TrapSpec {
    /// The 5x7 Penning trap.
    pub fn penning() -> Self {
        Self {
            rows: 5,
            cols: 7,
            interaction_sites: PENNING_INTERACTION_SITES.to_vec(),
        }
    }

    /// Build the lattice.
    pub fn build(&self) -> LatticeResult<TrapLattice> {
        TrapLattice::grid(self.rows, self.cols, &self.interaction_sites)
    }
}

impl Default for TrapSpec {
    fn default() -> Self {
        Self::penning()
    }
}

/// Grid trap lattice backed by a petgraph undirected graph.
#[derive(Debug, Clone)]
pub struct TrapLattice {
    graph: UnGraph<LatticeNode, (), u32>,
    rows: u32,
    cols: u32,
    adjacency: Vec<Vec<NodeId>>,
    twins: Vec<Option<NodeId>>,
    by_site: FxHashMap<(Site, bool), NodeId>,
}

impl TrapLattice {
    /// Build a `rows` x `cols` grid with the given interaction sites.
    pub fn grid(rows: u32, cols: u32, interaction_sites: &[Site]) -> LatticeResult<Self> {
        let mut interaction = FxHashSet::default();
        for &site in interaction_sites {
            if site.row >= rows || site.col >= cols {
                return Err(LatticeError::SiteOutOfBounds { site, rows, cols });
            }
            if !interaction.insert(site) {
                return Err(LatticeError::DuplicateSite(site));
            }
        }
        Ok(Self::assemble(rows, cols, &interaction))
    }

    /// The 5x7 Penning trap.
    pub fn penning() -> Self {
        let sites = PENNING_INTERACTION_SITES.iter().copied().collect();
        Self::assemble(5, 7, &sites)
    }

    /// A single row of `cols` sites with one interaction site in the middle.
    pub fn line(cols: u32) -> Self {
        let sites = std::iter::once(Site::new(0, cols / 2)).collect();
        Self::assemble(1, cols, &sites)
    }

    fn assemble(rows: u32, cols: u32, interaction: &FxHashSet<Site>) -> Self {
        let mut graph = UnGraph::<LatticeNode, (), u32>::default();
        let mut base: FxHashMap<Site, NodeIndex<u32>> = FxHashMap::default();
        let mut by_site = FxHashMap::default();

        for row in 0..rows {
            for col in 0..cols {
                let site = Site::new(row, col);
                let kind = if interaction.contains(&site) {
                    NodeKind::Interaction
                } else {
                    NodeKind::Standard
                };
                let node = graph.add_node(LatticeNode { site, kind });
                base.insert(site, node);
                by_site.insert((site, false), NodeId(node.index() as u32));

                if kind == NodeKind::Standard {
                    let idle = graph.add_node(LatticeNode {
                        site,
                        kind: NodeKind::Idle,
                    });
                    graph.add_edge(node, idle, ());
                    by_site.insert((site, true), NodeId(idle.index() as u32));
                }
            }
        }

        for row in 0..rows {
            for col in 0..cols {
                let here = base[&Site::new(row, col)];
                if col + 1 < cols {
                    graph.add_edge(here, base[&Site::new(row, col + 1)], ());
                }
                if row + 1 < rows {
                    graph.add_edge(here, base[&Site::new(row + 1, col)], ());
                }
            }
        }

        let adjacency = graph
            .node_indices()
            .map(|idx| {
                let mut neighbors: Vec<NodeId> = graph
                    .neighbors(idx)
                    .map(|n| NodeId(n.index() as u32))
                    .collect();
                neighbors.sort_unstable();
                neighbors.dedup();
                neighbors
            })
            .collect();

        let twins = graph
            .node_indices()
            .map(|idx| {
                let node = graph[idx];
                let twin_is_idle = match node.kind {
                    NodeKind::Standard => true,
                    NodeKind::Idle => false,
                    NodeKind::Interaction => return None,
                };
                by_site.get(&(node.site, twin_is_idle)).copied()
            })
            .collect();

        Self {
            graph,
            rows,
            cols,
            adjacency,
            twins,
            by_site,
        }
    }

    /// Grid rows.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Grid columns.
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// The standard or interaction node at a site.
    pub fn node_at(&self, site: Site) -> Option<NodeId> {
        self.by_site.get(&(site, false)).copied()
    }

    /// The idle node at a site.
    pub fn idle_at(&self, site: Site) -> Option<NodeId> {
        self.by_site.get(&(site, true)).copied()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Look up a node, failing on unknown ids.
    pub fn try_node(&self, id: NodeId) -> LatticeResult<LatticeNode> {
        self.node(id).ok_or(LatticeError::UnknownNode(id))
    }
}

impl Lattice for TrapLattice {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn node(&self, id: NodeId) -> Option<LatticeNode> {
        self.graph.node_weight(NodeIndex::new(id.index())).copied()
    }

    fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.adjacency.get(id.index()).cloned().unwrap_or_default()
    }

    fn idle_twin(&self, id: NodeId) -> Option<NodeId> {
        self.twins.get(id.index()).copied().flatten()
    }
}
